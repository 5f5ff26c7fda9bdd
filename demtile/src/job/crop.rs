//! Reconciliation of tile bounds with a user crop window.

use super::JobError;
use crate::grid::PixelBox;

/// Intersect a tile's bounds with a crop window.
///
/// Per axis, `start = max(tile_start, crop_start)` and
/// `stop = min(tile_stop, crop_stop)`. Returns `None` when the result covers
/// no pixels, in which case the tile has no work to do.
pub fn reconcile(tile: &PixelBox, crop: &PixelBox) -> Option<PixelBox> {
    let window = PixelBox::new(
        tile.begin_x.max(crop.begin_x),
        tile.begin_y.max(crop.begin_y),
        tile.end_x.min(crop.end_x),
        tile.end_y.min(crop.end_y),
    );
    (!window.is_empty()).then_some(window)
}

/// Parse the four values of a `--crop-win` option.
pub fn parse_crop_window(values: &[String]) -> Result<PixelBox, JobError> {
    let invalid = || JobError::InvalidCropWindow(values.join(" "));

    if values.len() != 4 {
        return Err(invalid());
    }
    let mut coords = [0i64; 4];
    for (slot, value) in coords.iter_mut().zip(values) {
        *slot = value.trim().parse().map_err(|_| invalid())?;
    }
    Ok(PixelBox::new(coords[0], coords[1], coords[2], coords[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_inner_window() {
        let tile = PixelBox::new(100, 100, 400, 400);
        let crop = PixelBox::new(150, 150, 350, 350);
        assert_eq!(reconcile(&tile, &crop), Some(crop));
    }

    #[test]
    fn test_reconcile_disjoint_is_none() {
        let tile = PixelBox::new(100, 100, 400, 400);
        let crop = PixelBox::new(500, 500, 600, 600);
        assert_eq!(reconcile(&tile, &crop), None);
    }

    #[test]
    fn test_reconcile_partial_overlap() {
        let tile = PixelBox::new(100, 100, 400, 400);
        let crop = PixelBox::new(0, 300, 200, 1000);
        assert_eq!(
            reconcile(&tile, &crop),
            Some(PixelBox::new(100, 300, 200, 400))
        );
    }

    #[test]
    fn test_reconcile_touching_edge_is_empty() {
        let tile = PixelBox::new(0, 0, 100, 100);
        let crop = PixelBox::new(100, 0, 200, 100);
        assert_eq!(reconcile(&tile, &crop), None);
    }

    #[test]
    fn test_parse_crop_window() {
        let values: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            parse_crop_window(&values).unwrap(),
            PixelBox::new(1, 2, 3, 4)
        );
    }

    #[test]
    fn test_parse_crop_window_rejects_garbage() {
        let values: Vec<String> = ["1", "x", "3", "4"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            parse_crop_window(&values),
            Err(JobError::InvalidCropWindow(_))
        ));
        assert!(parse_crop_window(&values[..3]).is_err());
    }
}
