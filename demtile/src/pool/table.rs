//! Tile-argument table.
//!
//! Plain text, one tile per line, four tab-separated integers
//! `begin_x begin_y end_x end_y`, no header. The distributor reads one row
//! per job and substitutes the columns into the worker command template.

use std::fs;
use std::io;
use std::path::Path;

use crate::grid::PixelBox;

/// Render the table for a list of padded bounds.
pub fn render_table<'a>(rows: impl IntoIterator<Item = &'a PixelBox>) -> String {
    rows.into_iter()
        .map(|b| {
            format!(
                "{}\t{}\t{}\t{}\n",
                b.begin_x, b.begin_y, b.end_x, b.end_y
            )
        })
        .collect()
}

/// Write the table, creating parent directories as needed.
pub fn write_table<'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a PixelBox>,
) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_table(rows))
}

/// Read a table back. Blank lines are skipped.
pub fn read_table(path: &Path) -> io::Result<Vec<PixelBox>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            let values: Vec<i64> = line
                .split('\t')
                .map(|v| v.trim().parse::<i64>())
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("row {}: {}", i + 1, e),
                    )
                })?;
            match values.as_slice() {
                [bx, by, ex, ey] => Ok(PixelBox::new(*bx, *by, *ex, *ey)),
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("row {}: expected 4 columns, found {}", i + 1, values.len()),
                )),
            }
        })
        .collect()
}
