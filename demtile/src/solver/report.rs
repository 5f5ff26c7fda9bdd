//! Parsing of the solver's report-mode output.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Pattern for `key = value` and `key: value` lines.
fn key_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*([A-Za-z][A-Za-z0-9_]*)\s*[=:]\s*(\S+)\s*$").unwrap()
    })
}

/// Extract every `key = value` pair from report output.
///
/// Later occurrences of a key win. Lines that do not match are ignored, so
/// banners and progress chatter around the report are harmless.
pub fn parse_key_values(output: &str) -> HashMap<String, String> {
    key_value_pattern()
        .captures_iter(output)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .collect()
}

/// Extract the DEM size `(cols, rows)` from report output.
///
/// Accepts `cols`/`rows` and the `dem_cols`/`dem_rows` spellings.
pub fn parse_dimensions(output: &str) -> Option<(i64, i64)> {
    let values = parse_key_values(output);
    let lookup = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| values.get(*n))
            .and_then(|v| v.parse::<i64>().ok())
    };

    let cols = lookup(&["cols", "dem_cols"])?;
    let rows = lookup(&["rows", "dem_rows"])?;
    Some((cols, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        let output = "Reading DEM...\ncols = 1000\nrows = 750\n";
        assert_eq!(parse_dimensions(output), Some((1000, 750)));
    }

    #[test]
    fn test_parse_dimensions_alternate_keys() {
        let output = "dem_cols: 20\ndem_rows: 30\n";
        assert_eq!(parse_dimensions(output), Some((20, 30)));
    }

    #[test]
    fn test_parse_dimensions_missing_rows() {
        assert_eq!(parse_dimensions("cols = 10\n"), None);
    }

    #[test]
    fn test_parse_dimensions_non_numeric() {
        assert_eq!(parse_dimensions("cols = ten\nrows = 5\n"), None);
    }

    #[test]
    fn test_key_values_case_insensitive_keys() {
        let kv = parse_key_values("Cols = 5\nthreads=8\n");
        assert_eq!(kv.get("cols").map(String::as_str), Some("5"));
        assert_eq!(kv.get("threads").map(String::as_str), Some("8"));
    }
}
