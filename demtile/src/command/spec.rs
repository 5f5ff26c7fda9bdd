//! Typed command descriptor.
//!
//! A [`CommandSpec`] is an ordered list of flags (each carrying its values)
//! and positional tokens. It is built once from a flat token list and only
//! flattened again when handed to an external program, so rewriting an
//! option can never split it from its values.

use thiserror::Error;

use super::arity::ArityTable;

/// Errors raised while parsing a token list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("option {flag} expects {expected} value(s) but only {found} follow it")]
    MissingValues {
        flag: String,
        expected: usize,
        found: usize,
    },
}

/// A flag and the values that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    /// Canonical name used for lookups.
    pub key: String,
    /// Spelling as written, used when rendering.
    pub flag: String,
    /// Values in order.
    pub values: Vec<String>,
    /// Written as `--flag=value` rather than `--flag value`.
    pub inline: bool,
}

/// One element of a [`CommandSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEntry {
    Flag(CommandOption),
    Positional(String),
}

/// Ordered `{flag, arity, values}` descriptor of a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    entries: Vec<CommandEntry>,
}

/// Returns true if the token should be read as a flag rather than a value.
///
/// Negative numbers (`-5`, `-0.25`) are values.
fn looks_like_flag(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some('-'), Some(c)) => !(c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

impl CommandSpec {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat token list.
    ///
    /// Known multi-value options consume exactly their arity in following
    /// tokens, whatever those tokens look like. A bare `--` ends option
    /// parsing; it and everything after it are kept as positionals.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingValues`] when a known option is
    /// followed by fewer tokens than its arity.
    pub fn parse<S: AsRef<str>>(tokens: &[S], table: &ArityTable) -> Result<Self, CommandError> {
        let mut entries = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i].as_ref();

            if token == "--" {
                entries.extend(
                    tokens[i..]
                        .iter()
                        .map(|t| CommandEntry::Positional(t.as_ref().to_string())),
                );
                break;
            }

            if !looks_like_flag(token) {
                entries.push(CommandEntry::Positional(token.to_string()));
                i += 1;
                continue;
            }

            if let Some((flag, value)) = token.split_once('=').filter(|_| token.starts_with("--")) {
                entries.push(CommandEntry::Flag(CommandOption {
                    key: table.canonical(flag).to_string(),
                    flag: flag.to_string(),
                    values: vec![value.to_string()],
                    inline: true,
                }));
                i += 1;
                continue;
            }

            let arity = table.arity(token);
            let available = tokens.len() - i - 1;
            if available < arity {
                return Err(CommandError::MissingValues {
                    flag: token.to_string(),
                    expected: arity,
                    found: available,
                });
            }

            entries.push(CommandEntry::Flag(CommandOption {
                key: table.canonical(token).to_string(),
                flag: token.to_string(),
                values: tokens[i + 1..=i + arity]
                    .iter()
                    .map(|t| t.as_ref().to_string())
                    .collect(),
                inline: false,
            }));
            i += 1 + arity;
        }

        Ok(Self { entries })
    }

    /// All entries in order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn options(&self) -> impl Iterator<Item = &CommandOption> {
        self.entries.iter().filter_map(|e| match e {
            CommandEntry::Flag(opt) => Some(opt),
            CommandEntry::Positional(_) => None,
        })
    }

    /// Returns true if an option with this canonical key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.options().any(|o| o.key == key)
    }

    /// Values of the first occurrence of an option.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.options()
            .find(|o| o.key == key)
            .map(|o| o.values.as_slice())
    }

    /// Positional tokens in order.
    pub fn positionals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            CommandEntry::Positional(p) => Some(p.as_str()),
            CommandEntry::Flag(_) => None,
        })
    }

    /// Remove every occurrence of an option, returning the first one.
    pub fn remove(&mut self, key: &str) -> Option<CommandOption> {
        let mut removed = None;
        self.entries.retain(|e| match e {
            CommandEntry::Flag(opt) if opt.key == key => {
                if removed.is_none() {
                    removed = Some(opt.clone());
                }
                false
            }
            _ => true,
        });
        removed
    }

    /// Set an option's values, replacing it in place if present.
    ///
    /// Any further occurrences of the same option are dropped so the result
    /// carries exactly one.
    pub fn set<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let position = self
            .entries
            .iter()
            .position(|e| matches!(e, CommandEntry::Flag(o) if o.key == key));

        match position {
            Some(pos) => {
                if let CommandEntry::Flag(opt) = &mut self.entries[pos] {
                    opt.inline = opt.inline && values.len() == 1;
                    opt.values = values;
                }
                let mut index = 0;
                self.entries.retain(|e| {
                    let keep = index <= pos
                        || !matches!(e, CommandEntry::Flag(o) if o.key == key);
                    index += 1;
                    keep
                });
            }
            None => self.push_flag(key, values),
        }
    }

    /// Append an option.
    pub fn push_flag<I, S>(&mut self, flag: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(CommandEntry::Flag(CommandOption {
            key: flag.to_string(),
            flag: flag.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            inline: false,
        }));
    }

    /// Append an option spelled differently from its canonical key (e.g. `-i`).
    pub fn push_aliased<I, S>(&mut self, key: &str, spelling: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(CommandEntry::Flag(CommandOption {
            key: key.to_string(),
            flag: spelling.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            inline: false,
        }));
    }

    /// Append a switch with no values.
    pub fn push_switch(&mut self, flag: &str) {
        self.push_flag(flag, Vec::<String>::new());
    }

    /// Append a positional token.
    pub fn push_positional(&mut self, value: impl Into<String>) {
        self.entries.push(CommandEntry::Positional(value.into()));
    }

    /// Append all entries of another descriptor.
    pub fn extend(&mut self, other: &CommandSpec) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Flatten to the argument list handed to an external program.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for entry in &self.entries {
            match entry {
                CommandEntry::Positional(p) => args.push(p.clone()),
                CommandEntry::Flag(opt) if opt.inline => {
                    args.push(format!("{}={}", opt.flag, opt.values.join(",")));
                }
                CommandEntry::Flag(opt) => {
                    args.push(opt.flag.clone());
                    args.extend(opt.values.iter().cloned());
                }
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FlagSpec;

    fn table() -> ArityTable {
        ArityTable::new()
            .with(FlagSpec::new("--crop-win", 4))
            .with(FlagSpec::new("--input-dem", 1).with_alias("-i"))
            .with(FlagSpec::new("--threads", 1))
    }

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_keeps_multi_value_option_together() {
        let spec = CommandSpec::parse(
            &tokens("--crop-win 0 0 300 300 --float-albedo a.tif"),
            &table(),
        )
        .unwrap();

        assert_eq!(
            spec.get("--crop-win").unwrap(),
            &["0", "0", "300", "300"].map(String::from)
        );
        assert!(spec.contains("--float-albedo"));
        assert_eq!(spec.positionals().collect::<Vec<_>>(), vec!["a.tif"]);
    }

    #[test]
    fn test_parse_accepts_negative_values() {
        let spec = CommandSpec::parse(&tokens("--crop-win -10 -20 300 300"), &table()).unwrap();
        assert_eq!(spec.get("--crop-win").unwrap()[0], "-10");
    }

    #[test]
    fn test_parse_missing_values_is_error() {
        let err = CommandSpec::parse(&tokens("--crop-win 1 2"), &table()).unwrap_err();
        assert_eq!(
            err,
            CommandError::MissingValues {
                flag: "--crop-win".to_string(),
                expected: 4,
                found: 2
            }
        );
    }

    #[test]
    fn test_alias_resolves_to_canonical_key() {
        let spec = CommandSpec::parse(&tokens("-i dem.tif"), &table()).unwrap();
        assert_eq!(spec.get("--input-dem").unwrap(), &["dem.tif".to_string()]);
        // Rendering preserves the original spelling
        assert_eq!(spec.to_args(), tokens("-i dem.tif"));
    }

    #[test]
    fn test_inline_value() {
        let spec = CommandSpec::parse(&tokens("--threads=4 img.tif"), &table()).unwrap();
        assert_eq!(spec.get("--threads").unwrap(), &["4".to_string()]);
        assert_eq!(spec.to_args(), tokens("--threads=4 img.tif"));
    }

    #[test]
    fn test_render_round_trip_preserves_order() {
        let input = tokens("a.tif --smoothness-weight 0.04 b.tif --crop-win 1 2 3 4 c.cub");
        let spec = CommandSpec::parse(&input, &table()).unwrap();
        assert_eq!(spec.to_args(), input);
    }

    #[test]
    fn test_double_dash_ends_options() {
        let spec = CommandSpec::parse(&tokens("--threads 2 -- --crop-win"), &table()).unwrap();
        assert!(!spec.contains("--crop-win"));
        assert_eq!(spec.to_args(), tokens("--threads 2 -- --crop-win"));
    }

    #[test]
    fn test_set_replaces_in_place_and_dedups() {
        let mut spec = CommandSpec::parse(
            &tokens("--crop-win 0 0 1 1 a.tif --crop-win 5 5 6 6"),
            &table(),
        )
        .unwrap();
        spec.set("--crop-win", ["10", "10", "20", "20"]);
        assert_eq!(spec.to_args(), tokens("--crop-win 10 10 20 20 a.tif"));
    }

    #[test]
    fn test_set_appends_when_absent() {
        let mut spec = CommandSpec::parse(&tokens("a.tif"), &table()).unwrap();
        spec.set("--threads", ["8"]);
        assert_eq!(spec.to_args(), tokens("a.tif --threads 8"));
    }

    #[test]
    fn test_remove_drops_all_occurrences() {
        let mut spec =
            CommandSpec::parse(&tokens("--threads 1 a.tif --threads 2"), &table()).unwrap();
        let removed = spec.remove("--threads").unwrap();
        assert_eq!(removed.values, vec!["1".to_string()]);
        assert_eq!(spec.to_args(), tokens("a.tif"));
        assert!(spec.remove("--threads").is_none());
    }
}
