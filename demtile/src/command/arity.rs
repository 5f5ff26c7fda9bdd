//! Option arity table.
//!
//! Some solver options consume more than one following token (the crop
//! window takes four). The parser has to know this up front so that an
//! option and its values are always kept together as one entry.

/// How a known option is spelled and how many values it consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    /// Canonical spelling, used when rendering.
    pub canonical: String,
    /// Alternative spellings that resolve to the canonical one.
    pub aliases: Vec<String>,
    /// Number of tokens following the flag that belong to it.
    pub arity: usize,
}

impl FlagSpec {
    /// Create a spec for a flag with no aliases.
    pub fn new(canonical: impl Into<String>, arity: usize) -> Self {
        Self {
            canonical: canonical.into(),
            aliases: Vec::new(),
            arity,
        }
    }

    /// Add an alternative spelling.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    fn matches(&self, flag: &str) -> bool {
        self.canonical == flag || self.aliases.iter().any(|a| a == flag)
    }
}

/// Lookup table of known options.
///
/// Flags not in the table are treated as switches (arity 0); any tokens that
/// follow them are kept as positional entries in their original order, so
/// rendering reproduces the input exactly.
#[derive(Debug, Clone, Default)]
pub struct ArityTable {
    specs: Vec<FlagSpec>,
}

impl ArityTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flag.
    pub fn with(mut self, spec: FlagSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Find the spec for a flag spelling, alias or canonical.
    pub fn lookup(&self, flag: &str) -> Option<&FlagSpec> {
        self.specs.iter().find(|s| s.matches(flag))
    }

    /// Resolve a spelling to its canonical form. Unknown flags map to themselves.
    pub fn canonical<'a>(&'a self, flag: &'a str) -> &'a str {
        self.lookup(flag).map(|s| s.canonical.as_str()).unwrap_or(flag)
    }

    /// Number of values a flag consumes (0 for unknown flags).
    pub fn arity(&self, flag: &str) -> usize {
        self.lookup(flag).map(|s| s.arity).unwrap_or(0)
    }
}
