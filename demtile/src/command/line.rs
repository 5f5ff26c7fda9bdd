//! Concrete command lines handed to external programs.

use std::fmt;
use std::path::{Path, PathBuf};

use super::spec::CommandSpec;

/// A program plus its flattened arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLine {
    /// Start a command line for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Build a command line from a typed descriptor.
    pub fn from_spec(program: impl Into<PathBuf>, spec: &CommandSpec) -> Self {
        Self {
            program: program.into(),
            args: spec.to_args(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program to execute.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The flattened argument list.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Build a `std::process::Command` for this line.
    pub fn to_command(&self) -> std::process::Command {
        let mut command = std::process::Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// Quote a token for display if it contains shell-special characters.
fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%{}".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_special_tokens() {
        let line = CommandLine::new("sfs").arg("-o").arg("out dir/run").arg("\t");
        assert_eq!(line.to_string(), "sfs -o 'out dir/run' '\t'");
    }

    #[test]
    fn test_display_keeps_placeholders_bare() {
        let line = CommandLine::new("demtile").args(["--pixel-begin-x", "{1}"]);
        assert_eq!(line.to_string(), "demtile --pixel-begin-x {1}");
    }

    #[test]
    fn test_from_spec() {
        let mut spec = CommandSpec::new();
        spec.push_flag("--threads", ["4"]);
        spec.push_positional("a.tif");
        let line = CommandLine::from_spec("sfs", &spec);
        assert_eq!(line.arguments(), &["--threads", "4", "a.tif"]);
        assert_eq!(line.program(), Path::new("sfs"));
    }
}
