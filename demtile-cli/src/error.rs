//! CLI error type.

use std::fmt;

use demtile::config::ConfigError;
use demtile::coordinator::CoordinatorError;
use demtile::process::DiscoveryError;

/// Errors reported to the user before exiting with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or written.
    Config(String),
    /// Bad command-line arguments.
    Usage(String),
    /// Logging could not be set up.
    Logging(String),
    /// The run itself failed.
    Run(CoordinatorError),
}

impl CliError {
    /// Returns true if the user should be pointed at `--help`.
    pub fn wants_usage_hint(&self) -> bool {
        match self {
            CliError::Usage(_) => true,
            CliError::Run(e) => e.is_usage(),
            _ => false,
        }
    }

    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Logging(msg) => write!(f, "Logging setup failed: {}", msg),
            CliError::Run(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Run(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoordinatorError> for CliError {
    fn from(e: CoordinatorError) -> Self {
        CliError::Run(e)
    }
}

impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        CliError::Run(CoordinatorError::Discovery(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_hint() {
        assert!(CliError::Usage("bad".into()).wants_usage_hint());
        assert!(CliError::Run(CoordinatorError::Usage("no images".into())).wants_usage_hint());
        assert!(!CliError::Config("x".into()).wants_usage_hint());
    }

    #[test]
    fn test_discovery_maps_to_run_error() {
        let err: CliError = DiscoveryError {
            name: "sfs".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Run(CoordinatorError::Discovery(_))));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("sfs"));
    }
}
