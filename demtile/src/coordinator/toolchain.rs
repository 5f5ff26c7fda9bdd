//! Resolved paths of the external programs a run calls.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::ProgramSettings;
use crate::process::{find_executable, DiscoveryError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub solver: PathBuf,
    pub mosaic: PathBuf,
    pub distributor: PathBuf,
    pub probe: PathBuf,
}

fn resolve_or_keep(name: &str) -> PathBuf {
    find_executable(name).unwrap_or_else(|_| {
        warn!(program = name, "Program not found, will try it as given");
        PathBuf::from(name)
    })
}

impl Toolchain {
    /// Program names as configured, unresolved.
    pub fn from_settings(programs: &ProgramSettings) -> Self {
        Self {
            solver: PathBuf::from(&programs.solver),
            mosaic: PathBuf::from(&programs.mosaic),
            distributor: PathBuf::from(&programs.distributor),
            probe: PathBuf::from(&programs.probe),
        }
    }

    /// Locate the programs.
    ///
    /// The solver must be found. The others are looked up on a best-effort
    /// basis; if missing, their failure surfaces when they are first run.
    pub fn discover(programs: &ProgramSettings) -> Result<Self, DiscoveryError> {
        let solver = find_executable(&programs.solver)?;
        debug!(solver = %solver.display(), "Found solver");

        Ok(Self {
            solver,
            mosaic: resolve_or_keep(&programs.mosaic),
            distributor: resolve_or_keep(&programs.distributor),
            probe: resolve_or_keep(&programs.probe),
        })
    }

    /// Check that the distributor can be found.
    pub fn require_distributor(&self) -> Result<PathBuf, DiscoveryError> {
        find_executable(&self.distributor.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let toolchain = Toolchain::from_settings(&ProgramSettings::default());
        assert_eq!(toolchain.solver, PathBuf::from("sfs"));
        assert_eq!(toolchain.distributor, PathBuf::from("parallel"));
    }

    #[test]
    fn test_discover_missing_solver() {
        let programs = ProgramSettings {
            solver: "demtile-no-such-solver".to_string(),
            ..ProgramSettings::default()
        };
        let err = Toolchain::discover(&programs).unwrap_err();
        assert_eq!(err.name, "demtile-no-such-solver");
    }
}
