//! Executable discovery.

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The named program could not be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not find executable '{name}' next to this program or in PATH")]
pub struct DiscoveryError {
    pub name: String,
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Locate an executable.
///
/// A name containing a path separator is checked as-is. Otherwise the
/// directory holding the current executable is searched first (tools are
/// usually installed side by side), then each entry of `PATH`.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if no matching executable file exists. On unix
/// a file without any execute bit does not count.
pub fn find_executable(name: &str) -> Result<PathBuf, DiscoveryError> {
    let not_found = || DiscoveryError {
        name: name.to_string(),
    };

    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return if is_executable_file(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    let sibling_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    let path_dirs = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    sibling_dir
        .into_iter()
        .chain(path_dirs)
        .map(|dir| dir.join(name))
        .find(|path| is_executable_file(path))
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tool(path: &Path, mode: u32) {
        fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
    }

    #[test]
    fn test_explicit_path_found() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("sfs");
        write_tool(&tool, 0o755);

        let found = find_executable(tool.to_str().unwrap()).unwrap();
        assert_eq!(found, tool);
    }

    #[test]
    fn test_explicit_path_missing() {
        let err = find_executable("/nonexistent/dir/sfs").unwrap_err();
        assert_eq!(err.name, "/nonexistent/dir/sfs");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_without_execute_bit_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("sfs");
        write_tool(&tool, 0o644);

        let err = find_executable(tool.to_str().unwrap()).unwrap_err();
        assert_eq!(err.name, tool.to_str().unwrap());
    }

    #[test]
    fn test_directory_is_not_an_executable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_executable(dir.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_bare_name_missing() {
        assert!(find_executable("demtile-no-such-tool-xyz").is_err());
    }
}
