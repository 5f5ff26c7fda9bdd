//! INI configuration file.
//!
//! ```ini
//! [solver]
//! program = sfs
//!
//! [mosaic]
//! program = dem_mosaic
//! weights_exponent = 2
//!
//! [distributor]
//! program = parallel
//!
//! [probe]
//! program = gdalinfo
//!
//! [tiling]
//! tile_size = 300
//! padding = 50
//!
//! [dispatch]
//! oversubscription = 1.25
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use tracing::debug;

use super::ConfigError;
use crate::coordinator::DEFAULT_OVERSUBSCRIPTION;
use crate::mosaic::DEFAULT_WEIGHTS_EXPONENT;

/// Default nominal tile edge in pixels.
pub const DEFAULT_TILE_SIZE: i64 = 300;

/// Default padding around each tile in pixels.
pub const DEFAULT_PADDING: i64 = 50;

/// External programs the coordinator calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSettings {
    pub solver: String,
    pub mosaic: String,
    pub distributor: String,
    pub probe: String,
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self {
            solver: "sfs".to_string(),
            mosaic: "dem_mosaic".to_string(),
            distributor: "parallel".to_string(),
            probe: "gdalinfo".to_string(),
        }
    }
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub programs: ProgramSettings,
    pub weights_exponent: u32,
    pub tile_size: i64,
    pub padding: i64,
    /// Workers per CPU when no process count is given.
    pub oversubscription: f64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            programs: ProgramSettings::default(),
            weights_exponent: DEFAULT_WEIGHTS_EXPONENT,
            tile_size: DEFAULT_TILE_SIZE,
            padding: DEFAULT_PADDING,
            oversubscription: DEFAULT_OVERSUBSCRIPTION,
        }
    }
}

fn read_value<T: FromStr>(
    ini: &Ini,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match ini.section(Some(section)).and_then(|s| s.get(key)) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        }),
        None => Ok(default),
    }
}

impl ConfigFile {
    /// Load from a path. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let d = Self::default();

        let config = Self {
            programs: ProgramSettings {
                solver: read_value(ini, "solver", "program", d.programs.solver)?,
                mosaic: read_value(ini, "mosaic", "program", d.programs.mosaic)?,
                distributor: read_value(ini, "distributor", "program", d.programs.distributor)?,
                probe: read_value(ini, "probe", "program", d.programs.probe)?,
            },
            weights_exponent: read_value(ini, "mosaic", "weights_exponent", d.weights_exponent)?,
            tile_size: read_value(ini, "tiling", "tile_size", d.tile_size)?,
            padding: read_value(ini, "tiling", "padding", d.padding)?,
            oversubscription: read_value(ini, "dispatch", "oversubscription", d.oversubscription)?,
        };

        if config.tile_size <= 0 {
            return Err(ConfigError::InvalidValue {
                section: "tiling".to_string(),
                key: "tile_size".to_string(),
                value: config.tile_size.to_string(),
            });
        }
        if config.padding < 0 {
            return Err(ConfigError::InvalidValue {
                section: "tiling".to_string(),
                key: "padding".to_string(),
                value: config.padding.to_string(),
            });
        }
        if config.oversubscription.is_nan() || config.oversubscription <= 0.0 {
            return Err(ConfigError::InvalidValue {
                section: "dispatch".to_string(),
                key: "oversubscription".to_string(),
                value: config.oversubscription.to_string(),
            });
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("solver"))
            .set("program", self.programs.solver.as_str());
        ini.with_section(Some("mosaic"))
            .set("program", self.programs.mosaic.as_str())
            .set("weights_exponent", self.weights_exponent.to_string());
        ini.with_section(Some("distributor"))
            .set("program", self.programs.distributor.as_str());
        ini.with_section(Some("probe"))
            .set("program", self.programs.probe.as_str());
        ini.with_section(Some("tiling"))
            .set("tile_size", self.tile_size.to_string())
            .set("padding", self.padding.to_string());
        ini.with_section(Some("dispatch"))
            .set("oversubscription", self.oversubscription.to_string());
        ini
    }

    /// Write to a path, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Directory holding demtile's configuration.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".demtile")
}

/// Default configuration file location, `~/.demtile/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
