use std::io;
use std::path::{Path, PathBuf};

use dmg_emu_core::gameboy::SavePolicy;
use dmg_emu_core::ppu::Shade;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SaveMode {
    #[default]
    Instruction,
    Vblank,
    Manual,
}

impl From<SaveMode> for SavePolicy {
    fn from(mode: SaveMode) -> Self {
        match mode {
            SaveMode::Instruction => SavePolicy::EveryInstruction,
            SaveMode::Vblank => SavePolicy::VBlank,
            SaveMode::Manual => SavePolicy::Manual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Throttle to the DMG frame rate.
    pub realtime: bool,
    /// 0xRRGGBB for the four shades, lightest first.
    pub palette: [u32; 4],
    pub save_on_exit: bool,
    pub frame_limit: Option<u64>,
    pub save_policy: SaveMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            realtime: false,
            palette: [
                Shade::White.rgb(),
                Shade::LightGray.rgb(),
                Shade::DarkGray.rgb(),
                Shade::Black.rgb(),
            ],
            save_on_exit: true,
            frame_limit: None,
            save_policy: SaveMode::default(),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("dmgemu").join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("dmgemu").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("dmgemu")
            .join("config.toml");
    }

    PathBuf::from("config.toml")
}

pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str::<Config>(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a config the user asked for by name. Any failure is an error.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text, path)
}

/// Load the config at its default location, falling back to defaults when it
/// is missing or unreadable.
pub fn load_or_default(path: &Path) -> Config {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return Config::default(),
    };

    match parse(&text, path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{e}; using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn every_field_is_optional() {
        let cfg = parse("realtime = true\n", Path::new("t.toml")).unwrap();
        assert!(cfg.realtime);
        assert!(cfg.save_on_exit);
        assert_eq!(cfg.palette, Config::default().palette);
        assert_eq!(cfg.save_policy, SaveMode::Instruction);
    }

    #[test]
    fn full_config_round_trips_through_toml() {
        let text = r#"
            realtime = false
            palette = [0xE0F8D0, 0x88C070, 0x346856, 0x081820]
            save_on_exit = false
            frame_limit = 600
            save_policy = "vblank"
        "#;
        let cfg = parse(text, Path::new("t.toml")).unwrap();
        assert_eq!(cfg.palette[0], 0xE0F8D0);
        assert_eq!(cfg.palette[3], 0x081820);
        assert!(!cfg.save_on_exit);
        assert_eq!(cfg.frame_limit, Some(600));
        assert_eq!(SavePolicy::from(cfg.save_policy), SavePolicy::VBlank);

        let again = parse(&toml::to_string(&cfg).unwrap(), Path::new("t.toml")).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn bad_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "frame_limit = \"soon\"").unwrap();
        assert_eq!(load_or_default(&path), Config::default());
        assert!(matches!(
            load_from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_only_an_error_when_named() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(load_or_default(&path), Config::default());
        assert!(matches!(load_from_file(&path), Err(ConfigError::Io { .. })));
    }
}
