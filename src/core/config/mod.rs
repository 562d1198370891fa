use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VideoStandard {
    Ntsc,
    Pal,
}

impl Default for VideoStandard {
    fn default() -> Self {
        VideoStandard::Ntsc
    }
}

/// Emulator tunables, loaded from `rpsx.yaml` next to the binary when the
/// file exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub video_standard: VideoStandard,
    /// Intercept the kernel putchar calls and log them as [TTY] lines.
    pub bios_tty_capture: bool,
    /// Fallback BIOS image used when the command line gives none.
    pub bios: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            video_standard: VideoStandard::Ntsc,
            bios_tty_capture: true,
            bios: None,
        }
    }
}

impl Config {
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        match fs::read_to_string(&path) {
            Ok(text) => match serde_yaml::from_str(&text) {
                Ok(config) => {
                    info!("configuration loaded from {}", path.as_ref().display());
                    config
                }
                Err(error) => {
                    warn!("ignoring malformed configuration: {error}");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_ntsc_with_tty() {
        let config = Config::default();
        assert_eq!(config.video_standard, VideoStandard::Ntsc);
        assert!(config.bios_tty_capture);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml::from_str("video_standard: Pal\n").unwrap();
        assert_eq!(config.video_standard, VideoStandard::Pal);
        assert!(config.bios_tty_capture);
    }
}
