//! XDG-compliant path resolution for coopcycle-ld.
//!
//! Only the config location is global; scraped data lives under the
//! configured `scrape.data_dir`, relative to the working directory by default.

use std::path::PathBuf;

/// Global XDG-compliant directories for coopcycle-ld.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// `$XDG_CONFIG_HOME/coopcycle-ld/`
    pub config_dir: PathBuf,
}

impl AppPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    ///
    /// Returns `None` when neither `XDG_CONFIG_HOME` nor `HOME` is set.
    pub fn resolve() -> Option<Self> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
        }
        .join("coopcycle-ld");

        Some(Self { config_dir })
    }

    /// Path to the global config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_in_config_dir() {
        let paths = AppPaths {
            config_dir: PathBuf::from("/tmp/xdg/coopcycle-ld"),
        };
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/tmp/xdg/coopcycle-ld/config.toml")
        );
    }
}
