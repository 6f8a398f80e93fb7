use std::path::Path;

use anyhow::{Context, Result};

use crate::config::HarnessConfig;

/// Load configuration with standard priority:
/// ./stdnorm.toml > ~/.config/stdnorm/config.toml > defaults
pub fn load_config() -> Result<HarnessConfig> {
    if let Some(config) = try_load_from_path("./stdnorm.toml")? {
        return Ok(config);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("stdnorm").join("config.toml");
        if let Some(config) = try_load_from_path(&user_config)? {
            return Ok(config);
        }
    }

    log::debug!("No stdnorm config found, using defaults");
    Ok(HarnessConfig::default())
}

/// Load from specific path.
pub fn load_config_from_path(path: &Path) -> Result<HarnessConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = HarnessConfig::from_toml_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn try_load_from_path(path: impl AsRef<Path>) -> Result<Option<HarnessConfig>> {
    let path = path.as_ref();
    if path.exists() {
        Ok(Some(load_config_from_path(path)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("stdnorm-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_from_path() {
        let path = temp_file("ok.toml", "[backend]\nkind = \"reference\"\n");
        let config = load_config_from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Reference);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let path = temp_file("bad.toml", "[kernel]\nreduction = \"three_pass\"\n");
        let err = load_config_from_path(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config_from_path(Path::new("/nonexistent/stdnorm.toml")).is_err());
    }
}
