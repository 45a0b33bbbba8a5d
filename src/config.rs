//! TOML configuration.
//!
//! Loaded once at process start and passed by reference into every component
//! that needs it — there is no ambient global. Example:
//!
//! ```toml
//! [general]
//! map_filename = ".docmap.json"
//! default_username = "ops"        # optional
//!
//! [targets.prod]
//! url = "https://aim.example.edu/fmax"
//! webservice_id = "1024"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub targets: BTreeMap<String, TargetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Name of the file map document, relative to the working-tree root.
    #[serde(default = "default_map_filename")]
    pub map_filename: String,
    /// Username applied when `--username` is not given; prompts otherwise.
    #[serde(default)]
    pub default_username: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            map_filename: default_map_filename(),
            default_username: None,
        }
    }
}

fn default_map_filename() -> String {
    ".docmap.json".to_string()
}

/// One remote endpoint: where it lives and which webservice transaction
/// identifier it expects.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub url: String,
    pub webservice_id: String,
}

impl Config {
    /// Look up a configured target by name.
    pub fn target(&self, name: &str) -> Result<&TargetConfig> {
        self.targets.get(name).with_context(|| {
            format!("target {} is not configured; add a [targets.{}] table", name, name)
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| "failed to parse config file")?;

    if config.general.map_filename.is_empty() {
        anyhow::bail!("general.map_filename must not be empty");
    }
    if config.targets.is_empty() {
        anyhow::bail!("at least one [targets.<name>] table must be configured");
    }
    for (name, target) in &config.targets {
        if target.url.is_empty() {
            anyhow::bail!("targets.{}.url must not be empty", name);
        }
        if target.webservice_id.is_empty() {
            anyhow::bail!("targets.{}.webservice_id must not be empty", name);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load(toml: &str) -> Result<Config> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn minimal_config_loads_with_defaults() {
        let config = load(
            r#"
[targets.prod]
url = "https://aim.example.edu/fmax"
webservice_id = "1024"
"#,
        )
        .unwrap();
        assert_eq!(config.general.map_filename, ".docmap.json");
        assert!(config.general.default_username.is_none());
        assert_eq!(config.target("prod").unwrap().webservice_id, "1024");
    }

    #[test]
    fn missing_targets_table_is_rejected() {
        let err = load("[general]\nmap_filename = \".docmap.json\"\n").unwrap_err();
        assert!(err.to_string().contains("parse") || err.to_string().contains("targets"));
    }

    #[test]
    fn empty_targets_table_is_rejected() {
        let err = load("[targets]\n").unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn empty_target_url_is_rejected() {
        let err = load(
            r#"
[targets.prod]
url = ""
webservice_id = "1024"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("targets.prod.url"));
    }

    #[test]
    fn unknown_target_lookup_names_the_target() {
        let config = load(
            r#"
[targets.prod]
url = "https://aim.example.edu/fmax"
webservice_id = "1024"
"#,
        )
        .unwrap();
        let err = config.target("staging").unwrap_err();
        assert!(err.to_string().contains("staging"));
    }
}
