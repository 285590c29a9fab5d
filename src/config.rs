//! `stone.toml`: project defaults the CLI falls back to.
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_CONFIG: &str = "stone.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoneConfig {
    /// Literal paths or glob patterns.
    pub input: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub proto: ProtoConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtoConfig {
    pub package: Option<String>,
    /// Prefix output with `syntax = "proto3";`.
    pub syntax_header: bool,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self { package: None, syntax_header: true }
    }
}

/// Deserialize TOML with the offending key path in error messages.
pub fn from_toml_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = toml::Deserializer::new(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at key {path}: {}", err.into_inner()))
        }
    }
}

/// An explicit path must exist; the default `stone.toml` is optional.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<StoneConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    if !explicit && !path.exists() {
        return Ok(StoneConfig::default());
    }
    let src = std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    let config = from_toml_with_path(&src).map_err(|e| anyhow!("invalid config {}: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_all_sections() {
        let config: StoneConfig = from_toml_with_path(
            r#"
            input = ["schemas/*.stone"]
            out_dir = "gen"

            [proto]
            package = "acme.v1"
            syntax_header = false
            "#,
        )
        .unwrap();
        assert_eq!(config.input, vec!["schemas/*.stone"]);
        assert_eq!(config.out_dir, Some(PathBuf::from("gen")));
        assert_eq!(config.proto.package.as_deref(), Some("acme.v1"));
        assert!(!config.proto.syntax_header);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config: StoneConfig = from_toml_with_path("").unwrap();
        assert_eq!(config, StoneConfig::default());
        assert!(config.proto.syntax_header);
    }

    #[test]
    fn unknown_keys_name_their_path() {
        let err = from_toml_with_path::<StoneConfig>("[proto]\npackag = \"x\"\n").unwrap_err();
        assert!(err.starts_with("at key proto"), "{err}");
        assert!(err.contains("packag"), "{err}");
    }

    #[test]
    fn explicit_file_is_loaded_and_must_exist() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "input = [\"a.stone\"]").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.input, vec!["a.stone"]);

        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
