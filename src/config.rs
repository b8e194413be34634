use crate::selection::DEFAULT_PROTECTED_CLASSES;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default = "ExplorerConfig::default_protected_classes")]
    pub protected_classes: Vec<String>,
    /// Show the data model itself as the top row instead of only its services.
    #[serde(default = "ExplorerConfig::default_show_root")]
    pub show_root: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IconConfig {
    /// Directory holding `<ClassName>.<extension>` images. No directory means default icons only.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "IconConfig::default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives. Unset defers to `RUST_LOG`, then `info`.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StudioConfig {
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub icons: IconConfig,
    /// Extra `class -> parent class` entries on top of the built-in classes.
    /// An empty parent makes the class a hierarchy root.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub icon_directory: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl ExplorerConfig {
    fn default_protected_classes() -> Vec<String> {
        DEFAULT_PROTECTED_CLASSES.iter().map(|class| class.to_string()).collect()
    }

    const fn default_show_root() -> bool {
        true
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self { protected_classes: Self::default_protected_classes(), show_root: Self::default_show_root() }
    }
}

impl IconConfig {
    fn default_extension() -> String {
        "png".to_string()
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self { directory: None, extension: Self::default_extension() }
    }
}

impl StudioConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(target: "config", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(directory) = &overrides.icon_directory {
            self.icons.directory = Some(directory.clone());
        }
        if let Some(filter) = &overrides.log_filter {
            self.logging.filter = Some(filter.clone());
        }
    }
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.icon_directory.is_none() && self.log_filter.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.icon_directory.is_some() {
            fields.push("icons");
        }
        if self.log_filter.is_some() {
            fields.push("log");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: StudioConfig = serde_json::from_str("{}").expect("parse");
        assert!(cfg.explorer.show_root);
        assert!(cfg.explorer.protected_classes.iter().any(|class| class == "Workspace"));
        assert_eq!(cfg.icons.extension, "png");
        assert!(cfg.logging.filter.is_none());
        assert!(cfg.classes.is_empty());
    }

    #[test]
    fn load_reads_sections_and_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "explorer": {{ "protected_classes": ["Workspace"], "show_root": false }},
                "icons": {{ "directory": "res/class_icons" }},
                "classes": {{ "Truss": "BasePart" }},
                "logging": {{ "filter": "mirror=debug" }}
            }}"#
        )
        .expect("write config");

        let mut cfg = StudioConfig::load(file.path()).expect("load");
        assert_eq!(cfg.explorer.protected_classes, vec!["Workspace".to_string()]);
        assert!(!cfg.explorer.show_root);
        assert_eq!(cfg.classes.get("Truss").map(String::as_str), Some("BasePart"));

        let overrides = ConfigOverrides { icon_directory: None, log_filter: Some("trace".into()) };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.logging.filter.as_deref(), Some("trace"));
        assert_eq!(cfg.icons.directory.as_deref(), Some(Path::new("res/class_icons")));
        assert_eq!(overrides.applied_fields(), vec!["log"]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = StudioConfig::load_or_default("definitely/not/here.json");
        assert!(cfg.icons.directory.is_none());
        let err = StudioConfig::load("definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
