use crate::config::ConfigOverrides;
use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub scene: Option<PathBuf>,
    pub script: Option<PathBuf>,
    icons: Option<PathBuf>,
    log: Option<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            if value.is_empty() {
                bail!("Empty value for '{flag}'");
            }
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "scene" => overrides.scene = Some(PathBuf::from(value)),
                "script" => overrides.script = Some(PathBuf::from(value)),
                "icons" => overrides.icons = Some(PathBuf::from(value)),
                "log" => overrides.log = Some(value),
                _ => bail!("Unknown flag '{flag}'. Supported flags: --config, --scene, --script, --icons, --log."),
            }
        }
        Ok(overrides)
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides { icon_directory: self.icons.clone(), log_filter: self.log.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = [
            "studio", "--config", "studio.json", "--scene", "place.json", "--script", "init.txt", "--icons",
            "res/icons", "--log", "mirror=trace",
        ];
        let overrides = CliOverrides::parse(args).expect("parse overrides");
        assert_eq!(overrides.config.as_deref(), Some(PathBuf::from("studio.json").as_path()));
        assert_eq!(overrides.scene.as_deref(), Some(PathBuf::from("place.json").as_path()));
        assert_eq!(overrides.script.as_deref(), Some(PathBuf::from("init.txt").as_path()));
        let config = overrides.config_overrides();
        assert_eq!(config.icon_directory, Some(PathBuf::from("res/icons")));
        assert_eq!(config.log_filter.as_deref(), Some("mirror=trace"));
    }

    #[test]
    fn latest_flag_wins() {
        let overrides = CliOverrides::parse(["studio", "--log", "info", "--log", "debug"]).expect("parse overrides");
        assert_eq!(overrides.config_overrides().log_filter.as_deref(), Some("debug"));
        assert!(overrides.config_overrides().icon_directory.is_none());
    }

    #[test]
    fn missing_value_errors() {
        let err = CliOverrides::parse(["studio", "--scene"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags_and_positionals() {
        let err = CliOverrides::parse(["studio", "--width", "800"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
        let err = CliOverrides::parse(["studio", "place.json"]).unwrap_err();
        assert!(err.to_string().contains("Unexpected argument"));
    }
}
