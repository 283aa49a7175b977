use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use clap::Parser;
use config::{builder::DefaultState, ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_PATH: &str = "./review-db";

#[derive(Parser, Debug)]
#[command(version)]
pub(crate) struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, value_name = "CONFIG_PATH")]
    pub(crate) config: PathBuf,
}

/// How much of the filtered result set the dashboard aggregates over: the
/// fetched page (bounded memory) or the whole filtered set (representative
/// statistics).
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MetricsScope {
    Page,
    Filtered,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Web {
    #[serde(deserialize_with = "deserialize_socket_addr")]
    pub(crate) address: SocketAddr,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Storage {
    pub(crate) path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct LexiconFile {
    pub(crate) path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Settings {
    pub(crate) web: Web,
    pub(crate) database: Storage,
    pub(crate) metrics_scope: MetricsScope,
    #[serde(default)]
    pub(crate) lexicon: Option<LexiconFile>,
}

impl Settings {
    /// Load settings from the given TOML file, with sane defaults.
    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::<DefaultState>::default()
            .set_default("web.address", DEFAULT_ADDR)?
            .set_default("database.path", DEFAULT_DB_PATH)?
            .set_default("metrics_scope", "page")?;

        let cfg = builder.add_source(File::from(path)).build()?;

        cfg.try_deserialize()
    }
}

fn deserialize_socket_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use super::{MetricsScope, Settings};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let file = write_config("");
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.web.address.port(), 8000);
        assert_eq!(settings.database.path, Path::new("./review-db"));
        assert_eq!(settings.metrics_scope, MetricsScope::Page);
        assert!(settings.lexicon.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let file = write_config(
            "metrics_scope = \"filtered\"\n\n[web]\naddress = \"127.0.0.1:9900\"\n\n[lexicon]\npath = \"./words.toml\"\n",
        );
        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.web.address.port(), 9900);
        assert_eq!(settings.metrics_scope, MetricsScope::Filtered);
        assert_eq!(
            settings.lexicon.unwrap().path,
            Path::new("./words.toml")
        );
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let file = write_config("metrics_scope = \"everything\"\n");
        assert!(Settings::from_file(file.path()).is_err());
    }
}
