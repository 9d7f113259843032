//! Configuration loading.
//!
//! Reads `tgvmax-archive.toml` (or the file given with `--config`) and fills
//! in defaults for everything the file leaves out. CLI flags override the
//! file through [`Config::apply_fetch_args`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::cli::FetchArgs;
use crate::encode::{Compression, Delimiter, Format};
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "tgvmax-archive.toml";

pub const DEFAULT_URL: &str =
    "https://ressources.data.sncf.com/api/explore/v2.1/catalog/datasets/tgvmax/exports/csv";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceConfig,
    pub archive: ArchiveConfig,
    pub readme: ReadmeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub url: String,
    pub delimiter: Delimiter,
    #[serde(deserialize_with = "duration_str")]
    pub timeout: Duration,
    pub retries: u32,
    #[serde(deserialize_with = "duration_str")]
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            url: DEFAULT_URL.to_string(),
            delimiter: Delimiter::Auto,
            timeout: Duration::from_secs(300),
            retries: 2,
            retry_delay: Duration::from_secs(30),
            user_agent: concat!("tgvmax-archive/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub data_dir: PathBuf,
    pub format: Format,
    pub compression: Compression,
    pub catalog: PathBuf,
    pub skip_unchanged: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            data_dir: PathBuf::from("data/maxjeune"),
            format: Format::Csv,
            compression: Compression::Zstd,
            catalog: PathBuf::from("data/catalog.db"),
            skip_unchanged: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadmeConfig {
    pub template: PathBuf,
    pub output: PathBuf,
}

impl Default for ReadmeConfig {
    fn default() -> Self {
        ReadmeConfig {
            template: PathBuf::from("README.template.md"),
            output: PathBuf::from("README.md"),
        }
    }
}

fn duration_str<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl Config {
    /// Loads the config from an explicit path, or from the default file in
    /// the working directory when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    log::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::parse(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(Error::Config("source.url must not be empty".into()));
        }
        if self.archive.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("archive.data_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn apply_fetch_args(&mut self, args: &FetchArgs) {
        if let Some(format) = args.format {
            self.archive.format = format;
        }
        if let Some(dir) = &args.data_dir {
            self.archive.data_dir = dir.clone();
            // A redirected archive gets its own catalog so its ids never
            // collide with the main archive's entries.
            self.archive.catalog = dir.join("catalog.db");
        }
        if let Some(catalog) = &args.catalog {
            self.archive.catalog = catalog.clone();
        }
    }
}
