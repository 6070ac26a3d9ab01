use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::data::{ArrayLengthEntry, ArrayLengths};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the engine library and its runtime files.
    pub library_dir: PathBuf,
    pub library_name: String,
    /// Oldest engine version and build this crate has been checked against.
    pub supported_version: String,
    pub supported_build: u32,
}

impl EngineConfig {
    pub fn library_path(&self) -> PathBuf {
        self.library_dir.join(&self.library_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    /// Entries merged over the built-in array length table.
    #[serde(default)]
    pub array_lengths: Vec<ArrayLengthEntry>,
}

impl SchemaConfig {
    pub fn array_lengths(&self) -> crate::Result<ArrayLengths> {
        ArrayLengths::with_entries(&self.array_lengths)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment(Path::new("config/default.toml")))
    }

    /// `file` layered under `OLX__`-prefixed environment variables.
    pub fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("OLX__").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        // Table entries are validated at load.
        config.schema.array_lengths()?;
        Ok(config)
    }
}
