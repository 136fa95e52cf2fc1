use std::path::PathBuf;

use serde::Deserialize;

use storage::kv_store::StorageHandler;

pub use error::Error;
pub use index::Indexer;
pub use query::QueryEngine;
pub use storage::encdec::{DecodingError, DecodingResult};

pub mod error;
pub mod index;
pub mod query;
pub mod rpc;
pub mod storage;

const DEFAULT_DB_PATH: &str = "./tmp/spindle";

/// Runtime configuration, layered from `spindle.toml` (or an explicit file)
/// and `SPINDLE_*` environment variables.
#[derive(Deserialize, Debug)]
pub struct Config {
    pub db_path: Option<String>,
}

impl Config {
    pub fn new(config_path: &Option<PathBuf>) -> Result<Self, Error> {
        let mut s = config::Config::builder();

        s = s.add_source(config::File::with_name("spindle.toml").required(false));

        if let Some(explicit) = config_path.as_ref().and_then(|x| x.to_str()) {
            s = s.add_source(config::File::with_name(explicit).required(true));
        }

        s = s.add_source(config::Environment::with_prefix("SPINDLE").separator("_"));

        s.build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Opens the store at the configured path, defaulting next to the
    /// working directory.
    pub fn open_store(&self) -> Result<StorageHandler, Error> {
        let path = self
            .db_path
            .clone()
            .unwrap_or_else(|| DEFAULT_DB_PATH.into());

        StorageHandler::open(path.into())
    }
}
