//! YAML persistence for configuration types.
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Saves a configuration as YAML.
pub fn save_config<T: Serialize>(config: &T, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(serde_yaml::to_string(config)?.as_bytes())?;
    Ok(())
}

/// Constructs a configuration from a YAML file.
pub fn load_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path)?;
    let rdr = BufReader::new(file);
    let config = serde_yaml::from_reader(rdr)?;
    Ok(config)
}
