//! # Data records
//!
//! Named resources the user collects across sessions: palettes, patterns, gradients, generated
//! brushes, paint dynamics and image templates. Each lives in its own TOML file and is managed by a
//! [`factory::DataFactory`].

use std::path::{Path, PathBuf};

pub mod brush;
pub mod dynamics;
pub mod factory;
pub mod gradient;
pub mod palette;
pub mod pattern;
pub mod template;

#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),
    #[error("{}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// A record a [`factory::DataFactory`] can manage.
pub trait Data: serde::Serialize + serde::de::DeserializeOwned + Clone + std::fmt::Debug {
    /// Subdirectory of the data root holding this kind of record.
    const FOLDER: &'static str;
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    /// The fallback record, for when nothing has been loaded.
    fn standard() -> Self;
    /// Reject contents that parse but make no sense.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Read one record from a TOML file.
pub fn load<T: Data>(path: &Path) -> Result<T, DataError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_owned(),
        source,
    })?;
    let data: T = toml::from_str(&text).map_err(|source| DataError::Parse {
        path: path.to_owned(),
        source,
    })?;
    data.validate().map_err(|reason| DataError::Invalid {
        path: path.to_owned(),
        reason,
    })?;
    Ok(data)
}

/// Write one record to a TOML file, replacing it.
pub fn save<T: Data>(data: &T, path: &Path) -> Result<(), DataError> {
    let text = toml::ser::to_string_pretty(data)?;
    std::fs::write(path, text).map_err(|source| DataError::Io {
        path: path.to_owned(),
        source,
    })
}
