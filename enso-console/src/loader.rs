//! Dataset loaders for the console: a CSV file on disk or the bundled table.
use enso_game::{DataLoader, Dataset, DatasetError};
use std::path::PathBuf;
use thiserror::Error;

/// Monthly ONI table shipped with the binary.
pub const BUNDLED_TABLE: &str = include_str!("../assets/data/oni_month.csv");

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin} is not a usable index table")]
    Invalid {
        origin: String,
        #[source]
        source: DatasetError,
    },
}

/// Reads a CSV table from a path each time it is asked.
#[derive(Debug, Clone)]
pub struct CsvFileLoader {
    path: PathBuf,
}

impl CsvFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLoader for CsvFileLoader {
    type Error = LoadError;

    fn load_dataset(&self) -> Result<Dataset, Self::Error> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        Dataset::from_csv_str(&text).map_err(|source| LoadError::Invalid {
            origin: self.path.display().to_string(),
            source,
        })
    }
}

/// Serves [`BUNDLED_TABLE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLoader;

impl DataLoader for EmbeddedLoader {
    type Error = LoadError;

    fn load_dataset(&self) -> Result<Dataset, Self::Error> {
        Dataset::from_csv_str(BUNDLED_TABLE).map_err(|source| LoadError::Invalid {
            origin: "bundled table".to_string(),
            source,
        })
    }
}

/// Either loader, picked from the command line.
#[derive(Debug, Clone)]
pub enum TableLoader {
    File(CsvFileLoader),
    Embedded(EmbeddedLoader),
}

impl TableLoader {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Embedded(EmbeddedLoader), |p| {
            Self::File(CsvFileLoader::new(p))
        })
    }
}

impl DataLoader for TableLoader {
    type Error = LoadError;

    fn load_dataset(&self) -> Result<Dataset, Self::Error> {
        match self {
            Self::File(loader) => loader.load_dataset(),
            Self::Embedded(loader) => loader.load_dataset(),
        }
    }
}
