//! Process-wide dataset cache: load on first use, serve thereafter.
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::DataLoader;
use crate::dataset::Dataset;

/// Wraps a [`DataLoader`] so the table is read at most once per success.
///
/// Failed loads are not cached; the next call tries again.
#[derive(Debug)]
pub struct CachedLoader<L> {
    loader: L,
    cell: OnceCell<Arc<Dataset>>,
}

impl<L: DataLoader> CachedLoader<L> {
    pub const fn new(loader: L) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    /// Shared handle to the dataset, loading it on first call.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if the dataset has not been loaded yet and
    /// loading fails.
    pub fn get(&self) -> Result<Arc<Dataset>, L::Error> {
        self.cell
            .get_or_try_init(|| {
                let dataset = self.loader.load_dataset()?;
                log::info!(
                    "loaded {} rows across {} index columns",
                    dataset.rows.len(),
                    dataset.columns.len()
                );
                Ok(Arc::new(dataset))
            })
            .cloned()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetError;
    use std::cell::Cell;

    struct CountingLoader {
        calls: Cell<u32>,
        fail_first: bool,
    }

    impl DataLoader for CountingLoader {
        type Error = DatasetError;

        fn load_dataset(&self) -> Result<Dataset, Self::Error> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_first && self.calls.get() == 1 {
                return Err(DatasetError::Empty);
            }
            Dataset::from_csv_str("date,ONI index\n2024-01,1.8\n")
        }
    }

    #[test]
    fn loads_once_and_shares() {
        let cache = CachedLoader::new(CountingLoader {
            calls: Cell::new(0),
            fail_first: false,
        });
        assert!(!cache.is_loaded());
        let first = cache.get().unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.loader.calls.get(), 1);
    }

    #[test]
    fn failures_are_retried() {
        let cache = CachedLoader::new(CountingLoader {
            calls: Cell::new(0),
            fail_first: true,
        });
        assert_eq!(cache.get().unwrap_err(), DatasetError::Empty);
        assert!(!cache.is_loaded());
        assert!(cache.get().is_ok());
        assert_eq!(cache.loader.calls.get(), 2);
    }
}
