use crate::core::filters::data::FilterData;
use crate::core::filters::io::FilterStoreError;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Process-wide filter state backed by a JSON file.
///
/// Readers see the last saved state. Writers go through [`FilterStore::edit`],
/// which mutates a working copy, writes it atomically and only then swaps it
/// in. The lock is held for the whole edit, so keep the closure synchronous
/// and short.
pub struct FilterStore {
    path: PathBuf,
    state: Mutex<FilterData>,
}

impl FilterStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FilterStoreError> {
        let path = path.into();
        let data = FilterData::load_from_path(&path)?;
        debug!(path = %path.display(), rules = data.ignore.len(), "loaded filters");
        Ok(Self::with_data(path, data))
    }

    pub fn with_data(path: impl Into<PathBuf>, data: FilterData) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, FilterData> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<T>(&self, reader: impl FnOnce(&FilterData) -> T) -> T {
        reader(&self.lock())
    }

    pub fn snapshot(&self) -> FilterData {
        self.lock().clone()
    }

    /// Applies `mutator` as one unit: the result is saved and published only
    /// if the closure returns `Ok` and the save succeeds. Any error leaves both
    /// the file and the in-memory state exactly as they were.
    pub fn edit<T, E>(&self, mutator: impl FnOnce(&mut FilterData) -> Result<T, E>) -> Result<T, E>
    where
        E: From<FilterStoreError>,
    {
        let mut state = self.lock();
        let mut working = state.clone();
        let result = mutator(&mut working)?;
        working.save_to_path(&self.path)?;
        *state = working;
        Ok(result)
    }

    /// Writes the current state, e.g. on the way out.
    pub fn save(&self) -> Result<(), FilterStoreError> {
        self.lock().save_to_path(&self.path)
    }
}
