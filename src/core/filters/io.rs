use crate::core::filters::data::{path_display, FilterData};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur while reading or writing the filter file.
#[derive(Debug)]
pub enum FilterStoreError {
    /// Failed to read the filter file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The filter file is not valid JSON of the expected shape.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to write the staged copy next to the filter file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    Serialize(serde_json::Error),

    /// The staged copy could not be renamed over the filter file.
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for FilterStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStoreError::Read { path, source } => {
                write!(f, "Failed to read filters at {}: {}", path_display(path), source)
            }
            FilterStoreError::Parse { path, source } => {
                write!(f, "Failed to parse filters at {}: {}", path_display(path), source)
            }
            FilterStoreError::Write { path, source } => {
                write!(f, "Failed to write filters near {}: {}", path_display(path), source)
            }
            FilterStoreError::Serialize(source) => {
                write!(f, "Failed to serialize filters: {}", source)
            }
            FilterStoreError::Persist { path, source } => {
                write!(f, "Failed to replace filters at {}: {}", path_display(path), source)
            }
        }
    }
}

impl StdError for FilterStoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FilterStoreError::Read { source, .. } => Some(source),
            FilterStoreError::Parse { source, .. } => Some(source),
            FilterStoreError::Write { source, .. } => Some(source),
            FilterStoreError::Serialize(source) => Some(source),
            FilterStoreError::Persist { source, .. } => Some(source),
        }
    }
}

/// A fully written sibling copy of the filter file that has not replaced the
/// original yet. Dropping it without [`StagedSave::commit`] removes the copy
/// and leaves the original untouched.
pub struct StagedSave {
    temp_file: NamedTempFile,
    target: PathBuf,
}

impl StagedSave {
    pub fn temp_path(&self) -> &Path {
        self.temp_file.path()
    }

    pub fn commit(self) -> Result<(), FilterStoreError> {
        let target = self.target;
        self.temp_file
            .persist(&target)
            .map_err(|err| FilterStoreError::Persist {
                path: target.clone(),
                source: err.error,
            })?;
        Ok(())
    }
}

impl FilterData {
    /// Loads the filter file. A missing file yields an empty store.
    pub fn load_from_path(path: &Path) -> Result<FilterData, FilterStoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(FilterData::default()),
            Err(source) => {
                return Err(FilterStoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| FilterStoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the serialized data to a temp file in the same directory as
    /// `path`, flushed to disk, ready to be renamed into place.
    pub fn stage_save(&self, path: &Path) -> Result<StagedSave, FilterStoreError> {
        let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        let write_err = |source| FilterStoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(FilterStoreError::Serialize)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .map_err(write_err)?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;

        Ok(StagedSave {
            temp_file,
            target: path.to_path_buf(),
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), FilterStoreError> {
        self.stage_save(path)?.commit()
    }
}
