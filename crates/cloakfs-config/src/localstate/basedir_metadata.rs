use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::local_state_dir::LocalStateDir;
use crate::config::FilesystemId;
use crate::utils::write_atomically;

/// Store the list of all basedirs and their filesystem ids
/// so we can recognize if a filesystem gets replaced with
/// a different filesystem by an adversary
#[derive(Debug, Serialize, Deserialize)]
pub struct BasedirMetadata {
    #[serde(flatten)]
    basedirs: HashMap<PathBuf, BasedirMetadataEntry>,
}

impl BasedirMetadata {
    pub fn load(local_state_dir: &LocalStateDir) -> Result<Self> {
        let basedirs_file = local_state_dir.for_basedir_metadata()?;
        let result = if basedirs_file.exists() {
            let file = std::fs::File::open(&basedirs_file)?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            Self::default()
        };
        Ok(result)
    }

    pub fn filesystem_id_for_basedir_is_correct(
        &self,
        basedir: &Path,
        expected_filesystem_id: &FilesystemId,
    ) -> Result<(), CheckFilesystemIdError> {
        match self.basedirs.get(basedir) {
            None => {
                // Basedir not known yet, everything is fine
                Ok(())
            }
            Some(entry) => {
                if entry.filesystem_id == *expected_filesystem_id {
                    Ok(())
                } else {
                    Err(CheckFilesystemIdError::FilesystemIdIncorrect {
                        basedir: basedir.to_path_buf(),
                        expected_id: *expected_filesystem_id,
                        actual_id: entry.filesystem_id,
                    })
                }
            }
        }
    }

    pub fn update_filesystem_id_for_basedir(
        &mut self,
        basedir: &Path,
        filesystem_id: FilesystemId,
        local_state_dir: &LocalStateDir,
    ) -> Result<()> {
        let new_entry = BasedirMetadataEntry { filesystem_id };
        match self.basedirs.entry(basedir.to_path_buf()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == new_entry {
                    // Filesystem id is already correct, nothing to do
                    Ok(())
                } else {
                    // Filesystem id is incorrect, update it
                    entry.insert(new_entry);
                    self.save(local_state_dir)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(new_entry);
                self.save(local_state_dir)
            }
        }
    }

    fn save(&self, local_state_dir: &LocalStateDir) -> Result<()> {
        let basedirs_file = local_state_dir.for_basedir_metadata()?;
        let content = serde_json::to_vec_pretty(self)?;
        write_atomically(&basedirs_file, &content)?;
        Ok(())
    }
}

impl Default for BasedirMetadata {
    fn default() -> Self {
        Self {
            basedirs: HashMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckFilesystemIdError {
    #[error(
        "Filesystem id for basedir {basedir} is incorrect. Expected {expected_id:?} but got {actual_id:?}. This likely means that the filesystem that was previously at this location was replaced with a different filesystem. We prevent this to avoid malicious actors from replacing a file system without you noticing."
    )]
    FilesystemIdIncorrect {
        basedir: PathBuf,
        expected_id: FilesystemId,
        actual_id: FilesystemId,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BasedirMetadataEntry {
    #[serde(rename = "filesystemId")]
    filesystem_id: FilesystemId,
}
