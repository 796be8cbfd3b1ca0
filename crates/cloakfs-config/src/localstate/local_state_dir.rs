use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::FilesystemId;

/// This struct helps find the right locations in the local file system to store local state
#[derive(Clone, Debug)]
pub struct LocalStateDir {
    app_dir: PathBuf,
}

impl LocalStateDir {
    pub fn new(app_dir: PathBuf) -> Self {
        Self { app_dir }
    }

    /// Location for the local state and integrity data of a specific filesystem
    pub fn for_filesystem_id(&self, filesystem_id: &FilesystemId) -> Result<PathBuf> {
        let filesystems_dir = self.app_dir.join("filesystems");
        let this_filesystem_dir = filesystems_dir.join(filesystem_id.to_hex());
        std::fs::create_dir_all(&this_filesystem_dir)
            .context("Tried to create directories for the filesystem local state")?;
        Ok(this_filesystem_dir)
    }

    /// Location for a file that stores the list of all basedirs
    /// and their filesystem ids so we can recognize if a filesystem
    /// gets replaced with a different filesystem by an adversary
    pub fn for_basedir_metadata(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.app_dir)
            .context("Tried to create directories for the local state")?;
        Ok(self.app_dir.join("basedirs"))
    }

    /// Location for the file backing the monotone client id allocator
    pub fn for_client_id_counter(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.app_dir)
            .context("Tried to create directories for the local state")?;
        Ok(self.app_dir.join("client_id_counter"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn for_filesystem_id_creates_directory() {
        let dir = TempDir::new("local_state_dir").unwrap();
        let local_state_dir = LocalStateDir::new(dir.path().join("state"));
        let filesystem_id = FilesystemId::new_random();
        let path = local_state_dir.for_filesystem_id(&filesystem_id).unwrap();
        assert!(path.is_dir());
        assert!(path.ends_with(filesystem_id.to_hex()));
    }

    #[test]
    fn different_filesystems_get_different_directories() {
        let dir = TempDir::new("local_state_dir").unwrap();
        let local_state_dir = LocalStateDir::new(dir.path().join("state"));
        let path1 = local_state_dir
            .for_filesystem_id(&FilesystemId::new_random())
            .unwrap();
        let path2 = local_state_dir
            .for_filesystem_id(&FilesystemId::new_random())
            .unwrap();
        assert_ne!(path1, path2);
    }

    #[test]
    fn for_basedir_metadata_creates_parent_directory() {
        let dir = TempDir::new("local_state_dir").unwrap();
        let local_state_dir = LocalStateDir::new(dir.path().join("state"));
        let path = local_state_dir.for_basedir_metadata().unwrap();
        assert!(path.parent().unwrap().is_dir());
    }
}
