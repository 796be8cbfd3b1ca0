use std::io::Result;
use std::path::{Path, PathBuf};

/// Writes `content` to `path` atomically by writing to a temporary file in the
/// same directory and renaming it into place. A failed write never leaves a
/// half-written file at `path`, and the temporary file is removed on failure.
pub fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, content).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp_path);
    })?;
    std::fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp_path);
    })?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    PathBuf::from(tmp_path)
}
