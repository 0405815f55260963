use std::{fs, path::Path};

use crate::error::{FileSystemError, FileSystemResult};

/// Ensures the parent directory of `path` exists.
///
/// Paths without a parent component (e.g. `catalog.json`) are left alone.
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| {
                FileSystemError::CreateDir {
                    dir: parent.to_path_buf(),
                    source: err,
                }
            })
        }
        _ => Ok(()),
    }
}

/// Writes `contents` to `path`, replacing any existing file.
///
/// The data is first written to a sibling `.part` file and then renamed into place so
/// readers never observe a half-written catalog. The `.part` file is removed if either
/// step fails.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> FileSystemResult<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".part");
    let staging = Path::new(&staging);

    if let Err(err) = fs::write(staging, contents) {
        let _ = fs::remove_file(staging);
        return Err(FileSystemError::WriteStaging {
            staging: staging.to_path_buf(),
            source: err,
        });
    }

    fs::rename(staging, path).map_err(|err| {
        let _ = fs::remove_file(staging);
        FileSystemError::Persist {
            staging: staging.to_path_buf(),
            target: path.to_path_buf(),
            source: err,
        }
    })
}
