//! File helpers shared by the backup engine
//!
//! Copies and JSON writes go through a temp file and a rename so a target is
//! either complete or untouched.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use super::live::side_files;
use crate::error::HoursError;

/// Read JSON from a file, returning a default value if file doesn't exist
pub fn read_json<T, P>(path: P) -> Result<T, HoursError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| HoursError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| HoursError::Storage(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), HoursError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = path.with_extension("json.tmp");
    let file = File::create(&temp_path)
        .map_err(|e| HoursError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| HoursError::Storage(format!("Failed to serialize data: {}", e)))?;
    writer
        .flush()
        .map_err(|e| HoursError::Storage(format!("Failed to flush data: {}", e)))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| HoursError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        HoursError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Sibling path used while a file is being written
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

/// Copy `src` to `dest` through a partial file and a rename.
///
/// Returns the number of bytes copied. `dest` is never left half-written.
pub fn copy_file_atomic(src: &Path, dest: &Path) -> Result<u64, HoursError> {
    ensure_parent(dest)?;

    let temp_path = partial_path(dest);
    let copied = fs::copy(src, &temp_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        HoursError::Io(format!(
            "Failed to copy {} to {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })?;

    File::open(&temp_path)
        .and_then(|f| f.sync_all())
        .map_err(|e| HoursError::Io(format!("Failed to sync {}: {}", temp_path.display(), e)))?;

    fs::rename(&temp_path, dest).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        HoursError::Io(format!("Failed to move copy into place: {}", e))
    })?;

    Ok(copied)
}

/// Remove a file; a file that is already gone is not an error
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a database file together with its WAL and shared-memory files
pub fn remove_database_files(path: &Path) -> io::Result<()> {
    remove_if_exists(path)?;
    for side in side_files(path) {
        remove_if_exists(&side)?;
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), HoursError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            HoursError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}
