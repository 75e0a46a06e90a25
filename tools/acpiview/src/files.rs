//! File sink for binary table dumps.

use acpi_view::{FileHandle, FileSink, FileSinkError};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

/// Creates dump files in one output directory.
pub struct DirectoryFiles {
    dir: PathBuf,
    open: Vec<Option<(PathBuf, File)>>,
}

impl DirectoryFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: Vec::new(),
        }
    }
}

impl FileSink for DirectoryFiles {
    fn create_file(&mut self, name: &str) -> Result<FileHandle, FileSinkError> {
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(|e| {
            log::error!("Cannot create {}: {e}", path.display());
            FileSinkError::Create(name.to_owned())
        })?;
        log::debug!("Created {}", path.display());
        self.open.push(Some((path, file)));
        Ok(FileHandle(self.open.len() - 1))
    }

    fn write(&mut self, handle: FileHandle, bytes: &[u8]) -> Result<usize, FileSinkError> {
        let Some(Some((path, file))) = self.open.get_mut(handle.0) else {
            return Err(FileSinkError::Write);
        };
        file.write_all(bytes).map_err(|e| {
            log::error!("Cannot write {}: {e}", path.display());
            FileSinkError::Write
        })?;
        Ok(bytes.len())
    }

    fn delete_file(&mut self, handle: FileHandle) -> Result<(), FileSinkError> {
        let Some((path, file)) = self.open.get_mut(handle.0).and_then(Option::take) else {
            return Err(FileSinkError::Delete);
        };
        drop(file);
        fs::remove_file(&path).map_err(|e| {
            log::error!("Cannot delete {}: {e}", path.display());
            FileSinkError::Delete
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("acpiview-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn writes_and_deletes() {
        let dir = scratch("files");
        let mut files = DirectoryFiles::new(&dir);

        let handle = files.create_file("APIC0001.bin").unwrap();
        assert_eq!(files.write(handle, b"APIC").unwrap(), 4);
        assert_eq!(fs::read(dir.join("APIC0001.bin")).unwrap(), b"APIC");

        files.delete_file(handle).unwrap();
        assert!(!dir.join("APIC0001.bin").exists());
        assert_eq!(files.delete_file(handle), Err(FileSinkError::Delete));
        assert_eq!(files.write(handle, b"x"), Err(FileSinkError::Write));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn create_fails_in_missing_directory() {
        let mut files = DirectoryFiles::new(scratch("missing").join("nope"));
        assert_eq!(
            files.create_file("FACP0001.bin"),
            Err(FileSinkError::Create("FACP0001.bin".to_owned()))
        );
    }
}
