//! Memory-mapped image backend.

use super::{checked_slice, Backend};
use crate::Result;

use memmap2::Mmap;
use std::{fs, path::Path};

/// An image memory-mapped from disk.
///
/// The mapping is read-only and lives as long as the backend. Modifying the file on disk while
/// it is mapped is undefined behaviour, as with any memory map.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;
        Physical::from_std_file(&file)
    }

    /// Map an already opened file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be mapped.
    pub fn from_std_file(file: &fs::File) -> Result<Physical> {
        // SAFETY: the mapping is read-only and never handed out mutably
        let mmap = unsafe { Mmap::map(file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        checked_slice(&self.data, offset, len)
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn physical() {
        let path = std::env::temp_dir().join(format!("cilimport-physical-{}.bin", std::process::id()));
        {
            let mut file = fs::File::create(&path).unwrap();
            file.write_all(&[0x4D, 0x5A, 0x90, 0x00, 0x03]).unwrap();
        }

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 5);
        assert_eq!(physical.data()[0], 0x4D);
        assert_eq!(physical.data_slice(1, 2).unwrap(), &[0x5A, 0x90]);
        assert!(physical.data_slice(4, 2).is_err());

        drop(physical);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn physical_missing_file() {
        let result = Physical::new("/definitely/not/a/real/image.dll");
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }
}
