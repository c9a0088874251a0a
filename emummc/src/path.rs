//! Backing file path builder
//!
//! Fixed 128-byte buffer holding the path of the image file currently
//! addressed. Every update rebuilds the whole path from the base path,
//! the partition suffix and the split index, so the buffer never carries
//! state from a previous request.

use crate::error::EmuError;
use crate::layout::{Partition, EMMC_DIR, MAX_SPLIT_FILES};

/// Buffer capacity including the NUL terminator
pub const PATH_CAPACITY: usize = 0x80;

/// Bounded path of the current backing file
#[derive(Clone)]
pub struct ImagePath {
    buf: [u8; PATH_CAPACITY],
    len: usize,
}

impl ImagePath {
    /// Create an empty path
    pub const fn new() -> Self {
        Self {
            buf: [0u8; PATH_CAPACITY],
            len: 0,
        }
    }

    /// Path as a string slice (without the NUL terminator)
    pub fn as_str(&self) -> &str {
        // Only whole `&str` components are ever copied in
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// Path bytes including the NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    /// Path length in bytes, excluding the NUL terminator
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no path has been built yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Build `<base_path>/eMMC`
    pub fn set_dir(&mut self, base_path: &str) -> Result<&str, EmuError> {
        self.build(&[base_path, EMMC_DIR])?;
        Ok(self.as_str())
    }

    /// Build `<base_path>/eMMC/<suffix>` for a partition.
    ///
    /// `Raw` selects split file `index`, boot partitions ignore it.
    pub fn set_file(
        &mut self,
        base_path: &str,
        partition: Partition,
        index: u32,
    ) -> Result<&str, EmuError> {
        if partition.is_split() {
            if index >= MAX_SPLIT_FILES {
                return Err(EmuError::SplitIndexOutOfRange);
            }
            let digits = [b'0' + (index / 10) as u8, b'0' + (index % 10) as u8];
            // Two ASCII digits are always valid UTF-8
            let digits = core::str::from_utf8(&digits).map_err(|_| EmuError::PathTooLong)?;
            self.build(&[base_path, EMMC_DIR, "/", digits])?;
        } else {
            self.build(&[base_path, EMMC_DIR, partition.file_suffix()])?;
        }
        Ok(self.as_str())
    }

    fn build(&mut self, parts: &[&str]) -> Result<(), EmuError> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        if total >= PATH_CAPACITY {
            // Leave the previous path intact
            return Err(EmuError::PathTooLong);
        }

        let mut pos = 0;
        for part in parts {
            let bytes = part.as_bytes();
            self.buf[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        }
        self.buf[pos] = 0;
        self.len = pos;
        Ok(())
    }
}

impl Default for ImagePath {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ImagePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ImagePath").field(&self.as_str()).finish()
    }
}
