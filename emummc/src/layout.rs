//! Persisted emuMMC layout
//!
//! Raw mode keeps the three eMMC partitions back to back on the SD card,
//! each starting on a 0x2000-sector unit:
//!
//! ```text
//! sector_offset + 0x0000  BOOT0
//! sector_offset + 0x2000  BOOT1
//! sector_offset + 0x4000  user data (Raw)
//! ```
//!
//! File mode keeps them as files under `<base_path>/eMMC/`:
//!
//! ```text
//! <base_path>/eMMC/BOOT0
//! <base_path>/eMMC/BOOT1
//! <base_path>/eMMC/00 .. 99   user data, split in equal parts
//! ```

use crate::error::EmuError;

/// Sector size of the eMMC and of the image files
pub const SECTOR_SIZE: usize = 512;

/// Sector shift (`bytes >> SECTOR_SHIFT == sectors`)
pub const SECTOR_SHIFT: u32 = 9;

/// Size of one partition unit in raw mode, in sectors
pub const PARTITION_UNIT_SECTORS: u64 = 0x2000;

/// Image directory, appended to the configured base path
pub const EMMC_DIR: &str = "/eMMC";

/// Maximum number of split files (`00` to `99`)
pub const MAX_SPLIT_FILES: u32 = 100;

/// eMMC hardware partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Partition {
    /// User data area
    #[default]
    Raw = 0,
    /// Boot partition 0
    Boot0 = 1,
    /// Boot partition 1
    Boot1 = 2,
}

impl Partition {
    /// Partition id as used by the MMC `SWITCH` command
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Position of the partition in the raw-mode layout, in units of
    /// [`PARTITION_UNIT_SECTORS`]
    pub const fn unit_offset(self) -> u64 {
        match self {
            Self::Boot0 => 0,
            Self::Boot1 => 1,
            Self::Raw => 2,
        }
    }

    /// Path suffix below `<base_path>/eMMC`
    pub const fn file_suffix(self) -> &'static str {
        match self {
            Self::Raw => "/00",
            Self::Boot0 => "/BOOT0",
            Self::Boot1 => "/BOOT1",
        }
    }

    /// Whether the partition is stored as split files in file mode
    pub const fn is_split(self) -> bool {
        matches!(self, Self::Raw)
    }
}

impl TryFrom<u32> for Partition {
    type Error = EmuError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Boot0),
            2 => Ok(Self::Boot1),
            _ => Err(EmuError::InvalidPartition),
        }
    }
}

/// Translate an eMMC sector to its raw-mode sector on the SD card
pub const fn raw_sector(sector: u32, sector_offset: u32, partition: Partition) -> u64 {
    sector as u64 + sector_offset as u64 + partition.unit_offset() * PARTITION_UNIT_SECTORS
}

/// Location of a sector inside the split user-data image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLocation {
    /// Split file index (`00`, `01`, ...)
    pub index: u32,
    /// Sector within that file
    pub local_sector: u32,
}

impl FileLocation {
    /// Byte offset within the file
    pub const fn byte_offset(&self) -> u64 {
        (self.local_sector as u64) << SECTOR_SHIFT
    }
}

/// Split a user-data sector into file index and local sector.
///
/// `count` sectors starting at `sector` must stay inside one file part.
pub fn locate(sector: u32, count: u32, part_size_sectors: u32) -> Result<FileLocation, EmuError> {
    if part_size_sectors == 0 {
        return Err(EmuError::NotInitialized);
    }

    let index = sector / part_size_sectors;
    let local_sector = sector % part_size_sectors;

    if index >= MAX_SPLIT_FILES {
        return Err(EmuError::SplitIndexOutOfRange);
    }
    if local_sector as u64 + count as u64 > part_size_sectors as u64 {
        return Err(EmuError::CrossesFilePart);
    }

    Ok(FileLocation { index, local_sector })
}

/// Bytes covered by `count` sectors, `None` if that overflows `usize`
pub const fn sectors_to_bytes(count: u32) -> Option<usize> {
    (count as usize).checked_mul(SECTOR_SIZE)
}
