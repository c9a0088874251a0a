//! Collaborator contracts
//!
//! The redirection layer only talks to hardware and filesystems through
//! these traits. The boot environment supplies the implementations.

use core::fmt::Debug;

use bitflags::bitflags;
use gpt_disk_io::BlockIo;

use crate::layout::Partition;

/// eMMC bus width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWidth {
    /// 1-bit data bus
    Bit1,
    /// 4-bit data bus
    Bit4,
    /// 8-bit data bus
    Bit8,
}

/// Parameters for bringing up an MMC controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmcInitParams {
    /// Controller index
    pub controller: u8,
    /// Data bus width
    pub bus_width: BusWidth,
    /// Controller-specific speed/timing mode
    pub speed_type: u8,
}

impl MmcInitParams {
    /// Built-in eMMC: controller 4, 8-bit bus, HS400 timing
    pub const EMMC: Self = Self {
        controller: 4,
        bus_width: BusWidth::Bit8,
        speed_type: 4,
    };
}

/// Physical eMMC driver
pub trait MmcDriver {
    /// Driver error
    type Error: Debug;

    /// Initialize the controller and the card
    fn init(&mut self, params: MmcInitParams) -> Result<(), Self::Error>;

    /// Power down the card and the controller
    fn end(&mut self) -> Result<(), Self::Error>;

    /// Read `count` sectors starting at `sector`
    fn read_sectors(&mut self, sector: u32, count: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `count` sectors starting at `sector`
    fn write_sectors(&mut self, sector: u32, count: u32, buf: &[u8]) -> Result<(), Self::Error>;

    /// Switch the active hardware partition
    fn set_partition(&mut self, partition: Partition) -> Result<(), Self::Error>;
}

/// Secondary removable medium (SD card).
///
/// Raw sector access goes through [`BlockIo`], the filesystem on it is
/// exposed separately through [`FileSystem`].
pub trait SdMedium: BlockIo {
    /// Mount the card and its filesystem. Mounting twice is a no-op.
    fn mount(&mut self) -> Result<(), Self::Error>;

    /// Unmount the card
    fn unmount(&mut self);
}

bitflags! {
    /// FAT file attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u8 {
        /// Read-only
        const READ_ONLY = 0x01;
        /// Hidden
        const HIDDEN = 0x02;
        /// System
        const SYSTEM = 0x04;
        /// Directory
        const DIRECTORY = 0x10;
        /// Archive
        const ARCHIVE = 0x20;
    }
}

/// Result of a `stat` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    /// File size in bytes
    pub size: u64,
    /// File attributes
    pub attributes: FileAttributes,
}

impl FileInfo {
    /// Check if the entry is a directory
    pub fn is_dir(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

/// File open mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading
    Read,
    /// Open an existing file for writing, without truncating it
    Write,
}

/// Filesystem hosted by the secondary medium
pub trait FileSystem {
    /// Open file handle
    type File;
    /// Filesystem error
    type Error: Debug;

    /// Look up a file or directory
    fn stat(&mut self, path: &str) -> Result<FileInfo, Self::Error>;

    /// Set the attributes selected by `mask` to the values in `attrs`
    fn chmod(
        &mut self,
        path: &str,
        attrs: FileAttributes,
        mask: FileAttributes,
    ) -> Result<(), Self::Error>;

    /// Open an existing file
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, Self::Error>;

    /// Move the file pointer to `offset` bytes from the start
    fn seek(&mut self, file: &mut Self::File, offset: u64) -> Result<(), Self::Error>;

    /// Read into `buf`, returning the number of bytes read
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `buf`, returning the number of bytes written
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> Result<usize, Self::Error>;

    /// Flush and close a file
    fn close(&mut self, file: Self::File) -> Result<(), Self::Error>;
}
