//! emuMMC error types
//!
//! Every failure is terminal for the call it occurs in. There is no retry
//! policy anywhere in this crate.

use core::fmt;

/// Result type for emuMMC operations
pub type EmuResult<T> = Result<T, EmuError>;

/// Errors that can occur while redirecting eMMC operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmuError {
    /// The real eMMC controller failed to initialize
    PhysicalInitFailure,
    /// Passthrough read, write or partition switch failed on the real eMMC
    PhysicalIo,
    /// The secondary medium could not be mounted
    MediumMountFailure,
    /// Raw sector transfer on the secondary medium failed
    MediumIo,
    /// `eMMC` directory or first split file missing
    ProbeFailure,
    /// Backing image file could not be opened
    FileOpenFailure,
    /// Seek, read, write or close on a backing image file failed
    FileIoFailure,
    /// `emummc.ini` could not be located or read
    ConfigSourceMissing,
    /// Backing file path does not fit the path buffer
    PathTooLong,
    /// Split file index above `99`
    SplitIndexOutOfRange,
    /// Request spans two split files
    CrossesFilePart,
    /// File-based access before a successful `init`
    NotInitialized,
    /// Caller buffer shorter than `count * 512` bytes
    BufferTooSmall,
    /// Buffer length is not a whole number of sectors
    UnalignedBuffer,
    /// Unknown eMMC partition id
    InvalidPartition,
    /// Block range past the end of the emulated device
    OutOfRange,
}

impl EmuError {
    /// Get a human-readable description of the error
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PhysicalInitFailure => "Failed to init eMMC",
            Self::PhysicalIo => "eMMC transfer failed",
            Self::MediumMountFailure => "Failed to mount SD card",
            Self::MediumIo => "SD card transfer failed",
            Self::ProbeFailure => "emuMMC image set not found",
            Self::FileOpenFailure => "Failed to open emuMMC image",
            Self::FileIoFailure => "emuMMC image I/O failed",
            Self::ConfigSourceMissing => "emuMMC config not found",
            Self::PathTooLong => "emuMMC path too long",
            Self::SplitIndexOutOfRange => "emuMMC split index out of range",
            Self::CrossesFilePart => "Request crosses emuMMC file part",
            Self::NotInitialized => "emuMMC not initialized",
            Self::BufferTooSmall => "Buffer too small for request",
            Self::UnalignedBuffer => "Buffer is not a whole number of sectors",
            Self::InvalidPartition => "Invalid eMMC partition",
            Self::OutOfRange => "Request beyond end of device",
        }
    }
}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
