//! emuMMC: eMMC redirection layer
//!
//! Lets a boot environment run an entire system from emulated storage
//! without touching the real eMMC. Every block-level eMMC operation (init,
//! end, partition switch, sector read, sector write) is routed to one of:
//!
//! - the real eMMC (redirection disabled),
//! - a raw sector range on the SD card,
//! - a set of split image files on the SD card filesystem.
//!
//! # Architecture
//!
//! 1. **Configuration** - [`config::load_config`] reads the `[emummc]`
//!    section once at startup and produces an [`EmuConfig`].
//! 2. **Redirection** - [`EmuStorage`] owns the config and the SD card and
//!    decides per call which backend to hit and where.
//! 3. **Integration** - [`EmuBlockIo`] exposes the result as a
//!    `gpt_disk_io::BlockIo` for partition and filesystem code.
//!
//! # Usage
//!
//! ```ignore
//! use emummc::{config, EmuStorage, Partition};
//!
//! let config = config::load_config(&mut sd, &ini).unwrap_or_default();
//! let mut storage = EmuStorage::new(config, sd, fs);
//! storage.init(&mut emmc)?;
//!
//! storage.set_partition(&mut emmc, Partition::Boot0)?;
//! storage.read(&mut emmc, 0, 1, &mut sector)?;
//! ```

#![no_std]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod block_io;
pub mod config;
pub mod error;
pub mod hal;
pub mod layout;
pub mod logger;
pub mod path;
pub mod storage;

pub use block_io::EmuBlockIo;
pub use config::{load_config, EmuConfig, EmuMode};
pub use error::{EmuError, EmuResult};
pub use hal::{FileAttributes, FileInfo, FileSystem, MmcDriver, MmcInitParams, OpenMode, SdMedium};
pub use layout::{Partition, SECTOR_SIZE};
pub use path::ImagePath;
pub use storage::EmuStorage;
