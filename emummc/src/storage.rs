//! Redirecting eMMC storage driver
//!
//! Sits between the boot environment and the real eMMC driver. Each call
//! is routed according to the loaded [`EmuConfig`]:
//!
//! ```text
//!                      ┌──────────────────────┐
//!   init/end/read/     │      EmuStorage      │
//!   write/partition ──►│  mode + partition    │
//!                      └──┬────────┬────────┬─┘
//!                Disabled │   Raw  │  File  │
//!                         ▼        ▼        ▼
//!                     MmcDriver  SdMedium  FileSystem
//!                     (eMMC)    (BlockIo)  (eMMC/00..99, BOOT0/1)
//! ```
//!
//! The physical eMMC handle is borrowed per call. The SD card and its
//! filesystem are owned by the driver for its lifetime.

use gpt_disk_types::Lba;

use crate::config::{EmuConfig, EmuMode};
use crate::error::{EmuError, EmuResult};
use crate::hal::{FileAttributes, FileSystem, MmcDriver, MmcInitParams, OpenMode, SdMedium};
use crate::layout::{self, Partition, SECTOR_SHIFT};
use crate::path::ImagePath;

/// Data direction of a transfer
enum Transfer<'b> {
    Read(&'b mut [u8]),
    Write(&'b [u8]),
}

impl Transfer<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Read(buf) => buf.len(),
            Self::Write(buf) => buf.len(),
        }
    }

    fn open_mode(&self) -> OpenMode {
        match self {
            Self::Read(_) => OpenMode::Read,
            Self::Write(_) => OpenMode::Write,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::Write(_) => "write",
        }
    }
}

/// eMMC driver that redirects to emulated storage
pub struct EmuStorage<'a, S: SdMedium, F: FileSystem> {
    config: EmuConfig<'a>,
    sd: S,
    fs: F,
    force_disable: bool,
    active_partition: Partition,
    part_size_sectors: u32,
    path: ImagePath,
}

impl<'a, S: SdMedium, F: FileSystem> EmuStorage<'a, S, F> {
    /// Create a driver for `config` on top of the SD card and its filesystem
    pub fn new(config: EmuConfig<'a>, sd: S, fs: F) -> Self {
        Self {
            config,
            sd,
            fs,
            force_disable: false,
            active_partition: Partition::Raw,
            part_size_sectors: 0,
            path: ImagePath::new(),
        }
    }

    /// Loaded configuration
    pub fn config(&self) -> &EmuConfig<'a> {
        &self.config
    }

    /// Mode used for the next call (force-disable applied)
    pub fn mode(&self) -> EmuMode<'a> {
        if self.force_disable {
            EmuMode::Disabled
        } else {
            self.config.mode
        }
    }

    /// Bypass redirection regardless of the configuration
    pub fn set_force_disable(&mut self, force_disable: bool) {
        self.force_disable = force_disable;
    }

    /// Check if redirection is bypassed
    pub fn is_force_disabled(&self) -> bool {
        self.force_disable
    }

    /// Partition selected by the last `set_partition`
    pub fn active_partition(&self) -> Partition {
        self.active_partition
    }

    /// Sectors per split file, 0 until probed by `init` in file mode
    pub fn part_size_sectors(&self) -> u32 {
        self.part_size_sectors
    }

    /// Path of the backing file last addressed in file mode
    pub fn current_path(&self) -> &str {
        self.path.as_str()
    }

    /// SD card
    pub fn medium(&mut self) -> &mut S {
        &mut self.sd
    }

    /// SD card filesystem
    pub fn filesystem(&mut self) -> &mut F {
        &mut self.fs
    }

    /// Give back the SD card and its filesystem
    pub fn into_parts(self) -> (S, F) {
        (self.sd, self.fs)
    }

    /// Initialize the eMMC and, unless disabled, the emulated storage
    pub fn init<M: MmcDriver>(&mut self, mmc: &mut M) -> EmuResult<()> {
        if let Err(e) = mmc.init(MmcInitParams::EMMC) {
            log::error!(target: "emummc", "Failed to init eMMC: {:?}", e);
            return Err(EmuError::PhysicalInitFailure);
        }

        if self.force_disable {
            log::info!(target: "emummc", "emuMMC force disabled, using eMMC");
            return Ok(());
        }

        self.active_partition = Partition::Raw;
        if let Err(e) = self.sd.mount() {
            log::error!(target: "emummc", "Failed to mount SD card: {:?}", e);
            return Err(EmuError::MediumMountFailure);
        }

        if let EmuMode::FileBased { base_path } = self.config.mode {
            self.probe_files(base_path)?;
        }

        log::info!(target: "emummc", "emuMMC init done, mode={}", self.mode().as_str());
        Ok(())
    }

    /// Check the image directory and size the split files from `00`
    fn probe_files(&mut self, base_path: &str) -> EmuResult<()> {
        let dir = self.path.set_dir(base_path).map_err(|e| {
            log::error!(target: "emummc", "emuMMC folder path for {}: {}", base_path, e);
            e
        })?;
        match self.fs.stat(dir) {
            Ok(info) if info.is_dir() => {}
            Ok(_) => {
                log::error!(target: "emummc", "emuMMC folder {} is not a directory", dir);
                return Err(EmuError::ProbeFailure);
            }
            Err(e) => {
                log::error!(target: "emummc", "Failed to open eMMC folder {}: {:?}", dir, e);
                return Err(EmuError::ProbeFailure);
            }
        }
        if let Err(e) = self
            .fs
            .chmod(dir, FileAttributes::ARCHIVE, FileAttributes::ARCHIVE)
        {
            log::warn!(target: "emummc", "Failed to set archive bit on {}: {:?}", dir, e);
        }

        let first = self.path.set_file(base_path, Partition::Raw, 0).map_err(|e| {
            log::error!(target: "emummc", "emuMMC rawnand path for {}: {}", base_path, e);
            e
        })?;
        let info = match self.fs.stat(first) {
            Ok(info) => info,
            Err(e) => {
                log::error!(target: "emummc", "Failed to open emuMMC rawnand {}: {:?}", first, e);
                return Err(EmuError::ProbeFailure);
            }
        };

        let part_size = u32::try_from(info.size >> SECTOR_SHIFT).unwrap_or(0);
        if part_size == 0 {
            log::error!(target: "emummc", "Invalid emuMMC part size: {} bytes", info.size);
            return Err(EmuError::ProbeFailure);
        }
        self.part_size_sectors = part_size;

        log::debug!(target: "emummc", "emuMMC file parts of {} sectors", part_size);
        Ok(())
    }

    /// Unmount the SD card and shut down the eMMC. Never fails.
    pub fn end<M: MmcDriver>(&mut self, mmc: &mut M) -> EmuResult<()> {
        self.sd.unmount();
        if let Err(e) = mmc.end() {
            log::warn!(target: "emummc", "eMMC teardown failed: {:?}", e);
        }
        Ok(())
    }

    /// Read `count` sectors starting at `sector` into `buf`
    pub fn read<M: MmcDriver>(
        &mut self,
        mmc: &mut M,
        sector: u32,
        count: u32,
        buf: &mut [u8],
    ) -> EmuResult<()> {
        let len = transfer_len(count, buf.len())?;
        self.transfer(mmc, sector, count, Transfer::Read(&mut buf[..len]))
    }

    /// Write `count` sectors starting at `sector` from `buf`
    pub fn write<M: MmcDriver>(
        &mut self,
        mmc: &mut M,
        sector: u32,
        count: u32,
        buf: &[u8],
    ) -> EmuResult<()> {
        let len = transfer_len(count, buf.len())?;
        self.transfer(mmc, sector, count, Transfer::Write(&buf[..len]))
    }

    /// Select the eMMC partition used by subsequent reads and writes
    pub fn set_partition<M: MmcDriver>(
        &mut self,
        mmc: &mut M,
        partition: Partition,
    ) -> EmuResult<()> {
        self.active_partition = partition;

        match self.mode() {
            EmuMode::Disabled => mmc.set_partition(partition).map_err(|e| {
                log::error!(
                    target: "emummc",
                    "eMMC partition switch to {:?} failed: {:?}",
                    partition,
                    e,
                );
                EmuError::PhysicalIo
            }),
            EmuMode::RawSector { .. } => Ok(()),
            EmuMode::FileBased { base_path } => {
                self.path.set_file(base_path, partition, 0).map_err(|e| {
                    log::error!(target: "emummc", "emuMMC path for {:?}: {}", partition, e);
                    e
                })?;
                Ok(())
            }
        }
    }

    fn transfer<M: MmcDriver>(
        &mut self,
        mmc: &mut M,
        sector: u32,
        count: u32,
        data: Transfer<'_>,
    ) -> EmuResult<()> {
        match self.mode() {
            EmuMode::Disabled => physical_transfer(mmc, sector, count, data),
            EmuMode::RawSector { sector_offset } => {
                let lba = layout::raw_sector(sector, sector_offset, self.active_partition);
                log::trace!(
                    target: "emummc",
                    "raw {} {:#x} -> SD {:#x} x{}",
                    data.name(),
                    sector,
                    lba,
                    count,
                );
                self.raw_transfer(lba, data)
            }
            EmuMode::FileBased { base_path } => self.file_transfer(base_path, sector, count, data),
        }
    }

    fn raw_transfer(&mut self, lba: u64, data: Transfer<'_>) -> EmuResult<()> {
        let name = data.name();
        let result = match data {
            Transfer::Read(buf) => self.sd.read_blocks(Lba(lba), buf),
            Transfer::Write(buf) => self.sd.write_blocks(Lba(lba), buf),
        };
        result.map_err(|e| {
            log::error!(
                target: "emummc",
                "emuMMC raw {} at SD sector {:#x} failed: {:?}",
                name,
                lba,
                e,
            );
            EmuError::MediumIo
        })
    }

    fn file_transfer(
        &mut self,
        base_path: &str,
        sector: u32,
        count: u32,
        data: Transfer<'_>,
    ) -> EmuResult<()> {
        if self.part_size_sectors == 0 {
            log::error!(target: "emummc", "emuMMC file access before init");
            return Err(EmuError::NotInitialized);
        }

        let partition = self.active_partition;
        let (index, local_sector) = if partition.is_split() {
            let loc = layout::locate(sector, count, self.part_size_sectors).map_err(|e| {
                log::error!(target: "emummc", "emuMMC sector {:#x} x{}: {}", sector, count, e);
                e
            })?;
            (loc.index, loc.local_sector)
        } else {
            (0, sector)
        };

        let path = self.path.set_file(base_path, partition, index).map_err(|e| {
            log::error!(
                target: "emummc",
                "emuMMC image path for {:?} part {}: {}",
                partition,
                index,
                e,
            );
            e
        })?;
        let offset = (local_sector as u64) << SECTOR_SHIFT;
        log::trace!(target: "emummc", "file {} {} @ {:#x} x{}", data.name(), path, offset, count);

        let mut file = match self.fs.open(path, data.open_mode()) {
            Ok(file) => file,
            Err(e) => {
                log::error!(target: "emummc", "Failed to open emuMMC image {}: {:?}", path, e);
                return Err(EmuError::FileOpenFailure);
            }
        };

        let result = file_io(&mut self.fs, &mut file, offset, data);
        let closed = self.fs.close(file);

        match (result, closed) {
            (Err((op, e)), closed) => {
                log::error!(
                    target: "emummc",
                    "Failed to {} emuMMC image {}: {}",
                    op,
                    self.path.as_str(),
                    e,
                );
                if let Err(e) = closed {
                    log::warn!(target: "emummc", "Failed to close emuMMC image: {:?}", e);
                }
                Err(EmuError::FileIoFailure)
            }
            (Ok(()), Err(e)) => {
                log::error!(
                    target: "emummc",
                    "Failed to close emuMMC image {}: {:?}",
                    self.path.as_str(),
                    e,
                );
                Err(EmuError::FileIoFailure)
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

/// Bytes covered by `count` sectors, checked against the caller's buffer
fn transfer_len(count: u32, buf_len: usize) -> EmuResult<usize> {
    match layout::sectors_to_bytes(count) {
        Some(len) if buf_len >= len => Ok(len),
        _ => {
            log::error!(
                target: "emummc",
                "Buffer of {} bytes too small for {} sectors",
                buf_len,
                count,
            );
            Err(EmuError::BufferTooSmall)
        }
    }
}

fn physical_transfer<M: MmcDriver>(
    mmc: &mut M,
    sector: u32,
    count: u32,
    data: Transfer<'_>,
) -> EmuResult<()> {
    let name = data.name();
    let result = match data {
        Transfer::Read(buf) => mmc.read_sectors(sector, count, buf),
        Transfer::Write(buf) => mmc.write_sectors(sector, count, buf),
    };
    result.map_err(|e| {
        log::error!(target: "emummc", "eMMC {} at {:#x} x{} failed: {:?}", name, sector, count, e);
        EmuError::PhysicalIo
    })
}

/// Seek and transfer on an open file. Errors carry the failed step.
fn file_io<F: FileSystem>(
    fs: &mut F,
    file: &mut F::File,
    offset: u64,
    data: Transfer<'_>,
) -> Result<(), (&'static str, EmuError)> {
    if let Err(e) = fs.seek(file, offset) {
        log::debug!(target: "emummc", "seek to {:#x}: {:?}", offset, e);
        return Err(("seek", EmuError::FileIoFailure));
    }

    let expected = data.len();
    let name = data.name();
    let done = match data {
        Transfer::Read(buf) => fs.read(file, buf),
        Transfer::Write(buf) => fs.write(file, buf),
    };

    match done {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => {
            log::debug!(target: "emummc", "short {}: {} of {} bytes", name, n, expected);
            Err((name, EmuError::FileIoFailure))
        }
        Err(e) => {
            log::debug!(target: "emummc", "{}: {:?}", name, e);
            Err((name, EmuError::FileIoFailure))
        }
    }
}
