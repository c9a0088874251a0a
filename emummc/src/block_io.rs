//! Block I/O adapter for emulated storage
//!
//! Presents the redirecting driver as a `gpt_disk_io::BlockIo`, so GPT,
//! FAT32 and ISO9660 code can run on top of emuMMC exactly as on the real
//! eMMC.
//!
//! # Usage
//!
//! ```ignore
//! storage.init(&mut mmc)?;
//! let mut disk = EmuBlockIo::new(&mut storage, &mut mmc, user_area_sectors);
//! let header = gpt_disk_io::Disk::new(&mut disk)?.read_primary_gpt_header(&mut buf)?;
//! ```

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

use crate::error::EmuError;
use crate::hal::{FileSystem, MmcDriver, SdMedium};
use crate::layout::SECTOR_SIZE;
use crate::storage::EmuStorage;

/// `BlockIo` view of the currently selected emuMMC partition
pub struct EmuBlockIo<'s, 'm, 'a, M, S, F>
where
    M: MmcDriver,
    S: SdMedium,
    F: FileSystem,
{
    storage: &'s mut EmuStorage<'a, S, F>,
    mmc: &'m mut M,
    num_blocks: u64,
}

impl<'s, 'm, 'a, M, S, F> EmuBlockIo<'s, 'm, 'a, M, S, F>
where
    M: MmcDriver,
    S: SdMedium,
    F: FileSystem,
{
    /// Wrap an initialized driver. `num_blocks` is the size of the
    /// selected partition in 512-byte sectors.
    pub fn new(storage: &'s mut EmuStorage<'a, S, F>, mmc: &'m mut M, num_blocks: u64) -> Self {
        Self {
            storage,
            mmc,
            num_blocks,
        }
    }

    /// Underlying driver
    pub fn storage(&mut self) -> &mut EmuStorage<'a, S, F> {
        &mut *self.storage
    }

    /// Validate a request and return its sector range
    fn check_range(&self, start_lba: Lba, len: usize) -> Result<(u32, u32), EmuError> {
        if len % SECTOR_SIZE != 0 {
            return Err(EmuError::UnalignedBuffer);
        }
        let count = (len / SECTOR_SIZE) as u64;
        let end = start_lba.0.checked_add(count).ok_or(EmuError::OutOfRange)?;
        if end > self.num_blocks {
            return Err(EmuError::OutOfRange);
        }

        let sector = u32::try_from(start_lba.0).map_err(|_| EmuError::OutOfRange)?;
        let count = u32::try_from(count).map_err(|_| EmuError::OutOfRange)?;
        Ok((sector, count))
    }
}

impl<M, S, F> BlockIo for EmuBlockIo<'_, '_, '_, M, S, F>
where
    M: MmcDriver,
    S: SdMedium,
    F: FileSystem,
{
    type Error = EmuError;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok(self.num_blocks)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let (sector, count) = self.check_range(start_lba, dst.len())?;
        self.storage.read(&mut *self.mmc, sector, count, dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let (sector, count) = self.check_range(start_lba, src.len())?;
        self.storage.write(&mut *self.mmc, sector, count, src)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Files are closed after every transfer
        Ok(())
    }
}
