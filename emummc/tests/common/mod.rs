//! Common test utilities: in-memory eMMC, SD card and filesystem

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;

use emummc::hal::{
    FileAttributes, FileInfo, FileSystem, MmcDriver, MmcInitParams, OpenMode, SdMedium,
};
use emummc::Partition;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

pub const SECTOR: usize = 512;
pub const BOOT_SECTORS: u32 = 64;

/// Calls seen by the mock eMMC
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MmcCall {
    Init(MmcInitParams),
    End,
    Read { sector: u32, count: u32 },
    Write { sector: u32, count: u32 },
    SetPartition(Partition),
}

/// In-memory eMMC that records every call
#[derive(Debug, Default)]
pub struct MockMmc {
    pub calls: Vec<MmcCall>,
    pub fail_init: bool,
    pub fail_io: bool,
    pub fail_end: bool,
    /// Sector contents, filled with the sector number's low byte on read
    pub written: BTreeMap<u32, Vec<u8>>,
}

impl MockMmc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MmcDriver for MockMmc {
    type Error = &'static str;

    fn init(&mut self, params: MmcInitParams) -> Result<(), Self::Error> {
        self.calls.push(MmcCall::Init(params));
        if self.fail_init {
            Err("init")
        } else {
            Ok(())
        }
    }

    fn end(&mut self) -> Result<(), Self::Error> {
        self.calls.push(MmcCall::End);
        if self.fail_end {
            Err("end")
        } else {
            Ok(())
        }
    }

    fn read_sectors(&mut self, sector: u32, count: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.calls.push(MmcCall::Read { sector, count });
        if self.fail_io {
            return Err("read");
        }
        for (i, chunk) in buf.chunks_mut(SECTOR).enumerate() {
            let s = sector + i as u32;
            match self.written.get(&s) {
                Some(data) => chunk.copy_from_slice(data),
                None => chunk.fill(s as u8),
            }
        }
        Ok(())
    }

    fn write_sectors(&mut self, sector: u32, count: u32, buf: &[u8]) -> Result<(), Self::Error> {
        self.calls.push(MmcCall::Write { sector, count });
        if self.fail_io {
            return Err("write");
        }
        for (i, chunk) in buf.chunks(SECTOR).enumerate() {
            self.written.insert(sector + i as u32, chunk.to_vec());
        }
        Ok(())
    }

    fn set_partition(&mut self, partition: Partition) -> Result<(), Self::Error> {
        self.calls.push(MmcCall::SetPartition(partition));
        if self.fail_io {
            Err("switch")
        } else {
            Ok(())
        }
    }
}

/// In-memory SD card for raw mode
#[derive(Debug, Clone)]
pub struct MemorySd {
    pub data: Vec<u8>,
    pub mounted: bool,
    pub mounts: usize,
    pub unmounts: usize,
    pub fail_mount: bool,
    /// `(lba, sectors)` of every raw transfer
    pub reads: Vec<(u64, usize)>,
    pub writes: Vec<(u64, usize)>,
}

impl MemorySd {
    pub fn new(sectors: usize) -> Self {
        Self {
            data: vec![0u8; sectors * SECTOR],
            mounted: false,
            mounts: 0,
            unmounts: 0,
            fail_mount: false,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn sector(&self, lba: u64) -> &[u8] {
        let offset = lba as usize * SECTOR;
        &self.data[offset..offset + SECTOR]
    }
}

impl BlockIo for MemorySd {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / SECTOR) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.reads.push((start_lba.0, dst.len() / SECTOR));
        let offset = start_lba.0 as usize * SECTOR;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        self.writes.push((start_lba.0, src.len() / SECTOR));
        let offset = start_lba.0 as usize * SECTOR;
        if offset + src.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SdMedium for MemorySd {
    fn mount(&mut self) -> Result<(), Self::Error> {
        self.mounts += 1;
        if self.fail_mount {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no SD card"));
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) {
        self.unmounts += 1;
        self.mounted = false;
    }
}

/// Filesystem calls recorded by [`MemoryFs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCall {
    Stat(String),
    Chmod(String, FileAttributes),
    Open(String, OpenMode),
    Seek(u64),
    Read(usize),
    Write(usize),
    Close,
}

/// Open file handle of [`MemoryFs`]
#[derive(Debug)]
pub struct MemFile {
    path: String,
    pos: u64,
}

/// In-memory filesystem with a call log and failure injection
#[derive(Debug, Default)]
pub struct MemoryFs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeMap<String, FileAttributes>,
    pub calls: Vec<FsCall>,
    pub open_handles: usize,
    pub fail_open: bool,
    pub fail_seek: bool,
    pub fail_io: bool,
    pub fail_close: bool,
    pub short_io: bool,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `<base>/eMMC` with `parts` split files of `part_sectors`
    /// sectors each, plus BOOT0 and BOOT1. Every sector is filled with a
    /// marker derived from the file and sector.
    pub fn with_image(base: &str, parts: u32, part_sectors: u32) -> Self {
        let mut fs = Self::new();
        let dir = format!("{}/eMMC", base);
        fs.dirs.insert(dir.clone(), FileAttributes::DIRECTORY);
        for part in 0..parts {
            fs.files.insert(
                format!("{}/{:02}", dir, part),
                image_data(part as u8, part_sectors),
            );
        }
        fs.files.insert(format!("{}/BOOT0", dir), image_data(0xB0, BOOT_SECTORS));
        fs.files.insert(format!("{}/BOOT1", dir), image_data(0xB1, BOOT_SECTORS));
        fs
    }

    pub fn opened_paths(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                FsCall::Open(path, _) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                FsCall::Seek(offset) => Some(*offset),
                _ => None,
            })
            .collect()
    }

    pub fn sector_of(&self, path: &str, sector: u32) -> &[u8] {
        let offset = sector as usize * SECTOR;
        &self.files[path][offset..offset + SECTOR]
    }
}

/// Sector `s` of a file tagged `tag` is filled with `tag ^ (s as u8)`
pub fn image_data(tag: u8, sectors: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(sectors as usize * SECTOR);
    for s in 0..sectors {
        data.extend(std::iter::repeat(tag ^ s as u8).take(SECTOR));
    }
    data
}

impl FileSystem for MemoryFs {
    type File = MemFile;
    type Error = io::Error;

    fn stat(&mut self, path: &str) -> Result<FileInfo, Self::Error> {
        self.calls.push(FsCall::Stat(path.to_string()));
        if let Some(attributes) = self.dirs.get(path) {
            return Ok(FileInfo {
                size: 0,
                attributes: *attributes,
            });
        }
        match self.files.get(path) {
            Some(data) => Ok(FileInfo {
                size: data.len() as u64,
                attributes: FileAttributes::ARCHIVE,
            }),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }

    fn chmod(
        &mut self,
        path: &str,
        attrs: FileAttributes,
        mask: FileAttributes,
    ) -> Result<(), Self::Error> {
        self.calls.push(FsCall::Chmod(path.to_string(), attrs));
        match self.dirs.get_mut(path) {
            Some(current) => {
                *current = (*current - mask) | (attrs & mask);
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, Self::Error> {
        self.calls.push(FsCall::Open(path.to_string(), mode));
        if self.fail_open || !self.files.contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()));
        }
        self.open_handles += 1;
        Ok(MemFile {
            path: path.to_string(),
            pos: 0,
        })
    }

    fn seek(&mut self, file: &mut Self::File, offset: u64) -> Result<(), Self::Error> {
        self.calls.push(FsCall::Seek(offset));
        if self.fail_seek {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek"));
        }
        file.pos = offset;
        Ok(())
    }

    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.calls.push(FsCall::Read(buf.len()));
        if self.fail_io {
            return Err(io::Error::new(io::ErrorKind::Other, "read"));
        }
        let data = &self.files[&file.path];
        let start = (file.pos as usize).min(data.len());
        let mut n = buf.len().min(data.len() - start);
        if self.short_io {
            n = n.saturating_sub(1);
        }
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> Result<usize, Self::Error> {
        self.calls.push(FsCall::Write(buf.len()));
        if self.fail_io {
            return Err(io::Error::new(io::ErrorKind::Other, "write"));
        }
        let n = if self.short_io {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        let data = self.files.get_mut(&file.path).expect("open file exists");
        let start = file.pos as usize;
        if data.len() < start + n {
            data.resize(start + n, 0);
        }
        data[start..start + n].copy_from_slice(&buf[..n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn close(&mut self, _file: Self::File) -> Result<(), Self::Error> {
        self.calls.push(FsCall::Close);
        self.open_handles -= 1;
        if self.fail_close {
            Err(io::Error::new(io::ErrorKind::Other, "close"))
        } else {
            Ok(())
        }
    }
}
