//! emuMMC configuration
//!
//! Loaded once from the `[emummc]` section of `emuMMC/emummc.ini` on the
//! SD card:
//!
//! ```text
//! [emummc]
//! enabled=1
//! sector=0x2000
//! id=0x0000
//! path=emuMMC/RAW1
//! nintendo_path=emuMMC/RAW1/Nintendo
//! ```
//!
//! `enabled=1` with a non-zero `sector` selects raw mode, `enabled=1` with
//! `sector=0` (or no `sector` key) selects file mode rooted at `path`.

pub mod source;

pub use source::{parse_dec, parse_hex, IniSection, IniSource, MemoryIni, SectionKind};

use crate::error::{EmuError, EmuResult};
use crate::hal::SdMedium;

/// Configuration file on the SD card
pub const CONFIG_SOURCE: &str = "emuMMC/emummc.ini";

/// Section consulted in [`CONFIG_SOURCE`]
pub const CONFIG_SECTION: &str = "emummc";

/// Where eMMC operations are redirected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmuMode<'a> {
    /// Use the real eMMC
    #[default]
    Disabled,
    /// Contiguous sector range on the SD card
    RawSector {
        /// First SD sector of the emulated eMMC (never 0)
        sector_offset: u32,
    },
    /// Image files on the SD card filesystem
    FileBased {
        /// Directory holding `eMMC/`
        base_path: &'a str,
    },
}

impl<'a> EmuMode<'a> {
    /// Derive the mode from the `enabled` and `sector` keys
    pub fn from_keys(enabled: bool, sector: u32, path: Option<&'a str>) -> Self {
        match (enabled, sector) {
            (false, _) => Self::Disabled,
            (true, 0) => Self::FileBased {
                base_path: path.unwrap_or(""),
            },
            (true, sector_offset) => Self::RawSector { sector_offset },
        }
    }

    /// Short name for logging
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::RawSector { .. } => "raw",
            Self::FileBased { .. } => "file",
        }
    }
}

/// emuMMC configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmuConfig<'a> {
    /// Redirection target
    pub mode: EmuMode<'a>,
    /// Path of the emulated `Nintendo` folder (`nintendo_path`)
    pub companion_path: Option<&'a str>,
    /// emuMMC id
    pub id: u32,
    /// Filesystem version of the emulated system
    pub fs_version: u32,
}

impl<'a> EmuConfig<'a> {
    /// Redirection disabled
    pub const fn disabled() -> Self {
        Self {
            mode: EmuMode::Disabled,
            companion_path: None,
            id: 0,
            fs_version: 0,
        }
    }

    /// Raw mode at `sector_offset`. An offset of 0 selects file mode with
    /// an empty base path, as the ini keys would.
    pub fn raw(sector_offset: u32) -> Self {
        Self {
            mode: EmuMode::from_keys(true, sector_offset, None),
            ..Self::disabled()
        }
    }

    /// File mode rooted at `base_path`
    pub const fn file_based(base_path: &'a str) -> Self {
        Self {
            mode: EmuMode::FileBased { base_path },
            ..Self::disabled()
        }
    }

    /// Set the emuMMC id
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    /// Set the companion `Nintendo` path
    pub fn with_companion_path(mut self, path: &'a str) -> Self {
        self.companion_path = Some(path);
        self
    }

    /// Set the filesystem version
    pub fn with_fs_version(mut self, fs_version: u32) -> Self {
        self.fs_version = fs_version;
        self
    }

    /// Check if redirection is enabled
    pub fn enabled(&self) -> bool {
        !matches!(self.mode, EmuMode::Disabled)
    }

    /// Raw-mode sector offset, 0 in any other mode
    pub fn sector_offset(&self) -> u32 {
        match self.mode {
            EmuMode::RawSector { sector_offset } => sector_offset,
            _ => 0,
        }
    }

    /// File-mode base path, empty in any other mode
    pub fn base_path(&self) -> &'a str {
        match self.mode {
            EmuMode::FileBased { base_path } => base_path,
            _ => "",
        }
    }
}

/// Keys collected from the `[emummc]` section
#[derive(Default)]
struct RawKeys<'a> {
    enabled: bool,
    sector: u32,
    id: u32,
    path: Option<&'a str>,
    nintendo_path: Option<&'a str>,
}

impl<'a> RawKeys<'a> {
    fn apply(&mut self, key: &str, value: &'a str) {
        match key {
            "enabled" => self.enabled = parse_dec(value) != 0,
            "sector" => self.sector = parse_hex(value),
            "id" => self.id = parse_hex(value),
            "path" => self.path = Some(value),
            "nintendo_path" => self.nintendo_path = Some(value),
            _ => {}
        }
    }

    fn into_config(self) -> EmuConfig<'a> {
        EmuConfig {
            mode: EmuMode::from_keys(self.enabled, self.sector, self.path),
            companion_path: self.nintendo_path,
            id: self.id,
            fs_version: 0,
        }
    }
}

/// Load the emuMMC configuration.
///
/// Mounts the SD card first; a mount failure is tolerated and left to the
/// ini source to report. Returns [`EmuError::ConfigSourceMissing`] when
/// the file cannot be found, in which case callers fall back to
/// `EmuConfig::default()` (redirection disabled).
pub fn load_config<'a, M, I>(medium: &mut M, source: &'a I) -> EmuResult<EmuConfig<'a>>
where
    M: SdMedium,
    I: IniSource + ?Sized,
{
    if let Err(e) = medium.mount() {
        log::warn!(target: "emummc", "SD mount failed before config load: {:?}", e);
    }

    let sections = match source.sections(CONFIG_SOURCE) {
        Some(sections) => sections,
        None => {
            log::info!(target: "emummc", "{} not found, emuMMC disabled", CONFIG_SOURCE);
            return Err(EmuError::ConfigSourceMissing);
        }
    };

    let mut keys = RawKeys::default();
    if let Some(section) = sections
        .iter()
        .find(|s| s.kind == SectionKind::Choice && s.name == CONFIG_SECTION)
    {
        for (key, value) in section.iter() {
            keys.apply(key, value);
        }
    }

    let config = keys.into_config();
    log::info!(
        target: "emummc",
        "emuMMC config: mode={} sector={:#x} id={:#x} path={:?}",
        config.mode.as_str(),
        config.sector_offset(),
        config.id,
        config.base_path()
    );

    Ok(config)
}
