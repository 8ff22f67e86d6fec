use crate::{error::LoadError, serial::Serial, timer::Timer};

pub const BOOT_ROM_SIZE: usize = 0x100;
const ROM_BANK_SIZE: usize = 0x4000;
const VRAM_SIZE: usize = 0x2000;
const WRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;
const HRAM_SIZE: usize = 0x7F;
const FLAT_SIZE: usize = 0x1_0000;
const OPEN_BUS: u8 = 0xFF;

/// Memory region an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    BootRom,
    Rom0,
    Rom1,
    Vram,
    ExternalRam,
    Wram,
    Oam,
    Unusable,
    Io,
    Hram,
    Ie,
}

/// Result of resolving a CPU address: the region plus the offset into that
/// region's backing storage. Echo RAM resolves straight to WRAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub region: Region,
    pub offset: u16,
}

impl Location {
    const fn new(region: Region, offset: u16) -> Self {
        Self { region, offset }
    }
}

/// I/O registers without a dedicated device: joypad, sound, LCD and the
/// boot ROM lockout.
#[derive(Debug, Clone)]
struct IoRegs {
    joyp: u8,
    sound: [u8; 0x30],
    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,
}

impl Default for IoRegs {
    fn default() -> Self {
        Self {
            joyp: 0x30,
            sound: [0; 0x30],
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            dma: 0xFF,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
        }
    }
}

// Bits that read back as 1 regardless of what was written.
fn sound_read_mask(addr: u16) -> u8 {
    match addr {
        0xFF10 => 0x80,
        0xFF11 => 0x3F,
        0xFF12 => 0x00,
        0xFF13 => 0xFF,
        0xFF14 => 0xBF,
        0xFF16 => 0x3F,
        0xFF17 => 0x00,
        0xFF18 => 0xFF,
        0xFF19 => 0xBF,
        0xFF1A => 0x7F,
        0xFF1B => 0xFF,
        0xFF1C => 0x9F,
        0xFF1D => 0xFF,
        0xFF1E => 0xBF,
        0xFF20 => 0xFF,
        0xFF21 => 0x00,
        0xFF22 => 0x00,
        0xFF23 => 0xBF,
        0xFF24 => 0x00,
        0xFF25 => 0x00,
        0xFF26 => 0x70,
        0xFF30..=0xFF3F => 0x00,
        _ => 0xFF,
    }
}

/// The DMG address space.
///
/// In the normal mode every access is routed through [`Mmu::resolve`] to
/// the backing store or I/O register it names. The flat mode created by
/// [`Mmu::new_flat`] replaces all of that with a plain 64 KiB array, which
/// is what single-instruction conformance vectors expect.
#[derive(Debug, Clone)]
pub struct Mmu {
    boot_rom: Vec<u8>,
    pub boot_mapped: bool,
    rom: Vec<u8>,
    rom_len: usize,
    vram: Vec<u8>,
    wram: Vec<u8>,
    oam: [u8; OAM_SIZE],
    hram: [u8; HRAM_SIZE],
    io: IoRegs,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub timer: Timer,
    pub serial: Serial,
    flat: Option<Vec<u8>>,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            boot_rom: Vec::new(),
            boot_mapped: false,
            rom: vec![OPEN_BUS; 2 * ROM_BANK_SIZE],
            rom_len: 0,
            vram: vec![0; VRAM_SIZE],
            wram: vec![0; WRAM_SIZE],
            oam: [0; OAM_SIZE],
            hram: [0; HRAM_SIZE],
            io: IoRegs::default(),
            if_reg: 0x01,
            ie_reg: 0,
            timer: Timer::new(),
            serial: Serial::new(),
            flat: None,
        }
    }

    /// 64 KiB of plain RAM with no I/O side effects.
    pub fn new_flat() -> Self {
        Self {
            flat: Some(vec![0; FLAT_SIZE]),
            ..Self::new()
        }
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.flat.is_some()
    }

    /// Copy a cartridge image into banks 0 and 1. Bytes past 0x7FFF are
    /// dropped since no mapper is modeled.
    pub fn load_rom(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if data.is_empty() {
            return Err(LoadError::EmptyRom);
        }
        let len = data.len().min(self.rom.len());
        if data.len() > len {
            log::warn!(
                "ROM image is {} bytes; only the first {} are mapped",
                data.len(),
                len
            );
        }
        self.rom.fill(OPEN_BUS);
        self.rom[..len].copy_from_slice(&data[..len]);
        self.rom_len = len;
        if let Some(flat) = self.flat.as_mut() {
            flat[..len].copy_from_slice(&data[..len]);
        }
        Ok(())
    }

    /// Map a boot ROM over 0x0000-0x00FF until FF50 is written.
    pub fn load_boot_rom(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if data.is_empty() {
            return Err(LoadError::EmptyBootRom);
        }
        if data.len() > BOOT_ROM_SIZE {
            return Err(LoadError::BootRomTooLarge { len: data.len() });
        }
        self.boot_rom = data.to_vec();
        self.boot_mapped = true;
        Ok(())
    }

    pub fn has_boot_rom(&self) -> bool {
        !self.boot_rom.is_empty()
    }

    /// Remap the boot ROM (if one was loaded) and clear RAM and I/O state.
    /// The cartridge image is kept.
    pub fn reset(&mut self) {
        let rom = std::mem::take(&mut self.rom);
        let rom_len = self.rom_len;
        let boot_rom = std::mem::take(&mut self.boot_rom);
        *self = if self.is_flat() {
            Self::new_flat()
        } else {
            Self::new()
        };
        self.boot_mapped = !boot_rom.is_empty();
        self.boot_rom = boot_rom;
        self.rom = rom;
        self.rom_len = rom_len;
        if let Some(flat) = self.flat.as_mut() {
            flat[..rom_len].copy_from_slice(&self.rom[..rom_len]);
        }
    }

    /// Map a CPU address to its region and offset. Total over `u16`.
    pub fn resolve(&self, addr: u16) -> Location {
        match addr {
            0x0000..=0x00FF if self.boot_mapped => Location::new(Region::BootRom, addr),
            0x0000..=0x3FFF => Location::new(Region::Rom0, addr),
            0x4000..=0x7FFF => Location::new(Region::Rom1, addr - 0x4000),
            0x8000..=0x9FFF => Location::new(Region::Vram, addr - 0x8000),
            0xA000..=0xBFFF => Location::new(Region::ExternalRam, addr - 0xA000),
            0xC000..=0xDFFF => Location::new(Region::Wram, addr - 0xC000),
            0xE000..=0xFDFF => Location::new(Region::Wram, addr - 0xE000),
            0xFE00..=0xFE9F => Location::new(Region::Oam, addr - 0xFE00),
            0xFEA0..=0xFEFF => Location::new(Region::Unusable, addr - 0xFEA0),
            0xFF00..=0xFF7F => Location::new(Region::Io, addr - 0xFF00),
            0xFF80..=0xFFFE => Location::new(Region::Hram, addr - 0xFF80),
            0xFFFF => Location::new(Region::Ie, 0),
        }
    }

    /// Backing storage for `addr` up to the end of its region. I/O, IE and
    /// open-bus regions have none.
    pub fn unmap_address(&self, addr: u16) -> Option<&[u8]> {
        if let Some(flat) = &self.flat {
            return Some(&flat[addr as usize..]);
        }
        let loc = self.resolve(addr);
        let off = loc.offset as usize;
        match loc.region {
            Region::BootRom => self.boot_rom.get(off..),
            Region::Rom0 => Some(&self.rom[off..ROM_BANK_SIZE]),
            Region::Rom1 => Some(&self.rom[ROM_BANK_SIZE + off..]),
            Region::Vram => Some(&self.vram[off..]),
            Region::Wram => Some(&self.wram[off..]),
            Region::Oam => Some(&self.oam[off..]),
            Region::Hram => Some(&self.hram[off..]),
            Region::ExternalRam | Region::Unusable | Region::Io | Region::Ie => None,
        }
    }

    pub fn read8(&self, addr: u16) -> u8 {
        if let Some(flat) = &self.flat {
            return flat[addr as usize];
        }
        let loc = self.resolve(addr);
        let off = loc.offset as usize;
        match loc.region {
            Region::BootRom => self.boot_rom.get(off).copied().unwrap_or(OPEN_BUS),
            Region::Rom0 => self.rom[off],
            Region::Rom1 => self.rom[ROM_BANK_SIZE + off],
            Region::Vram => self.vram[off],
            Region::Wram => self.wram[off],
            Region::Oam => self.oam[off],
            Region::Hram => self.hram[off],
            Region::Io => self.read_io(addr),
            Region::Ie => self.ie_reg,
            Region::ExternalRam | Region::Unusable => {
                log::trace!("open-bus read {addr:04X}");
                OPEN_BUS
            }
        }
    }

    pub fn write8(&mut self, addr: u16, val: u8) {
        if let Some(flat) = self.flat.as_mut() {
            flat[addr as usize] = val;
            return;
        }
        let loc = self.resolve(addr);
        let off = loc.offset as usize;
        match loc.region {
            Region::Vram => self.vram[off] = val,
            Region::Wram => self.wram[off] = val,
            Region::Oam => self.oam[off] = val,
            Region::Hram => self.hram[off] = val,
            Region::Io => self.write_io(addr, val),
            Region::Ie => self.ie_reg = val,
            Region::BootRom | Region::Rom0 | Region::Rom1 => {
                log::trace!("ignored ROM write {addr:04X} <- {val:02X}");
            }
            Region::ExternalRam | Region::Unusable => {
                log::trace!("open-bus write {addr:04X} <- {val:02X}");
            }
        }
    }

    /// Little-endian 16-bit read; the high byte comes from `addr + 1`
    /// (wrapping).
    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read8(addr);
        let hi = self.read8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write16(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write8(addr, lo);
        self.write8(addr.wrapping_add(1), hi);
    }

    fn read_io(&self, addr: u16) -> u8 {
        let io = &self.io;
        match addr {
            // No buttons are modeled, so every input line reads released.
            0xFF00 => 0xC0 | (io.joyp & 0x30) | 0x0F,
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF10..=0xFF3F => io.sound[(addr - 0xFF10) as usize] | sound_read_mask(addr),
            0xFF40 => io.lcdc,
            0xFF41 => io.stat | 0x80,
            0xFF42 => io.scy,
            0xFF43 => io.scx,
            0xFF44 => io.ly,
            0xFF45 => io.lyc,
            0xFF46 => io.dma,
            0xFF47 => io.bgp,
            0xFF48 => io.obp0,
            0xFF49 => io.obp1,
            0xFF4A => io.wy,
            0xFF4B => io.wx,
            _ => OPEN_BUS,
        }
    }

    fn write_io(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF00 => self.io.joyp = val & 0x30,
            0xFF01 | 0xFF02 => self.serial.write(addr, val, &mut self.if_reg),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.if_reg),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF10..=0xFF3F => self.io.sound[(addr - 0xFF10) as usize] = val,
            0xFF40 => self.io.lcdc = val,
            // mode and coincidence bits are owned by the PPU
            0xFF41 => self.io.stat = (self.io.stat & 0x07) | (val & 0x78),
            0xFF42 => self.io.scy = val,
            0xFF43 => self.io.scx = val,
            0xFF44 => log::trace!("ignored LY write {val:02X}"),
            0xFF45 => self.io.lyc = val,
            0xFF46 => self.oam_dma(val),
            0xFF47 => self.io.bgp = val,
            0xFF48 => self.io.obp0 = val,
            0xFF49 => self.io.obp1 = val,
            0xFF4A => self.io.wy = val,
            0xFF4B => self.io.wx = val,
            0xFF50 => {
                if self.boot_mapped {
                    log::debug!("boot ROM unmapped");
                }
                self.boot_mapped = false;
            }
            _ => log::trace!("ignored I/O write {addr:04X} <- {val:02X}"),
        }
    }

    /// Copy 160 bytes from `page << 8` into OAM in one go.
    fn oam_dma(&mut self, page: u8) {
        self.io.dma = page;
        let src = u16::from(page) << 8;
        for i in 0..OAM_SIZE as u16 {
            let byte = self.read8(src.wrapping_add(i));
            self.oam[i as usize] = byte;
        }
    }
}
