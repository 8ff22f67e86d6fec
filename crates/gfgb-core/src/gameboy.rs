use std::{fs, path::Path};

use crate::{
    cpu::Cpu,
    error::{CpuError, LoadError},
    mmu::Mmu,
};

/// A complete DMG machine: CPU plus address space.
#[derive(Debug, Clone)]
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    /// Memory-mapped machine in the post-boot register state.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new_post_boot(),
            mmu: Mmu::new(),
        }
    }

    /// Machine backed by 64 KiB of flat RAM with zeroed registers. Timer and
    /// serial are not stepped in this mode.
    pub fn new_flat() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new_flat(),
        }
    }

    pub fn load_rom(&mut self, data: &[u8]) -> Result<(), LoadError> {
        self.mmu.load_rom(data)
    }

    pub fn load_rom_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let data = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded ROM {} ({} bytes)", path.display(), data.len());
        self.load_rom(&data)
    }

    /// Map a boot ROM and put the CPU in its power-on state so execution
    /// starts at 0x0000.
    pub fn load_boot_rom(&mut self, data: &[u8]) -> Result<(), LoadError> {
        self.mmu.load_boot_rom(data)?;
        self.cpu = Cpu::new();
        Ok(())
    }

    pub fn load_boot_rom_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let data = fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_boot_rom(&data)
    }

    /// Run one instruction (or one idle slot while halted), advance the
    /// timer, then dispatch any pending interrupt. Returns elapsed clocks.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        let mut cycles = self.cpu.step(&mut self.mmu)?;
        if !self.mmu.is_flat() {
            self.mmu.timer.step(cycles, &mut self.mmu.if_reg);
        }
        cycles += self.cpu.service_interrupts(&mut self.mmu);
        Ok(cycles)
    }

    /// Return to the initial state, keeping the loaded ROM and boot ROM.
    pub fn reset(&mut self) {
        self.mmu.reset();
        self.cpu = if self.mmu.boot_mapped || self.mmu.is_flat() {
            Cpu::new()
        } else {
            Cpu::new_post_boot()
        };
    }

    pub fn read8(&self, addr: u16) -> u8 {
        self.mmu.read8(addr)
    }

    pub fn write8(&mut self, addr: u16, val: u8) {
        self.mmu.write8(addr, val);
    }

    pub fn read16(&self, addr: u16) -> u16 {
        self.mmu.read16(addr)
    }

    pub fn write16(&mut self, addr: u16, val: u16) {
        self.mmu.write16(addr, val);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
