//! Single-step test (SST) vectors.
//!
//! Each file holds a JSON array of cases. A case gives the machine state
//! before and after exactly one instruction, with RAM listed as
//! `[address, value]` pairs.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::{error::CpuError, error::SstError, gameboy::GameBoy, registers::RegisterFile};

#[derive(Debug, Clone, Deserialize)]
pub struct SstState {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub f: u8,
    pub h: u8,
    pub l: u8,
    pub ime: u8,
    #[serde(default)]
    pub ie: Option<u8>,
    /// EI latch, present only in vectors that exercise it.
    #[serde(default)]
    pub ei: Option<u8>,
    #[serde(default)]
    pub ram: Vec<(u16, u8)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SstCase {
    pub name: String,
    pub initial: SstState,
    #[serde(rename = "final")]
    pub expected: SstState,
    /// Per-machine-cycle bus activity. Only its length is checked, and only
    /// when the list is present.
    #[serde(default)]
    pub cycles: Vec<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum SstMismatch {
    #[error("{name}: step failed: {source}")]
    Step {
        name: String,
        #[source]
        source: CpuError,
    },
    #[error("{name}: {}", .diffs.join("; "))]
    State { name: String, diffs: Vec<String> },
}

pub fn load_file(path: &Path) -> Result<Vec<SstCase>, SstError> {
    let text = fs::read_to_string(path).map_err(|source| SstError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SstError::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl SstCase {
    /// Load `initial` into a flat-memory machine, run one instruction and
    /// compare against `final` and the expected clock count.
    pub fn run(&self) -> Result<(), SstMismatch> {
        let mut gb = GameBoy::new_flat();
        self.initial.apply(&mut gb);

        let clocks = gb
            .cpu
            .step(&mut gb.mmu)
            .map_err(|source| SstMismatch::Step {
                name: self.name.clone(),
                source,
            })?;

        let mut diffs = self.expected.diff(&gb);
        if !self.cycles.is_empty() && clocks != self.expected_clocks() {
            diffs.push(format!(
                "cycles: want {} got {clocks}",
                self.expected_clocks()
            ));
        }
        if diffs.is_empty() {
            Ok(())
        } else {
            Err(SstMismatch::State {
                name: self.name.clone(),
                diffs,
            })
        }
    }

    /// Clock ticks the vector expects, four per listed bus cycle.
    pub fn expected_clocks(&self) -> u32 {
        self.cycles.len() as u32 * 4
    }
}

impl SstState {
    fn apply(&self, gb: &mut GameBoy) {
        let regs = &mut gb.cpu.regs;
        regs.pc = self.pc;
        regs.sp = self.sp;
        regs.a = self.a;
        regs.b = self.b;
        regs.c = self.c;
        regs.d = self.d;
        regs.e = self.e;
        regs.set_f(self.f);
        regs.h = self.h;
        regs.l = self.l;
        regs.ime = self.ime != 0;
        gb.cpu.ei_pending = self.ei.is_some_and(|ei| ei != 0);
        for &(addr, val) in &self.ram {
            gb.mmu.write8(addr, val);
        }
    }

    fn diff(&self, gb: &GameBoy) -> Vec<String> {
        let regs: &RegisterFile = &gb.cpu.regs;
        let mut diffs = Vec::new();
        let mut check = |what: &str, want: u16, got: u16| {
            if want != got {
                diffs.push(format!("{what}: want {want:#06X} got {got:#06X}"));
            }
        };

        check("pc", self.pc, regs.pc);
        check("sp", self.sp, regs.sp);
        check("a", self.a.into(), regs.a.into());
        check("b", self.b.into(), regs.b.into());
        check("c", self.c.into(), regs.c.into());
        check("d", self.d.into(), regs.d.into());
        check("e", self.e.into(), regs.e.into());
        check("f", self.f.into(), regs.f().into());
        check("h", self.h.into(), regs.h.into());
        check("l", self.l.into(), regs.l.into());
        check("ime", u16::from(self.ime != 0), u16::from(regs.ime));
        if let Some(ei) = self.ei {
            check("ei", u16::from(ei != 0), u16::from(gb.cpu.ei_pending));
        }
        for &(addr, val) in &self.ram {
            let got = gb.mmu.read8(addr);
            if got != val {
                diffs.push(format!("ram[{addr:#06X}]: want {val:#04X} got {got:#04X}"));
            }
        }
        diffs
    }
}
