use std::{
    fmt,
    io::{self, Write},
    ops::Range,
};

use crate::{
    decode::{Instruction, Mnemonic, Operand, fetch},
    mmu::{BOOT_ROM_SIZE, Mmu},
    registers::{Cond, R8, R16, R16Mem, R16Stk},
    symbols::DebugSymbolTable,
};

const ROM_ENTRY: u16 = 0x0100;
const ROM0_END: u16 = 0x4000;

impl fmt::Display for R8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            R8::B => "B",
            R8::C => "C",
            R8::D => "D",
            R8::E => "E",
            R8::H => "H",
            R8::L => "L",
            R8::HlIndirect => "[HL]",
            R8::A => "A",
        })
    }
}

impl fmt::Display for R16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            R16::BC => "BC",
            R16::DE => "DE",
            R16::HL => "HL",
            R16::SP => "SP",
        })
    }
}

impl fmt::Display for R16Mem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            R16Mem::BC => "[BC]",
            R16Mem::DE => "[DE]",
            R16Mem::HLI => "[HL+]",
            R16Mem::HLD => "[HL-]",
        })
    }
}

impl fmt::Display for R16Stk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            R16Stk::BC => "BC",
            R16Stk::DE => "DE",
            R16Stk::HL => "HL",
            R16Stk::AF => "AF",
        })
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cond::NZ => "NZ",
            Cond::Z => "Z",
            Cond::NC => "NC",
            Cond::C => "C",
        })
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::R8(r) => write!(f, "{r}"),
            Operand::R16(rr) => write!(f, "{rr}"),
            Operand::R16Mem(rr) => write!(f, "{rr}"),
            Operand::R16Stk(rr) => write!(f, "{rr}"),
            Operand::Imm8(n) => write!(f, "${n:02X}"),
            Operand::E8(e) => write!(f, "{e}"),
            Operand::HighImm8(n) => write!(f, "[$FF{n:02X}]"),
            Operand::HighC => f.write_str("[$FF00+C]"),
            Operand::SpE8(e) if e < 0 => write!(f, "SP{e}"),
            Operand::SpE8(e) => write!(f, "SP+{e}"),
            Operand::Imm16(n) => write!(f, "${n:04X}"),
            Operand::Imm16Mem(n) => write!(f, "[${n:04X}]"),
            Operand::Bit(b) => write!(f, "{b}"),
            Operand::Vector(v) => write!(f, "${v:02X}"),
            Operand::Cond(cc) => write!(f, "{cc}"),
            Operand::UnknownByte(b) => write!(f, "${b:02X}"),
        }
    }
}

/// Canonical assembly text, e.g. `LD A, [HL+]` or `JR NZ, -5`.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, op) in self.operands().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

/// Render `inst` as it appears at a known address. Relative jumps become
/// absolute targets and jump/call targets use symbol names when one
/// starts there.
pub fn render_at(inst: &Instruction, next_pc: u16, symbols: Option<&DebugSymbolTable>) -> String {
    let mut text = inst.mnemonic.name().to_string();
    for (i, op) in inst.operands().enumerate() {
        text.push_str(if i == 0 { " " } else { ", " });
        let target = match (inst.mnemonic, *op) {
            (Mnemonic::Jr, Operand::E8(e)) => Some(next_pc.wrapping_add(e as i16 as u16)),
            (Mnemonic::Jp | Mnemonic::Call, Operand::Imm16(n)) => Some(n),
            _ => None,
        };
        match target {
            Some(addr) => match symbols.and_then(|s| s.label_at(addr)) {
                Some(label) => text.push_str(label),
                None => text.push_str(&format!("${addr:04X}")),
            },
            None => text.push_str(&op.to_string()),
        }
    }
    text
}

/// Decode and print every instruction starting in `range`, one per line as
/// `  $0150: LD A, $00`.
pub fn disassemble_range(
    mmu: &Mmu,
    range: Range<u16>,
    symbols: Option<&DebugSymbolTable>,
    out: &mut impl Write,
) -> io::Result<()> {
    write_range(mmu, range, symbols, "  ", out)
}

/// Disassemble the boot ROM (when mapped and not already covered by boot
/// symbols) followed by the cartridge, either symbol by symbol or as one
/// run from the entry point to the end of bank 0.
pub fn disassemble_program(
    mmu: &Mmu,
    symbols: Option<&DebugSymbolTable>,
    out: &mut impl Write,
) -> io::Result<()> {
    let symbols = symbols.filter(|s| !s.is_empty());

    if mmu.boot_mapped && !symbols.is_some_and(|s| s.has_boot_symbols()) {
        writeln!(out, "BootRom:")?;
        write_range(mmu, 0..BOOT_ROM_SIZE as u16, symbols, "  ", out)?;
    }

    writeln!(out, "RomStart:")?;
    match symbols {
        Some(table) => {
            for sym in table.iter() {
                writeln!(out, "  {}:", sym.name)?;
                let end = sym.start.saturating_add(sym.len);
                write_range(mmu, sym.start..end, symbols, "    ", out)?;
            }
        }
        None => write_range(mmu, ROM_ENTRY..ROM0_END, None, "  ", out)?,
    }
    Ok(())
}

fn write_range(
    mmu: &Mmu,
    range: Range<u16>,
    symbols: Option<&DebugSymbolTable>,
    indent: &str,
    out: &mut impl Write,
) -> io::Result<()> {
    // u32 so a range ending at the top of memory terminates
    let end = u32::from(range.end);
    let mut pc = u32::from(range.start);
    while pc < end {
        let addr = pc as u16;
        let fetched = fetch(mmu, addr);
        writeln!(
            out,
            "{indent}${addr:04X}: {}",
            render_at(&fetched.instruction, fetched.next_pc, symbols)
        )?;
        pc += u32::from(fetched.len);
    }
    Ok(())
}
