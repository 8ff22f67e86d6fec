//! Per-instruction semantics.
//!
//! [`execute`] expects `regs.pc` to already point past the instruction, so
//! relative jumps and pushed return addresses are computed from it. Cycle
//! counts are clock ticks, four per machine cycle, as listed on
//! gbdev.io/pandocs/CPU_Instruction_Set.html.

use crate::{
    decode::{Instruction, Mnemonic, Operand},
    error::CpuError,
    mmu::Mmu,
    registers::{Flag, R8, R16, RegisterFile},
};

/// Side effects the step driver has to apply after the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Control {
    #[default]
    None,
    /// EI: enable IME after the next instruction.
    EnableInterrupts,
    /// DI: IME is already clear; drop any pending EI as well.
    DisableInterrupts,
    Halt,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub cycles: u32,
    pub control: Control,
}

impl Outcome {
    const fn new(cycles: u32) -> Self {
        Self {
            cycles,
            control: Control::None,
        }
    }

    const fn with(cycles: u32, control: Control) -> Self {
        Self { cycles, control }
    }
}

/// Apply `inst` to the machine.
///
/// `Invalid` instructions produce [`CpuError::InvalidOpcode`]; operand
/// shapes that no opcode encodes produce [`CpuError::OperandMismatch`].
pub fn execute(
    regs: &mut RegisterFile,
    mmu: &mut Mmu,
    inst: &Instruction,
) -> Result<Outcome, CpuError> {
    use Mnemonic::*;
    use Operand as O;

    let mismatch = || CpuError::OperandMismatch {
        mnemonic: inst.mnemonic,
    };
    const A: Option<Operand> = Some(O::R8(R8::A));
    const HL: Option<Operand> = Some(O::R16(R16::HL));
    const SP: Option<Operand> = Some(O::R16(R16::SP));

    let outcome = match (inst.mnemonic, inst.operands) {
        (Nop, [None, None]) => Outcome::new(4),
        (Stop, [None, None]) => Outcome::with(4, Control::Stop),
        (Halt, [None, None]) => Outcome::with(4, Control::Halt),
        (Di, [None, None]) => {
            regs.ime = false;
            Outcome::with(4, Control::DisableInterrupts)
        }
        (Ei, [None, None]) => Outcome::with(4, Control::EnableInterrupts),

        // 8-bit loads
        (Ld, [Some(O::R8(dst)), Some(O::R8(src))]) => {
            let val = read_r8(regs, mmu, src);
            write_r8(regs, mmu, dst, val);
            Outcome::new(if is_hl(dst) || is_hl(src) { 8 } else { 4 })
        }
        (Ld, [Some(O::R8(dst)), Some(O::Imm8(n))]) => {
            write_r8(regs, mmu, dst, n);
            Outcome::new(if is_hl(dst) { 12 } else { 8 })
        }
        (Ld, [Some(O::R16Mem(mem)), A]) => {
            let addr = regs.r16_mem_address(mem);
            mmu.write8(addr, regs.a);
            Outcome::new(8)
        }
        (Ld, [A, Some(O::R16Mem(mem))]) => {
            let addr = regs.r16_mem_address(mem);
            regs.a = mmu.read8(addr);
            Outcome::new(8)
        }
        (Ld, [Some(O::Imm16Mem(addr)), A]) => {
            mmu.write8(addr, regs.a);
            Outcome::new(16)
        }
        (Ld, [A, Some(O::Imm16Mem(addr))]) => {
            regs.a = mmu.read8(addr);
            Outcome::new(16)
        }
        (Ldh, [Some(O::HighImm8(n)), A]) => {
            mmu.write8(high(n), regs.a);
            Outcome::new(12)
        }
        (Ldh, [A, Some(O::HighImm8(n))]) => {
            regs.a = mmu.read8(high(n));
            Outcome::new(12)
        }
        (Ldh, [Some(O::HighC), A]) => {
            mmu.write8(high(regs.c), regs.a);
            Outcome::new(8)
        }
        (Ldh, [A, Some(O::HighC)]) => {
            regs.a = mmu.read8(high(regs.c));
            Outcome::new(8)
        }

        // 16-bit loads and stack
        (Ld, [Some(O::R16(rr)), Some(O::Imm16(n))]) => {
            regs.set16(rr, n);
            Outcome::new(12)
        }
        (Ld, [Some(O::Imm16Mem(addr)), SP]) => {
            mmu.write16(addr, regs.sp);
            Outcome::new(20)
        }
        (Ld, [SP, HL]) => {
            regs.sp = regs.hl();
            Outcome::new(8)
        }
        (Ld, [HL, Some(O::SpE8(e))]) => {
            let val = sp_offset(regs, e);
            regs.set_hl(val);
            Outcome::new(12)
        }
        (Push, [Some(O::R16Stk(rr)), None]) => {
            let val = regs.get_stk(rr);
            push16(regs, mmu, val);
            Outcome::new(16)
        }
        (Pop, [Some(O::R16Stk(rr)), None]) => {
            let val = pop16(regs, mmu);
            regs.set_stk(rr, val);
            Outcome::new(12)
        }

        // 8-bit arithmetic and logic
        (Add | Adc | Sub | Sbc | And | Xor | Or | Cp, [A, Some(src)]) => {
            let (val, cycles) = match src {
                O::R8(r) => (read_r8(regs, mmu, r), if is_hl(r) { 8 } else { 4 }),
                O::Imm8(n) => (n, 8),
                _ => return Err(mismatch()),
            };
            alu8(regs, inst.mnemonic, val).ok_or_else(mismatch)?;
            Outcome::new(cycles)
        }
        (Inc, [Some(O::R8(r)), None]) => {
            let val = read_r8(regs, mmu, r);
            let res = val.wrapping_add(1);
            write_r8(regs, mmu, r, res);
            let carry = regs.flag(Flag::C);
            regs.set_flags(res == 0, false, val & 0x0F == 0x0F, carry);
            Outcome::new(if is_hl(r) { 12 } else { 4 })
        }
        (Dec, [Some(O::R8(r)), None]) => {
            let val = read_r8(regs, mmu, r);
            let res = val.wrapping_sub(1);
            write_r8(regs, mmu, r, res);
            let carry = regs.flag(Flag::C);
            regs.set_flags(res == 0, true, val & 0x0F == 0, carry);
            Outcome::new(if is_hl(r) { 12 } else { 4 })
        }

        // 16-bit arithmetic
        (Inc, [Some(O::R16(rr)), None]) => {
            regs.set16(rr, regs.get16(rr).wrapping_add(1));
            Outcome::new(8)
        }
        (Dec, [Some(O::R16(rr)), None]) => {
            regs.set16(rr, regs.get16(rr).wrapping_sub(1));
            Outcome::new(8)
        }
        (Add, [HL, Some(O::R16(rr))]) => {
            let hl = regs.hl();
            let val = regs.get16(rr);
            let zero = regs.flag(Flag::Z);
            regs.set_flags(
                zero,
                false,
                (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF,
                hl as u32 + val as u32 > 0xFFFF,
            );
            regs.set_hl(hl.wrapping_add(val));
            Outcome::new(8)
        }
        (Add, [SP, Some(O::E8(e))]) => {
            regs.sp = sp_offset(regs, e);
            Outcome::new(16)
        }

        // Accumulator rotates and misc flag ops
        (Rlca | Rrca | Rla | Rra, [None, None]) => {
            let (res, carry) =
                rotate(inst.mnemonic, regs.a, regs.flag(Flag::C)).ok_or_else(mismatch)?;
            regs.a = res;
            regs.set_flags(false, false, false, carry);
            Outcome::new(4)
        }
        (Daa, [None, None]) => {
            daa(regs);
            Outcome::new(4)
        }
        (Cpl, [None, None]) => {
            regs.a = !regs.a;
            regs.set_flag(Flag::N, true);
            regs.set_flag(Flag::H, true);
            Outcome::new(4)
        }
        (Scf, [None, None]) => {
            let zero = regs.flag(Flag::Z);
            regs.set_flags(zero, false, false, true);
            Outcome::new(4)
        }
        (Ccf, [None, None]) => {
            let zero = regs.flag(Flag::Z);
            let carry = regs.flag(Flag::C);
            regs.set_flags(zero, false, false, !carry);
            Outcome::new(4)
        }

        // CB table
        (Rlc | Rrc | Rl | Rr | Sla | Sra | Swap | Srl, [Some(O::R8(r)), None]) => {
            let val = read_r8(regs, mmu, r);
            let (res, carry) =
                rotate(inst.mnemonic, val, regs.flag(Flag::C)).ok_or_else(mismatch)?;
            write_r8(regs, mmu, r, res);
            regs.set_flags(res == 0, false, false, carry);
            Outcome::new(if is_hl(r) { 16 } else { 8 })
        }
        (Bit, [Some(O::Bit(b)), Some(O::R8(r))]) => {
            let val = read_r8(regs, mmu, r);
            let carry = regs.flag(Flag::C);
            regs.set_flags(val & (1 << (b & 7)) == 0, false, true, carry);
            Outcome::new(if is_hl(r) { 12 } else { 8 })
        }
        (Res, [Some(O::Bit(b)), Some(O::R8(r))]) => {
            let val = read_r8(regs, mmu, r) & !(1 << (b & 7));
            write_r8(regs, mmu, r, val);
            Outcome::new(if is_hl(r) { 16 } else { 8 })
        }
        (Set, [Some(O::Bit(b)), Some(O::R8(r))]) => {
            let val = read_r8(regs, mmu, r) | (1 << (b & 7));
            write_r8(regs, mmu, r, val);
            Outcome::new(if is_hl(r) { 16 } else { 8 })
        }

        // Control flow
        (Jp, [Some(O::Imm16(target)), None]) => {
            regs.pc = target;
            Outcome::new(16)
        }
        (Jp, [HL, None]) => {
            regs.pc = regs.hl();
            Outcome::new(4)
        }
        (Jp, [Some(O::Cond(cc)), Some(O::Imm16(target))]) => {
            if regs.condition(cc) {
                regs.pc = target;
                Outcome::new(16)
            } else {
                Outcome::new(12)
            }
        }
        (Jr, [Some(O::E8(e)), None]) => {
            regs.pc = relative(regs.pc, e);
            Outcome::new(12)
        }
        (Jr, [Some(O::Cond(cc)), Some(O::E8(e))]) => {
            if regs.condition(cc) {
                regs.pc = relative(regs.pc, e);
                Outcome::new(12)
            } else {
                Outcome::new(8)
            }
        }
        (Call, [Some(O::Imm16(target)), None]) => {
            call(regs, mmu, target);
            Outcome::new(24)
        }
        (Call, [Some(O::Cond(cc)), Some(O::Imm16(target))]) => {
            if regs.condition(cc) {
                call(regs, mmu, target);
                Outcome::new(24)
            } else {
                Outcome::new(12)
            }
        }
        (Ret, [None, None]) => {
            regs.pc = pop16(regs, mmu);
            Outcome::new(16)
        }
        (Ret, [Some(O::Cond(cc)), None]) => {
            if regs.condition(cc) {
                regs.pc = pop16(regs, mmu);
                Outcome::new(20)
            } else {
                Outcome::new(8)
            }
        }
        (Reti, [None, None]) => {
            regs.pc = pop16(regs, mmu);
            regs.ime = true;
            Outcome::new(16)
        }
        (Rst, [Some(O::Vector(vector)), None]) => {
            call(regs, mmu, u16::from(vector));
            Outcome::new(16)
        }

        (Invalid, [Some(O::UnknownByte(opcode)), None]) => {
            return Err(CpuError::InvalidOpcode {
                opcode,
                pc: regs.pc.wrapping_sub(1),
            });
        }
        _ => return Err(mismatch()),
    };
    Ok(outcome)
}

#[inline]
fn is_hl(reg: R8) -> bool {
    reg == R8::HlIndirect
}

#[inline]
fn high(offset: u8) -> u16 {
    0xFF00 | u16::from(offset)
}

#[inline]
fn relative(pc: u16, e: i8) -> u16 {
    pc.wrapping_add(e as i16 as u16)
}

fn read_r8(regs: &RegisterFile, mmu: &Mmu, reg: R8) -> u8 {
    match regs.get8(reg) {
        Some(val) => val,
        None => mmu.read8(regs.hl()),
    }
}

fn write_r8(regs: &mut RegisterFile, mmu: &mut Mmu, reg: R8, val: u8) {
    if !regs.set8(reg, val) {
        mmu.write8(regs.hl(), val);
    }
}

pub(crate) fn push16(regs: &mut RegisterFile, mmu: &mut Mmu, val: u16) {
    let [lo, hi] = val.to_le_bytes();
    regs.sp = regs.sp.wrapping_sub(1);
    mmu.write8(regs.sp, hi);
    regs.sp = regs.sp.wrapping_sub(1);
    mmu.write8(regs.sp, lo);
}

fn pop16(regs: &mut RegisterFile, mmu: &Mmu) -> u16 {
    let lo = mmu.read8(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    let hi = mmu.read8(regs.sp);
    regs.sp = regs.sp.wrapping_add(1);
    u16::from_le_bytes([lo, hi])
}

fn call(regs: &mut RegisterFile, mmu: &mut Mmu, target: u16) {
    let ret = regs.pc;
    push16(regs, mmu, ret);
    regs.pc = target;
}

/// SP plus a signed offset. H and C come from the unsigned low-byte
/// addition; Z and N are cleared.
fn sp_offset(regs: &mut RegisterFile, e: i8) -> u16 {
    let sp = regs.sp;
    let val = e as i16 as u16;
    regs.set_flags(
        false,
        false,
        (sp & 0x0F) + (val & 0x0F) > 0x0F,
        (sp & 0xFF) + (val & 0xFF) > 0xFF,
    );
    sp.wrapping_add(val)
}

/// Returns `None` for mnemonics outside the eight ALU operations.
fn alu8(regs: &mut RegisterFile, op: Mnemonic, val: u8) -> Option<()> {
    let a = regs.a;
    let carry_in = u8::from(regs.flag(Flag::C));
    match op {
        Mnemonic::Add | Mnemonic::Adc => {
            let c = if op == Mnemonic::Adc { carry_in } else { 0 };
            let sum = u16::from(a) + u16::from(val) + u16::from(c);
            let res = sum as u8;
            regs.set_flags(res == 0, false, (a & 0x0F) + (val & 0x0F) + c > 0x0F, sum > 0xFF);
            regs.a = res;
        }
        Mnemonic::Sub | Mnemonic::Sbc | Mnemonic::Cp => {
            let c = if op == Mnemonic::Sbc { carry_in } else { 0 };
            let diff = i16::from(a) - i16::from(val) - i16::from(c);
            let res = diff as u8;
            regs.set_flags(res == 0, true, (a & 0x0F) < (val & 0x0F) + c, diff < 0);
            if op != Mnemonic::Cp {
                regs.a = res;
            }
        }
        Mnemonic::And => {
            regs.a = a & val;
            regs.set_flags(regs.a == 0, false, true, false);
        }
        Mnemonic::Xor => {
            regs.a = a ^ val;
            regs.set_flags(regs.a == 0, false, false, false);
        }
        Mnemonic::Or => {
            regs.a = a | val;
            regs.set_flags(regs.a == 0, false, false, false);
        }
        _ => return None,
    }
    Some(())
}

/// Rotate/shift `val`, returning the result and the carry out. Shared by
/// the accumulator forms and the CB table.
fn rotate(op: Mnemonic, val: u8, carry_in: bool) -> Option<(u8, bool)> {
    let cin = u8::from(carry_in);
    let out = match op {
        Mnemonic::Rlc | Mnemonic::Rlca => (val.rotate_left(1), val & 0x80 != 0),
        Mnemonic::Rrc | Mnemonic::Rrca => (val.rotate_right(1), val & 0x01 != 0),
        Mnemonic::Rl | Mnemonic::Rla => ((val << 1) | cin, val & 0x80 != 0),
        Mnemonic::Rr | Mnemonic::Rra => ((val >> 1) | (cin << 7), val & 0x01 != 0),
        Mnemonic::Sla => (val << 1, val & 0x80 != 0),
        Mnemonic::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
        Mnemonic::Swap => (val.rotate_left(4), false),
        Mnemonic::Srl => (val >> 1, val & 0x01 != 0),
        _ => return None,
    };
    Some(out)
}

fn daa(regs: &mut RegisterFile) {
    let subtract = regs.flag(Flag::N);
    let mut correction = 0u8;
    let mut carry = false;
    if regs.flag(Flag::H) || (!subtract && regs.a & 0x0F > 0x09) {
        correction |= 0x06;
    }
    if regs.flag(Flag::C) || (!subtract && regs.a > 0x99) {
        correction |= 0x60;
        carry = true;
    }
    regs.a = if subtract {
        regs.a.wrapping_sub(correction)
    } else {
        regs.a.wrapping_add(correction)
    };
    regs.set_flags(regs.a == 0, subtract, false, carry);
}
