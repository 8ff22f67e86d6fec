use crate::{
    mmu::Mmu,
    registers::{Cond, R8, R16, R16Mem, R16Stk},
};

pub const CB_PREFIX: u8 = 0xCB;

/// Opcode class. `Invalid` covers the unassigned primary opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    Add,
    And,
    Bit,
    Call,
    Ccf,
    Cp,
    Cpl,
    Daa,
    Dec,
    Di,
    Ei,
    Halt,
    Inc,
    Jp,
    Jr,
    Ld,
    Ldh,
    Nop,
    Or,
    Pop,
    Push,
    Res,
    Ret,
    Reti,
    Rl,
    Rla,
    Rlc,
    Rlca,
    Rr,
    Rra,
    Rrc,
    Rrca,
    Rst,
    Sbc,
    Scf,
    Set,
    Sla,
    Sra,
    Srl,
    Stop,
    Sub,
    Swap,
    Xor,
    Invalid,
}

impl Mnemonic {
    pub const fn name(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::Add => "ADD",
            Mnemonic::And => "AND",
            Mnemonic::Bit => "BIT",
            Mnemonic::Call => "CALL",
            Mnemonic::Ccf => "CCF",
            Mnemonic::Cp => "CP",
            Mnemonic::Cpl => "CPL",
            Mnemonic::Daa => "DAA",
            Mnemonic::Dec => "DEC",
            Mnemonic::Di => "DI",
            Mnemonic::Ei => "EI",
            Mnemonic::Halt => "HALT",
            Mnemonic::Inc => "INC",
            Mnemonic::Jp => "JP",
            Mnemonic::Jr => "JR",
            Mnemonic::Ld => "LD",
            Mnemonic::Ldh => "LDH",
            Mnemonic::Nop => "NOP",
            Mnemonic::Or => "OR",
            Mnemonic::Pop => "POP",
            Mnemonic::Push => "PUSH",
            Mnemonic::Res => "RES",
            Mnemonic::Ret => "RET",
            Mnemonic::Reti => "RETI",
            Mnemonic::Rl => "RL",
            Mnemonic::Rla => "RLA",
            Mnemonic::Rlc => "RLC",
            Mnemonic::Rlca => "RLCA",
            Mnemonic::Rr => "RR",
            Mnemonic::Rra => "RRA",
            Mnemonic::Rrc => "RRC",
            Mnemonic::Rrca => "RRCA",
            Mnemonic::Rst => "RST",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Scf => "SCF",
            Mnemonic::Set => "SET",
            Mnemonic::Sla => "SLA",
            Mnemonic::Sra => "SRA",
            Mnemonic::Srl => "SRL",
            Mnemonic::Stop => "STOP",
            Mnemonic::Sub => "SUB",
            Mnemonic::Swap => "SWAP",
            Mnemonic::Xor => "XOR",
            // Emitted as a raw data byte.
            Mnemonic::Invalid => "DB",
        }
    }

    /// The eight ALU operations selected by bits 3-5 of `x=2` and `x=3,z=6`
    /// opcodes.
    const fn alu(y: u8) -> Self {
        match y & 0x07 {
            0 => Mnemonic::Add,
            1 => Mnemonic::Adc,
            2 => Mnemonic::Sub,
            3 => Mnemonic::Sbc,
            4 => Mnemonic::And,
            5 => Mnemonic::Xor,
            6 => Mnemonic::Or,
            _ => Mnemonic::Cp,
        }
    }

    /// Rotate/shift group of the CB table.
    const fn rot(y: u8) -> Self {
        match y & 0x07 {
            0 => Mnemonic::Rlc,
            1 => Mnemonic::Rrc,
            2 => Mnemonic::Rl,
            3 => Mnemonic::Rr,
            4 => Mnemonic::Sla,
            5 => Mnemonic::Sra,
            6 => Mnemonic::Swap,
            _ => Mnemonic::Srl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    R8(R8),
    R16(R16),
    R16Mem(R16Mem),
    R16Stk(R16Stk),
    Imm8(u8),
    /// Signed displacement of JR and ADD SP.
    E8(i8),
    /// `[$FF00+n8]`
    HighImm8(u8),
    /// `[$FF00+C]`
    HighC,
    /// `SP+e8` as loaded into HL.
    SpE8(i8),
    Imm16(u16),
    Imm16Mem(u16),
    Bit(u8),
    /// RST target address.
    Vector(u8),
    Cond(Cond),
    UnknownByte(u8),
}

/// A decoded instruction: an opcode class and up to two operands, in
/// assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub operands: [Option<Operand>; 2],
}

impl Instruction {
    pub const fn new(mnemonic: Mnemonic) -> Self {
        Self {
            mnemonic,
            operands: [None, None],
        }
    }

    pub const fn unary(mnemonic: Mnemonic, a: Operand) -> Self {
        Self {
            mnemonic,
            operands: [Some(a), None],
        }
    }

    pub const fn binary(mnemonic: Mnemonic, a: Operand, b: Operand) -> Self {
        Self {
            mnemonic,
            operands: [Some(a), Some(b)],
        }
    }

    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.operands.iter().flatten()
    }

    pub fn is_invalid(&self) -> bool {
        self.mnemonic == Mnemonic::Invalid
    }
}

/// Output of [`fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fetched {
    pub instruction: Instruction,
    /// Address of the following instruction (wraps at 0xFFFF).
    pub next_pc: u16,
    /// Encoded size in bytes, prefix and immediates included.
    pub len: u16,
}

/// Decode the instruction at `pc` without touching CPU state.
pub fn fetch(mmu: &Mmu, pc: u16) -> Fetched {
    decode_with(|addr| mmu.read8(addr), pc)
}

/// Decode from an arbitrary byte source. Used by [`fetch`] and by tooling
/// that decodes straight out of a ROM image.
pub fn decode_with(read: impl Fn(u16) -> u8, pc: u16) -> Fetched {
    let mut cursor = Cursor { read, pc, len: 0 };
    let op = cursor.next_u8();
    let instruction = if op == CB_PREFIX {
        let cb = cursor.next_u8();
        decode_cb(cb)
    } else {
        decode_base(op, &mut cursor)
    };
    Fetched {
        instruction,
        next_pc: pc.wrapping_add(cursor.len),
        len: cursor.len,
    }
}

/// Decode from the start of a byte slice. Missing bytes read as zero.
pub fn decode_slice(bytes: &[u8], pc: u16) -> Fetched {
    decode_with(
        |addr| {
            bytes
                .get(addr.wrapping_sub(pc) as usize)
                .copied()
                .unwrap_or(0)
        },
        pc,
    )
}

struct Cursor<F> {
    read: F,
    pc: u16,
    len: u16,
}

impl<F: Fn(u16) -> u8> Cursor<F> {
    fn next_u8(&mut self) -> u8 {
        let byte = (self.read)(self.pc.wrapping_add(self.len));
        self.len += 1;
        byte
    }

    fn next_u16(&mut self) -> u16 {
        let lo = self.next_u8();
        let hi = self.next_u8();
        u16::from_le_bytes([lo, hi])
    }
}

fn decode_base<F: Fn(u16) -> u8>(op: u8, cur: &mut Cursor<F>) -> Instruction {
    use Mnemonic::*;
    use Operand as O;

    let x = op >> 6;
    let y = (op >> 3) & 0x07;
    let z = op & 0x07;
    let p = y >> 1;
    let q = y & 0x01;

    let a = O::R8(R8::A);
    let hl = O::R16(R16::HL);
    let sp = O::R16(R16::SP);

    match x {
        0 => match z {
            0 => match y {
                0 => Instruction::new(Nop),
                1 => Instruction::binary(Ld, O::Imm16Mem(cur.next_u16()), sp),
                2 => {
                    // STOP is followed by a padding byte.
                    cur.next_u8();
                    Instruction::new(Stop)
                }
                3 => Instruction::unary(Jr, O::E8(cur.next_u8() as i8)),
                _ => Instruction::binary(
                    Jr,
                    O::Cond(Cond::from_bits(y - 4)),
                    O::E8(cur.next_u8() as i8),
                ),
            },
            1 => {
                let rr = O::R16(R16::from_bits(p));
                if q == 0 {
                    Instruction::binary(Ld, rr, O::Imm16(cur.next_u16()))
                } else {
                    Instruction::binary(Add, hl, rr)
                }
            }
            2 => {
                let mem = O::R16Mem(R16Mem::from_bits(p));
                if q == 0 {
                    Instruction::binary(Ld, mem, a)
                } else {
                    Instruction::binary(Ld, a, mem)
                }
            }
            3 => Instruction::unary(if q == 0 { Inc } else { Dec }, O::R16(R16::from_bits(p))),
            4 => Instruction::unary(Inc, O::R8(R8::from_bits(y))),
            5 => Instruction::unary(Dec, O::R8(R8::from_bits(y))),
            6 => Instruction::binary(Ld, O::R8(R8::from_bits(y)), O::Imm8(cur.next_u8())),
            _ => Instruction::new(match y {
                0 => Rlca,
                1 => Rrca,
                2 => Rla,
                3 => Rra,
                4 => Daa,
                5 => Cpl,
                6 => Scf,
                _ => Ccf,
            }),
        },
        1 if op == 0x76 => Instruction::new(Halt),
        1 => Instruction::binary(Ld, O::R8(R8::from_bits(y)), O::R8(R8::from_bits(z))),
        2 => Instruction::binary(Mnemonic::alu(y), a, O::R8(R8::from_bits(z))),
        _ => match z {
            0 => match y {
                0..=3 => Instruction::unary(Ret, O::Cond(Cond::from_bits(y))),
                4 => Instruction::binary(Ldh, O::HighImm8(cur.next_u8()), a),
                5 => Instruction::binary(Add, sp, O::E8(cur.next_u8() as i8)),
                6 => Instruction::binary(Ldh, a, O::HighImm8(cur.next_u8())),
                _ => Instruction::binary(Ld, hl, O::SpE8(cur.next_u8() as i8)),
            },
            1 if q == 0 => Instruction::unary(Pop, O::R16Stk(R16Stk::from_bits(p))),
            1 => match p {
                0 => Instruction::new(Ret),
                1 => Instruction::new(Reti),
                2 => Instruction::unary(Jp, hl),
                _ => Instruction::binary(Ld, sp, hl),
            },
            2 => match y {
                0..=3 => Instruction::binary(
                    Jp,
                    O::Cond(Cond::from_bits(y)),
                    O::Imm16(cur.next_u16()),
                ),
                4 => Instruction::binary(Ldh, O::HighC, a),
                5 => Instruction::binary(Ld, O::Imm16Mem(cur.next_u16()), a),
                6 => Instruction::binary(Ldh, a, O::HighC),
                _ => Instruction::binary(Ld, a, O::Imm16Mem(cur.next_u16())),
            },
            3 => match y {
                0 => Instruction::unary(Jp, O::Imm16(cur.next_u16())),
                6 => Instruction::new(Di),
                7 => Instruction::new(Ei),
                // y == 1 is the CB prefix, handled before we get here
                _ => invalid(op),
            },
            4 => match y {
                0..=3 => Instruction::binary(
                    Call,
                    O::Cond(Cond::from_bits(y)),
                    O::Imm16(cur.next_u16()),
                ),
                _ => invalid(op),
            },
            5 if q == 0 => Instruction::unary(Push, O::R16Stk(R16Stk::from_bits(p))),
            5 if p == 0 => Instruction::unary(Call, O::Imm16(cur.next_u16())),
            5 => invalid(op),
            6 => Instruction::binary(Mnemonic::alu(y), a, O::Imm8(cur.next_u8())),
            _ => Instruction::unary(Rst, O::Vector(y * 8)),
        },
    }
}

fn decode_cb(op: u8) -> Instruction {
    let x = op >> 6;
    let y = (op >> 3) & 0x07;
    let reg = Operand::R8(R8::from_bits(op));

    match x {
        0 => Instruction::unary(Mnemonic::rot(y), reg),
        1 => Instruction::binary(Mnemonic::Bit, Operand::Bit(y), reg),
        2 => Instruction::binary(Mnemonic::Res, Operand::Bit(y), reg),
        _ => Instruction::binary(Mnemonic::Set, Operand::Bit(y), reg),
    }
}

fn invalid(op: u8) -> Instruction {
    Instruction::unary(Mnemonic::Invalid, Operand::UnknownByte(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_little_endian_immediates() {
        let fetched = decode_slice(&[0x01, 0x34, 0x12], 0x4000);
        assert_eq!(
            fetched.instruction,
            Instruction::binary(Mnemonic::Ld, Operand::R16(R16::BC), Operand::Imm16(0x1234))
        );
        assert_eq!(fetched.len, 3);
        assert_eq!(fetched.next_pc, 0x4003);
    }

    #[test]
    fn next_pc_wraps_at_top_of_memory() {
        let fetched = decode_with(|_| 0xC3, 0xFFFE);
        assert_eq!(fetched.len, 3);
        assert_eq!(fetched.next_pc, 0x0001);
    }
}
