// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

const FLAG_MASK: u8 = 0xF0;

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html (DMG A/B/C)
const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// 8-bit operand register, in the order used by the 3-bit opcode fields.
///
/// `HlIndirect` is the `[HL]` slot of that encoding. It is not a register:
/// the executor resolves it to a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R8 {
    B,
    C,
    D,
    E,
    H,
    L,
    HlIndirect,
    A,
}

impl R8 {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => R8::B,
            1 => R8::C,
            2 => R8::D,
            3 => R8::E,
            4 => R8::H,
            5 => R8::L,
            6 => R8::HlIndirect,
            _ => R8::A,
        }
    }
}

/// 16-bit register pair as selected by the `p` field of ALU/load opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R16 {
    BC,
    DE,
    HL,
    SP,
}

impl R16 {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => R16::BC,
            1 => R16::DE,
            2 => R16::HL,
            _ => R16::SP,
        }
    }
}

/// Register pair used as a memory pointer. `HLI`/`HLD` bump HL after the
/// access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R16Mem {
    BC,
    DE,
    HLI,
    HLD,
}

impl R16Mem {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => R16Mem::BC,
            1 => R16Mem::DE,
            2 => R16Mem::HLI,
            _ => R16Mem::HLD,
        }
    }
}

/// Register pair as seen by PUSH/POP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R16Stk {
    BC,
    DE,
    HL,
    AF,
}

impl R16Stk {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => R16Stk::BC,
            1 => R16Stk::DE,
            2 => R16Stk::HL,
            _ => R16Stk::AF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cond {
    NZ,
    Z,
    NC,
    C,
}

impl Cond {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Cond::NZ,
            1 => Cond::Z,
            2 => Cond::NC,
            _ => Cond::C,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Z,
    N,
    H,
    C,
}

impl Flag {
    #[inline]
    pub const fn mask(self) -> u8 {
        match self {
            Flag::Z => FLAG_Z,
            Flag::N => FLAG_N,
            Flag::H => FLAG_H,
            Flag::C => FLAG_C,
        }
    }
}

/// SM83 register file.
///
/// F is stored with its low nibble forced to zero; every write path goes
/// through [`RegisterFile::set_f`] so the invariant cannot be broken from
/// outside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    pub a: u8,
    f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub ime: bool,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register state left behind by the DMG boot ROM.
    pub fn post_boot() -> Self {
        Self {
            a: BOOT_A,
            f: BOOT_F,
            b: BOOT_B,
            c: BOOT_C,
            d: BOOT_D,
            e: BOOT_E,
            h: BOOT_H,
            l: BOOT_L,
            sp: BOOT_SP,
            pc: BOOT_PC,
            ime: false,
        }
    }

    #[inline]
    pub fn f(&self) -> u8 {
        self.f
    }

    #[inline]
    pub fn set_f(&mut self, val: u8) {
        self.f = val & FLAG_MASK;
    }

    #[inline]
    pub fn flag(&self, flag: Flag) -> bool {
        self.f & flag.mask() != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.f |= flag.mask();
        } else {
            self.f &= !flag.mask();
        }
    }

    /// Replace all four flags at once.
    #[inline]
    pub fn set_flags(&mut self, z: bool, n: bool, h: bool, c: bool) {
        self.f = if z { FLAG_Z } else { 0 }
            | if n { FLAG_N } else { 0 }
            | if h { FLAG_H } else { 0 }
            | if c { FLAG_C } else { 0 };
    }

    pub fn condition(&self, cond: Cond) -> bool {
        match cond {
            Cond::NZ => !self.flag(Flag::Z),
            Cond::Z => self.flag(Flag::Z),
            Cond::NC => !self.flag(Flag::C),
            Cond::C => self.flag(Flag::C),
        }
    }

    /// Read a plain 8-bit register. Returns `None` for `[HL]`.
    pub fn get8(&self, reg: R8) -> Option<u8> {
        match reg {
            R8::B => Some(self.b),
            R8::C => Some(self.c),
            R8::D => Some(self.d),
            R8::E => Some(self.e),
            R8::H => Some(self.h),
            R8::L => Some(self.l),
            R8::A => Some(self.a),
            R8::HlIndirect => None,
        }
    }

    /// Write a plain 8-bit register. Returns `false` (and writes nothing)
    /// for `[HL]`.
    pub fn set8(&mut self, reg: R8, val: u8) -> bool {
        match reg {
            R8::B => self.b = val,
            R8::C => self.c = val,
            R8::D => self.d = val,
            R8::E => self.e = val,
            R8::H => self.h = val,
            R8::L => self.l = val,
            R8::A => self.a = val,
            R8::HlIndirect => return false,
        }
        true
    }

    #[inline]
    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[inline]
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[inline]
    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    #[inline]
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }

    #[inline]
    pub fn set_bc(&mut self, val: u16) {
        [self.b, self.c] = val.to_be_bytes();
    }

    #[inline]
    pub fn set_de(&mut self, val: u16) {
        [self.d, self.e] = val.to_be_bytes();
    }

    #[inline]
    pub fn set_hl(&mut self, val: u16) {
        [self.h, self.l] = val.to_be_bytes();
    }

    #[inline]
    pub fn set_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = a;
        self.set_f(f);
    }

    pub fn get16(&self, reg: R16) -> u16 {
        match reg {
            R16::BC => self.bc(),
            R16::DE => self.de(),
            R16::HL => self.hl(),
            R16::SP => self.sp,
        }
    }

    pub fn set16(&mut self, reg: R16, val: u16) {
        match reg {
            R16::BC => self.set_bc(val),
            R16::DE => self.set_de(val),
            R16::HL => self.set_hl(val),
            R16::SP => self.sp = val,
        }
    }

    pub fn get_stk(&self, reg: R16Stk) -> u16 {
        match reg {
            R16Stk::BC => self.bc(),
            R16Stk::DE => self.de(),
            R16Stk::HL => self.hl(),
            R16Stk::AF => self.af(),
        }
    }

    pub fn set_stk(&mut self, reg: R16Stk, val: u16) {
        match reg {
            R16Stk::BC => self.set_bc(val),
            R16Stk::DE => self.set_de(val),
            R16Stk::HL => self.set_hl(val),
            R16Stk::AF => self.set_af(val),
        }
    }

    /// Pointer for an `r16_mem` operand. HL+/HL- are applied here, as part
    /// of the memory access, so the caller sees the updated HL immediately.
    pub fn r16_mem_address(&mut self, reg: R16Mem) -> u16 {
        match reg {
            R16Mem::BC => self.bc(),
            R16Mem::DE => self.de(),
            R16Mem::HLI => {
                let hl = self.hl();
                self.set_hl(hl.wrapping_add(1));
                hl
            }
            R16Mem::HLD => {
                let hl = self.hl();
                self.set_hl(hl.wrapping_sub(1));
                hl
            }
        }
    }

    /// Formatted register state for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} IME:{}",
            self.af(),
            self.bc(),
            self.de(),
            self.hl(),
            self.pc,
            self.sp,
            self.ime as u8
        )
    }
}
