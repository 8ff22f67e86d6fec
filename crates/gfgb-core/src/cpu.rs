use crate::{
    decode::fetch,
    error::CpuError,
    execute::{Control, execute, push16},
    mmu::Mmu,
    registers::RegisterFile,
};

#[cfg(feature = "cpu-trace")]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {
        println!($($arg)*);
    };
}
#[cfg(not(feature = "cpu-trace"))]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {};
}

// Interrupt vectors (gbdev.io/pandocs/Interrupts.html)
const INTERRUPT_VBLANK: u16 = 0x40;
const INTERRUPT_STAT: u16 = 0x48;
const INTERRUPT_TIMER: u16 = 0x50;
const INTERRUPT_SERIAL: u16 = 0x58;
const INTERRUPT_JOYPAD: u16 = 0x60;

const INTERRUPT_MASK: u8 = 0x1F;
const INTERRUPT_DISPATCH_CYCLES: u32 = 20;
const IDLE_CYCLES: u32 = 4;

/// SM83 core: the register file plus the latches the step driver owns.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    pub regs: RegisterFile,
    /// Set by EI; IME turns on once the following instruction completes.
    pub ei_pending: bool,
    pub halted: bool,
    /// Set by STOP. Nothing wakes the CPU since no joypad is modeled.
    pub stopped: bool,
    /// Total clocks executed since reset.
    pub cycles: u64,
}

impl Cpu {
    /// All registers zeroed, as at power-on before the boot ROM runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers as the DMG boot ROM leaves them.
    pub fn new_post_boot() -> Self {
        Self {
            regs: RegisterFile::post_boot(),
            ..Self::default()
        }
    }

    /// Fetch and execute one instruction. Returns elapsed clocks.
    ///
    /// On error PC is left on the offending instruction and no latch
    /// changes.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<u32, CpuError> {
        if self.stopped {
            self.cycles += u64::from(IDLE_CYCLES);
            return Ok(IDLE_CYCLES);
        }
        if self.halted {
            if Self::pending(mmu) == 0 {
                self.cycles += u64::from(IDLE_CYCLES);
                return Ok(IDLE_CYCLES);
            }
            self.halted = false;
        }

        let mut enable_after = self.ei_pending;
        let pc = self.regs.pc;
        let fetched = fetch(mmu, pc);
        cpu_trace!("[CPU] {pc:04X}: {} | {}", fetched.instruction, self.regs.debug_state());

        self.regs.pc = fetched.next_pc;
        let outcome = match execute(&mut self.regs, mmu, &fetched.instruction) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.regs.pc = pc;
                return Err(err);
            }
        };

        self.ei_pending = false;
        match outcome.control {
            Control::None => {}
            Control::EnableInterrupts => self.ei_pending = true,
            Control::DisableInterrupts => enable_after = false,
            Control::Halt => self.halted = true,
            Control::Stop => {
                log::debug!("STOP at {pc:04X}");
                self.stopped = true;
            }
        }
        if enable_after {
            self.regs.ime = true;
        }

        self.cycles += u64::from(outcome.cycles);
        Ok(outcome.cycles)
    }

    /// Dispatch the highest-priority pending interrupt if IME allows it.
    /// Any pending interrupt ends HALT, even with IME clear. Returns the
    /// clocks spent on dispatch.
    pub fn service_interrupts(&mut self, mmu: &mut Mmu) -> u32 {
        let pending = Self::pending(mmu);
        if pending == 0 {
            return 0;
        }
        self.halted = false;
        if !self.regs.ime {
            return 0;
        }

        let (bit, vector) = Self::next_interrupt(pending);
        log::trace!("interrupt {bit:02X} -> {vector:04X}");
        mmu.if_reg &= !bit;
        self.regs.ime = false;
        let ret = self.regs.pc;
        push16(&mut self.regs, mmu, ret);
        self.regs.pc = vector;
        self.cycles += u64::from(INTERRUPT_DISPATCH_CYCLES);
        INTERRUPT_DISPATCH_CYCLES
    }

    #[inline]
    fn pending(mmu: &Mmu) -> u8 {
        mmu.if_reg & mmu.ie_reg & INTERRUPT_MASK
    }

    fn next_interrupt(pending: u8) -> (u8, u16) {
        if pending & 0x01 != 0 {
            (0x01, INTERRUPT_VBLANK)
        } else if pending & 0x02 != 0 {
            (0x02, INTERRUPT_STAT)
        } else if pending & 0x04 != 0 {
            (0x04, INTERRUPT_TIMER)
        } else if pending & 0x08 != 0 {
            (0x08, INTERRUPT_SERIAL)
        } else {
            (0x10, INTERRUPT_JOYPAD)
        }
    }
}
