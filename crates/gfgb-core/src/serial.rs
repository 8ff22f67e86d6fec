const SERIAL_IRQ: u8 = 0x08;
const SC_START: u8 = 0x80;
const SC_INTERNAL_CLOCK: u8 = 0x01;
// Nothing is attached to the link port, so the line floats high.
const DISCONNECTED_BYTE: u8 = 0xFF;

/// SB/SC register pair.
///
/// Internal-clock transfers complete immediately: the outgoing byte is
/// appended to the capture buffer, SB receives 0xFF and the serial
/// interrupt is requested. Test ROMs use this to print their results.
#[derive(Debug, Clone)]
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0x7E,
            out_buf: Vec::new(),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, if_reg: &mut u8) {
        match addr {
            0xFF01 => self.sb = val,
            0xFF02 => {
                self.sc = val;
                if val & (SC_START | SC_INTERNAL_CLOCK) == SC_START | SC_INTERNAL_CLOCK {
                    self.complete_transfer(if_reg);
                }
            }
            _ => {}
        }
    }

    fn complete_transfer(&mut self, if_reg: &mut u8) {
        log::trace!("serial out {:02X}", self.sb);
        self.out_buf.push(self.sb);
        self.sb = DISCONNECTED_BYTE;
        self.sc &= !SC_START;
        *if_reg |= SERIAL_IRQ;
    }

    /// Drain everything sent over the link so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }

    pub fn peek_output(&self) -> &[u8] {
        &self.out_buf
    }
}
