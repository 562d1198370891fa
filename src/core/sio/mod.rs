use std::collections::VecDeque;
use tracing::debug;

/*
1F801040h JOY_TX_DATA / JOY_RX_DATA
1F801044h JOY_STAT (R)
  0     TX FIFO Not Full       (1=Ready for new byte)
  1     RX FIFO Not Empty      (0=Empty, 1=Data available)
  2     TX Idle                (1=Idle/Finished)
  7     /ACK Input Level       (0=Off, 1=On)
  11-31 Baudrate Timer         (decrementing at 33MHz)
1F801048h JOY_MODE (R/W)
  0-1   Baudrate Reload Factor (1=MUL1, 2=MUL16, 3=MUL64)
  2-3   Character Length       (3=8 bits)
1F80104Ah JOY_CTRL (R/W)
  4     Acknowledge (W)
  6     Reset (W)
1F80104Eh JOY_BAUD (R/W)
  Reload value; the 21-bit timer reloads as Reload * Factor / 2.
 */
const RX_FIFO_LEN: usize = 4;

pub struct ControllerIo {
    baud: u16,
    mode: u16,
    ctrl: u16,
    rx_fifo: VecDeque<u8>,
    baud_counter: i64,
    pending_cycles: u64,
}

impl ControllerIo {
    pub fn new() -> Self {
        ControllerIo {
            baud: 0,
            mode: 0,
            ctrl: 0,
            rx_fifo: VecDeque::with_capacity(RX_FIFO_LEN),
            baud_counter: 0,
            pending_cycles: 0,
        }
    }

    /// Cycle feed from the interlink, one call per retired instruction.
    pub fn add_cycles(&mut self, cycles: usize) {
        self.pending_cycles += cycles as u64;
    }

    /// Burns the accumulated cycles into the baud countdown; called on
    /// every register access so reads observe a live timer.
    pub fn update_baudrate_timer(&mut self) {
        self.baud_counter -= std::mem::take(&mut self.pending_cycles) as i64;
        let reload = self.baud_reload();
        while self.baud_counter <= 0 {
            if reload == 0 {
                self.baud_counter = 0;
                break;
            }
            self.baud_counter += reload;
        }
    }

    fn baud_reload(&self) -> i64 {
        self.baud as i64 * (self.mode & 3) as i64 / 2
    }

    pub fn read_stat(&mut self) -> u32 {
        self.update_baudrate_timer();
        // low three bits read as ready regardless of FIFO state
        let mut stat = 0x7u32;
        if !self.rx_fifo.is_empty() {
            stat |= 0x02;
        }
        stat | ((self.baud_counter as u32 & 0x1F_FFFF) << 11)
    }

    pub fn read_data(&mut self) -> u8 {
        self.update_baudrate_timer();
        let byte = self.rx_fifo.pop_front().unwrap_or(0xFF);
        debug!("JOY_RX_DATA -> {:02X}", byte);
        byte
    }

    /// No pad protocol behind the port; the line floats high.
    pub fn write_data(&mut self, value: u8) {
        self.update_baudrate_timer();
        debug!("JOY_TX_DATA <- {:02X}", value);
        if self.rx_fifo.len() < RX_FIFO_LEN {
            self.rx_fifo.push_back(0xFF);
        }
    }

    pub fn read_mode(&mut self) -> u16 {
        self.update_baudrate_timer();
        self.mode
    }

    pub fn write_mode(&mut self, value: u16) {
        self.update_baudrate_timer();
        self.mode = value;
    }

    pub fn write_mode_byte(&mut self, lane: u32, value: u8) {
        let mode = self.mode;
        self.write_mode(patch_halfword_lane(mode, lane, value));
    }

    pub fn read_ctrl(&mut self) -> u16 {
        self.update_baudrate_timer();
        self.ctrl
    }

    pub fn write_ctrl(&mut self, value: u16) {
        self.update_baudrate_timer();
        // bits 4 and 6 are strobes and never read back
        self.ctrl = value & !0x50;
        if (value & 0x40) != 0 {
            self.rx_fifo.clear();
        }
    }

    pub fn write_ctrl_byte(&mut self, lane: u32, value: u8) {
        let ctrl = self.ctrl;
        self.write_ctrl(patch_halfword_lane(ctrl, lane, value));
    }

    pub fn read_baud(&mut self) -> u16 {
        self.update_baudrate_timer();
        self.baud
    }

    pub fn write_baud(&mut self, value: u16) {
        self.update_baudrate_timer();
        self.baud = value;
        self.baud_counter = self.baud_reload();
    }

    pub fn write_baud_byte(&mut self, lane: u32, value: u8) {
        let baud = self.baud;
        self.write_baud(patch_halfword_lane(baud, lane, value));
    }
}

#[inline]
fn patch_halfword_lane(current: u16, lane: u32, value: u8) -> u16 {
    if lane & 1 == 0 {
        (current & 0xFF00) | value as u16
    } else {
        (current & 0x00FF) | ((value as u16) << 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_byte_writes() {
        let mut cio = ControllerIo::new();
        cio.write_mode_byte(0, 0x4E);
        cio.write_mode_byte(1, 0x12);
        assert_eq!(cio.read_mode(), 0x124E);
        cio.write_mode_byte(0, 0x0D);
        assert_eq!(cio.read_mode(), 0x120D, "upper half preserved");
    }

    #[test]
    fn stat_low_bits_always_ready() {
        let mut cio = ControllerIo::new();
        assert_eq!(cio.read_stat() & 7, 7);
        cio.write_data(0x01);
        assert_eq!(cio.read_stat() & 7, 7);
    }

    #[test]
    fn baud_timer_reloads_from_mode_factor() {
        let mut cio = ControllerIo::new();
        cio.write_mode(0x000E); // MUL16... factor bits = 2
        cio.write_baud(0x0088);
        // counter starts at 0x88 * 2 / 2
        cio.add_cycles(0x10);
        cio.update_baudrate_timer();
        assert_eq!(cio.read_stat() >> 11, (0x88 - 0x10) as u32);
    }

    #[test]
    fn rx_fifo_caps_at_four_bytes() {
        let mut cio = ControllerIo::new();
        for _ in 0..6 {
            cio.write_data(0xAA);
        }
        let mut drained = 0;
        while cio.read_stat() & 0x02 != 0 {
            cio.read_data();
            drained += 1;
        }
        assert_eq!(drained, 4);
        assert_eq!(cio.read_data(), 0xFF, "empty FIFO floats high");
    }
}
