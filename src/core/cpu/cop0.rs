use tracing::{debug, warn};

/*
COP0 Register Summary
  cop0r8      - BadVaddr - Bad Virtual Address (R)
  cop0r12     - SR - System status register (R/W)
  cop0r13     - CAUSE - Describes the most recently recognised exception
  cop0r14     - EPC - Return Address from Trap (R)
  cop0r15     - PRID - Processor ID (R)

cop0r12 - SR - System status register (R/W)
  0     IEc Current Interrupt Enable  (0=Disable, 1=Enable)
  1     KUc Current Kernel/User Mode  (0=Kernel, 1=User)
  2     IEp Previous Interrupt Enable
  3     KUp Previous Kernel/User Mode
  4     IEo Old Interrupt Enable
  5     KUo Old Kernel/User Mode
  8-15  Im  8 bit interrupt mask fields
  16    Isc Isolate Cache (0=No, 1=Isolate)
             When isolated, all load and store operations are targetted
             to the instruction cache, and never the main memory.
  22    BEV Boot exception vectors in RAM/ROM (0=RAM/KSEG0, 1=ROM/KSEG1)
  28-31 CU0..CU3 coprocessor enables (CU0 also usable in kernel mode)

cop0r13 - CAUSE
  2-6   Excode  What kind of exception occurred
  8-15  Ip      Interrupt pending field (bit 10 is the hardware line)
  28-29 CE      Coprocessor number in case of CpU exceptions
  31    BD      Branch Delay (exception in a branch delay slot; EPC holds
                the branch instruction instead of the delay slot)
 */
pub enum Cop0Reg {
    BadVAddr = 8,
    SR = 12,
    Cause = 13,
    EPC = 14,
}

const PRID_VALUE: u32 = 2;

/// Reset exception vector: the first fetch after power-on.
pub const RESET_EXCEPTION_VECTOR: u32 = 0xBFC0_0000;
/// General exception vector, everything except reset lands here.
pub const GENERAL_EXCEPTION_VECTOR: u32 = 0x8000_0080;

pub struct Cop0 {
    regs: [u32; 32],
}

impl Cop0 {
    pub fn new() -> Self {
        let mut cop0 = Cop0 { regs: [0; 32] };
        cop0.reset();
        cop0
    }

    pub fn reset(&mut self) {
        self.regs = [0; 32];
        self.regs[15] = PRID_VALUE;
    }

    pub fn read_reg(&self, index: usize) -> u32 {
        self.regs[index]
    }

    pub fn write_reg(&mut self, index: usize, value: u32) {
        match index {
            6 | 8 | 14 | 15 => {
                warn!("Cop0 ignoring write to read-only register #{index} = {value:08X}")
            }
            13 => {
                // read-only except the two software interrupt latches
                self.regs[index] = (self.regs[index] & 0xFFFF_FCFF) | (value & 0x300);
            }
            _ => {
                debug!("Cop0 writing #{index} = {:08X}", value);
                self.regs[index] = value;
            }
        }
    }

    pub fn status(&self) -> u32 {
        self.regs[Cop0Reg::SR as usize]
    }

    pub fn set_status(&mut self, value: u32) {
        self.regs[Cop0Reg::SR as usize] = value;
    }

    pub fn cause(&self) -> u32 {
        self.regs[Cop0Reg::Cause as usize]
    }

    pub fn set_cause(&mut self, value: u32) {
        self.regs[Cop0Reg::Cause as usize] = value;
    }

    pub fn set_epc(&mut self, value: u32) {
        self.regs[Cop0Reg::EPC as usize] = value;
    }

    pub fn set_bad_vaddr(&mut self, value: u32) {
        self.regs[Cop0Reg::BadVAddr as usize] = value;
    }

    pub fn is_in_kernel_mode(&self) -> bool {
        (self.status() & 2) == 0 // KUc = 0
    }

    pub fn is_cache_isolated(&self) -> bool {
        (self.status() & (1 << 16)) != 0
    }

    /// Kernel segments are off limits once KUc says user mode.
    pub fn is_address_allowed(&self, address: u32) -> bool {
        self.is_in_kernel_mode() || address < 0x8000_0000
    }

    /// KSEG0 strips the top bit, KSEG1 the top three; KUSEG and KSEG2 map
    /// straight through.
    pub fn virtual_to_physical(&self, address: u32) -> u32 {
        match address >> 29 {
            0b100 => address & 0x7FFF_FFFF,
            0b101 => address & 0x1FFF_FFFF,
            _ => address,
        }
    }

    /// Only KUSEG and KSEG0 go through the instruction cache.
    pub fn is_cacheable(&self, address: u32) -> bool {
        matches!(address >> 29, 0b000..=0b011 | 0b100)
    }

    /// Exception entry: push 00 (kernel, interrupts off) onto the
    /// IEc/KUc/IEp/KUp/IEo/KUo stack in SR bits 0-5.
    pub fn push_status_stack(&mut self) {
        let sr = self.status();
        self.set_status((sr & !0x3F) | ((sr << 2) & 0x3F));
    }

    /// RFE pops the stack: bits 2,3 move down to 0,1 and bits 4,5 stay as
    /// the new previous pair.
    pub fn rfe(&mut self) {
        let sr = self.status();
        let stack = sr & 0x3F;
        self.set_status((sr & !0xF) | ((stack >> 2) & 0xF));
    }

    pub fn is_cop_usable(&self, cop: usize) -> bool {
        let sr = self.status();
        if cop == 0 {
            // COP0 is always usable from kernel mode
            (sr & 2) == 0 || (sr & (1 << 28)) != 0
        } else {
            sr & (1 << (28 + cop)) != 0
        }
    }

    /*
      The console drives a single hardware interrupt line, cop0r13.bit10.
      It is not a latch: it mirrors "(I_STAT AND I_MASK) != 0" and clears as
      soon as the masked status goes back to zero.
     */
    pub fn set_hw_interrupt(&mut self) {
        self.regs[Cop0Reg::Cause as usize] |= 1 << 10;
    }

    pub fn clear_hw_interrupt(&mut self) {
        self.regs[Cop0Reg::Cause as usize] &= !(1 << 10);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_stack_push_then_rfe_restores() {
        let mut cop0 = Cop0::new();
        cop0.set_status(0b10_1101);
        let before = cop0.status() & 0x0F;
        cop0.push_status_stack();
        assert_eq!(cop0.status() & 0x3F, (0b10_1101 << 2) & 0x3F);
        cop0.rfe();
        assert_eq!(cop0.status() & 0x0F, before);
    }

    #[test]
    fn push_keeps_upper_status_bits() {
        let mut cop0 = Cop0::new();
        cop0.set_status(0x1040_0001);
        cop0.push_status_stack();
        assert_eq!(cop0.status() & !0x3F, 0x1040_0000);
        assert_eq!(cop0.status() & 0x3F, 0b0100);
    }

    #[test]
    fn kseg_translation() {
        let cop0 = Cop0::new();
        assert_eq!(cop0.virtual_to_physical(0x8001_2345), 0x0001_2345);
        assert_eq!(cop0.virtual_to_physical(0xBFC0_0000), 0x1FC0_0000);
        assert_eq!(cop0.virtual_to_physical(0x0000_1000), 0x0000_1000);
        assert_eq!(cop0.virtual_to_physical(0xFFFE_0130), 0xFFFE_0130);
    }

    #[test]
    fn user_mode_locks_out_kernel_segments() {
        let mut cop0 = Cop0::new();
        assert!(cop0.is_address_allowed(0xBFC0_0000));
        cop0.set_status(2); // KUc = user
        assert!(!cop0.is_address_allowed(0xBFC0_0000));
        assert!(cop0.is_address_allowed(0x0010_0000));
    }

    #[test]
    fn cacheable_segments() {
        let cop0 = Cop0::new();
        assert!(cop0.is_cacheable(0x0000_0000));
        assert!(cop0.is_cacheable(0x8000_0000));
        assert!(!cop0.is_cacheable(0xA000_0000));
        assert!(!cop0.is_cacheable(0xFFFE_0130));
    }

    #[test]
    fn cause_writes_only_touch_software_irq_bits() {
        let mut cop0 = Cop0::new();
        cop0.set_cause(0x8000_0410);
        cop0.write_reg(Cop0Reg::Cause as usize, 0xFFFF_FFFF);
        assert_eq!(cop0.cause(), 0x8000_0710);
    }
}
