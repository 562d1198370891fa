use crate::core::cdrom::disc::CdImage;
use crate::core::cdrom::CdromDrive;
use crate::core::config::VideoStandard;
use crate::core::dma::{DmaArbiter, DmaBus};
use crate::core::gpu::{Gpu, GpuSink, NTSC_TIMINGS, PAL_TIMINGS};
use crate::core::sio::ControllerIo;
use crate::core::spu::{SpuPorts, SpuSink};
use crate::core::swap_endianness;
use crate::core::timer::TimerModule;
use std::io;
use tracing::{debug, info};

pub const BIOS_LEN: usize = 512 * 1024;
const RAM_LEN: usize = 2 * 1024 * 1024;
const SCRATCHPAD_LEN: usize = 1024;

// access stall costs seen by the CPU
const RAM_STALL_CYCLES: usize = 6;
const BIOS_STALL_CYCLES: usize = 1;
const CACHE_CONTROL_STALL_CYCLES: usize = 1;
const DEFAULT_STALL_CYCLES: usize = 4;

/*
  KUSEG     physical
  ----------------------------------------------------------------
  00000000h  2048K  Main RAM (mirrored through the first 8MB)
  1F000000h  8192K  Expansion Region 1 (not populated)
  1F800000h  1K     Scratchpad (needs cache-control bits 3+7)
  1F801000h  4K     I/O Ports
  1F802000h         Expansion Region 2 (BIOS POST at 1F802041h)
  1FC00000h  512K   BIOS ROM
  FFFE0130h         Cache control
 */
const EXPANSION1_BASE: u32 = 0x1F00_0000;
const SCRATCHPAD_BASE: u32 = 0x1F80_0000;
const IO_BASE: u32 = 0x1F80_1000;
const EXPANSION2_BASE: u32 = 0x1F80_2000;
const BIOS_BASE: u32 = 0x1FC0_0000;
const CACHE_CONTROL: u32 = 0xFFFE_0130;
const POST_REGISTER: u32 = 0x1F80_2041;

// I/O register addresses
const I_STAT: u32 = 0x1F80_1070;
const I_MASK: u32 = 0x1F80_1074;
const JOY_DATA: u32 = 0x1F80_1040;
const JOY_STAT: u32 = 0x1F80_1044;
const JOY_MODE: u32 = 0x1F80_1048;
const JOY_BAUD: u32 = 0x1F80_104C;
const GP0_PORT: u32 = 0x1F80_1810;
const GP1_PORT: u32 = 0x1F80_1814;

/// Who owns the bus interface unit right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusHolder {
    Cpu,
    Gpu,
    Cdrom,
    Dma,
    Spu,
}

/*
I_STAT lives in network order, so the program-visible low bits sit in the
top byte of the stored word:
  bit 0 VBlank  -> 01000000h   bit 4 Timer0 -> 10000000h
  bit 1 GPU     -> 02000000h   bit 5 Timer1 -> 20000000h
  bit 2 CDROM   -> 04000000h   bit 6 Timer2 -> 40000000h
  bit 3 DMA     -> 08000000h
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayedIrq {
    VBlank = 0,
    Cdrom = 1,
    Dma = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
}

impl DelayedIrq {
    fn status_bit(&self) -> u32 {
        match self {
            DelayedIrq::VBlank => 0x0100_0000,
            DelayedIrq::Cdrom => 0x0400_0000,
            DelayedIrq::Dma => 0x0800_0000,
            DelayedIrq::Timer0 => 0x1000_0000,
            DelayedIrq::Timer1 => 0x2000_0000,
            DelayedIrq::Timer2 => 0x4000_0000,
        }
    }
}

#[derive(Default, Clone, Copy)]
struct IrqDelaySlot {
    target: Option<u64>,
    counter: u64,
}

pub struct Interlink {
    ram: Vec<u8>,
    bios: Vec<u8>,
    scratchpad: Vec<u8>,
    /// Delay/size registers at 1F801000h..1F801060h, stored as written.
    io_ports: [u32; 25],
    cache_control: u32,
    interrupt_status_reg: u32,
    interrupt_mask_reg: u32,
    irq_delays: [IrqDelaySlot; 6],
    pending_irq_cycles: u64,
    bus_holder: BusHolder,
    timers: TimerModule,
    gpu: Gpu,
    spu: SpuPorts,
    cdrom: CdromDrive,
    cio: ControllerIo,
    dma: DmaArbiter,
    post: u8,
}

impl Interlink {
    pub fn new(
        bios: Vec<u8>,
        gpu_sink: Box<dyn GpuSink>,
        spu_sink: Box<dyn SpuSink>,
        disc: Option<Box<dyn CdImage>>,
        video: VideoStandard,
    ) -> io::Result<Interlink> {
        if bios.len() != BIOS_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("BIOS image is {} bytes, expected {}", bios.len(), BIOS_LEN),
            ));
        }
        info!("BIOS MD5: {:X}", md5::compute(&bios));
        let timings = match video {
            VideoStandard::Ntsc => NTSC_TIMINGS,
            VideoStandard::Pal => PAL_TIMINGS,
        };
        Ok(Interlink {
            ram: vec![0; RAM_LEN],
            bios,
            scratchpad: vec![0; SCRATCHPAD_LEN],
            io_ports: [0; 25],
            cache_control: 0,
            interrupt_status_reg: 0,
            interrupt_mask_reg: 0,
            irq_delays: [IrqDelaySlot::default(); 6],
            pending_irq_cycles: 0,
            bus_holder: BusHolder::Cpu,
            timers: TimerModule::new(),
            gpu: Gpu::new(gpu_sink, timings),
            spu: SpuPorts::new(spu_sink),
            cdrom: CdromDrive::new(disc),
            cio: ControllerIo::new(),
            dma: DmaArbiter::new(),
            post: 0,
        })
    }

    pub fn bus_holder(&self) -> BusHolder {
        self.bus_holder
    }

    pub fn post(&self) -> u8 {
        self.post
    }

    pub fn irq_status_raw(&self) -> u32 {
        self.interrupt_status_reg
    }

    pub fn irq_mask_raw(&self) -> u32 {
        self.interrupt_mask_reg
    }

    /// Scratchpad decoding is gated on cache-control bits 3 and 7.
    pub fn is_scratchpad_enabled(&self) -> bool {
        swap_endianness(self.cache_control) & 0x88 == 0x88
    }

    pub fn is_instruction_cache_enabled(&self) -> bool {
        swap_endianness(self.cache_control) & 0x800 != 0
    }

    pub fn how_many_stall_cycles(&self, address: u32) -> usize {
        if address < EXPANSION1_BASE {
            RAM_STALL_CYCLES
        } else if (BIOS_BASE..BIOS_BASE + BIOS_LEN as u32).contains(&address) {
            BIOS_STALL_CYCLES
        } else if (CACHE_CONTROL..CACHE_CONTROL + 4).contains(&address) {
            CACHE_CONTROL_STALL_CYCLES
        } else {
            DEFAULT_STALL_CYCLES
        }
    }

    /// Side-effect-free byte view for instruction cache refills.
    pub fn read_raw_byte(&self, address: u32) -> u8 {
        if address < EXPANSION1_BASE {
            self.ram[(address & 0x1F_FFFF) as usize]
        } else if (BIOS_BASE..BIOS_BASE + BIOS_LEN as u32).contains(&address) {
            self.bios[(address - BIOS_BASE) as usize]
        } else {
            0
        }
    }

    // ===================== cycle & interrupt plumbing =====================

    /// Per-retired-instruction cycle feed: GPU pump, controller baud
    /// timer, timer module and the delayed-IRQ counters.
    pub fn append_sync_cycles(&mut self, cycles: usize) {
        self.pending_irq_cycles += cycles as u64;
        self.cio.add_cycles(cycles);
        self.timers.add_cpu_cycles(cycles);
        let vblanks = self.gpu.append_cpu_cycles(cycles);
        for _ in 0..vblanks {
            Self::schedule(&mut self.irq_delays, DelayedIrq::VBlank, 0);
        }
    }

    /// Timer catch-up; any timer interrupt lands in its delay slot.
    pub fn resync(&mut self) {
        let fired = self.timers.resync(&self.gpu);
        if fired & 1 != 0 {
            Self::schedule(&mut self.irq_delays, DelayedIrq::Timer0, 0);
        }
        if fired & 2 != 0 {
            Self::schedule(&mut self.irq_delays, DelayedIrq::Timer1, 0);
        }
        if fired & 4 != 0 {
            Self::schedule(&mut self.irq_delays, DelayedIrq::Timer2, 0);
        }
    }

    pub fn schedule_interrupt(&mut self, irq: DelayedIrq, delay: u64) {
        Self::schedule(&mut self.irq_delays, irq, delay);
    }

    fn schedule(slots: &mut [IrqDelaySlot; 6], irq: DelayedIrq, delay: u64) {
        slots[irq as usize] = IrqDelaySlot {
            target: Some(delay),
            counter: 0,
        };
    }

    /// Advances the six delay counters by the cycles accumulated since the
    /// previous dispatch and fires everything that matured.
    pub fn increment_interrupt_counters(&mut self) {
        let cycles = std::mem::take(&mut self.pending_irq_cycles);
        for index in 0..self.irq_delays.len() {
            let slot = &mut self.irq_delays[index];
            let Some(target) = slot.target else {
                continue;
            };
            slot.counter += cycles;
            if slot.counter >= target {
                slot.target = None;
                let irq = match index {
                    0 => DelayedIrq::VBlank,
                    1 => DelayedIrq::Cdrom,
                    2 => DelayedIrq::Dma,
                    3 => DelayedIrq::Timer0,
                    4 => DelayedIrq::Timer1,
                    _ => DelayedIrq::Timer2,
                };
                self.interrupt_status_reg |= irq.status_bit();
                if irq == DelayedIrq::Cdrom {
                    self.cdrom.on_delayed_irq();
                }
                debug!("delayed IRQ {:?} dispatched", irq);
            }
        }
    }

    /// Billing-boundary flush of the GPU port buffer; this is the one
    /// place the work queue may apply backpressure.
    pub fn flush_gpu_queue(&mut self) {
        self.gpu.flush_to_sink();
    }

    /// Runs the DMA arbiter against the devices and hands the bus back
    /// when the transfers (or their chopped windows) are done.
    pub fn run_dma(&mut self, cpu_cycles: usize) {
        if !self.dma.any_active() {
            self.bus_holder = BusHolder::Cpu;
            return;
        }
        let outcome = self.dma.run(
            cpu_cycles,
            &mut DmaBus {
                ram: &mut self.ram,
                gpu: &mut self.gpu,
                cdrom: &mut self.cdrom,
                spu: &mut self.spu,
            },
        );
        self.bus_holder = if outcome.holding_bus {
            BusHolder::Dma
        } else {
            BusHolder::Cpu
        };
        if outcome.irq {
            Self::schedule(&mut self.irq_delays, DelayedIrq::Dma, 0);
        }
    }

    // ===================== register-level access =====================

    // Everything below speaks network byte order, the R3051 swaps at its
    // end. RAM and BIOS words are assembled inline.

    pub fn read_word(&mut self, address: u32) -> u32 {
        if address < EXPANSION1_BASE {
            let offset = (address & 0x1F_FFFC) as usize;
            return (self.ram[offset] as u32) << 24
                | (self.ram[offset + 1] as u32) << 16
                | (self.ram[offset + 2] as u32) << 8
                | self.ram[offset + 3] as u32;
        }
        if (BIOS_BASE..BIOS_BASE + BIOS_LEN as u32).contains(&address) {
            let offset = ((address - BIOS_BASE) & !3) as usize;
            return (self.bios[offset] as u32) << 24
                | (self.bios[offset + 1] as u32) << 16
                | (self.bios[offset + 2] as u32) << 8
                | self.bios[offset + 3] as u32;
        }
        if (SCRATCHPAD_BASE..SCRATCHPAD_BASE + SCRATCHPAD_LEN as u32).contains(&address) {
            let offset = ((address - SCRATCHPAD_BASE) & !3) as usize;
            return (self.scratchpad[offset] as u32) << 24
                | (self.scratchpad[offset + 1] as u32) << 16
                | (self.scratchpad[offset + 2] as u32) << 8
                | self.scratchpad[offset + 3] as u32;
        }
        if (IO_BASE..EXPANSION2_BASE).contains(&address) {
            return self.read_io_word(address & !3);
        }
        if address == CACHE_CONTROL {
            return self.cache_control;
        }
        debug!("read from unmapped address {:08X}", address);
        0
    }

    pub fn read_byte(&mut self, address: u32) -> u8 {
        if address < EXPANSION1_BASE {
            return self.ram[(address & 0x1F_FFFF) as usize];
        }
        if (BIOS_BASE..BIOS_BASE + BIOS_LEN as u32).contains(&address) {
            return self.bios[(address - BIOS_BASE) as usize];
        }
        if (SCRATCHPAD_BASE..SCRATCHPAD_BASE + SCRATCHPAD_LEN as u32).contains(&address) {
            return self.scratchpad[(address - SCRATCHPAD_BASE) as usize];
        }
        // byte-true device ports first, they have read side effects
        match address {
            0x1F80_1800 => return self.cdrom.read_port0(),
            0x1F80_1801 => return self.cdrom.read_port1(),
            0x1F80_1802 => return self.cdrom.read_port2(),
            0x1F80_1803 => return self.cdrom.read_port3(),
            JOY_DATA => return self.cio.read_data(),
            _ => {}
        }
        if (IO_BASE..EXPANSION2_BASE).contains(&address) {
            let word = self.read_io_word(address & !3);
            return (word >> (24 - 8 * (address & 3))) as u8;
        }
        if address == POST_REGISTER {
            return self.post;
        }
        if (CACHE_CONTROL..CACHE_CONTROL + 4).contains(&address) {
            return (self.cache_control >> (24 - 8 * (address & 3))) as u8;
        }
        debug!("read from unmapped address {:08X}", address);
        0
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        if address < EXPANSION1_BASE {
            let offset = (address & 0x1F_FFFC) as usize;
            self.ram[offset] = (value >> 24) as u8;
            self.ram[offset + 1] = (value >> 16) as u8;
            self.ram[offset + 2] = (value >> 8) as u8;
            self.ram[offset + 3] = value as u8;
            return;
        }
        if (SCRATCHPAD_BASE..SCRATCHPAD_BASE + SCRATCHPAD_LEN as u32).contains(&address) {
            let offset = ((address - SCRATCHPAD_BASE) & !3) as usize;
            self.scratchpad[offset] = (value >> 24) as u8;
            self.scratchpad[offset + 1] = (value >> 16) as u8;
            self.scratchpad[offset + 2] = (value >> 8) as u8;
            self.scratchpad[offset + 3] = value as u8;
            return;
        }
        if (IO_BASE..EXPANSION2_BASE).contains(&address) {
            self.write_io_word(address & !3, value);
            return;
        }
        if address == CACHE_CONTROL {
            debug!("cache control = {:08X}", value);
            self.cache_control = value;
            return;
        }
        if (BIOS_BASE..BIOS_BASE + BIOS_LEN as u32).contains(&address) {
            debug!("dropping write to BIOS ROM at {:08X}", address);
            return;
        }
        debug!("dropping write to unmapped address {:08X}", address);
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        if address < EXPANSION1_BASE {
            self.ram[(address & 0x1F_FFFF) as usize] = value;
            return;
        }
        if (SCRATCHPAD_BASE..SCRATCHPAD_BASE + SCRATCHPAD_LEN as u32).contains(&address) {
            self.scratchpad[(address - SCRATCHPAD_BASE) as usize] = value;
            return;
        }
        match address {
            0x1F80_1800 => return self.cdrom.write_port0(value),
            0x1F80_1801 => {
                let scheduled = self.cdrom.write_port1(value);
                return self.schedule_cdrom(scheduled);
            }
            0x1F80_1802 => {
                let scheduled = self.cdrom.write_port2(value);
                return self.schedule_cdrom(scheduled);
            }
            0x1F80_1803 => {
                let scheduled = self.cdrom.write_port3(value);
                return self.schedule_cdrom(scheduled);
            }
            JOY_DATA => return self.cio.write_data(value),
            0x1F80_1048 | 0x1F80_1049 => return self.cio.write_mode_byte(address & 1, value),
            0x1F80_104A | 0x1F80_104B => return self.cio.write_ctrl_byte(address & 1, value),
            0x1F80_104E | 0x1F80_104F => return self.cio.write_baud_byte(address & 1, value),
            POST_REGISTER => {
                info!("BIOS POST = {:02X}", value);
                self.post = value;
                return;
            }
            _ => {}
        }
        if (IO_BASE..EXPANSION2_BASE).contains(&address) {
            // merge the byte lane into the network-order word register
            let aligned = address & !3;
            let shift = 24 - 8 * (address & 3);
            let current = self.read_io_word(aligned);
            let merged = (current & !(0xFF << shift)) | ((value as u32) << shift);
            self.write_io_word(aligned, merged);
            return;
        }
        if (EXPANSION2_BASE..EXPANSION2_BASE + 0x100).contains(&address) {
            debug!("Expansion 2 write {:08X} = {:02X}", address, value);
            return;
        }
        if (CACHE_CONTROL..CACHE_CONTROL + 4).contains(&address) {
            let shift = 24 - 8 * (address & 3);
            self.cache_control =
                (self.cache_control & !(0xFF << shift)) | ((value as u32) << shift);
            return;
        }
        debug!("dropping write to unmapped address {:08X}", address);
    }

    fn schedule_cdrom(&mut self, delay: Option<u64>) {
        if let Some(delay) = delay {
            Self::schedule(&mut self.irq_delays, DelayedIrq::Cdrom, delay);
        }
    }

    /// Word-granular I/O decode; device registers hold natural values, so
    /// the boundary swaps both ways.
    fn read_io_word(&mut self, address: u32) -> u32 {
        match address {
            // the JOY block punches a hole in the delay/size register range
            0x1F80_1000..=0x1F80_103F | 0x1F80_1050..=0x1F80_1060 => {
                self.io_ports[((address - IO_BASE) >> 2) as usize]
            }
            I_STAT => self.interrupt_status_reg,
            I_MASK => self.interrupt_mask_reg,
            JOY_DATA => swap_endianness(self.cio.read_data() as u32),
            JOY_STAT => swap_endianness(self.cio.read_stat()),
            JOY_MODE => {
                let low = self.cio.read_mode() as u32;
                let high = self.cio.read_ctrl() as u32;
                swap_endianness(low | (high << 16))
            }
            JOY_BAUD => {
                let high = self.cio.read_baud() as u32;
                swap_endianness(high << 16)
            }
            0x1F80_1080..=0x1F80_10EF => {
                let channel = (((address >> 4) & 0xF) - 8) as usize;
                let value = match (address >> 2) & 3 {
                    0 => self.dma.read_madr(channel),
                    1 => self.dma.read_bcr(channel),
                    2 => self.dma.read_chcr(channel),
                    _ => 0,
                };
                swap_endianness(value)
            }
            0x1F80_10F0 => swap_endianness(self.dma.read_dpcr()),
            0x1F80_10F4 => swap_endianness(self.dma.read_dicr()),
            0x1F80_1100..=0x1F80_112F => {
                self.resync();
                self.timers.read_register(address)
            }
            GP0_PORT => swap_endianness(self.gpu.read_response()),
            GP1_PORT => swap_endianness(self.gpu.read_status()),
            0x1F80_1800..=0x1F80_1803 => {
                // rarely word-read; compose the byte lanes in port order
                let b0 = self.read_byte(address) as u32;
                let b1 = self.read_byte(address + 1) as u32;
                let b2 = self.read_byte(address + 2) as u32;
                let b3 = self.read_byte(address + 3) as u32;
                (b0 << 24) | (b1 << 16) | (b2 << 8) | b3
            }
            0x1F80_1C00..=0x1F80_1FFF => {
                let offset = address - 0x1F80_1C00;
                let low = self.spu.read_half(offset) as u32;
                let high = self.spu.read_half(offset + 2) as u32;
                swap_endianness(low | (high << 16))
            }
            _ => {
                debug!("read from unhandled I/O register {:08X}", address);
                0
            }
        }
    }

    fn write_io_word(&mut self, address: u32, value: u32) {
        match address {
            0x1F80_1000..=0x1F80_103F | 0x1F80_1050..=0x1F80_1060 => {
                // delay/size registers are stored as written, the core
                // never interprets them
                self.io_ports[((address - IO_BASE) >> 2) as usize] = value;
            }
            I_STAT => {
                // producer-set, consumer-clear acknowledgement
                self.interrupt_status_reg &= value;
            }
            I_MASK => {
                self.interrupt_mask_reg = value;
            }
            JOY_DATA => self.cio.write_data(swap_endianness(value) as u8),
            JOY_STAT => {}
            JOY_MODE => {
                let natural = swap_endianness(value);
                self.cio.write_mode(natural as u16);
                self.cio.write_ctrl((natural >> 16) as u16);
            }
            JOY_BAUD => {
                let natural = swap_endianness(value);
                self.cio.write_baud((natural >> 16) as u16);
            }
            0x1F80_1080..=0x1F80_10EF => {
                let channel = (((address >> 4) & 0xF) - 8) as usize;
                let natural = swap_endianness(value);
                match (address >> 2) & 3 {
                    0 => self.dma.write_madr(channel, natural),
                    1 => self.dma.write_bcr(channel, natural),
                    2 => self.dma.write_chcr(channel, natural),
                    _ => {}
                }
            }
            0x1F80_10F0 => self.dma.write_dpcr(swap_endianness(value)),
            0x1F80_10F4 => self.dma.write_dicr(swap_endianness(value)),
            0x1F80_1100..=0x1F80_112F => {
                self.resync();
                self.timers.write_register(address, value);
            }
            GP0_PORT => self.gpu.gp0_write(swap_endianness(value)),
            GP1_PORT => self.gpu.gp1_write(swap_endianness(value)),
            0x1F80_1800..=0x1F80_1803 => {
                let natural = swap_endianness(value);
                self.write_byte(address, natural as u8);
            }
            0x1F80_1C00..=0x1F80_1FFF => {
                let offset = address - 0x1F80_1C00;
                let natural = swap_endianness(value);
                self.spu.write_half(offset, natural as u16);
                self.spu.write_half(offset + 2, (natural >> 16) as u16);
            }
            _ => {
                debug!("write to unhandled I/O register {:08X} = {:08X}", address, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu::NullGpuSink;
    use crate::core::spu::NullSpuSink;

    fn interlink() -> Interlink {
        Interlink::new(
            vec![0; BIOS_LEN],
            Box::new(NullGpuSink),
            Box::new(NullSpuSink),
            None,
            VideoStandard::Ntsc,
        )
        .unwrap()
    }

    #[test]
    fn undersized_bios_is_rejected() {
        let result = Interlink::new(
            vec![0; 1234],
            Box::new(NullGpuSink),
            Box::new(NullSpuSink),
            None,
            VideoStandard::Ntsc,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ram_words_round_trip_and_mirror() {
        let mut ilink = interlink();
        ilink.write_word(0x1234, 0xA1B2_C3D4);
        assert_eq!(ilink.read_word(0x1234), 0xA1B2_C3D4);
        assert_eq!(ilink.read_byte(0x1234), 0xA1, "network order in the array");
        // the 2MB RAM mirrors through the first 8MB
        assert_eq!(ilink.read_word(0x1234 + 0x20_0000), 0xA1B2_C3D4);
    }

    #[test]
    fn stall_cycles_by_region() {
        let ilink = interlink();
        assert_eq!(ilink.how_many_stall_cycles(0x0000_1000), 6);
        assert_eq!(ilink.how_many_stall_cycles(0x1FC0_0000), 1);
        assert_eq!(ilink.how_many_stall_cycles(0xFFFE_0130), 1);
        assert_eq!(ilink.how_many_stall_cycles(0x1F80_1070), 4);
    }

    #[test]
    fn scratchpad_needs_cache_control_bits() {
        let mut ilink = interlink();
        assert!(!ilink.is_scratchpad_enabled());
        ilink.write_word(CACHE_CONTROL, swap_endianness(0x88));
        assert!(ilink.is_scratchpad_enabled());
        ilink.write_word(CACHE_CONTROL, swap_endianness(0x08));
        assert!(!ilink.is_scratchpad_enabled());
    }

    #[test]
    fn unmapped_reads_are_zero_and_writes_drop() {
        let mut ilink = interlink();
        assert_eq!(ilink.read_word(0x1F00_0100), 0, "expansion 1 is ignored");
        ilink.write_word(0x1F00_0100, 0xFFFF_FFFF);
        assert_eq!(ilink.read_word(0x1F00_0100), 0);
        ilink.write_word(BIOS_BASE, 0xFFFF_FFFF);
        assert_eq!(ilink.read_word(BIOS_BASE), 0, "ROM stays read only");
    }

    #[test]
    fn delayed_irq_fires_after_its_delay() {
        let mut ilink = interlink();
        ilink.schedule_interrupt(DelayedIrq::Cdrom, 100);
        ilink.append_sync_cycles(60);
        ilink.increment_interrupt_counters();
        assert_eq!(ilink.irq_status_raw() & 0x0400_0000, 0, "not matured yet");
        ilink.append_sync_cycles(60);
        ilink.increment_interrupt_counters();
        assert_ne!(ilink.irq_status_raw() & 0x0400_0000, 0);
    }

    #[test]
    fn irq_acknowledge_is_consumer_clear() {
        let mut ilink = interlink();
        ilink.schedule_interrupt(DelayedIrq::VBlank, 0);
        ilink.increment_interrupt_counters();
        assert_ne!(ilink.irq_status_raw() & 0x0100_0000, 0);
        // the program writes the little-endian complement through the bus
        ilink.write_word(I_STAT, !0x0100_0000);
        assert_eq!(ilink.irq_status_raw() & 0x0100_0000, 0);
    }

    #[test]
    fn timer2_irq_reaches_interrupt_status() {
        let mut ilink = interlink();
        // timer 2, clock source CPU/8, reset+IRQ on target, target 100
        ilink.write_word(0x1F80_1128, swap_endianness(100));
        ilink.write_word(0x1F80_1124, swap_endianness(0x0218));
        ilink.append_sync_cycles(808);
        ilink.resync();
        ilink.increment_interrupt_counters();
        assert_ne!(ilink.irq_status_raw() & 0x4000_0000, 0);
        let mode = swap_endianness(ilink.read_word(0x1F80_1124));
        assert_ne!(mode & (1 << 11), 0, "target latch visible");
    }

    #[test]
    fn post_register_latches_boot_progress() {
        let mut ilink = interlink();
        ilink.write_byte(POST_REGISTER, 0x01);
        assert_eq!(ilink.post(), 0x01);
    }

    #[test]
    fn joy_mode_word_round_trips(){
        let mut ilink = interlink();
        ilink.write_word(JOY_MODE, swap_endianness(0x0000_000E));
        let read = swap_endianness(ilink.read_word(JOY_MODE));
        assert_eq!(read & 0xFFFF, 0x000E);
    }

    #[test]
    fn vblank_arrives_through_the_gpu_pump() {
        let mut ilink = interlink();
        // a frame and a bit of CPU cycles
        ilink.append_sync_cycles(600_000);
        ilink.increment_interrupt_counters();
        assert_ne!(ilink.irq_status_raw() & 0x0100_0000, 0);
    }
}
