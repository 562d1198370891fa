use crate::core::gpu::{Gpu, GPU_CLOCK_DENOMINATOR, GPU_CLOCK_NUMERATOR};
use crate::core::swap_endianness;
use std::mem;
use tracing::debug;

/*
Counter Mode (program-visible bit layout):
  0     Synchronization Enable (0=Free Run, 1=Synchronize via Bit1-2)
  1-2   Synchronization Mode
         Counter 0:  0=Pause during Hblank, 1=Reset at Hblank,
                     2=Reset at Hblank and pause outside, 3=Pause until
                     Hblank once then Free Run
         Counter 1:  same, with Vblank
         Counter 2:  0 or 3=Stop at current value, 1 or 2=Free Run
  3     Reset counter to 0000h  (0=After Counter=FFFFh, 1=After Counter=Target)
  4     IRQ when Counter=Target
  5     IRQ when Counter=FFFFh
  6     IRQ Once/Repeat Mode    (0=One-shot, 1=Repeatedly)
  7     IRQ Pulse/Toggle Mode   (0=Short Bit10=0 Pulse, 1=Toggle Bit10)
  8-9   Clock Source
         Counter 0:  0 or 2=System Clock, 1 or 3=Dotclock
         Counter 1:  0 or 2=System Clock, 1 or 3=Hblank
         Counter 2:  0 or 1=System Clock, 2 or 3=System Clock/8
  10    Interrupt Request       (0=Yes, 1=No)
  11    Reached Target Value    (Reset after Reading)
  12    Reached FFFFh Value     (Reset after Reading)

The three registers of each counter are stored in network byte order like
every other interconnect register; the helpers below swap on access.
 */

#[derive(Debug, PartialEq)]
enum ClockSource {
    SystemClock,
    DotClock,
    Hblank,
    SystemClockDiv8,
}

impl ClockSource {
    fn from_mode<const N: usize>(mode: u16) -> ClockSource {
        const { assert!(N < 3) }
        let source = (mode >> 8) & 3;
        match N {
            0 => match source {
                0 | 2 => ClockSource::SystemClock,
                _ => ClockSource::DotClock,
            },
            1 => match source {
                0 | 2 => ClockSource::SystemClock,
                _ => ClockSource::Hblank,
            },
            2 => match source {
                0 | 1 => ClockSource::SystemClock,
                _ => ClockSource::SystemClockDiv8,
            },
            _ => unreachable!(),
        }
    }
}

pub struct Timer<const N: usize> {
    // network byte order, like the rest of the register file
    mode: u32,
    counter: u32,
    target: u32,
    cpu_cycle_acc: u64,
    gpu_cycle_carry: u64,
    dot_remainder: u64,
    div8_remainder: u64,
    hblank_seen: u64,
    blank_was_active: bool,
    blank_occurred_once: bool,
    irq_fired_once: bool,
    pulse_restore: bool,
}

impl<const N: usize> Timer<N> {
    pub fn new() -> Self {
        const { assert!(N < 3) }
        Timer {
            mode: 0,
            counter: 0,
            target: 0,
            cpu_cycle_acc: 0,
            gpu_cycle_carry: 0,
            dot_remainder: 0,
            div8_remainder: 0,
            hblank_seen: 0,
            blank_was_active: false,
            blank_occurred_once: false,
            irq_fired_once: false,
            pulse_restore: false,
        }
    }

    #[inline]
    fn mode_value(&self) -> u16 {
        swap_endianness(self.mode) as u16
    }

    #[inline]
    fn set_mode_value(&mut self, value: u16) {
        self.mode = swap_endianness(value as u32);
    }

    #[inline]
    fn counter_value(&self) -> u16 {
        swap_endianness(self.counter) as u16
    }

    #[inline]
    fn set_counter_value(&mut self, value: u16) {
        self.counter = swap_endianness(value as u32);
    }

    #[inline]
    fn target_value(&self) -> u16 {
        swap_endianness(self.target) as u16
    }

    pub fn add_cpu_cycles(&mut self, cycles: usize) {
        self.cpu_cycle_acc += cycles as u64;
    }

    /// Idempotent catch-up: burns the CPU-cycle accumulator into counter
    /// ticks according to the clock source and sync mode. Returns true if
    /// a timer interrupt should be dispatched.
    pub fn resync(&mut self, gpu: &Gpu) -> bool {
        if self.pulse_restore {
            // the short IRQ pulse is visible for one resync window
            self.set_mode_value(self.mode_value() | (1 << 10));
            self.pulse_restore = false;
        }

        let cpu_cycles = mem::take(&mut self.cpu_cycle_acc);
        let mode = self.mode_value();

        let mut ticks = match ClockSource::from_mode::<N>(mode) {
            ClockSource::SystemClock => cpu_cycles,
            ClockSource::SystemClockDiv8 => {
                self.div8_remainder += cpu_cycles;
                let ticks = self.div8_remainder / 8;
                self.div8_remainder %= 8;
                ticks
            }
            ClockSource::DotClock => {
                let numerator = cpu_cycles * GPU_CLOCK_NUMERATOR + self.gpu_cycle_carry;
                self.gpu_cycle_carry = numerator % GPU_CLOCK_DENOMINATOR;
                self.dot_remainder += numerator / GPU_CLOCK_DENOMINATOR;
                let divider = gpu.dot_clock_divider() as u64;
                let ticks = self.dot_remainder / divider;
                self.dot_remainder %= divider;
                ticks
            }
            ClockSource::Hblank => {
                let total = gpu.total_hblanks();
                let ticks = total - self.hblank_seen;
                self.hblank_seen = total;
                ticks
            }
        };

        // blank gating: counter 0 follows hblank, counter 1 vblank. The
        // hblank window is a point event at this granularity, so counter 0
        // only ever sees edges, never an active blank.
        if (mode & 1) != 0 {
            let (blank_active, blank_started) = match N {
                0 => {
                    let total = gpu.total_hblanks();
                    let started = total != self.hblank_seen;
                    self.hblank_seen = total;
                    (false, started)
                }
                1 => {
                    let active = gpu.in_vblank();
                    let started = active && !self.blank_was_active;
                    self.blank_was_active = active;
                    (active, started)
                }
                _ => (false, false),
            };
            if blank_started {
                self.blank_occurred_once = true;
            }

            if N == 2 {
                // counter 2: 0/3 freeze at the current value, 1/2 free run
                if matches!((mode >> 1) & 3, 0 | 3) {
                    ticks = 0;
                }
            } else {
                match (mode >> 1) & 3 {
                    0 => {
                        if blank_active {
                            ticks = 0;
                        }
                    }
                    1 => {
                        if blank_started {
                            self.set_counter_value(0);
                        }
                    }
                    2 => {
                        if blank_started {
                            self.set_counter_value(0);
                        }
                        if !blank_active {
                            ticks = 0;
                        }
                    }
                    _ => {
                        if !self.blank_occurred_once {
                            ticks = 0;
                        }
                    }
                }
            }
        }

        self.advance(ticks)
    }

    fn advance(&mut self, mut ticks: u64) -> bool {
        let mut fired = false;
        while ticks > 0 {
            let mode = self.mode_value();
            let counter = self.counter_value() as u64;
            let reset_on_target = (mode & 0x8) != 0;
            let target = self.target_value() as u64;
            // when the counter sits above its target it wraps at FFFFh first
            let target_wrap = reset_on_target && counter <= target;
            let stop = if target_wrap { target } else { 0xFFFF };

            let until_wrap = stop - counter + 1;
            if ticks < until_wrap {
                self.set_counter_value((counter + ticks) as u16);
                break;
            }

            ticks -= until_wrap;
            self.set_counter_value(0);
            if target_wrap {
                debug!("timer {N} hit target {:04X}", target);
                self.set_mode_value(self.mode_value() | (1 << 11));
                if (mode & 0x10) != 0 {
                    fired |= self.trigger_timer_interrupt();
                }
            } else {
                self.set_mode_value(self.mode_value() | (1 << 12));
                if (mode & 0x20) != 0 {
                    fired |= self.trigger_timer_interrupt();
                }
            }
        }
        fired
    }

    /// One-shot/repeat gate, then bit 10 handling: toggle flips it, pulse
    /// drives it low until the next resync. The IRQ line is asserted when
    /// bit 10 reads zero.
    fn trigger_timer_interrupt(&mut self) -> bool {
        let mode = self.mode_value();
        let one_shot = (mode & 0x40) == 0;
        if one_shot && self.irq_fired_once {
            return false;
        }
        self.irq_fired_once = true;

        let toggle = (mode & 0x80) != 0;
        if toggle {
            self.set_mode_value(mode ^ (1 << 10));
        } else {
            self.set_mode_value(mode & !(1 << 10));
            self.pulse_restore = true;
        }
        (self.mode_value() & (1 << 10)) == 0
    }

    /// Raw register-level reads; the mode read clears the reached latches.
    pub fn read_counter(&self) -> u32 {
        self.counter
    }

    pub fn read_mode(&mut self) -> u32 {
        let raw = self.mode;
        self.set_mode_value(self.mode_value() & !(3 << 11));
        raw
    }

    pub fn read_target(&self) -> u32 {
        self.target
    }

    pub fn write_counter(&mut self, raw: u32) {
        self.counter = raw & swap_endianness(0xFFFF);
    }

    pub fn write_mode(&mut self, raw: u32) {
        self.mode = raw;
        let mode = self.mode_value();
        debug!("timer {N} mode = {:04X}", mode);
        // writing the mode resets the counter and rearms the IRQ
        self.set_counter_value(0);
        self.irq_fired_once = false;
        self.pulse_restore = false;
        self.blank_occurred_once = false;
        self.set_mode_value(mode | (1 << 10));
    }

    pub fn write_target(&mut self, raw: u32) {
        self.target = raw & swap_endianness(0xFFFF);
    }
}

pub struct TimerModule {
    pub timer0: Timer<0>,
    pub timer1: Timer<1>,
    pub timer2: Timer<2>,
}

impl TimerModule {
    pub fn new() -> Self {
        TimerModule {
            timer0: Timer::new(),
            timer1: Timer::new(),
            timer2: Timer::new(),
        }
    }

    pub fn add_cpu_cycles(&mut self, cycles: usize) {
        self.timer0.add_cpu_cycles(cycles);
        self.timer1.add_cpu_cycles(cycles);
        self.timer2.add_cpu_cycles(cycles);
    }

    /// Returns a bitmask of the timers whose interrupt should be
    /// dispatched into the interlink's delay slots.
    pub fn resync(&mut self, gpu: &Gpu) -> u8 {
        let mut fired = 0;
        if self.timer0.resync(gpu) {
            fired |= 1;
        }
        if self.timer1.resync(gpu) {
            fired |= 2;
        }
        if self.timer2.resync(gpu) {
            fired |= 4;
        }
        fired
    }

    /// Register file access at 1F801100h+N*10h; the caller resyncs first.
    pub fn read_register(&mut self, address: u32) -> u32 {
        let timer = (address >> 4) & 3;
        match (timer, (address >> 2) & 3) {
            (0, 0) => self.timer0.read_counter(),
            (0, 1) => self.timer0.read_mode(),
            (0, 2) => self.timer0.read_target(),
            (1, 0) => self.timer1.read_counter(),
            (1, 1) => self.timer1.read_mode(),
            (1, 2) => self.timer1.read_target(),
            (2, 0) => self.timer2.read_counter(),
            (2, 1) => self.timer2.read_mode(),
            (2, 2) => self.timer2.read_target(),
            _ => 0,
        }
    }

    pub fn write_register(&mut self, address: u32, raw: u32) {
        let timer = (address >> 4) & 3;
        match (timer, (address >> 2) & 3) {
            (0, 0) => self.timer0.write_counter(raw),
            (0, 1) => self.timer0.write_mode(raw),
            (0, 2) => self.timer0.write_target(raw),
            (1, 0) => self.timer1.write_counter(raw),
            (1, 1) => self.timer1.write_mode(raw),
            (1, 2) => self.timer1.write_target(raw),
            (2, 0) => self.timer2.write_counter(raw),
            (2, 1) => self.timer2.write_mode(raw),
            (2, 2) => self.timer2.write_target(raw),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpu::{NullGpuSink, NTSC_TIMINGS};

    fn gpu() -> Gpu {
        Gpu::new(Box::new(NullGpuSink), NTSC_TIMINGS)
    }

    #[test]
    fn timer2_at_cpu_div8_hits_target() {
        let gpu = gpu();
        let mut timer: Timer<2> = Timer::new();
        // source CPU/8, reset on target, IRQ on target
        timer.write_mode(swap_endianness(0x0218));
        timer.write_target(swap_endianness(100));
        timer.add_cpu_cycles(808);
        let fired = timer.resync(&gpu);
        assert!(fired, "target IRQ dispatched");
        assert_eq!(timer.counter_value(), 0, "wrapped after the target tick");
        let mode = swap_endianness(timer.read_mode()) as u16;
        assert_ne!(mode & (1 << 11), 0, "target latch set");
    }

    #[test]
    fn timer2_div8_partial_progress() {
        let gpu = gpu();
        let mut timer: Timer<2> = Timer::new();
        timer.write_mode(swap_endianness(0x0218));
        timer.write_target(swap_endianness(100));
        timer.add_cpu_cycles(800);
        let fired = timer.resync(&gpu);
        assert!(!fired);
        assert_eq!(timer.counter_value(), 100, "100 ticks, no wrap yet");
    }

    #[test]
    fn mode_read_clears_latches() {
        let gpu = gpu();
        let mut timer: Timer<2> = Timer::new();
        timer.write_mode(swap_endianness(0x0218));
        timer.write_target(swap_endianness(1));
        timer.add_cpu_cycles(16);
        timer.resync(&gpu);
        let first = swap_endianness(timer.read_mode()) as u16;
        assert_ne!(first & (1 << 11), 0);
        let second = swap_endianness(timer.read_mode()) as u16;
        assert_eq!(second & (3 << 11), 0);
    }

    #[test]
    fn toggle_mode_flips_bit10_once_per_crossing() {
        let gpu = gpu();
        let mut timer: Timer<0> = Timer::new();
        // CPU source, reset on target, IRQ on target, repeat, toggle
        timer.write_mode(swap_endianness(0x00D8));
        timer.write_target(swap_endianness(9));
        let before = (swap_endianness(timer.read_mode()) >> 10) & 1;
        timer.add_cpu_cycles(10);
        timer.resync(&gpu);
        let after_one = (swap_endianness(timer.read_mode()) >> 10) & 1;
        assert_ne!(before, after_one);
        timer.add_cpu_cycles(10);
        timer.resync(&gpu);
        let after_two = (swap_endianness(timer.read_mode()) >> 10) & 1;
        assert_eq!(before, after_two);
    }

    #[test]
    fn pulse_mode_restores_bit10_on_next_resync() {
        let gpu = gpu();
        let mut timer: Timer<0> = Timer::new();
        // CPU source, reset on target, IRQ on target, repeat, pulse
        timer.write_mode(swap_endianness(0x0058));
        timer.write_target(swap_endianness(4));
        timer.add_cpu_cycles(5);
        assert!(timer.resync(&gpu));
        assert_eq!(swap_endianness(timer.read_mode()) & (1 << 10), 0, "pulsed low");
        timer.resync(&gpu);
        assert_ne!(swap_endianness(timer.read_mode()) & (1 << 10), 0, "restored");
    }

    #[test]
    fn one_shot_fires_a_single_time() {
        let gpu = gpu();
        let mut timer: Timer<2> = Timer::new();
        // one-shot (bit 6 clear), pulse, IRQ on target, reset on target
        timer.write_mode(swap_endianness(0x0018));
        timer.write_target(swap_endianness(4));
        timer.add_cpu_cycles(5);
        assert!(timer.resync(&gpu));
        timer.resync(&gpu); // restore pulse
        timer.add_cpu_cycles(5);
        assert!(!timer.resync(&gpu), "second crossing stays silent");
    }

    #[test]
    fn stopped_timer2_holds_its_value() {
        let gpu = gpu();
        let mut timer: Timer<2> = Timer::new();
        timer.write_mode(swap_endianness(0x0001)); // sync enable, mode 0 = stop
        timer.add_cpu_cycles(500);
        timer.resync(&gpu);
        assert_eq!(timer.counter_value(), 0);
    }

    #[test]
    fn hblank_source_counts_scanlines() {
        let mut gpu = gpu();
        let mut timer: Timer<1> = Timer::new();
        timer.write_mode(swap_endianness(0x0100)); // source = hblank
        let cpu_per_line = NTSC_TIMINGS.gpu_cycles_per_scanline * GPU_CLOCK_DENOMINATOR
            / GPU_CLOCK_NUMERATOR
            + 1;
        for _ in 0..5 {
            gpu.append_cpu_cycles(cpu_per_line as usize);
        }
        timer.add_cpu_cycles(5 * cpu_per_line as usize);
        timer.resync(&gpu);
        assert_eq!(timer.counter_value(), 5);
    }
}
