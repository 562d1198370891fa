use crate::core::{Console, CPU_CLOCK};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// wall-clock pacing granularity, slices per emulated second
const THROTTLE_RES: u64 = 100;
const PACING_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// The emulator actor: owns the console and burns instruction blocks in a
/// hot loop, pacing itself against the wall clock. The only data shared
/// with the other actors are the quit flag and the work queue hidden
/// behind the GPU sink.
pub struct Emulator {
    console: Console,
    quit: Arc<AtomicBool>,
}

impl Emulator {
    pub fn new(console: Console, quit: Arc<AtomicBool>) -> Self {
        Emulator { console, quit }
    }

    pub fn run(&mut self) {
        info!("emulator actor running");
        let slice_cycles = (CPU_CLOCK as u64 / THROTTLE_RES) as i64;
        let slice_duration = Duration::from_micros(1_000_000 / THROTTLE_RES);

        let mut slice_budget = slice_cycles;
        let mut slice_start = Instant::now();
        let mut report_start = Instant::now();
        let mut report_cycles: u64 = 0;

        while !self.quit.load(Ordering::Acquire) {
            let cycles = self.console.run_block() as i64;
            slice_budget -= cycles;
            report_cycles += cycles as u64;

            if slice_budget <= 0 {
                slice_budget += slice_cycles;
                let elapsed = slice_start.elapsed();
                if elapsed < slice_duration {
                    thread::sleep(slice_duration - elapsed);
                }
                slice_start = Instant::now();
            }

            if report_start.elapsed() >= PACING_REPORT_INTERVAL {
                let emulated_seconds = report_cycles as f64 / CPU_CLOCK as f64;
                let wall_seconds = report_start.elapsed().as_secs_f64();
                debug!(
                    "pacing: {:.1}% of real time",
                    emulated_seconds / wall_seconds * 100.0
                );
                report_start = Instant::now();
                report_cycles = 0;
            }
        }
        info!("emulator actor draining out");
    }
}
