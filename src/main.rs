use clap::Parser;
use std::fs;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

use rpsx_core::core::cdrom::disc::{CdImage, CueBinImage};
use rpsx_core::core::config::Config;
use rpsx_core::core::emu::Emulator;
use rpsx_core::core::queue::WorkQueue;
use rpsx_core::core::spu::NullSpuSink;
use rpsx_core::core::Console;
use rpsx_core::log;

#[derive(Parser)]
#[command(name = "rpsx", about = "PlayStation console core emulator")]
struct Args {
    /// 512 KiB BIOS ROM image
    #[arg(long)]
    bios: String,

    /// CUE sheet of a CD image (the BIN it references is mapped read-only)
    #[arg(long)]
    cd: Option<String>,

    /// Initial log filter, reloadable at runtime
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _logger = log::Logger::new(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = Config::load_or_default("rpsx.yaml");
    info!("starting with BIOS {}", args.bios);

    let bios = fs::read(&args.bios).map_err(|e| format!("cannot read BIOS {}: {e}", args.bios))?;

    let disc: Option<Box<dyn CdImage>> = match &args.cd {
        Some(path) => {
            let image = CueBinImage::open(path).map_err(|e| format!("cannot load disc {path}: {e}"))?;
            Some(Box::new(image))
        }
        None => None,
    };

    let (producer, consumer) = WorkQueue::new().split();
    let shutdown = producer.clone();

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = quit.clone();
        ctrlc::set_handler(move || quit.store(true, Ordering::Release))
            .map_err(|e| format!("cannot install the quit handler: {e}"))?;
    }

    // the renderer actor: drains GPU commands until the close signal; the
    // GL back end plugs in here
    let renderer = thread::spawn(move || {
        let mut commands: u64 = 0;
        while consumer.wait_for_item().is_some() {
            commands += 1;
        }
        debug!("renderer actor consumed {commands} commands");
    });

    let mut console = Console::new(
        bios,
        Box::new(producer),
        Box::new(NullSpuSink),
        disc,
        config.video_standard,
    )
    .map_err(|e| e.to_string())?;
    console.cpu.set_bios_tty_capture_enabled(config.bios_tty_capture);

    let emulator_quit = quit.clone();
    let emulator = thread::spawn(move || {
        Emulator::new(console, emulator_quit).run();
    });

    emulator
        .join()
        .map_err(|_| "emulator actor panicked".to_string())?;
    shutdown.end_processing();
    renderer
        .join()
        .map_err(|_| "renderer actor panicked".to_string())?;
    Ok(())
}
