mod config;
mod error;
mod pacer;
mod screenshot;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use dmg_emu_core::{
    diagnostics::TraceSink,
    error::EmulationError,
    gameboy::{FRAME_CYCLES, GameBoy},
    joypad::Button,
};
use log::{error, info, warn};

use crate::error::CliError;
use crate::pacer::RealTimePacer;

#[derive(Parser, Debug)]
#[command(name = "dmgemu", version, about = "Headless original Game Boy emulator")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Number of frames to run
    #[arg(long)]
    frames: Option<u64>,

    /// Number of clock ticks to run
    #[arg(long)]
    cycles: Option<u64>,

    /// Number of wall-clock seconds to run
    #[arg(long)]
    seconds: Option<u64>,

    /// Throttle to the DMG frame rate
    #[arg(long)]
    realtime: bool,

    /// Print bytes the program sends over the serial port
    #[arg(long)]
    serial: bool,

    /// Write the last frame to a PNG file
    #[arg(long, value_name = "PNG")]
    screenshot: Option<PathBuf>,

    /// Write one register dump per instruction to a file
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "TOML")]
    config: Option<PathBuf>,

    /// Buttons held for the whole run, comma separated
    #[arg(long, value_delimiter = ',')]
    hold: Vec<String>,
}

/// Trace sink backed by a buffered file.
struct FileTrace {
    out: BufWriter<File>,
    failed: bool,
}

impl FileTrace {
    fn create(path: &Path) -> Result<Self, CliError> {
        let file = File::create(path).map_err(|source| CliError::Trace {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            out: BufWriter::new(file),
            failed: false,
        })
    }
}

impl TraceSink for FileTrace {
    fn record(&mut self, line: &str) {
        if self.failed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!("Trace output stopped: {e}");
            self.failed = true;
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Limits {
    frames: Option<u64>,
    cycles: Option<u64>,
    seconds: Option<Duration>,
}

fn parse_buttons(names: &[String]) -> Result<Vec<Button>, CliError> {
    names
        .iter()
        .map(|name| {
            Button::from_name(name.trim()).ok_or_else(|| CliError::UnknownButton(name.clone()))
        })
        .collect()
}

fn print_serial(bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    for &b in bytes {
        let _ = if b.is_ascii_graphic() || b == b' ' || b == b'\n' {
            write!(stdout, "{}", b as char)
        } else {
            write!(stdout, "\\x{b:02X}")
        };
    }
    let _ = stdout.flush();
}

/// Run until a limit is reached, calling `on_frame` after every frame's
/// worth of emulation. Returns the number of frames run.
fn run_session(
    gb: &mut GameBoy,
    limits: Limits,
    mut on_frame: impl FnMut(&mut GameBoy),
) -> Result<u64, EmulationError> {
    let start = Instant::now();
    let mut frames = 0u64;

    loop {
        match limits.cycles {
            Some(max) => {
                let remaining = max.saturating_sub(gb.cycles());
                if remaining == 0 {
                    break;
                }
                gb.run_cycles(remaining.min(FRAME_CYCLES))?;
            }
            None => gb.run_frame()?,
        }
        frames += 1;
        on_frame(gb);

        if limits.frames.is_some_and(|max| frames >= max) {
            break;
        }
        if limits.seconds.is_some_and(|limit| start.elapsed() >= limit) {
            break;
        }
    }
    Ok(frames)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => config::load_from_file(path)?,
        None => config::load_or_default(&config::default_config_path()),
    };
    let held = parse_buttons(&args.hold)?;

    let mut gb = GameBoy::new();
    gb.set_save_policy(config.save_policy.into());
    gb.load_rom(&args.rom)?;

    if args.realtime || config.realtime {
        gb.set_pacer(Box::new(RealTimePacer::new()));
    }
    if let Some(path) = &args.trace {
        gb.set_trace_sink(Some(Box::new(FileTrace::create(path)?)));
    }
    for button in held {
        gb.set_button(button, true);
    }

    let limits = Limits {
        frames: args.frames.or(config.frame_limit),
        cycles: args.cycles,
        seconds: args.seconds.map(Duration::from_secs),
    };
    if limits.frames.is_none() && limits.cycles.is_none() && limits.seconds.is_none() {
        info!("No run limit given; running until the program stops");
    }

    let started = Instant::now();
    let result = run_session(&mut gb, limits, |gb| {
        if args.serial {
            print_serial(&gb.take_serial());
        }
    });

    if config.save_on_exit {
        gb.save();
    }

    let frames = result?;
    info!(
        "Ran {frames} frames ({} ticks) in {:.2?}",
        gb.cycles(),
        started.elapsed()
    );

    if let Some(path) = &args.screenshot {
        screenshot::write_png(path, gb.framebuffer(), &config.palette)?;
        info!("Saved screenshot to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
