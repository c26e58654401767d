/**
 * Pan/Tilt Rig Controller Binary
 *
 * Console front end for the rig:
 * 1. Connects to the firmware over serial (or a dry-run link)
 * 2. Starts / stops face, gesture and manual tracking sessions
 * 3. Jogs the rig and runs the reset handshake
 *
 * Usage: rig_controller [--port PORT] [--baud BAUD] [--config FILE] [--replay SCRIPT]
 */

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pantilt::config::{Config, EXAMPLE_CONFIG};
use pantilt::rig::channel::MotorChannel;
use pantilt::{
    Direction, MemoryLink, ModeController, NoVision, PositionState, ReplayVision,
    SerialLink, SerialPortLink, StatusBoard, TrackingMode, VisionBackend,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pan/tilt camera rig controller", long_about = None)]
struct Args {
    /// Serial port of the rig firmware (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Replay scripted detections instead of a camera
    #[arg(short, long)]
    replay: Option<String>,

    /// Use an in-memory link instead of a serial port (wire traffic shows with --debug)
    #[arg(long)]
    dry_run: bool,

    /// Print the example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn print_help() {
    println!("\n[Commands]");
    println!("  face | gesture | manual - start a tracking session");
    println!("  stop    - stop the running session");
    println!("  w/a/s/d - jog up/left/down/right");
    println!("  reset   - ask the rig for its real pose");
    println!("  pose    - print the current pose");
    println!("  status  - print the latest status");
    println!("  x       - exit\n");
}

fn open_link(args: &Args, config: &Config) -> Result<Box<dyn SerialLink>> {
    if args.dry_run {
        let link = MemoryLink::new();
        link.answer_resets_with(config.home());
        info!("Dry run, no serial port opened");
        return Ok(Box::new(link));
    }

    let link = SerialPortLink::open(&config.serial.port, config.serial.baud_rate, config.write_timeout())
        .with_context(|| format!("Failed to open port {}", config.serial.port))?;
    Ok(Box::new(link))
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config {}", path))?,
        None => Config::default(),
    };
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.validate()?;

    println!("==============================================");
    println!("  Pan/Tilt Rig Controller");
    println!("==============================================");
    println!("  Port: {}", if args.dry_run { "(dry run)" } else { config.serial.port.as_str() });
    println!("  Baud: {}", config.serial.baud_rate);
    println!("==============================================");

    let vision: Arc<dyn VisionBackend> = match &args.replay {
        Some(path) => Arc::new(ReplayVision::from_file(path).with_context(|| format!("Failed to load replay {}", path))?),
        None => Arc::new(NoVision),
    };

    let link = open_link(&args, &config)?;
    let channel = MotorChannel::new(
        link,
        PositionState::new(config.pose_limits(), config.home()),
        config.reset_timeout(),
    )
    .context("Failed to set up the motor channel")?;
    let board = Arc::new(StatusBoard::new());
    let controller = Arc::new(ModeController::new(channel, vision, board.clone(), config.tracking_settings()));

    print_help();
    println!("Enter commands (or 'x' to exit):");

    let mut last_seen = 0;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if board.has_new(last_seen) {
            let (status, epoch) = board.latest();
            println!("[STATUS] {}", status.text);
            last_seen = epoch;
        }

        print!("> ");
        io::stdout().flush()?;

        let input = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let cmd = input.trim();

        match cmd {
            "face" | "gesture" | "manual" => {
                let mode: TrackingMode = cmd.parse()?;
                match controller.start(mode) {
                    Ok(true) => println!("[START {}]", mode.announcement()),
                    Ok(false) => println!("[BUSY] {} is running, stop it first", controller.mode()),
                    Err(e) => println!("[ERROR] {}", e),
                }
            }
            "stop" => match controller.stop() {
                Ok(true) => println!("[STOP]"),
                Ok(false) => println!("[IDLE] nothing to stop"),
                Err(e) => println!("[ERROR] {}", e),
            },
            "w" | "a" | "s" | "d" => {
                let direction: Direction = cmd.parse()?;
                match controller.jog(direction) {
                    Ok(pose) => println!("[JOG {:?}] {}", direction, pose),
                    Err(e) => println!("[ERROR] {}", e),
                }
            }
            "reset" => {
                //reset blocks on the firmware, keep the prompt alive
                let ctrl = controller.clone();
                thread::spawn(move || {
                    if let Ok(pose) = ctrl.reset() {
                        println!("\n[RESET] {}", pose);
                    }
                });
            }
            "pose" | "r" => println!("[POSE] {}", controller.pose()),
            "status" => {
                let (status, epoch) = board.latest();
                println!("[STATUS] {} ({})", status.text, status.severity.color());
                last_seen = epoch;
            }
            "help" | "?" => print_help(),
            "x" | "exit" | "quit" => {
                println!("[SHUTDOWN]");
                break;
            }
            "" => {}
            _ => println!("Unknown command: {}", cmd),
        }
    }

    controller.shutdown()?;
    println!("Goodbye!");
    Ok(())
}
