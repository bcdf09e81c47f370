use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

use sc_app::{
    Acquisition, AppConfig, AppResult, RunController, RunEvent, RunState, load_config,
    parse_interval_seconds, parse_threshold_grams,
};
use sc_instrument::{Instrument, SimulatedBalance, available_ports};
use sc_monitor::{AlertEvent, AlertSink};
use sc_series::validate_base_path;

#[derive(Parser)]
#[command(name = "autoscale")]
#[command(about = "AutoScale - balance flow-rate logger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports on this machine
    Ports,
    /// Zero the balance
    Tare {
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Poll the balance a few times and print the weights
    Read {
        #[command(flatten)]
        link: LinkArgs,
        /// Number of readings
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        /// Seconds between readings
        #[arg(long, default_value = "1")]
        interval: String,
    },
    /// Record a flow-rate run and export it
    Record(RecordArgs),
}

#[derive(Args)]
struct LinkArgs {
    /// YAML config file with `link` and `run` sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial port (e.g. COM1, /dev/ttyUSB0)
    #[arg(long)]
    port: Option<String>,
    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,
}

#[derive(Args)]
struct RecordArgs {
    #[command(flatten)]
    link: LinkArgs,
    /// Sampling interval in seconds
    #[arg(long)]
    interval: Option<String>,
    /// Plot title
    #[arg(long)]
    title: Option<String>,
    /// Alert when mass exceeds this many grams
    #[arg(long)]
    alert_threshold: Option<String>,
    /// Disable the threshold alert
    #[arg(long)]
    no_alert: bool,
    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long)]
    duration: Option<f64>,
    /// Export base path; writes <base>.txt and <base>.svg
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Use a simulated balance filling at this many grams per second
    #[arg(long)]
    simulate: Option<f64>,
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ports => cmd_ports(),
        Commands::Tare { link } => cmd_tare(&link),
        Commands::Read {
            link,
            count,
            interval,
        } => cmd_read(&link, count, &interval),
        Commands::Record(args) => cmd_record(&args),
    }
}

fn resolve_config(link: &LinkArgs) -> AppResult<AppConfig> {
    let mut config = match &link.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(port) = &link.port {
        config.link.port = port.clone();
    }
    if let Some(baud) = link.baud {
        config.link.baud_rate = baud;
    }
    Ok(config)
}

fn open_balance(config: &AppConfig) -> AppResult<Box<dyn Instrument>> {
    let link = sc_instrument::open(&config.link.port_settings())?;
    Ok(Box::new(link))
}

fn cmd_ports() -> AppResult<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    } else {
        println!("Serial ports:");
        for port in ports {
            println!("  {} - {}", port.name, port.description);
        }
    }
    Ok(())
}

fn cmd_tare(link: &LinkArgs) -> AppResult<()> {
    let config = resolve_config(link)?;
    let mut balance = open_balance(&config)?;
    balance.tare()?;
    println!("✓ Balance tared on {}", config.link.port);
    Ok(())
}

fn cmd_read(link: &LinkArgs, count: u32, interval: &str) -> AppResult<()> {
    let config = resolve_config(link)?;
    let interval = Duration::from_millis(parse_interval_seconds(interval)?);
    let mut balance = open_balance(&config)?;

    for i in 0..count {
        if i > 0 {
            thread::sleep(interval);
        }
        match balance.read_mass() {
            Ok(mass) => println!("{mass} g"),
            Err(e) => eprintln!("✗ {e}"),
        }
    }
    Ok(())
}

/// Rings the terminal bell when the target weight is reached.
struct BellAlert;

impl AlertSink for BellAlert {
    fn alert(&mut self, event: &AlertEvent) {
        eprint!("\x07");
        eprintln!(
            "\n⚠ Target weight reached: {} g > {} g",
            event.sample.mass_grams, event.threshold_grams
        );
    }
}

fn cmd_record(args: &RecordArgs) -> AppResult<()> {
    let mut config = resolve_config(&args.link)?;
    if let Some(text) = &args.interval {
        config.run.sampling_interval_ms = parse_interval_seconds(text)?;
    }
    if let Some(title) = &args.title {
        config.run.plot_title = title.clone();
    }
    if let Some(text) = &args.alert_threshold {
        config.run.alert_threshold_grams = parse_threshold_grams(text)?;
    }
    if args.no_alert {
        config.run.alert_enabled = false;
    }

    let output = args.output.clone().unwrap_or_else(default_output);
    validate_base_path(&output)?;

    let balance: Box<dyn Instrument> = match args.simulate {
        Some(rate) => Box::new(SimulatedBalance::new(rate)),
        None => open_balance(&config)?,
    };
    let controller =
        RunController::new(balance, config.run.clone())?.with_alert_sink(Box::new(BellAlert));
    let acquisition = Acquisition::spawn(controller)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    println!("Recording \"{}\" (Ctrl-C to stop)", config.run.plot_title);
    acquisition.start()?;

    let started = Instant::now();
    let limit = args.duration.map(Duration::from_secs_f64);
    let mut running = true;
    while running {
        if interrupted.load(Ordering::SeqCst) || limit.is_some_and(|l| started.elapsed() >= l) {
            acquisition.stop()?;
        }
        match acquisition.events.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => running = render_event(&event),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    clear_progress_line();

    acquisition.export(&output)?;
    loop {
        match acquisition.events.recv_timeout(Duration::from_secs(5)) {
            Ok(RunEvent::Exported(paths)) => {
                println!("✓ Saved {}", paths.data.display());
                println!("✓ Saved {}", paths.chart.display());
                break;
            }
            Ok(RunEvent::ExportFailed { message }) => {
                eprintln!("✗ {message}");
                break;
            }
            Ok(_) => continue,
            Err(_) => {
                eprintln!("✗ Export did not complete");
                break;
            }
        }
    }

    let controller = acquisition.shutdown()?;
    println!(
        "Samples: {}  Failed ticks: {}",
        controller.series().len(),
        controller.tick_failures()
    );
    Ok(())
}

/// Print one event. Returns false once the run is over.
fn render_event(event: &RunEvent) -> bool {
    match event {
        RunEvent::StateChanged(RunState::Running) => println!("Timer is ON"),
        RunEvent::StateChanged(RunState::Idle) => {
            clear_progress_line();
            println!("Timer is OFF");
            return false;
        }
        RunEvent::StartFailed { message } => {
            eprintln!("✗ Could not start: {message}");
            return false;
        }
        RunEvent::AlreadyRunning => println!("Timer is already active"),
        RunEvent::Tick(report) => {
            print!(
                "\r{}  |  flow rate: {}   ",
                report.readout.last_point, report.readout.flow_rate
            );
            let _ = io::stdout().flush();
        }
        RunEvent::TickFailed { tick, message, .. } => {
            clear_progress_line();
            eprintln!("✗ Tick {tick} skipped: {message}");
        }
        RunEvent::Aborted { reason } => {
            clear_progress_line();
            eprintln!("✗ Run aborted: {reason}");
        }
        RunEvent::Alert(_)
        | RunEvent::Tared
        | RunEvent::TareFailed { .. }
        | RunEvent::ConfigUpdated
        | RunEvent::ConfigRejected { .. }
        | RunEvent::Exported(_)
        | RunEvent::ExportFailed { .. } => {}
    }
    true
}

fn clear_progress_line() {
    print!("\r{:80}\r", "");
    let _ = io::stdout().flush();
}

fn default_output() -> PathBuf {
    let stamp = chrono::Local::now().format("run_%Y%m%d_%H%M%S");
    Path::new(".").join(stamp.to_string())
}
