use clap::Parser;
use stargazer_client::{run_client, ScanState, ScannerConfig};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Runs one sweep of the gimbal and prints every point as a JSON line.
#[derive(Parser, Debug)]
#[command(about = "Scans the surroundings of a pan/tilt gimbal.")]
struct Args {
    /// Host serving the gimbal WebSocket, e.g. 192.168.4.1
    host: Option<String>,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Seconds to wait for the first connection
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,
    /// Seconds allowed for the whole sweep before giving up
    #[arg(long, default_value_t = 3600)]
    scan_timeout: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stargazer_client=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }

    let (client_threads, handle) = run_client(config)?;

    let deadline = Instant::now() + Duration::from_secs(args.connect_timeout);
    while !handle.status().connected {
        if Instant::now() > deadline {
            return Err("gimbal did not connect".into());
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    handle.toggle_scan()?;
    let mut stdout = std::io::stdout().lock();
    let mut offset = 0;
    let mut started = false;
    let scan_deadline = Instant::now() + Duration::from_secs(args.scan_timeout);
    loop {
        if Instant::now() > scan_deadline {
            handle.stop_scan()?;
            return Err("sweep did not complete in time".into());
        }
        std::thread::sleep(Duration::from_millis(100));
        for point in handle.cloud().since(offset) {
            writeln!(stdout, "{}", serde_json::to_string(&point)?)?;
            offset += 1;
        }
        let status = handle.status();
        started |= status.state == ScanState::Sweeping;
        if started && status.state == ScanState::Idle {
            break;
        }
    }
    for point in handle.cloud().since(offset) {
        writeln!(stdout, "{}", serde_json::to_string(&point)?)?;
    }

    drop(client_threads);
    Ok(())
}
