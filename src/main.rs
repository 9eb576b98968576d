use adb_bridge::adb::AdbBackend;
use adb_bridge::app::{self, BridgeConfig, ConfigOverrides};
use adb_bridge::error::{BridgeError, ErrorCode};
use adb_bridge::forward::WebSocketConnector;
use adb_bridge::monitor::{shutdown_signal, MonitorController};
use adb_bridge::subprocess::SubprocessManager;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Forward Android crashes and errors to a desktop listener
#[derive(Parser)]
#[command(name = "adb-bridge", version)]
#[command(about = "Tail adb logcat, classify errors and forward them over WebSocket", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// WebSocket URI of the desktop listener
    #[arg(long, value_name = "URI")]
    sink_uri: Option<String>,

    /// Port of a listener on localhost (ignored when --sink-uri is given)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the adb executable
    #[arg(long, value_name = "PATH")]
    adb: Option<String>,

    /// Serial of the device to monitor (default: first attached device)
    #[arg(short = 's', long, value_name = "SERIAL")]
    device: Option<String>,

    /// Also write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            sink_uri: self.sink_uri,
            port: self.port,
            adb_program: self.adb,
            preferred_device: self.device,
            verbose: self.verbose,
            log_file: self.log_file,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        app::handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = BridgeConfig::load(cli.overrides())?;
    app::init_logging(&config)?;
    debug!("Configuration: {:?}", config);

    let subprocess = SubprocessManager::production();
    let backend = AdbBackend::with_runner(&config.adb_program, subprocess.runner())
        .with_list_timeout(config.device_list_timeout);
    let version = backend.version().await.map_err(|e| {
        BridgeError::launch_with_code(
            ErrorCode::LAUNCH_COMMAND_NOT_FOUND,
            format!(
                "adb is not available ({}). Install Android platform-tools and make sure adb is on PATH",
                e
            ),
            None,
        )
    })?;
    info!("ADB available: {}", version);
    info!("Starting ADB Bridge, forwarding to {}", config.sink_uri);

    let connector = WebSocketConnector::new(config.connect_timeout);
    let mut monitor = MonitorController::new(
        Arc::new(backend),
        Arc::new(connector),
        config.monitor_settings(),
    );

    let shutdown = shutdown_signal();
    let stats = monitor.run(&shutdown).await?;

    info!(
        "ADB Bridge finished: {} lines read, {} errors detected, {} forwarded",
        stats.lines_read, stats.events_classified, stats.events_delivered
    );
    Ok(())
}
