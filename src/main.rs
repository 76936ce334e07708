//! Steward daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!     primary thread                 lifecycle thread            steward-io runtime
//!     ──────────────                 ────────────────            ─────────────────
//!     parse options
//!     init logging
//!     install signals
//!     start subsystems  ─────────────────────────────────────▶  message server pump
//!                                                               HTTP intake (Unix socket)
//!     spawn worker      ──────────▶  wait on queue
//!     wait for signals
//!       TERM/INT ──▶ queue ───────▶  stop signal loop ◀──┐
//!       HUP      ──▶ queue ───────▶  (ignored)           │
//!       USR1     ──▶ leave loop ─────────────────────────┘
//!     join worker                    stop intake        ──▶  graceful drain
//!                                    stop message server ─▶  deliver backlog
//!                                    exit(0)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use steward::config::{self, Options, Settings};
use steward::error::{Error, Result};
use steward::http::HttpIntake;
use steward::lifecycle::{install_panic_hook, launch, Controller, SignalBridge};
use steward::observability::logging;
use steward::server::{LogSink, MessageServer, Sink};

/// Name prefix of the async I/O runtime threads.
const RUNTIME_THREAD_NAME: &str = "steward-io";

#[derive(Debug, Parser)]
#[command(name = "steward", version)]
#[command(about = "Message intake daemon with ordered, signal-driven shutdown", long_about = None)]
struct Cli {
    /// File from which other settings may be read
    #[arg(short = 'f', long, value_name = "CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Unix socket the HTTP intake listens on
    #[arg(short = 's', long = "socket", value_name = "SOCKET_FILE")]
    socket_file: Option<PathBuf>,

    /// Level of messages printed on stderr
    #[arg(short = 'v', long, value_name = "LEVEL")]
    verbosity: Option<String>,

    /// File to append log messages to
    #[arg(short = 'l', long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Level of messages written to the log file
    #[arg(short = 'e', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Request timeout for the HTTP intake, in seconds
    #[arg(short = 't', long, value_name = "SECS")]
    request_timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Settings {
        Settings {
            socket_file: self.socket_file.clone(),
            log_stderr_level: self.verbosity.clone(),
            log_file: self.log_file.clone(),
            log_file_level: self.log_level.clone(),
            request_timeout_secs: self.request_timeout,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = match config::resolve(cli.config_file.as_deref(), cli.overrides()) {
        Ok(options) => options,
        Err(e) => return fail(&e),
    };

    if let Err(e) = logging::init(&options.logging) {
        return fail(&e);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        socket_file = %options.socket_file.display(),
        "steward starting"
    );

    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            fail(&e)
        }
    }
}

fn fail(error: &Error) -> ExitCode {
    eprintln!("steward: {error}");
    ExitCode::from(error.exit_code())
}

/// Build the subsystems and hand the primary thread to the lifecycle.
fn run(options: Options) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name(RUNTIME_THREAD_NAME)
        .enable_all()
        .build()?;

    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(LogSink)];
    let server = Arc::new(MessageServer::new(runtime.handle().clone(), sinks));
    let intake = Arc::new(HttpIntake::new(
        runtime.handle().clone(),
        options.socket_file,
        options.request_timeout,
        server.sender(),
    ));

    // The bridge binds to this thread; signals are handled here from now on.
    let bridge = Arc::new(SignalBridge::os());
    let controller = Controller::builder(bridge)
        .subsystem(intake)
        .subsystem(server)
        .build();

    install_panic_hook(Arc::clone(&controller));

    launch(&controller)
}
