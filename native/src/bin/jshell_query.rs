// Command-line front end: evaluate expressions in the target process.

use clap::{Parser, Subcommand};
use jshell_bridge::{
    logging, session, BridgeConfig, Procedures, Segment, Session, Target, Value, WorldPoint,
};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "jshell-query")]
#[command(
    version,
    about = "Evaluate expressions inside a running JShell pipe server",
    long_about = "Evaluate expressions inside a running JShell pipe server.\n\n\
                  The pipe server must already be loaded into the target process. \
                  On Windows the target process is located and its PID logged, but \
                  JSHELL_PAYLOAD is not injected by this tool: use an external loader."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print decoded values as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Do not send the start-up imports and helper procedures
    #[arg(long, global = true)]
    skip_prelude: bool,

    /// Pipe name (overrides JSHELL_PIPE_NAME)
    #[arg(long, global = true)]
    pipe: Option<String>,

    /// Read timeout in milliseconds (overrides JSHELL_READ_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Remove the crash log left by earlier runs before starting
    #[arg(long, global = true)]
    clear_crash_log: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one expression as-is
    Query {
        /// Expression to evaluate; `;` is appended when missing
        script: String,
    },
    /// Build a chained call, e.g. `chain client getLocalPlayer() getWorldLocation()`
    Chain {
        /// Remote object the chain starts from
        target: String,
        /// Segments: `name` for attributes, `name(args)` for calls
        #[arg(required = true)]
        segments: Vec<String>,
    },
    /// Path from the local player to a tile
    Path { x: i32, y: i32, plane: i32 },
    /// Current game state
    State,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    logging::init_logger();
    logging::init_crash_logger();

    if let Ok(dsn) = std::env::var("JSHELL_SENTRY_DSN") {
        let environment = std::env::var("SENTRY_ENVIRONMENT").ok();
        logging::init_sentry(Some(&dsn), environment.as_deref());
    }

    let cli = Cli::parse();
    if cli.clear_crash_log {
        if let Err(e) = logging::clear_crash_log() {
            error!("[CLI] Could not clear crash log: {}", e);
        }
    }

    let code = match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("[CLI] {}", e);
            eprintln!("error: {}", e);
            if let Some(path) = logging::get_crash_log_path() {
                if std::path::Path::new(&path).exists() {
                    eprintln!("details in crash log: {}", path);
                }
            }
            ExitCode::FAILURE
        }
    };

    logging::shutdown_sentry();
    code
}

fn run(cli: Cli) -> jshell_bridge::Result<()> {
    let mut config = BridgeConfig::from_env()?;
    if let Some(pipe) = cli.pipe {
        config.pipe_name = pipe;
    }
    if let Some(timeout) = cli.timeout_ms {
        config.read_timeout_ms = Some(timeout);
    }
    if cli.skip_prelude {
        config.run_prelude = false;
    }

    let session = session::shared(|| build_session(config))?;
    info!("[CLI] Session ready (v{})", jshell_bridge::get_version());

    match cli.command {
        Commands::Query { script } => print_value(session.query(&script)?, cli.json),
        Commands::Chain { target, segments } => {
            let segments: Vec<Segment> = segments.iter().map(|s| Segment::parse(s)).collect();
            let mut target = Target::new(Arc::clone(&session), target);
            let value = target.apply(&segments).execute()?;
            print_value(value, cli.json);
        }
        Commands::Path { x, y, plane } => {
            let destination = WorldPoint::new(x, y, plane);
            let path = Procedures::new(session).find_path(destination)?;
            if cli.json {
                println!("{}", serde_json::to_string(&path).unwrap_or_default());
            } else {
                for point in path {
                    println!("{} {} {}", point.x, point.y, point.plane);
                }
            }
        }
        Commands::State => {
            let state = Procedures::new(session).game_state()?;
            println!("{}", state.unwrap_or_else(|| "<no reply>".to_string()));
        }
    }

    Ok(())
}

#[cfg(windows)]
fn build_session(config: BridgeConfig) -> jshell_bridge::Result<Arc<Session>> {
    let locator = jshell_bridge::ExecutableLocator::new(config.target_process.clone());
    Session::builder(config).locator(locator).build()
}

#[cfg(not(windows))]
fn build_session(config: BridgeConfig) -> jshell_bridge::Result<Arc<Session>> {
    Session::builder(config).build()
}

fn print_value(value: Option<Value>, json: bool) {
    match (value, json) {
        (None, _) => println!("<no reply>"),
        (Some(value), true) => println!("{}", serde_json::to_string(&value).unwrap_or_default()),
        (Some(value), false) => println!("{}", value),
    }
}
