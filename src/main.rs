use anyhow::Result;
use clap::Parser;
use huella::cli::{Cli, Command, OutputFormat};
use huella::config::HuellaConfig;
use huella::{output, Huella, HuellaError};
use tracing_subscriber::EnvFilter;

/// Exit status for a well-formed authentication that was rejected
const EXIT_REJECTED: i32 = 2;
const EXIT_ERROR: i32 = 1;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print an engine error and map it to the error exit status
fn report(err: &HuellaError, format: OutputFormat) -> i32 {
    eprintln!("{}", output::render_error(err, format));
    EXIT_ERROR
}

fn run(engine: &Huella, command: &Command, format: OutputFormat) -> Result<i32> {
    let code = match command {
        Command::Enroll { username, features } => {
            let features = features.load()?;
            match engine.enroll(username, &features) {
                Ok(outcome) => {
                    println!("{}", output::render_enrollment(&outcome, format));
                    0
                }
                Err(err) => report(&err, format),
            }
        }
        Command::Authenticate { username, features } => {
            let features = features.load()?;
            match engine.authenticate(username, &features) {
                Ok(decision) => {
                    println!("{}", output::render_decision(&decision, format));
                    if decision.authenticated {
                        0
                    } else {
                        EXIT_REJECTED
                    }
                }
                Err(err) => report(&err, format),
            }
        }
        Command::Users => match engine.list_users() {
            Ok(users) => {
                println!("{}", output::render_users(&users, format));
                0
            }
            Err(err) => report(&err, format),
        },
        Command::ExpectedFeatures { username } => {
            match engine.expected_feature_count(username.as_deref()) {
                Ok(count) => {
                    println!("{}", output::render_expected_count(count, format));
                    0
                }
                Err(err) => report(&err, format),
            }
        }
    };
    Ok(code)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let mut config = HuellaConfig::load(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let engine = Huella::open(config)?;
    let code = run(&engine, &args.command, args.format)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
