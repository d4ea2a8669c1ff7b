use afftrack::args::{Args, Command};
use afftrack::{commands, Config, Mode, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for testing the program without hitting the Google APIs.
    // When AFFTRACK_IN_TEST_MODE is set and non-zero in length, then the mode
    // will be Mode::Test, otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(
            home,
            init_args.client_secret(),
            init_args.sheet_url(),
            init_args.utc_offset(),
        )
        .await?
        .print(),

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config, mode).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Record(record_args) => {
            let config = Config::load(home).await?;
            commands::record(&config, record_args.file()).await?.print()
        }

        Command::Expenses(expenses_args) => {
            let config = Config::load(home).await?;
            commands::expenses(&config, mode, expenses_args.buyer(), expenses_args.date())
                .await?
                .print()
        }

        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            match report_args.buyer() {
                Some(buyer) => commands::report_range(
                    &config,
                    mode,
                    buyer,
                    report_args.start(),
                    report_args.end(),
                )
                .await?
                .print(),
                None => {
                    commands::report_all(&config, mode, report_args.start(), report_args.end())
                        .await?
                        .print()
                }
            }
        }

        Command::Reject(reject_args) => {
            let config = Config::load(home).await?;
            commands::reject(&config, reject_args.buyer(), reject_args.amount())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
