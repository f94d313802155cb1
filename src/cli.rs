use clap::{crate_description, crate_version, Arg, ArgAction, ArgMatches, Command};
use pretty_env_logger::env_logger::Builder;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use edgeapi::api::Client;
use edgeapi::common::{Result, Sink};
use edgeapi::output::Presenter;
use edgeapi::{Config, OutputFormat, Overrides};

fn syslog_priority(level: log::Level) -> u8 {
    match level {
        log::Level::Error => 3,
        log::Level::Warn => 4,
        log::Level::Info => 6,
        log::Level::Debug | log::Level::Trace => 7,
    }
}

/// `RUST_LOG` wins; otherwise info, or debug with `--debug`.
/// `RUST_LOG_STYLE=SYSTEMD` swaps the colored format for `<priority>target: msg`.
fn setup_logger(debug: bool) {
    let mut builder = match env::var("RUST_LOG_STYLE").as_deref() {
        Ok("SYSTEMD") => {
            let mut builder = Builder::new();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    syslog_priority(record.level()),
                    record.target(),
                    record.args()
                )
            });
            builder
        }
        _ => pretty_env_logger::formatted_builder(),
    };

    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) if debug => builder.filter_level(log::LevelFilter::Debug),
        Err(_) => builder.filter_level(log::LevelFilter::Info),
    };
    builder.init();
}

fn command() -> Command {
    Command::new("edgeapi")
        .about(crate_description!())
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .global(true)
                .help("API key for authentication"),
        )
        .arg(
            Arg::new("debug")
                .action(ArgAction::SetTrue)
                .long("debug")
                .global(true)
                .help("Enable debug mode"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(["text", "json"])
                .help("Output format: text or json"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to the YAML config file"),
        )
        .subcommand(Command::new("get-machines").about("Retrieve available machines"))
        .version(crate_version!())
}

fn overrides(args: &ArgMatches) -> Overrides {
    Overrides {
        config_path: args.get_one::<PathBuf>("config").cloned(),
        api_key: args.get_one::<String>("api-key").cloned(),
        debug: args.get_flag("debug"),
        output: args
            .get_one::<String>("output")
            .map(|o| match o.as_str() {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            }),
    }
}

fn get_machines(config: &Config, presenter: Presenter) -> Result<()> {
    if let Some(source) = config.credential_source {
        tracing::info!(source = %source, "API key loaded");
    }
    let client = Client::from_config(config)?;

    presenter.log("Fetching available machines...");
    let result = client.list_machines(&presenter)?;
    if let Err(err) = presenter.print_result(&result) {
        tracing::error!(error = %err, "Failed to write output");
    }
    Ok(())
}

pub(crate) fn main() {
    let args = command().get_matches();
    // Global flags are propagated down, so read them where they were given.
    let overrides = overrides(args.subcommand().map_or(&args, |(_, sub)| sub));

    setup_logger(overrides.debug || env::var("DEBUG").is_ok_and(|v| v == "true"));

    let config = match Config::load(&overrides) {
        Ok(c) => c,
        Err(err) => {
            let presenter = Presenter::from(overrides.output.unwrap_or_default());
            presenter.report(&err);
            exit(err.exit_code());
        }
    };
    let presenter = Presenter::from(config.output);

    match args.subcommand_name() {
        Some("get-machines") => {
            if let Err(err) = get_machines(&config, presenter) {
                presenter.report(&err);
                exit(err.exit_code());
            }
        }
        _ => presenter.log("Welcome to Edge CLI! Use --help to see available commands."),
    }
}
