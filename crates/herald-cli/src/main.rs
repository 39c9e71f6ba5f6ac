//! Herald CLI binary entrypoint.
//!
//! This is the main entry point for the `herald` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use herald_cli::cli::{Cli, Commands};
use herald_cli::commands::{ParseCommand, ParsersCommand, RouteCommand, TemplatesCommand};
use herald_cli::output::OutputFormat;
use herald_cli::CliError;
use herald_route::{ParserEngine, Router, RoutingConfig, SharedParserEngine, TemplateMatcher};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    let config = cli
        .config
        .as_deref()
        .map(RoutingConfig::from_path)
        .transpose()?;
    let engine_config = config.as_ref().map(|c| c.engine.clone()).unwrap_or_default();
    let engine = ParserEngine::with_config(engine_config);
    debug!(parsers = engine.parser_count(), "parser engine ready");
    let router = Router::with_parts(SharedParserEngine::new(engine), TemplateMatcher::builtin());

    match &cli.command {
        Commands::Parse(args) => {
            ParseCommand::new(router.engine()).execute(&mut stdout, &format, args)?;
        }
        Commands::Validate(args) => {
            ParseCommand::new(router.engine()).validate(&mut stdout, &format, args)?;
        }
        Commands::Route(args) => {
            RouteCommand::new(&router, config.as_ref()).execute(&mut stdout, &format, args)?;
        }
        Commands::Templates => {
            TemplatesCommand::new(&router, config.as_ref()).execute(&mut stdout, &format)?;
        }
        Commands::Parsers => {
            ParsersCommand::new(&router).execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}
