//! wp-release command-line entry point.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use wpr_cli::cli::{Cli, Command};
use wpr_cli::commands::{run_deploy, run_list, run_rollback};
use wpr_cli::logging::init_logging;
use wpr_cli::summary::{print_deploy_summary, print_release_history, print_rollback_summary};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = cli.log_config(io::stderr().is_terminal());
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<()> {
    let json = cli.site.json;
    match &cli.command {
        None => {
            let report = run_deploy(&cli.site, &cli.deploy)?;
            if json {
                print_json(&report)?;
            } else {
                print_deploy_summary(&report);
            }
        }
        Some(Command::List(args)) => {
            let entries = run_list(&cli.site, args)?;
            if json {
                print_json(&entries)?;
            } else {
                print_release_history(&entries);
            }
        }
        Some(Command::Rollback(args)) => {
            let report = run_rollback(&cli.site, args)?;
            if json {
                print_json(&report)?;
            } else {
                print_rollback_summary(&report);
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
