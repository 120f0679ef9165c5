#![allow(dead_code)]

use crate::app::App;
use crate::cli::SubCommand;
use crate::config::RawRootCfg;
use clap::Parser;
use is_root::is_root;
use std::process::ExitCode;
use std::time::Duration;

mod app;
mod cli;
mod common;
mod config;
mod external;
mod neighbor;
mod network;
mod route;
mod router;

#[derive(Debug, Parser)]
#[command(name = "sixrouter", about = "User-space IPv6 router")]
struct ProgramArgs {
    #[command(subcommand)]
    pub cmd: SubCommand,
}

fn main() -> ExitCode {
    let args: ProgramArgs = ProgramArgs::parse();
    let opt = match args.cmd {
        SubCommand::Start(opt) => opt,
        SubCommand::Check(opt) => return report(cli::check_config(&opt)),
        SubCommand::Interfaces(opt) => return report(cli::list_interfaces(&opt)),
    };
    if !is_root() {
        eprintln!("sixrouter must be run with root privilege");
        return ExitCode::FAILURE;
    }
    let config = match RawRootCfg::load_or_default(opt.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config
        .level_filter()
        .and_then(external::init_tracing)
    {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let app = match App::create(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(app.run());
    tracing::info!("Exiting...");
    // blocked readers are abandoned after this
    rt.shutdown_timeout(Duration::from_millis(600));
    ExitCode::SUCCESS
}

fn report(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
