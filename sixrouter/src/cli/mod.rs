use crate::config::RawRootCfg;
use crate::network::datalink::{interface_ipv6, interface_mac, is_ignored};
use clap::{Args, Subcommand, ValueHint};
use colored::Colorize;
use std::path::PathBuf;
use tabular::{Row, Table};

#[derive(Debug, Args)]
pub(crate) struct StartOptions {
    /// Path of the YAML configuration. Without one, only OS-assigned addresses are used
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct CheckOptions {
    /// Path of the YAML configuration
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,
}

#[derive(Debug, Args)]
pub(crate) struct InterfacesOptions {
    /// Take the ignore list from this configuration
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum SubCommand {
    /// Start the router
    Start(StartOptions),
    /// Validate a configuration file
    Check(CheckOptions),
    /// List network interfaces and whether the router takes them over
    Interfaces(InterfacesOptions),
}

pub(crate) fn check_config(opt: &CheckOptions) -> anyhow::Result<()> {
    let config = RawRootCfg::load(&opt.config)?;
    config.validate()?;
    println!(
        "{}: {} interfaces, {} routes, {} neighbors",
        "Success".green(),
        config.interfaces.len(),
        config.routes.len(),
        config.neighbors.len()
    );
    Ok(())
}

pub(crate) fn list_interfaces(opt: &InterfacesOptions) -> anyhow::Result<()> {
    let config = RawRootCfg::load_or_default(opt.config.as_deref())?;
    let mut table = Table::new("{:<} {:<} {:<} {:<}");
    table.add_row(
        Row::new()
            .with_cell("Name")
            .with_cell("MAC")
            .with_cell("IPv6")
            .with_cell("Status"),
    );
    for iface in pnet_datalink::interfaces() {
        let mac = interface_mac(&iface);
        let status = if is_ignored(&iface.name, &config.ignore_interfaces) {
            "ignored".yellow()
        } else if mac.is_none() {
            "no link address".red()
        } else {
            "routed".green()
        };
        table.add_row(
            Row::new()
                .with_cell(iface.name.bold())
                .with_cell(mac.map_or("N/A".to_string(), |m| m.to_string()))
                .with_cell(
                    interface_ipv6(&iface)
                        .map_or("N/A".to_string(), |(addr, len)| format!("{}/{}", addr, len)),
                )
                .with_cell(status),
        );
    }
    println!("{}", table);
    Ok(())
}
