#![allow(rustdoc::private_intra_doc_links)]

use anyhow::{Context, Result};
use host_config::HostConfig;
use opts::Action;
use paths::{HostPaths, StartArgs};

mod actions;
mod applet;
mod applets;
mod application_lifecycle;
mod client;
mod commands;
mod daemon_response;
mod error;
mod error_handling_ctx;
mod host_config;
mod icon;
mod lifecycle;
mod loader;
mod loader_iface;
mod menu;
mod opts;
mod paths;
mod poller;
mod router;
mod server;
mod templates;
mod util;

#[cfg(test)]
mod test_util;

fn main() {
    let binary_name = std::env::args().next().unwrap_or_else(|| "applet-host".to_owned());
    let opts: opts::Opt = opts::Opt::from_env();

    let log_level_filter = if opts.log_debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::init_timed();
    } else {
        pretty_env_logger::formatted_timed_builder()
            .filter(Some("applet_host"), log_level_filter)
            .filter(Some("applet"), log_level_filter)
            .filter(Some("dock_bus"), log_level_filter)
            .filter(Some("groupconf"), log_level_filter)
            .init();
    }

    match run(opts, binary_name) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error_handling_ctx::print_error(&err);
            std::process::exit(1);
        }
    }
}

fn run(opts: opts::Opt, binary_name: String) -> Result<i32> {
    let paths = opts
        .config_path
        .map(HostPaths::from_config_dir)
        .unwrap_or_else(HostPaths::default)
        .context("Failed to initialize the applet host paths")?;

    let config = match HostConfig::read(&paths.get_host_config_file()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", error_handling_ctx::format_error(&anyhow::Error::from(error::HostError::from(err))));
            return Ok(2);
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().context("Failed to initialize tokio runtime")?;
    rt.block_on(async move {
        match &opts.action {
            Action::Daemon { solo } => {
                let solo = *solo || config.loader.solo;
                let outcome = server::run_daemon(&paths, &config, None, solo, opts.log_debug, &binary_name).await?;
                Ok(outcome.exit_code())
            }
            Action::StartApplet { args } => {
                let args = StartArgs::from_args(args)?;
                let outcome = server::run_daemon(&paths, &config, Some(args), false, opts.log_debug, &binary_name).await?;
                Ok(outcome.exit_code())
            }
            action => {
                if let Some(output) = client::handle_client_action(action).await? {
                    println!("{}", output);
                }
                Ok(0)
            }
        }
    })
}
