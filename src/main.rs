/*
 *  main.rs
 *
 *  PirateDisplay - now playing, pocket sized
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use tokio::signal::unix::{signal, SignalKind};

use pirate_display::art::ArtFetcher;
use pirate_display::config::{self, Cli};
use pirate_display::coordinator::Coordinator;
use pirate_display::ctx::Ctx;
use pirate_display::display::{DisplaySinkFactory, FrameComposer};
use pirate_display::input;
use pirate_display::mopidy::MopidySession;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
///
/// Once a signal is caught it is logged and the function returns, which
/// ends the event loop.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize the logger with the appropriate level based on debug flag
    env_logger::Builder::from_env(Env::default().default_filter_or(if cli.debug {"debug"} else {"info"}))
        .format_timestamp_secs()
        .init();

    info!("{} - now playing, pocket sized", env!("CARGO_PKG_NAME"));
    info!("v.{} built {} ({})", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_PROFILE);

    let cfg = config::load(&cli).context("configuration")?;
    let endpoint = cfg.endpoint()?;

    let sink = DisplaySinkFactory::create_from_config(&cfg.display)
        .context("display initialization")?;
    let composer = FrameComposer::new(cfg.render.compose_options()?);
    let art = ArtFetcher::new(endpoint.web_port, cfg.render.art_cache_path.clone());

    let session = MopidySession::connect(&endpoint.host, endpoint.port)
        .await
        .with_context(|| format!("connecting to Mopidy at {}:{}", endpoint.host, endpoint.port))?;

    let mut coordinator = Coordinator::new(Ctx::new(session, art, composer, sink));
    let _buttons = input::start(&cfg.buttons, coordinator.events())
        .context("button setup")?;

    let outcome = tokio::select! {
        result = coordinator.run() => result,
        result = signal_handler() => {
            if let Err(e) = result {
                error!("Signal handler failed: {}", e);
            }
            Ok(())
        }
    };

    coordinator.close().await;
    info!("Disconnected");

    outcome.context("event loop")
}
