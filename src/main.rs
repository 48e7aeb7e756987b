// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use keycast::config::{PlaybackOptions, load_recording, save_recording};
use keycast::playback::{PlaybackEngine, PlaybackOutcome};
use keycast::{recorder, session};

#[derive(Parser)]
#[command(name = "keycast", version, about = "Record keystrokes and replay them with human-like timing")]
struct Cli {
    /// Debug logging for keycast itself
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record key presses from this terminal until Esc
    Record {
        /// Where to write the recording
        output: PathBuf,
    },
    /// Replay a recording into the focused window
    Play {
        input: PathBuf,

        /// Seconds to wait before the first key, to switch windows
        #[arg(long, value_name = "SECS", default_value_t = 3.0)]
        start_delay: f64,

        #[command(flatten)]
        options: PlaybackOptions,
    },
    /// List the entries of a recording
    Show { input: PathBuf },
    /// Interactive session: F8 toggles playback, F9 re-records, Esc quits
    Session {
        /// Recording to start from
        #[arg(long)]
        input: Option<PathBuf>,

        /// Save the recording here on exit
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: PlaybackOptions,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info,keycast=debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn play(input: PathBuf, start_delay: f64, options: PlaybackOptions) -> Result<()> {
    let events = load_recording(&input)?;
    let settings = options.resolve()?;
    let start_delay = Duration::try_from_secs_f64(start_delay)
        .context("Start delay must be a non-negative number of seconds")?;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("received Ctrl-C, stopping playback");
        token.cancel();
    })?;

    info!(
        keys = events.len(),
        looping = settings.loop_playback,
        "starting in {:.1}s, press Ctrl-C to stop",
        start_delay.as_secs_f64()
    );
    tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        _ = tokio::time::sleep(start_delay) => {}
    }

    let mut engine = PlaybackEngine::with_planner(options.sender(), options.planner());
    match engine.play(&events, &settings, &cancel).await? {
        PlaybackOutcome::Completed { keys_sent } => info!(keys_sent, "playback complete"),
        PlaybackOutcome::Cancelled { keys_sent } => info!(keys_sent, "playback stopped"),
    }
    Ok(())
}

fn show(input: PathBuf) -> Result<()> {
    let events = load_recording(&input)?;
    for (index, event) in events.iter().enumerate() {
        let comment = event.comment.as_deref().unwrap_or_default();
        println!(
            "{:>4}  {:>7} ms  {:<24} {}",
            index + 1,
            event.delay_since_previous.as_millis(),
            event.label(),
            comment
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Record { output } => {
            let events = recorder::record_terminal()?;
            if events.is_empty() {
                warn!("nothing recorded, {} not written", output.display());
                return Ok(());
            }
            save_recording(&output, &events)?;
            info!(keys = events.len(), path = %output.display(), "recording saved");
        }
        Command::Play {
            input,
            start_delay,
            options,
        } => play(input, start_delay, options).await?,
        Command::Show { input } => show(input)?,
        Command::Session {
            input,
            output,
            options,
        } => {
            let events = match &input {
                Some(path) => load_recording(path)?,
                None => Vec::new(),
            };
            let settings = options.resolve()?;
            let events = session::run(events, settings, options).await?;

            match output.or(input) {
                Some(path) if !events.is_empty() => {
                    save_recording(&path, &events)?;
                    info!(keys = events.len(), path = %path.display(), "recording saved");
                }
                _ => {}
            }
        }
    }

    Ok(())
}
