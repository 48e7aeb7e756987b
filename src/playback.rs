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

//! Playback engine for recorded keystrokes
//!
//! Re-plans on every pass, waits out each action's delay and hands the
//! keypress to a [`KeySender`]

use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::PlaybackError;
use crate::injector::KeySender;
use crate::planner::SequencePlanner;
use crate::random::{RandomSource, ThreadRandomSource};
use crate::types::{PlaybackSettings, RecordedEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every action of a non-looping plan was sent, or the plan was empty.
    Completed { keys_sent: usize },
    /// Stopped by the cancellation token.
    Cancelled { keys_sent: usize },
}

pub struct PlaybackEngine<S, R = ThreadRandomSource> {
    sender: S,
    planner: SequencePlanner<R>,
}

impl<S: KeySender> PlaybackEngine<S, ThreadRandomSource> {
    pub fn new(sender: S) -> Self {
        Self::with_planner(sender, SequencePlanner::default())
    }
}

impl<S: KeySender, R: RandomSource> PlaybackEngine<S, R> {
    pub fn with_planner(sender: S, planner: SequencePlanner<R>) -> Self {
        Self { sender, planner }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    // Returns false when cancelled mid-wait
    async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }

    pub async fn play(
        &mut self,
        events: &[RecordedEvent],
        settings: &PlaybackSettings,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome, PlaybackError> {
        settings.validate()?;

        let mut keys_sent = 0;
        let mut pass = 0usize;

        loop {
            pass += 1;
            // Planned per pass so shuffle and jitter are drawn fresh
            let plan = self.planner.build_plan(events, settings)?;
            if plan.is_empty() {
                debug!("nothing to play");
                return Ok(PlaybackOutcome::Completed { keys_sent });
            }
            info!(pass, actions = plan.len(), "starting playback pass");

            for action in &plan {
                if cancel.is_cancelled() || !Self::wait(action.delay(), cancel).await {
                    info!(keys_sent, "playback cancelled");
                    return Ok(PlaybackOutcome::Cancelled { keys_sent });
                }

                // A keypress in flight always completes its down/up pair
                self.sender
                    .send_key_press(action.key, action.modifiers, action.character)?;
                keys_sent += 1;
            }

            if !settings.loop_playback {
                info!(keys_sent, "playback finished");
                return Ok(PlaybackOutcome::Completed { keys_sent });
            }
        }
    }
}
