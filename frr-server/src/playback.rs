//! Frame-driven playback task
//!
//! One task per playing replay. It ticks the scrubber on a fixed interval
//! and broadcasts the assembled frame. The task carries the generation it
//! was started under, so a tick racing a reload is rejected by the replay
//! itself and the task exits.

use crate::state::AppState;
use frr_core::replay::TickOutcome;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Start the playback task, cancelling any previous one
pub async fn start_playback_task(state: AppState) {
    let token = CancellationToken::new();
    {
        let mut cancel = state.playback_cancel.write().await;
        if let Some(previous) = cancel.replace(token.clone()) {
            previous.cancel();
        }
    }

    let generation = state.replay.read().await.generation();
    tokio::spawn(run(state, token, generation));
}

/// Cancel the running playback task, if any
pub async fn stop_playback_task(state: &AppState) {
    let mut cancel = state.playback_cancel.write().await;
    if let Some(token) = cancel.take() {
        token.cancel();
    }
}

async fn run(state: AppState, token: CancellationToken, generation: u64) {
    tracing::info!(generation, "Playback task started");

    let mut interval = tokio::time::interval(state.frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let (outcome, playing, frame) = {
            let mut replay = state.replay.write().await;
            let outcome = replay.tick(generation, state.clock.now());
            let frame = match outcome {
                TickOutcome::Advanced | TickOutcome::Finished => replay.frame(),
                TickOutcome::Stale | TickOutcome::Idle => None,
            };
            (outcome, replay.scrubber().is_playing(), frame)
        };

        if let Some(frame) = frame {
            let _ = state.frame_tx.send(Arc::new(frame));
        }

        match outcome {
            TickOutcome::Stale => {
                tracing::debug!(generation, "Playback tick outlived its session");
                break;
            }
            TickOutcome::Finished => {
                tracing::info!(generation, "Playback reached the last sample");
                break;
            }
            TickOutcome::Idle if !playing => break,
            TickOutcome::Idle | TickOutcome::Advanced => {}
        }
    }

    tracing::info!(generation, "Playback task ended");
}
