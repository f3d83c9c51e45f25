//! Wall-clock ticker advancing the simulation clock.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::api::RuntimeHandle;

/// Spawns a task that advances the simulation by `tick` every `tick` of wall
/// time. The task ends once the worker stops accepting commands.
pub fn spawn_ticker(handle: RuntimeHandle, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            timer.tick().await;
            if handle.advance(tick).await.is_err() {
                debug!("ticker stopped: simulation worker is gone");
                break;
            }
        }
    })
}
