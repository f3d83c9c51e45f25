//! Periodic eviction of expired cooldown markers.

use tracing::debug;

use crate::replication::RecordFields;
use crate::state::{GameTime, RecordId};

use super::ActionEngine;

impl<'a> ActionEngine<'a> {
    /// Clears cooldown markers on granted records whose window ended at least
    /// `cooldown_expiry_grace` before `now`. Returns the number cleared.
    ///
    /// Gating compares `end > now` directly, so this never changes whether a
    /// record can run; it only drops stale timestamps.
    pub fn sweep_cooldowns(&mut self, now: GameTime) -> usize {
        let grace = self.world.config().expiry_grace();
        let expired: Vec<RecordId> = self
            .world
            .ledgers()
            .flat_map(|ledger| ledger.records())
            .filter(|id| {
                self.world
                    .record(*id)
                    .and_then(|r| r.cooldown())
                    .is_some_and(|cooldown| cooldown.end + grace <= now)
            })
            .collect();

        for record in &expired {
            if let Some(entry) = self.world.record_mut(*record) {
                entry.cooldown = None;
            }
            self.world.mark_dirty(*record, RecordFields::COOLDOWN);
        }

        if !expired.is_empty() {
            debug!(cleared = expired.len(), %now, "swept expired cooldowns");
        }
        expired.len()
    }
}
