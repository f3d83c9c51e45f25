mod common;
mod container;
mod ledger;
mod record;

pub use common::{EntityId, EventKey, GameTime, MapId, PrototypeId, RecordId, WorldPosition};
pub use container::ActionContainer;
pub use ledger::GrantLedger;
pub use record::{ActionRecord, Cooldown, Presentation, UpgradeDescriptor};
