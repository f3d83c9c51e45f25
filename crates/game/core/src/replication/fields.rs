use bitflags::bitflags;

bitflags! {
    /// Tracks which fields of an [`ActionRecord`](crate::state::ActionRecord)
    /// changed since the last replication flush.
    ///
    /// Observers receive the full record payload; the mask tells them which
    /// parts to trust as new (a freshly spawned record carries every bit).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct RecordFields: u16 {
        const IDENTITY     = 1 << 0;
        const ENABLED      = 1 << 1;
        const TOGGLED      = 1 << 2;
        const COOLDOWN     = 1 << 3;
        const USE_DELAY    = 1 << 4;
        const CHARGES      = 1 << 5;
        const PRESENTATION = 1 << 6;
        const UPGRADE      = 1 << 7;
        const CONTAINER    = 1 << 8;
        const ATTACHED     = 1 << 9;
    }
}

impl RecordFields {
    /// Fields touched by post-execution bookkeeping.
    pub const EXECUTION: Self = Self::ENABLED
        .union(Self::TOGGLED)
        .union(Self::COOLDOWN)
        .union(Self::CHARGES);

    /// Container and grant relations.
    pub const RELATIONS: Self = Self::CONTAINER.union(Self::ATTACHED);
}
