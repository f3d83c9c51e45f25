use std::fmt;
use std::time::Duration;

/// Unique identifier for any entity tracked by the action system.
///
/// Holders, performers and action records all share this id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// First id handed out by a client-side allocator.
    ///
    /// Server ids grow from 1 and never reach this range, so records predicted
    /// locally on a client can never collide with replicated ones.
    pub const CLIENT_BASE: u32 = 1 << 31;

    /// Returns true if this id was allocated on a client replica.
    #[inline]
    pub const fn is_client_local(self) -> bool {
        self.0 >= Self::CLIENT_BASE
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of an action record. Records are entities in their own right.
pub type RecordId = EntityId;

/// Simulation time measured in whole milliseconds since the session started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameTime(pub u64);

impl GameTime {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs.max(0.0) * 1000.0).round() as u64)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Time elapsed since `earlier`, saturating at zero.
    pub fn saturating_since(self, earlier: GameTime) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl std::ops::Add<Duration> for GameTime {
    type Output = GameTime;

    fn add(self, rhs: Duration) -> GameTime {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        GameTime(self.0.saturating_add(millis))
    }
}

impl std::ops::AddAssign<Duration> for GameTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Identifier of a map (a disjoint coordinate space).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapId(pub u32);

/// A point in the world, expressed in map-local continuous coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPosition {
    pub map: MapId,
    pub x: f32,
    pub y: f32,
}

impl WorldPosition {
    pub const fn new(map: MapId, x: f32, y: f32) -> Self {
        Self { map, x, y }
    }

    /// Straight-line distance to `other`, or `None` when on different maps.
    pub fn distance(&self, other: &WorldPosition) -> Option<f32> {
        if self.map != other.map {
            return None;
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        Some((dx * dx + dy * dy).sqrt())
    }

    /// Returns true if `other` lies on the same map within `range`.
    pub fn in_range(&self, other: &WorldPosition, range: f32) -> bool {
        self.distance(other).is_some_and(|d| d <= range)
    }
}

impl fmt::Display for WorldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}) on map {}", self.x, self.y, self.map.0)
    }
}

/// Identifier of an action prototype (the data template records are spawned from).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PrototypeId(pub String);

impl PrototypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PrototypeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for PrototypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key naming the gameplay event a record raises when executed.
///
/// Collaborators subscribe to keys, never to the core's internals.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EventKey(pub String);

impl EventKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl From<&str> for EventKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
