use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

pub mod board;
pub mod room;
pub mod turns;

pub use room::{ActionOutcome, ActionRejected, GameRoom, RoomConfig, TurnMode};
pub use turns::TurnScheduler;

/// The room directory: a concurrent map so lookups for one room never
/// block another. Each room carries its own mutex — the unit of
/// exclusion is the room, not the registry.
pub type Rooms = Arc<DashMap<String, Arc<Mutex<GameRoom>>>>;
