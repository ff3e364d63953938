use std::collections::HashMap;

use serde::Serialize;

/// Full room state as rendered to clients: sent on join and embedded in
/// every outbound delta. Grids are transmitted whole on each update — no
/// diffing, boards are at most 30x30.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub version: u32,
    /// -1 for a mine, 0..=8 adjacency otherwise.
    pub board: Vec<Vec<i8>>,
    /// 0 hidden, 1 open, 2 flagged.
    #[serde(rename = "viewState")]
    pub view_state: Vec<Vec<u8>>,
    pub playing: bool,
    #[serde(rename = "playerNames")]
    pub player_names: HashMap<String, String>,
    #[serde(rename = "currentTurnId")]
    pub current_turn_id: Option<String>,
    #[serde(rename = "eliminatedUsers")]
    pub eliminated_users: Vec<String>,
    #[serde(rename = "remainingCells")]
    pub remaining_cells: usize,
}

/// Outbound state document, broadcast to every connection in the room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "GAME_START")]
    GameStart {
        content: String,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    #[serde(rename = "UPDATE")]
    Update {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    #[serde(rename = "GAME_OVER")]
    GameOver {
        content: String,
        #[serde(rename = "isWin")]
        is_win: bool,
        #[serde(rename = "winnerNames")]
        winner_names: Vec<String>,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    /// Chat relay. Carries no snapshot; the room state is unchanged.
    #[serde(rename = "CHAT")]
    Chat { sender: String, content: String },
}
