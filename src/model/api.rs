use serde::Serialize;

/// REST-facing description of a room, returned by the directory routes.
#[derive(Debug, Clone, Serialize)]
pub struct RoomDescriptor {
    pub id: String,
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    #[serde(rename = "playerCount")]
    pub player_count: usize,
    pub playing: bool,
}
