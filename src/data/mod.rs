use uuid::Uuid;

/// Visibility of a single cell from the players' point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Hidden,
    Open,
    Flagged,
}

/// Authoritative content of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellValue {
    Mine,
    /// Number of adjacent mines, 0..=8.
    Clear(u8),
}

/// A rectangular minefield: the mine layout plus the visibility grid.
///
/// Both grids are stored flat in row-major order; `row * cols + col`
/// addresses a cell.
#[derive(Debug)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub values: Vec<CellValue>,
    pub states: Vec<CellState>,
}

/// A participant of a room. `account` links to an external ranking
/// identity; guests have none and are skipped by score reporting.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub nickname: String,
    pub account: Option<String>,
}

/// A validated inbound game action, applied on behalf of a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Open { row: usize, col: usize },
    Flag { row: usize, col: usize },
}
