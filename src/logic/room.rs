use std::{collections::HashMap, time::Instant};

use rand::Rng;
use rocket_ws::Message;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    data::{Action, Board, CellState, CellValue, Player},
    logic::turns::TurnScheduler,
    model::{
        self,
        api::RoomDescriptor,
        server::{ServerMessage, Snapshot},
    },
};

pub const MIN_DIMENSION: usize = 5;
pub const MAX_DIMENSION: usize = 30;
pub const DEFAULT_DIMENSION: usize = 10;
pub const DEFAULT_MINES: usize = 15;

/// Whether actions rotate through a turn order or any survivor may act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnMode {
    #[default]
    Rotating,
    Free,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub turn_mode: TurnMode,
}

impl RoomConfig {
    /// Applies the server-side clamps: dimensions outside [5, 30] fall
    /// back to 10, and a mine count that would fill the board is reset
    /// to a fifth of the cells.
    pub fn sanitized(name: String, rows: usize, cols: usize, mines: usize) -> Self {
        let rows = if (MIN_DIMENSION..=MAX_DIMENSION).contains(&rows) {
            rows
        } else {
            DEFAULT_DIMENSION
        };
        let cols = if (MIN_DIMENSION..=MAX_DIMENSION).contains(&cols) {
            cols
        } else {
            DEFAULT_DIMENSION
        };
        let mines = if mines >= rows * cols {
            rows * cols / 5
        } else {
            mines
        };

        Self {
            name,
            rows,
            cols,
            mines,
            turn_mode: TurnMode::default(),
        }
    }
}

/// Why an action was dropped. Rejections never produce an outbound
/// message; the caller logs the reason and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("no round is in progress")]
    NotPlaying,
    #[error("a round is already in progress")]
    RoundInProgress,
    #[error("sender is not a member of this room")]
    NotInRoom,
    #[error("sender has been eliminated")]
    Eliminated,
    #[error("it is not the sender's turn")]
    NotYourTurn,
    #[error("target cell is out of bounds or not hidden")]
    InvalidCell,
}

/// Result of an accepted action: the delta to broadcast, plus the
/// winners (non-empty only on a winning game over) so the caller can
/// report scores after releasing the room lock.
#[derive(Debug)]
pub struct ActionOutcome {
    pub message: ServerMessage,
    pub winners: Vec<Player>,
}

/// The authoritative state of one room. Mutated strictly under its
/// registry-held `Mutex`; every method here is synchronous and bounded
/// by the board size, so the lock is never held across an await.
pub struct GameRoom {
    id: String,
    config: RoomConfig,
    board: Board,
    players: Vec<Player>,
    senders: HashMap<Uuid, UnboundedSender<Message>>,
    scheduler: TurnScheduler,
    remaining_safe_cells: usize,
    playing: bool,
    last_activity: Instant,
}

impl GameRoom {
    pub fn new(id: String, config: RoomConfig) -> Self {
        let board = Board::empty(config.rows, config.cols);
        Self {
            id,
            config,
            board,
            players: Vec::new(),
            senders: HashMap::new(),
            scheduler: TurnScheduler::new(),
            remaining_safe_cells: 0,
            playing: false,
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn descriptor(&self) -> RoomDescriptor {
        RoomDescriptor {
            id: self.id.clone(),
            name: self.config.name.clone(),
            rows: self.config.rows,
            cols: self.config.cols,
            mines: self.config.mines,
            player_count: self.players.len(),
            playing: self.playing,
        }
    }

    /// Registers a player and their outbound channel. Joining is gated
    /// on the round boundary: nobody enters mid-round.
    pub fn add_player(
        &mut self,
        player: Player,
        sender: UnboundedSender<Message>,
    ) -> Result<(), ActionRejected> {
        if self.playing {
            return Err(ActionRejected::RoundInProgress);
        }
        self.last_activity = Instant::now();
        self.senders.insert(player.id, sender);
        info!(room_id = %self.id, player_id = %player.id, nickname = %player.nickname, "player joined");
        self.players.push(player);
        Ok(())
    }

    /// Drops a player. Mid-round the leaver is treated as eliminated so
    /// the rotation skips them. If the last survivor leaves the round
    /// ends as a loss, otherwise the eliminated players still connected
    /// could never act again or restart. The returned message, if any,
    /// is the game-over delta for the caller to broadcast.
    pub fn remove_player(&mut self, id: &Uuid) -> Option<(Player, Option<ServerMessage>)> {
        self.last_activity = Instant::now();
        self.senders.remove(id);
        let position = self.players.iter().position(|p| p.id == *id)?;
        let player = self.players.remove(position);

        let mut game_over = None;
        if self.playing {
            self.scheduler.eliminate(*id);
            if self.scheduler.survivor_count() == 0 {
                let content = format!("{} left as the last survivor. Nobody wins.", player.nickname);
                game_over = Some(self.finish_round(false, Vec::new(), content).message);
            } else if self.scheduler.current() == Some(*id) {
                self.scheduler.advance();
            }
        }

        info!(room_id = %self.id, player_id = %id, "player left");
        Some((player, game_over))
    }

    /// Cloned outbound handles for broadcasting after the lock is gone.
    pub fn sender_handles(&self) -> Vec<UnboundedSender<Message>> {
        self.senders.values().cloned().collect()
    }

    pub fn should_cleanup(&self, empty_timeout_secs: u64) -> bool {
        self.is_empty() && self.last_activity.elapsed().as_secs() > empty_timeout_secs
    }

    /// Applies one inbound action. Exactly one delta on success; a typed
    /// reason on rejection, which the caller must not broadcast.
    #[instrument(level = "trace", skip(self, rng), fields(room_id = %self.id))]
    pub fn handle_action(
        &mut self,
        sender: Uuid,
        action: Action,
        rng: &mut impl Rng,
    ) -> Result<ActionOutcome, ActionRejected> {
        if !self.players.iter().any(|p| p.id == sender) {
            return Err(ActionRejected::NotInRoom);
        }
        self.last_activity = Instant::now();

        match action {
            Action::Start => self.start_round(rng),
            Action::Open { row, col } => self.open_cell(sender, row, col),
            Action::Flag { row, col } => self.flag_cell(sender, row, col),
        }
    }

    fn start_round(&mut self, rng: &mut impl Rng) -> Result<ActionOutcome, ActionRejected> {
        if self.playing {
            return Err(ActionRejected::RoundInProgress);
        }

        let RoomConfig {
            rows, cols, mines, ..
        } = self.config;
        self.board = Board::generate(rows, cols, mines, rng);
        self.remaining_safe_cells = rows * cols - mines;

        let ids: Vec<Uuid> = self.players.iter().map(|p| p.id).collect();
        self.scheduler.start_round(&ids, rng);
        self.playing = true;

        info!(room_id = %self.id, players = ids.len(), "round started");
        Ok(ActionOutcome {
            message: ServerMessage::GameStart {
                content: "Minesweeper started! Open cells and avoid the mines.".to_string(),
                snapshot: self.snapshot(),
            },
            winners: Vec::new(),
        })
    }

    /// Shared gate for in-round actions: round running, sender alive,
    /// and (in rotating mode) holding the turn.
    fn guard_turn(&self, sender: Uuid) -> Result<(), ActionRejected> {
        if !self.playing {
            return Err(ActionRejected::NotPlaying);
        }
        if self.scheduler.is_eliminated(&sender) {
            return Err(ActionRejected::Eliminated);
        }
        if self.config.turn_mode == TurnMode::Rotating
            && self.scheduler.current() != Some(sender)
        {
            return Err(ActionRejected::NotYourTurn);
        }
        Ok(())
    }

    fn open_cell(
        &mut self,
        sender: Uuid,
        row: usize,
        col: usize,
    ) -> Result<ActionOutcome, ActionRejected> {
        self.guard_turn(sender)?;
        if !self.board.is_hidden(row, col) {
            return Err(ActionRejected::InvalidCell);
        }

        if self.board.value(row, col) == CellValue::Mine {
            return Ok(self.open_mine(sender, row, col));
        }

        let opened = self.board.open(row, col);
        self.remaining_safe_cells -= opened;
        debug!(room_id = %self.id, row, col, opened, remaining = self.remaining_safe_cells, "cells opened");

        if self.remaining_safe_cells == 0 {
            let winners = self.survivor_players();
            let content = "Board cleared! The survivors win together.".to_string();
            return Ok(self.finish_round(true, winners, content));
        }

        self.next_turn();
        Ok(self.update_outcome(None))
    }

    fn open_mine(&mut self, sender: Uuid, row: usize, col: usize) -> ActionOutcome {
        self.board.states[row * self.config.cols + col] = CellState::Open;
        self.scheduler.eliminate(sender);
        let nickname = self.nickname(sender);
        debug!(room_id = %self.id, player_id = %sender, row, col, "player hit a mine");

        match self.scheduler.survivor_count() {
            0 => {
                let content = format!("{nickname} hit a mine. Nobody survived!");
                self.finish_round(false, Vec::new(), content)
            }
            // A lone player cannot win by outliving opponents they never
            // had; clearing the board is their only win.
            1 if self.scheduler.player_count() > 1 => {
                let winners = self.survivor_players();
                let content = match winners.first() {
                    Some(winner) => format!("{nickname} hit a mine. {} survives and wins!", winner.nickname),
                    None => format!("{nickname} hit a mine. The last survivor wins!"),
                };
                self.finish_round(true, winners, content)
            }
            _ => {
                self.next_turn();
                self.update_outcome(Some(format!("{nickname} hit a mine and is out.")))
            }
        }
    }

    fn flag_cell(
        &mut self,
        sender: Uuid,
        row: usize,
        col: usize,
    ) -> Result<ActionOutcome, ActionRejected> {
        self.guard_turn(sender)?;
        if !self.board.toggle_flag(row, col) {
            return Err(ActionRejected::InvalidCell);
        }
        // Flagging keeps the turn and never touches the safe-cell count.
        debug!(room_id = %self.id, row, col, "flag toggled");
        Ok(self.update_outcome(None))
    }

    fn next_turn(&mut self) {
        if self.config.turn_mode == TurnMode::Rotating {
            self.scheduler.advance();
        }
    }

    fn finish_round(
        &mut self,
        is_win: bool,
        winners: Vec<Player>,
        content: String,
    ) -> ActionOutcome {
        self.board.reveal_mines();
        self.playing = false;
        info!(room_id = %self.id, is_win, winners = winners.len(), "round finished");

        ActionOutcome {
            message: ServerMessage::GameOver {
                content,
                is_win,
                winner_names: winners.iter().map(|p| p.nickname.clone()).collect(),
                snapshot: self.snapshot(),
            },
            winners,
        }
    }

    fn update_outcome(&self, content: Option<String>) -> ActionOutcome {
        ActionOutcome {
            message: ServerMessage::Update {
                content,
                snapshot: self.snapshot(),
            },
            winners: Vec::new(),
        }
    }

    /// Join/leave notice carrying the full state so late joiners render
    /// without replaying history.
    pub fn membership_update(&self, content: String) -> ServerMessage {
        ServerMessage::Update {
            content: Some(content),
            snapshot: self.snapshot(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let board = self
            .board
            .values
            .chunks(self.config.cols)
            .map(|row| {
                row.iter()
                    .map(|value| match value {
                        CellValue::Mine => model::WIRE_MINE,
                        CellValue::Clear(n) => *n as i8,
                    })
                    .collect()
            })
            .collect();
        let view_state = self
            .board
            .states
            .chunks(self.config.cols)
            .map(|row| {
                row.iter()
                    .map(|state| match state {
                        CellState::Hidden => model::WIRE_HIDDEN,
                        CellState::Open => model::WIRE_OPEN,
                        CellState::Flagged => model::WIRE_FLAGGED,
                    })
                    .collect()
            })
            .collect();

        Snapshot {
            version: model::PROTOCOL_VERSION,
            board,
            view_state,
            playing: self.playing,
            player_names: self
                .players
                .iter()
                .map(|p| (p.id.to_string(), p.nickname.clone()))
                .collect(),
            current_turn_id: if self.playing {
                self.scheduler.current().map(|id| id.to_string())
            } else {
                None
            },
            eliminated_users: self.scheduler.eliminated().map(Uuid::to_string).collect(),
            remaining_cells: self.remaining_safe_cells,
        }
    }

    fn survivor_players(&self) -> Vec<Player> {
        self.players
            .iter()
            .filter(|p| !self.scheduler.is_eliminated(&p.id))
            .cloned()
            .collect()
    }

    fn nickname(&self, id: Uuid) -> String {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.nickname.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
