use rand::Rng;

use crate::data::{Board, CellState, CellValue};

impl Board {
    /// An all-clear, all-hidden board. Rooms hold one of these between
    /// rounds so a snapshot can always be rendered.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            mines: 0,
            values: vec![CellValue::Clear(0); rows * cols],
            states: vec![CellState::Hidden; rows * cols],
        }
    }

    /// Generates a fresh board with exactly `mines` mines placed uniformly
    /// at random, adjacency counts filled in and all cells hidden.
    ///
    /// The caller is responsible for clamping parameters beforehand;
    /// `mines >= rows * cols` is a caller bug and panics.
    pub fn generate(rows: usize, cols: usize, mines: usize, rng: &mut impl Rng) -> Self {
        assert!(
            mines < rows * cols,
            "mine count {mines} must be below cell count {}",
            rows * cols
        );

        let mut values = vec![CellValue::Clear(0); rows * cols];

        // Sampling without replacement by rejection: duplicates are rare
        // because creation clamps mines well below the cell count.
        let mut placed = 0;
        while placed < mines {
            let index = rng.random_range(0..rows * cols);
            if values[index] != CellValue::Mine {
                values[index] = CellValue::Mine;
                placed += 1;
            }
        }

        for row in 0..rows {
            for col in 0..cols {
                let index = row * cols + col;
                if values[index] == CellValue::Mine {
                    continue;
                }

                let mut count = 0;
                for dr in -1i32..=1 {
                    for dc in -1i32..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = row as i32 + dr;
                        let nc = col as i32 + dc;
                        if nr >= 0
                            && nr < rows as i32
                            && nc >= 0
                            && nc < cols as i32
                            && values[nr as usize * cols + nc as usize] == CellValue::Mine
                        {
                            count += 1;
                        }
                    }
                }
                values[index] = CellValue::Clear(count);
            }
        }

        Self {
            rows,
            cols,
            mines,
            values,
            states: vec![CellState::Hidden; rows * cols],
        }
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn value(&self, row: usize, col: usize) -> CellValue {
        self.values[self.index(row, col)]
    }

    pub fn state(&self, row: usize, col: usize) -> CellState {
        self.states[self.index(row, col)]
    }

    pub fn is_hidden(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && self.state(row, col) == CellState::Hidden
    }

    /// Opens a hidden clear cell, cascading through its zero-adjacency
    /// region, and returns how many clear cells were newly opened.
    ///
    /// Out-of-bounds coordinates and non-hidden cells are a no-op
    /// returning 0, so repeated opens are idempotent. Uses an explicit
    /// work list instead of call recursion so large boards cannot
    /// exhaust the stack; each cell is marked open before its neighbors
    /// are pushed, which bounds the walk and counts every cell once.
    pub fn open(&mut self, row: usize, col: usize) -> usize {
        if !self.is_hidden(row, col) {
            return 0;
        }

        let mut opened = 0;
        let mut pending = vec![(row, col)];

        while let Some((r, c)) = pending.pop() {
            let index = self.index(r, c);
            if self.states[index] != CellState::Hidden {
                continue;
            }

            // Zero cells have no mined neighbors, so the cascade can
            // never walk onto a mine; only the starting cell could be
            // one and the state machine handles that case separately.
            if self.values[index] == CellValue::Mine {
                continue;
            }

            self.states[index] = CellState::Open;
            opened += 1;

            if self.values[index] != CellValue::Clear(0) {
                continue;
            }

            for dr in -1i32..=1 {
                for dc in -1i32..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    let nr = r as i32 + dr;
                    let nc = c as i32 + dc;
                    if nr >= 0 && nr < self.rows as i32 && nc >= 0 && nc < self.cols as i32 {
                        pending.push((nr as usize, nc as usize));
                    }
                }
            }
        }

        opened
    }

    /// Toggles a flag on a hidden cell. Returns false when the cell is
    /// out of bounds or already open.
    pub fn toggle_flag(&mut self, row: usize, col: usize) -> bool {
        if !self.in_bounds(row, col) {
            return false;
        }
        let index = self.index(row, col);
        match self.states[index] {
            CellState::Hidden => {
                self.states[index] = CellState::Flagged;
                true
            }
            CellState::Flagged => {
                self.states[index] = CellState::Hidden;
                true
            }
            CellState::Open => false,
        }
    }

    /// Marks every mine open. Called once when a round ends so clients
    /// can render the full layout.
    pub fn reveal_mines(&mut self) {
        for index in 0..self.values.len() {
            if self.values[index] == CellValue::Mine {
                self.states[index] = CellState::Open;
            }
        }
    }

    /// Number of clear cells still hidden.
    pub fn hidden_clear_cells(&self) -> usize {
        self.values
            .iter()
            .zip(&self.states)
            .filter(|(value, state)| **value != CellValue::Mine && **state == CellState::Hidden)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn generate_places_exact_mine_count() {
        for seed in 0..5 {
            let board = Board::generate(10, 12, 25, &mut rng(seed));
            let mines = board
                .values
                .iter()
                .filter(|v| **v == CellValue::Mine)
                .count();
            assert_eq!(mines, 25);
            assert!(board.states.iter().all(|s| *s == CellState::Hidden));
        }
    }

    #[test]
    fn generate_adjacency_counts_match_neighbors() {
        let board = Board::generate(9, 9, 20, &mut rng(42));
        for row in 0..board.rows {
            for col in 0..board.cols {
                let CellValue::Clear(adjacent) = board.value(row, col) else {
                    continue;
                };
                let mut expected = 0;
                for dr in -1i32..=1 {
                    for dc in -1i32..=1 {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        let nr = row as i32 + dr;
                        let nc = col as i32 + dc;
                        if nr >= 0
                            && nr < board.rows as i32
                            && nc >= 0
                            && nc < board.cols as i32
                            && board.value(nr as usize, nc as usize) == CellValue::Mine
                        {
                            expected += 1;
                        }
                    }
                }
                assert_eq!(adjacent, expected, "cell ({row}, {col})");
            }
        }
    }

    #[test]
    #[should_panic(expected = "mine count")]
    fn generate_rejects_full_board() {
        Board::generate(5, 5, 25, &mut rng(0));
    }

    #[test]
    fn open_is_idempotent_and_counts_once() {
        let mut board = Board::generate(8, 8, 10, &mut rng(7));
        let (row, col) = first_clear(&board);

        let opened = board.open(row, col);
        assert!(opened >= 1);
        assert_eq!(board.hidden_clear_cells(), 64 - 10 - opened);

        assert_eq!(board.open(row, col), 0);
        assert_eq!(board.hidden_clear_cells(), 64 - 10 - opened);
    }

    #[test]
    fn open_out_of_bounds_is_noop() {
        let mut board = Board::generate(5, 5, 3, &mut rng(1));
        assert_eq!(board.open(5, 0), 0);
        assert_eq!(board.open(0, 99), 0);
        assert_eq!(board.hidden_clear_cells(), 22);
    }

    #[test]
    fn open_zero_cell_floods_entire_region() {
        // A single mine in the corner leaves one big zero region; opening
        // any zero cell must reveal every clear cell whose region it
        // touches, each exactly once.
        let mut board = Board::empty(4, 4);
        board.mines = 1;
        board.values[0] = CellValue::Mine;
        board.values[1] = CellValue::Clear(1);
        board.values[4] = CellValue::Clear(1);
        board.values[5] = CellValue::Clear(1);

        let opened = board.open(3, 3);
        // Everything but the mine is connected through zero cells.
        assert_eq!(opened, 15);
        assert_eq!(board.hidden_clear_cells(), 0);
        assert_eq!(board.state(0, 0), CellState::Hidden);
    }

    #[test]
    fn open_skips_flagged_cells_in_cascade() {
        let mut board = Board::empty(3, 3);
        board.toggle_flag(1, 1);
        let opened = board.open(0, 0);
        assert_eq!(opened, 8);
        assert_eq!(board.state(1, 1), CellState::Flagged);
    }

    #[test]
    fn flag_toggles_between_hidden_and_flagged() {
        let mut board = Board::generate(5, 5, 5, &mut rng(3));
        assert!(board.toggle_flag(2, 2));
        assert_eq!(board.state(2, 2), CellState::Flagged);
        assert!(board.toggle_flag(2, 2));
        assert_eq!(board.state(2, 2), CellState::Hidden);
        assert!(!board.toggle_flag(9, 9));

        let (row, col) = first_clear(&board);
        board.open(row, col);
        assert!(!board.toggle_flag(row, col));
    }

    #[test]
    fn reveal_mines_opens_every_mine() {
        let mut board = Board::generate(6, 6, 8, &mut rng(11));
        board.reveal_mines();
        for index in 0..36 {
            if board.values[index] == CellValue::Mine {
                assert_eq!(board.states[index], CellState::Open);
            }
        }
    }

    fn first_clear(board: &Board) -> (usize, usize) {
        let index = board
            .values
            .iter()
            .position(|v| *v != CellValue::Mine)
            .unwrap();
        (index / board.cols, index % board.cols)
    }
}
