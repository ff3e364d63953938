use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

/// Per-round turn rotation with elimination tracking.
///
/// The order is fixed when a round starts and never shrinks; eliminated
/// players stay in the order and are skipped by [`advance`](Self::advance).
#[derive(Debug, Default)]
pub struct TurnScheduler {
    order: Vec<Uuid>,
    current: usize,
    eliminated: HashSet<Uuid>,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shuffles `ids` into a fresh turn order, resets the cursor and
    /// clears eliminations.
    pub fn start_round(&mut self, ids: &[Uuid], rng: &mut impl Rng) {
        let mut order = ids.to_vec();
        order.shuffle(rng);
        self.order = order;
        self.current = 0;
        self.eliminated.clear();
    }

    /// The id whose turn it currently is, if a round has an order.
    pub fn current(&self) -> Option<Uuid> {
        self.order.get(self.current).copied()
    }

    pub fn eliminate(&mut self, id: Uuid) {
        self.eliminated.insert(id);
    }

    pub fn is_eliminated(&self, id: &Uuid) -> bool {
        self.eliminated.contains(id)
    }

    pub fn eliminated(&self) -> impl Iterator<Item = &Uuid> {
        self.eliminated.iter()
    }

    /// Players in the round, eliminated or not.
    pub fn player_count(&self) -> usize {
        self.order.len()
    }

    pub fn survivor_count(&self) -> usize {
        self.order.len() - self.eliminated.len()
    }

    pub fn survivors(&self) -> impl Iterator<Item = &Uuid> {
        self.order.iter().filter(|id| !self.eliminated.contains(id))
    }

    /// Moves the cursor to the next non-eliminated id, wrapping around.
    ///
    /// Bounded by one full lap of the order; callers must check
    /// `survivor_count() > 0` first. With a single non-eliminated
    /// player this lands back on them.
    pub fn advance(&mut self) {
        if self.order.is_empty() {
            return;
        }
        for _ in 0..self.order.len() {
            self.current = (self.current + 1) % self.order.len();
            if !self.eliminated.contains(&self.order[self.current]) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn start_round_is_a_permutation() {
        let players = ids(6);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(9));

        assert_eq!(scheduler.player_count(), 6);
        assert_eq!(scheduler.survivor_count(), 6);
        let mut sorted = scheduler.order.clone();
        sorted.sort();
        let mut expected = players.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn advance_rotates_through_all_players() {
        let players = ids(3);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(1));

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(scheduler.current().unwrap());
            scheduler.advance();
        }
        seen.sort();
        let mut expected = players;
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn advance_skips_eliminated_players() {
        let players = ids(4);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(2));

        let first = scheduler.current().unwrap();
        let second = {
            let mut probe = TurnScheduler::new();
            probe.start_round(&players, &mut StdRng::seed_from_u64(2));
            probe.advance();
            probe.current().unwrap()
        };

        scheduler.eliminate(second);
        scheduler.advance();
        let landed = scheduler.current().unwrap();
        assert_ne!(landed, second);
        assert_ne!(landed, first);
    }

    #[test]
    fn advance_never_lands_on_eliminated_id() {
        let players = ids(5);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(3));

        scheduler.eliminate(players[0]);
        scheduler.eliminate(players[2]);
        scheduler.eliminate(players[4]);

        for _ in 0..20 {
            scheduler.advance();
            let current = scheduler.current().unwrap();
            assert!(!scheduler.is_eliminated(&current));
        }
    }

    #[test]
    fn single_player_rotation_stays_put() {
        let players = ids(1);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(4));

        scheduler.advance();
        assert_eq!(scheduler.current(), Some(players[0]));
        assert_eq!(scheduler.survivor_count(), 1);
    }

    #[test]
    fn survivor_count_tracks_eliminations() {
        let players = ids(3);
        let mut scheduler = TurnScheduler::new();
        scheduler.start_round(&players, &mut StdRng::seed_from_u64(5));

        scheduler.eliminate(players[0]);
        assert_eq!(scheduler.survivor_count(), 2);
        scheduler.eliminate(players[1]);
        assert_eq!(scheduler.survivor_count(), 1);
        assert_eq!(scheduler.survivors().copied().collect::<Vec<_>>(), vec![
            players[2]
        ]);
    }
}
