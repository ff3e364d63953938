use std::sync::Arc;

use tracing::{debug, info};

use crate::data::Player;

/// Game kind reported to the ranking collaborator.
pub const GAME_KIND: &str = "Mine";

/// Score delta credited per win.
pub const WIN_SCORE_DELTA: i64 = -1;

/// Collaborator that forwards match results to an external ranking
/// system. The engine never calls this directly; routes invoke it after
/// a GAME_OVER broadcast, outside any room lock.
pub trait ScoreReporter: Send + Sync {
    fn report(&self, account: &str, game_kind: &str, delta: i64);
}

pub type SharedScoreReporter = Arc<dyn ScoreReporter>;

/// Default reporter: records results in the log. A deployment wires a
/// real ranking client in here instead.
pub struct LogScoreReporter;

impl ScoreReporter for LogScoreReporter {
    fn report(&self, account: &str, game_kind: &str, delta: i64) {
        info!(account, game_kind, delta, "score reported");
    }
}

/// Reports one result per winner holding a linked account. Guests are
/// skipped; an empty winner list reports nothing.
pub fn report_winners(reporter: &SharedScoreReporter, winners: &[Player]) {
    for winner in winners {
        match &winner.account {
            Some(account) => reporter.report(account, GAME_KIND, WIN_SCORE_DELTA),
            None => debug!(nickname = %winner.nickname, "guest winner, no score reported"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct RecordingReporter {
        calls: Mutex<Vec<(String, String, i64)>>,
    }

    impl ScoreReporter for RecordingReporter {
        fn report(&self, account: &str, game_kind: &str, delta: i64) {
            self.calls
                .lock()
                .unwrap()
                .push((account.to_string(), game_kind.to_string(), delta));
        }
    }

    fn player(account: Option<&str>) -> Player {
        Player {
            id: Uuid::new_v4(),
            nickname: "p".to_string(),
            account: account.map(str::to_string),
        }
    }

    #[test]
    fn reports_only_linked_winners() {
        let recorder = Arc::new(RecordingReporter::default());
        let reporter: SharedScoreReporter = recorder.clone();

        report_winners(&reporter, &[
            player(Some("alice")),
            player(None),
            player(Some("bob")),
        ]);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("alice".to_string(), GAME_KIND.to_string(), WIN_SCORE_DELTA));
        assert_eq!(calls[1].0, "bob");
    }

    #[test]
    fn no_winners_reports_nothing() {
        let recorder = Arc::new(RecordingReporter::default());
        let reporter: SharedScoreReporter = recorder.clone();
        report_winners(&reporter, &[]);
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
