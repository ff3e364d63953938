use std::{env, time::Duration};

use tokio::time;
use tracing::{debug, info};

use crate::logic::Rooms;

/// Periodically removes empty rooms that nobody joined. Rooms are
/// normally deleted the moment their last player disconnects; this task
/// is the backstop for rooms created over REST and then abandoned.
pub async fn start_cleanup_task(rooms: Rooms) {
    let cleanup_interval_secs: u64 = env::var("CLEANUP_INTERVAL_SECONDS")
        .unwrap_or_else(|_| "60".to_string())
        .parse()
        .unwrap_or(60);

    let empty_timeout_secs: u64 = env::var("EMPTY_ROOM_TIMEOUT_SECONDS")
        .unwrap_or_else(|_| "600".to_string())
        .parse()
        .unwrap_or(600);

    let mut interval = time::interval(Duration::from_secs(cleanup_interval_secs));

    info!(
        "started room cleanup task: checking every {}s, empty-room timeout: {}s",
        cleanup_interval_secs, empty_timeout_secs
    );

    loop {
        interval.tick().await;
        cleanup_rooms(&rooms, empty_timeout_secs).await;
    }
}

async fn cleanup_rooms(rooms: &Rooms, empty_timeout_secs: u64) {
    let mut rooms_to_remove = Vec::new();

    for entry in rooms.iter() {
        // Skip rooms whose lock is held; they are in use by definition.
        if let Ok(room) = entry.value().try_lock()
            && room.should_cleanup(empty_timeout_secs)
        {
            rooms_to_remove.push(entry.key().clone());
        }
    }

    let removed_count = rooms_to_remove.len();
    for room_id in rooms_to_remove {
        rooms.remove(&room_id);
        debug!("cleaned up room: {}", room_id);
    }

    if removed_count > 0 {
        info!("cleaned up {} abandoned rooms", removed_count);
    }
}
