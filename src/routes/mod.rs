use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{
    State, delete,
    futures::{SinkExt, StreamExt},
    get,
    http::Status,
    post,
    serde::json::Json,
};
use rocket_ws::{Channel, Message, WebSocket};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    data::Player,
    logic::{
        GameRoom, RoomConfig, Rooms,
        room::{DEFAULT_DIMENSION, DEFAULT_MINES},
    },
    model::{api::RoomDescriptor, client::ClientAction, server::ServerMessage},
    rate_limit::{ClientIp, RateLimiter},
    score::{self, SharedScoreReporter},
};

/// Inserts a room under a fresh nanoid, growing the id length if
/// collisions keep happening.
#[instrument(level = "trace", skip(rooms, config))]
fn add_room(rooms: &State<Rooms>, config: RoomConfig) -> RoomDescriptor {
    let mut id_length = 5;
    let max_attempts_per_length = 10;

    loop {
        for _ in 0..max_attempts_per_length {
            let id = nanoid!(id_length);
            match rooms.entry(id.clone()) {
                Entry::Occupied(_) => {
                    debug!("room id collision, trying another: {}", id);
                    continue;
                }
                Entry::Vacant(entry) => {
                    let room = GameRoom::new(id.clone(), config.clone());
                    let descriptor = room.descriptor();
                    entry.insert(Arc::new(Mutex::new(room)));
                    info!("created room {}", id);
                    return descriptor;
                }
            }
        }

        warn!(
            "exhausted id attempts at length {}, increasing to {}",
            id_length,
            id_length + 1
        );
        id_length += 1;
    }
}

#[post("/rooms?<name>&<rows>&<cols>&<mines>")]
#[instrument(level = "trace", skip(rooms, rate_limiter), fields(client_ip = %client_ip.0))]
pub fn create_room(
    name: String,
    rows: Option<usize>,
    cols: Option<usize>,
    mines: Option<usize>,
    rooms: &State<Rooms>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<RoomDescriptor>, Status> {
    rate_limiter.check(&client_ip).inspect_err(|_| {
        warn!("rate limit exceeded for client {}", client_ip.0);
    })?;

    let config = RoomConfig::sanitized(
        name,
        rows.unwrap_or(DEFAULT_DIMENSION),
        cols.unwrap_or(DEFAULT_DIMENSION),
        mines.unwrap_or(DEFAULT_MINES),
    );
    info!(
        "room creation request from {}: {}x{} with {} mines",
        client_ip.0, config.rows, config.cols, config.mines
    );

    Ok(Json(add_room(rooms, config)))
}

#[get("/rooms")]
pub async fn list_rooms(rooms: &State<Rooms>) -> Json<Vec<RoomDescriptor>> {
    // Clone the handles out first so no registry shard lock is held
    // while waiting on room mutexes.
    let handles: Vec<_> = rooms.iter().map(|entry| entry.value().clone()).collect();
    let mut descriptors = Vec::with_capacity(handles.len());
    for room in handles {
        descriptors.push(room.lock().await.descriptor());
    }
    Json(descriptors)
}

#[get("/rooms/<id>")]
pub async fn get_room(id: String, rooms: &State<Rooms>) -> Result<Json<RoomDescriptor>, Status> {
    let room = rooms.get(&id).ok_or(Status::NotFound)?.value().clone();
    let descriptor = room.lock().await.descriptor();
    Ok(Json(descriptor))
}

#[delete("/rooms/<id>")]
pub fn delete_room(id: String, rooms: &State<Rooms>) -> Status {
    match rooms.remove(&id) {
        Some(_) => {
            info!("room {} deleted", id);
            Status::NoContent
        }
        None => Status::NotFound,
    }
}

/// Serializes once and enqueues onto every connection's outbound
/// channel. Callers must not hold the room lock; the actual socket
/// writes happen in the per-connection writer tasks.
fn broadcast(senders: &[mpsc::UnboundedSender<Message>], message: &ServerMessage) {
    let Ok(text) = serde_json::to_string(message) else {
        return;
    };
    for sender in senders {
        let _ = sender.send(Message::Text(text.clone()));
    }
}

/// Applies one inbound action under the room lock, then broadcasts the
/// resulting delta and reports winner scores with the lock released.
/// Chat documents bypass the state machine and are relayed as-is under
/// the connection's authoritative nickname.
async fn handle_inbound(
    room_id: &str,
    room: &Arc<Mutex<GameRoom>>,
    reporter: &SharedScoreReporter,
    player_id: Uuid,
    nickname: &str,
    inbound: ClientAction,
) {
    if let Some(claimed) = inbound.sender_id() {
        if claimed != player_id.to_string() {
            debug!(
                room_id,
                claimed,
                authoritative = %player_id,
                "senderId mismatch, using connection identity"
            );
        }
    }

    let action = match inbound {
        ClientAction::Chat { message, .. } => {
            let senders = room.lock().await.sender_handles();
            broadcast(
                &senders,
                &ServerMessage::Chat {
                    sender: nickname.to_string(),
                    content: message,
                },
            );
            return;
        }
        ref other => match other.action() {
            Some(action) => action,
            None => return,
        },
    };
    let (result, senders) = {
        let mut room = room.lock().await;
        let mut rng = rand::rng();
        let result = room.handle_action(player_id, action, &mut rng);
        (result, room.sender_handles())
    };

    match result {
        Ok(outcome) => {
            broadcast(&senders, &outcome.message);
            score::report_winners(reporter, &outcome.winners);
        }
        Err(reason) => {
            debug!(room_id, player_id = %player_id, %reason, "action rejected");
        }
    }
}

#[get("/ws?<id>&<name>&<account>")]
#[instrument(level = "trace", skip(ws, rooms, reporter), fields(room_id = %id))]
pub fn websocket_handler(
    ws: WebSocket,
    rooms: &State<Rooms>,
    reporter: &State<SharedScoreReporter>,
    id: String,
    name: String,
    account: Option<String>,
) -> Result<Channel<'static>, Status> {
    let room = match rooms.get(&id) {
        None => {
            warn!("websocket connection attempt for non-existent room: {}", id);
            return Err(Status::NotFound);
        }
        Some(value) => value.value().clone(),
    };
    let rooms = rooms.inner().clone();
    let reporter = reporter.inner().clone();

    Ok(ws.channel(move |stream| {
        Box::pin(async move {
            let (mut write, mut read) = stream.split();
            let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

            let player = Player {
                id: Uuid::new_v4(),
                nickname: name,
                account: account.filter(|a| !a.is_empty()),
            };
            let player_id = player.id;
            let nickname = player.nickname.clone();

            let joined = {
                let mut room = room.lock().await;
                match room.add_player(player, tx) {
                    Ok(()) => Some((
                        room.membership_update(format!("{nickname} joined the room.")),
                        room.sender_handles(),
                    )),
                    Err(reason) => {
                        warn!(room_id = %id, %reason, "join rejected");
                        None
                    }
                }
            };

            let Some((join_message, senders)) = joined else {
                let _ = write.close().await;
                return Ok(());
            };

            let writer = tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    if write.send(message).await.is_err() {
                        break;
                    }
                }
            });

            // The join notice carries the full snapshot, so the new
            // client renders current state without replaying history.
            broadcast(&senders, &join_message);
            info!(room_id = %id, player_id = %player_id, "client connected");

            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientAction>(&text) {
                            Ok(inbound) => {
                                handle_inbound(&id, &room, &reporter, player_id, &nickname, inbound)
                                    .await;
                            }
                            Err(e) => {
                                warn!(room_id = %id, error = %e, "invalid action document");
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!(room_id = %id, player_id = %player_id, "connection closed");
                        break;
                    }
                    Err(e) => {
                        error!(room_id = %id, player_id = %player_id, error = %e, "websocket error");
                        break;
                    }
                    _ => {
                        debug!(room_id = %id, "ignoring non-text message");
                    }
                }
            }

            let (leave_message, game_over, senders, now_empty) = {
                let mut room = room.lock().await;
                let removed = room.remove_player(&player_id);
                let now_empty = room.is_empty();
                let was_member = removed.is_some();
                let game_over = removed.and_then(|(_, message)| message);
                let message = (was_member && !now_empty)
                    .then(|| room.membership_update(format!("{nickname} left the room.")));
                (message, game_over, room.sender_handles(), now_empty)
            };

            if let Some(message) = leave_message {
                broadcast(&senders, &message);
            }
            if let Some(message) = game_over {
                broadcast(&senders, &message);
            }
            if now_empty {
                rooms.remove(&id);
                info!(room_id = %id, "room removed after last player left");
            }

            writer.abort();
            info!(room_id = %id, player_id = %player_id, "client disconnected");
            Ok(())
        })
    }))
}
