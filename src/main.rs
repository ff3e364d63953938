use std::sync::Arc;

use dashmap::DashMap;
use mineroom_server::{
    cleanup::start_cleanup_task,
    cors::create_cors,
    logic::Rooms,
    rate_limit::RateLimiter,
    routes::{create_room, delete_room, get_room, list_rooms, websocket_handler},
    score::{LogScoreReporter, SharedScoreReporter},
};
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
    routes,
};
use tracing::{info, warn};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Cleanup Task",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Some(rooms) = rocket.state::<Rooms>() {
            info!("starting cleanup task for abandoned rooms");
            let rooms_for_cleanup = rooms.clone();
            tokio::spawn(async move {
                start_cleanup_task(rooms_for_cleanup).await;
            });
        } else {
            warn!("failed to get room registry for cleanup task");
        }
        Ok(rocket)
    }
}

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("starting multiplayer minesweeper room server");

    let rooms: Rooms = Arc::new(DashMap::new());
    let rate_limiter = RateLimiter::from_env();
    let score_reporter: SharedScoreReporter = Arc::new(LogScoreReporter);

    rocket::build()
        .attach(create_cors())
        .attach(CleanupFairing)
        .manage(rooms)
        .manage(rate_limiter)
        .manage(score_reporter)
        .mount("/", routes![
            create_room,
            list_rooms,
            get_room,
            delete_room,
            websocket_handler
        ])
}
