use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "steward=info,steward_discord=info,steward_games=info".into()
            }),
        )
        .init();

    // load config: explicit path via STEWARD_CONFIG > ~/.steward/steward.toml
    let config_path = std::env::var("STEWARD_CONFIG").ok();
    let config = steward_core::StewardConfig::load(config_path.as_deref())?;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    steward_tracker::db::init_db(&db)?;
    steward_commands::db::init_db(&db)?;
    steward_games::db::init_db(&db)?;
    steward_events::db::init_db(&db)?;
    info!("database migrations complete");
    drop(db);

    // build subsystems — each gets its own connection for thread safety
    let tracker = steward_tracker::Tracker::new(shared_conn(&db_path)?, config.xp.clone())?;
    let commands = steward_commands::CustomCommands::new(shared_conn(&db_path)?)?;
    let games = steward_games::GamesHandle::new(Connection::open(&db_path)?)?;
    let game_timer =
        steward_games::GameTimer::new(Connection::open(&db_path)?, config.games.poll_secs)?;
    let events = steward_events::EventManager::new(shared_conn(&db_path)?, config.events.clone())?;
    let thermometer = steward_slowmode::Thermometer::new(&config.slowmode);

    if config.web.enabled {
        let state = Arc::new(steward_web::WebState {
            db: Mutex::new(Connection::open(&db_path)?),
            ranks: config.xp.ranks.clone(),
        });
        let bind = config.web.bind.clone();
        let port = config.web.port;
        tokio::spawn(async move {
            if let Err(e) = steward_web::serve(state, &bind, port).await {
                tracing::error!(error = %e, "web surface failed");
            }
        });
    }

    let app = Arc::new(steward_discord::App::new(
        config,
        tracker,
        commands,
        games,
        game_timer,
        events,
        thermometer,
    ));

    // Runs until the fatal configuration error ends the connection.
    steward_discord::Adapter::new(app).run().await?;
    Ok(())
}

fn shared_conn(path: &str) -> anyhow::Result<Arc<Mutex<Connection>>> {
    Ok(Arc::new(Mutex::new(Connection::open(path)?)))
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
