use clap::Parser;
use tracing::info;

use crate::{
    config::{Config, StartArgs},
    seed::Seed,
    state::FileManager,
};

pub mod clock;
pub mod config;
pub mod error;
pub mod file;
pub mod folder;
pub mod router;
pub mod seed;
pub mod state;
pub mod view;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let StartArgs {
        config_path,
        address: host,
        port,
        log_level: level,
    } = StartArgs::parse();

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::read(config_path).expect("invalid config file");

    let seed = Seed::load(config.seed_dir.as_deref()).expect("invalid seed data");

    let latency = config.latency();
    info!("Store latency: {latency:?}, folder delete policy: {:?}", config.folder_delete);

    let state = FileManager::new(seed, latency, config.folder_delete);

    let addr = format!("{host}:{port}");

    info!("Now listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("error while starting TCP listener");

    let router = router::router(state);

    axum::serve(listener, router)
        .await
        .expect("error while starting server");
}
