//! voxmemo: a terminal voice memo recorder with playback and text-to-speech.

mod app;
mod commands;
mod config;
mod error;
mod logging;
mod media;
mod playback;
mod recording;
mod setup;
mod speech;
mod storage;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal error: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
