//! TaskDesk desktop shell.
//!
//! Run with: cargo run -p taskdesk-shell
//! Configuration: `config/taskdesk.toml` (or `TASKDESK_CONFIG`) and `TASKDESK_*` env vars.

mod app;
mod window;

use eframe::egui;
use std::sync::Arc;
use taskdesk_core::{DurableStore, MemoryStore, PresentationMode, ShellConfig, SledStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ShellConfig::load()?;
    let routes = config.route_table()?;
    let storage: Arc<dyn DurableStore> = if config.ephemeral {
        tracing::info!("ephemeral session; credential kept in memory");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.credential_store_path();
        tracing::info!(path = %path.display(), "opening credential store");
        Arc::new(SledStore::open(Some(path))?)
    };
    tracing::info!(api = %config.api_base_url, "starting TaskDesk shell");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    // listeners are spawned from the UI thread
    let _enter = runtime.enter();
    let handle = runtime.handle().clone();

    let login = PresentationMode::Login.geometry();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([login.width as f32, login.height as f32])
            .with_title("TaskDesk"),
        ..Default::default()
    };

    eframe::run_native(
        "TaskDesk",
        options,
        Box::new(move |cc| {
            let app = app::ShellApp::new(cc.egui_ctx.clone(), handle, &config, storage, routes)
                .map_err(|e| e.to_string())?;
            Ok(Box::new(app))
        }),
    )?;
    Ok(())
}
