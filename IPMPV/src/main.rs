use std::sync::Arc;

use anyhow::{Context, Result};
use ipmchannels::{ChannelDirectory, ChannelError, load_channels};
use ipmconfig::get_config;
use ipmcontrol::{
    Dispatcher, DisplayController, Localization, MediaSession, MpvEngine, MpvOptions,
    Placeholders, RemoteExt, RetroArchLauncher, VolumeSession,
};
use ipmosd::{CoordinatorOptions, TracingSurface, overlay_channel, spawn_coordinator};
use ipmserver::{ConfigExt, Server};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = get_config();

    // ========== PHASE 1 : Serveur et logs ==========

    let mut server = Server::new_configured();
    server.init_logging().await;
    let info = server.info();
    server
        .add_route("/info", move || {
            let info = info.clone();
            async move {
                serde_json::json!({
                    "name": info.name,
                    "version": env!("CARGO_PKG_VERSION"),
                    "base_url": info.base_url,
                    "http_port": info.http_port,
                })
            }
        })
        .await;

    // ========== PHASE 2 : Chaînes ==========

    let channels = match load_channels(&config) {
        Ok(channels) => channels,
        Err(ChannelError::NotConfigured) => {
            error!("❌ No playlist URL configured (playlist.url or IPMPV_M3U_URL)");
            return Err(ChannelError::NotConfigured.into());
        }
        Err(e) => return Err(e.into()),
    };
    if channels.is_empty() {
        warn!("⚠️ Playlist is empty, channel commands will be rejected");
    }
    let channels = Arc::new(ChannelDirectory::new(channels));
    info!("📺 {} channel(s) loaded", channels.len());

    // ========== PHASE 3 : OSD ==========

    let (overlay, overlay_rx) = overlay_channel();
    let corner_radius = config.get_osd_corner_radius().unwrap_or(15);
    let _coordinator = spawn_coordinator(
        overlay_rx,
        TracingSurface::new(corner_radius),
        CoordinatorOptions::from_config(&config),
    )
    .context("Cannot start OSD coordinator")?;

    // ========== PHASE 4 : Lecteur, volume, affichage ==========

    info!("🎬 Starting mpv...");
    let engine = Arc::new(
        MpvEngine::spawn(&MpvOptions::from_config(&config)).context("Cannot start mpv")?,
    );

    let media = Arc::new(MediaSession::new(
        engine.clone(),
        channels,
        overlay.clone(),
        Placeholders::from_config(&config),
    ));
    media
        .spawn_log_watcher()
        .context("Cannot start engine log watcher")?;

    let volume = Arc::new(VolumeSession::from_config(&config, overlay));
    let display_ctl = Arc::new(DisplayController::from_config(&config));
    let resolution = display_ctl.current();
    info!("🖥️ Display resolution: {}", resolution);

    let dispatcher = Arc::new(Dispatcher::new(
        media.clone(),
        volume,
        display_ctl,
        Arc::new(RetroArchLauncher::from_config(&config)),
        Arc::new(Localization::load(&config.get_default_language())),
    ));

    // ========== PHASE 5 : Routes HTTP ==========

    server
        .init_config_api()
        .await
        .context("Cannot initialize configuration API")?;
    server.init_remote(dispatcher).await;

    info!("🌐 Starting HTTP server...");
    server.start().await;

    info!("✅ IPMPV is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    info!("🛑 Stopping player...");
    media.hide_overlay();
    media.stop();
    engine.shutdown();

    Ok(())
}
