mod bridge;
mod console;

use crate::bridge::{HeadlessDevice, LoggingTransport, SharedPlayer};
use crate::console::Console;
use botdeck_core::{CoreError, DashboardEngine, DeckConfig, PlayerEngine};
use botdeck_gateway::{
    ApiClient, CommandDispatcher, ControlChannel, EventHub, GatewayError, MonitorPoller,
    PairedChannel, SseTransport,
};
use botdeck_visualizer::{CanvasSpec, RingTap, TicketClock, WaveformPipeline};
use std::fs::File;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Initialize logging with optional file output.
    // Check config for logging.enabled before the full config load.
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match DeckConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            eprintln!("A configuration template has been created at {}.", path.display());
            eprintln!("Edit it with your gateway address and start botdeck again.");
            std::process::exit(0);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    // Create tokio runtime for background tasks
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {e}");
    }

    if let Err(e) = runtime.block_on(run(config, cancel_token)) {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: DeckConfig, cancel_token: CancellationToken) -> Result<(), GatewayError> {
    let engine = DashboardEngine::new();
    let api = Arc::new(ApiClient::new(&config.gateway.base_url)?);

    // The audio element stand-in: transport owned by the player, signal tee
    // owned by the visualizer.
    let window = config.visualizer.window;
    let (transport, signal) = LoggingTransport::new(window * 4);
    let player: SharedPlayer = Arc::new(Mutex::new(PlayerEngine::new(
        transport,
        api.stream_endpoint(),
    )));

    let mut pipeline = WaveformPipeline::new(
        Box::new(TicketClock::new()),
        CanvasSpec::new(48.0, 8.0, 1.0),
    );
    pipeline.attach(
        Box::new(RingTap::new(signal, window)),
        Box::new(HeadlessDevice),
        window,
    );
    let pipeline = Arc::new(Mutex::new(pipeline));

    // Control channel: headless runs have no socket endpoint. Dropping the
    // peer leaves the channel disconnected, so every command takes the
    // request/response fallback - the two paths carry identical intent.
    let (channel, peer) = PairedChannel::new();
    drop(peer);

    // Seed state from the bulk endpoints; a failed fetch degrades to an
    // empty widget, not a crash.
    bootstrap(&api, &engine).await;

    // One shared push connection for every widget
    match SseTransport::connect(api.http(), api.base_url()).await {
        Ok(transport) => {
            let hub = EventHub::new(Box::new(transport));
            let subscription = hub.subscribe().await;
            tokio::spawn(bridge::fold_events(
                subscription,
                engine.clone(),
                player.clone(),
                cancel_token.clone(),
            ));
        }
        Err(e) => {
            warn!("push stream unavailable, widgets will rely on polls: {e}");
        }
    }

    let poller = Arc::new(MonitorPoller::new(
        api.clone(),
        engine.clone(),
        config.monitor.poll_interval_secs,
        Some(cancel_token.clone()),
    ));
    let _monitor = poller.start();

    let player_channel: Arc<dyn ControlChannel> = channel.clone();
    tokio::spawn(bridge::run_player(
        player_channel.clone(),
        player.clone(),
        cancel_token.clone(),
    ));
    tokio::spawn(bridge::log_dashboard_events(
        engine.clone(),
        cancel_token.clone(),
    ));

    let dispatcher = CommandDispatcher::new(player_channel, api.clone());
    let console = Console {
        engine,
        player,
        dispatcher,
        api,
        pipeline: pipeline.clone(),
        guild_id: config.gateway.guild_id,
    };
    console.run(cancel_token.clone()).await;

    // Teardown: every registration is revoked; each release stands alone.
    cancel_token.cancel();
    channel.close();
    pipeline.lock().await.detach();
    info!("botdeck shut down");
    Ok(())
}

async fn bootstrap(api: &ApiClient, engine: &Arc<DashboardEngine>) {
    match api.chat_logs(100).await {
        Ok(items) => {
            info!("loaded {} chat entries", items.len());
            engine.load_chat(items).await;
        }
        Err(e) => warn!("chat log bootstrap failed: {e}"),
    }
    match api.channels().await {
        Ok(listing) => {
            info!(
                "loaded {} public / {} private channels",
                listing.public.len(),
                listing.private.len()
            );
            engine.load_channels(listing.public, listing.private).await;
        }
        Err(e) => warn!("channel bootstrap failed: {e}"),
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading so tracing comes up first.
/// Returns `false` if the config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let config_path = DeckConfig::config_path();
    let Ok(content) = std::fs::read_to_string(&config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = DeckConfig::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
