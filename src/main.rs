use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

mod cache;
mod config;
mod feed;
mod models;
mod render;
mod server;
mod widget;

use cache::SqliteCache;
use config::Config;
use feed::{CallbackRegistry, FeedClient, HttpTransport};
use render::Renderer;
use server::AppState;
use widget::animation::resolve_completion_signal;
use widget::runtime::{self, CompletionSink, RuntimeOptions, WidgetStatus};
use widget::{Collaborators, LiveBetting, SchedulerOptions, SharedDisplay, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open cache
    let cache = SqliteCache::open(&config.database_path)?;
    info!("Cache opened: {}", config.database_path);

    // Resolve the completion signal once, up front
    let completion_signal = resolve_completion_signal(config.transition_properties.as_slice());
    match completion_signal {
        Some(signal) => info!("Card transitions complete on '{}'", signal),
        None => warn!(
            "No supported transition property in {:?}; cards will not rotate",
            config.transition_properties
        ),
    }

    // Build feed client
    let (registry, feed_rx) = CallbackRegistry::new(&config.feed_callback);
    let feed = FeedClient::new(
        Arc::new(HttpTransport::new()?),
        registry,
        &config.feed_url,
        config.feed_app_id.as_deref(),
        config.feed_app_key.as_deref(),
    )?;

    let display = SharedDisplay::new();
    let (sink, signal_rx) = CompletionSink::new(display.clone());
    let (status_tx, status_rx) = watch::channel(WidgetStatus::default());

    let widget = LiveBetting::new(
        Collaborators {
            feed: Arc::new(feed),
            cache: Box::new(cache),
            clock: Arc::new(SystemClock),
            display: Box::new(display.clone()),
        },
        Renderer::new(config.render_options()),
        SchedulerOptions {
            freshness_window: config.freshness_window(),
            completion_signal: completion_signal.map(str::to_string),
        },
    );

    let runtime_options = RuntimeOptions {
        rotation_period: config.rotation_period(),
        headless_transition: config.transition_ms.map(Duration::from_millis),
        fetch_retry: config.fetch_retry_secs.map(Duration::from_secs),
    };
    tokio::spawn(runtime::run(
        widget,
        feed_rx,
        signal_rx,
        sink.clone(),
        status_tx,
        runtime_options,
    ));

    // Start the HTTP server
    let app = server::router(
        AppState {
            display,
            sink,
            status: status_rx,
        },
        &config.static_dir,
        config.index_path.as_deref(),
    );
    let addr: SocketAddr = config.listen_addr().parse()?;
    info!("Serving {} on http://{}", config.static_dir.display(), addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
