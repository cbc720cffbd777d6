use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::feed::jsonp::is_valid_callback_name;
use crate::render::{RenderOptions, TimeFormat};

/// Live-betting widget host
#[derive(Parser, Debug, Clone)]
#[command(name = "live-betting", version, about)]
pub struct Config {
    /// Listen host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Directory of static assets (icons, stylesheets)
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// HTML entry point served at `/`; the embedded page is used when unset
    #[arg(long, env = "INDEX_PATH")]
    pub index_path: Option<PathBuf>,

    /// SQLite cache path (`:memory:` for no persistence)
    #[arg(long, env = "DATABASE_PATH", default_value = "livebetting.db")]
    pub database_path: String,

    /// JSONP live-events feed URL
    #[arg(
        long,
        env = "FEED_URL",
        default_value = "https://api.unicdn.net/v1/feeds/sportsbook/event/live.jsonp"
    )]
    pub feed_url: String,

    /// Feed application ID (`app_id` query parameter)
    #[arg(long, env = "FEED_APP_ID")]
    pub feed_app_id: Option<String>,

    /// Feed application key (`app_key` query parameter)
    #[arg(long, env = "FEED_APP_KEY")]
    pub feed_app_key: Option<String>,

    /// JSONP callback name sent as `callback=`
    #[arg(long, env = "FEED_CALLBACK", default_value = "liveCallback")]
    pub feed_callback: String,

    /// Card rotation period in milliseconds
    #[arg(long, env = "ROTATION_INTERVAL_MS", default_value = "3500")]
    pub rotation_interval_ms: u64,

    /// How long fetched events stay fresh, in seconds
    #[arg(long, env = "FRESHNESS_SECS", default_value = "120")]
    pub freshness_secs: u64,

    /// Cards shown at once
    #[arg(long, env = "VISIBLE_CARDS", default_value = "2")]
    pub visible_cards: usize,

    /// Clock format on the cards
    #[arg(long, env = "TIME_FORMAT", value_enum, default_value = "24h")]
    pub time_format: TimeFormat,

    /// Bet links point at `<root>/<event id>`
    #[arg(
        long,
        env = "BET_URL_ROOT",
        default_value = "https://www.unibet.com/betting#/event/live"
    )]
    pub bet_url_root: String,

    /// URL path of the sport icon directory
    #[arg(long, env = "ICON_BASE", default_value = "./images/icons")]
    pub icon_base: String,

    /// Transition style properties the display honours (comma separated)
    #[arg(
        long,
        env = "TRANSITION_PROPERTIES",
        value_delimiter = ',',
        default_value = "transition"
    )]
    pub transition_properties: Vec<String>,

    /// Complete each slide-out after this many milliseconds without a browser
    #[arg(long, env = "TRANSITION_MS")]
    pub transition_ms: Option<u64>,

    /// Re-request the feed when it stays silent this many seconds (never by default)
    #[arg(long, env = "FETCH_RETRY_SECS")]
    pub fetch_retry_secs: Option<u64>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rotation_interval_ms == 0 {
            anyhow::bail!("rotation_interval_ms must be positive");
        }
        if self.freshness_secs == 0 {
            anyhow::bail!("freshness_secs must be positive");
        }
        if self.visible_cards == 0 {
            anyhow::bail!("visible_cards must be at least 1");
        }
        if self.fetch_retry_secs == Some(0) {
            anyhow::bail!("fetch_retry_secs must be positive when set");
        }
        if !is_valid_callback_name(&self.feed_callback) {
            anyhow::bail!(
                "feed_callback '{}' is not a valid JavaScript identifier",
                self.feed_callback
            );
        }
        if let Err(e) = url::Url::parse(&self.feed_url) {
            anyhow::bail!("feed_url '{}' is invalid: {}", self.feed_url, e);
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            visible_count: self.visible_cards,
            icon_base: self.icon_base.trim_end_matches('/').to_string(),
            bet_url_root: self.bet_url_root.trim_end_matches('/').to_string(),
            time_format: self.time_format,
        }
    }

    pub fn rotation_period(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_secs as i64)
    }
}
