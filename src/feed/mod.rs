pub mod client;
pub mod jsonp;
pub mod payload;
pub mod registry;

pub use client::{FeedClient, HttpTransport};
pub use registry::CallbackRegistry;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("malformed JSONP body: {0}")]
    Jsonp(String),

    #[error("failed to decode feed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid feed URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("a feed request is already in flight")]
    RequestInFlight,

    #[error("feed delivery does not match the pending request")]
    StaleTicket,

    #[error("feed delivery channel is full, payload dropped")]
    DeliveryDropped,

    #[error("feed receiver has been dropped")]
    ChannelClosed,
}

/// The widget's view of the feed: fire a request, or abandon the pending one.
///
/// Responses never come back through this trait; they arrive later on the
/// registry's delivery channel.
pub trait FeedRequester: Send + Sync {
    /// Start a request and return immediately.
    fn request_data(&self) -> Result<(), FeedError>;

    /// Forget the in-flight request so a late response is discarded.
    fn cancel_pending(&self);
}
