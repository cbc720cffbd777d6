use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::jsonp::unwrap_jsonp;
use super::payload::parse_payload;
use super::registry::{CallbackRegistry, Ticket};
use super::{FeedError, FeedRequester};

/// Trait every feed transport must implement.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// GET `url` and return the raw response body.
    async fn fetch(&self, url: &Url) -> Result<String, FeedError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Plain HTTPS transport for the JSONP feed.
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FeedError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(HttpTransport { http })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &Url) -> Result<String, FeedError> {
        let resp = self.http.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status().as_u16()));
        }
        Ok(resp.text().await?)
    }
}

/// Fires feed requests and hands their payloads to the callback registry.
#[derive(Clone)]
pub struct FeedClient {
    transport: Arc<dyn FeedTransport>,
    registry: CallbackRegistry,
    feed_url: Url,
}

impl FeedClient {
    /// `app_id` / `app_key` are appended as query parameters when given.
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        registry: CallbackRegistry,
        feed_url: &str,
        app_id: Option<&str>,
        app_key: Option<&str>,
    ) -> Result<Self, FeedError> {
        let mut feed_url = Url::parse(feed_url)?;
        {
            let mut query = feed_url.query_pairs_mut();
            if let Some(id) = app_id {
                query.append_pair("app_id", id);
            }
            if let Some(key) = app_key {
                query.append_pair("app_key", key);
            }
        }
        Ok(FeedClient {
            transport,
            registry,
            feed_url,
        })
    }

    /// The feed URL with the `callback` parameter attached.
    pub fn request_url(&self) -> Url {
        let mut url = self.feed_url.clone();
        url.query_pairs_mut()
            .append_pair("callback", self.registry.name());
        url
    }

    async fn fetch_and_deliver(
        transport: Arc<dyn FeedTransport>,
        registry: CallbackRegistry,
        url: Url,
        ticket: Ticket,
    ) {
        let payload = match fetch_payload(transport.as_ref(), &url, registry.name()).await {
            Ok(p) => p,
            Err(e) => {
                // Slot stays claimed: the callback simply never fires.
                warn!("Feed request via '{}' failed: {}", transport.name(), e);
                return;
            }
        };

        let count = payload.len();
        match registry.complete(ticket, payload) {
            Ok(()) => info!("Feed delivered {} live event(s)", count),
            Err(e) => debug!("Discarding feed response: {}", e),
        }
    }
}

async fn fetch_payload(
    transport: &dyn FeedTransport,
    url: &Url,
    callback: &str,
) -> Result<crate::models::EventList, FeedError> {
    let body = transport.fetch(url).await?;
    let json = unwrap_jsonp(&body, callback)?;
    parse_payload(json)
}

impl FeedRequester for FeedClient {
    fn request_data(&self) -> Result<(), FeedError> {
        let ticket = self.registry.begin()?;
        let url = self.request_url();
        debug!("Requesting live events from {}", url.path());

        tokio::spawn(Self::fetch_and_deliver(
            Arc::clone(&self.transport),
            self.registry.clone(),
            url,
            ticket,
        ));
        Ok(())
    }

    fn cancel_pending(&self) {
        self.registry.cancel();
    }
}
