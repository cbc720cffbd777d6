//! The rotating live-betting widget.
//!
//! ```text
//!   start ──cache hit──▶ IDLE ◀──────────── completion signal ──┐
//!     │                   │ tick (fresh, events)                │
//!     │                   ▼                                     │
//!     │               ANIMATING ────────────────────────────────┘
//!     │                   │ tick (stale), from IDLE or ANIMATING
//!     │                   ▼
//!     └──cache miss──▶ EXPIRED ──request──▶ FETCHING ──payload──▶ IDLE
//! ```
//!
//! Expiry is judged on the wall clock against the fetch timestamp, so it
//! still fires when a completion signal never arrives. A slide-out that is
//! under way when the data expires still completes its swap while the fetch
//! is outstanding, so the last-known cards stay on screen.

pub mod animation;
pub mod clock;
pub mod display;
pub mod runtime;

pub use clock::{Clock, SystemClock};
pub use display::{Display, DisplaySnapshot, SharedDisplay};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheEntry, CacheStore};
use crate::feed::FeedRequester;
use crate::models::EventList;
use crate::render::Renderer;
use animation::SLIDE_OUT_CLASS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Animating,
    /// Data is stale and the refetch could not be started yet
    Expired,
    Fetching,
}

/// Everything the widget talks to, injected so tests can swap in fakes.
pub struct Collaborators {
    pub feed: Arc<dyn FeedRequester>,
    pub cache: Box<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
    pub display: Box<dyn Display>,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Maximum age of cached data before a refetch
    pub freshness_window: Duration,
    /// Completion signal resolved at startup; `None` if the host supports none
    pub completion_signal: Option<String>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            freshness_window: Duration::seconds(120),
            completion_signal: Some("transitionend".into()),
        }
    }
}

pub struct LiveBetting {
    feed: Arc<dyn FeedRequester>,
    cache: Box<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    display: Box<dyn Display>,
    renderer: Renderer,
    options: SchedulerOptions,

    events: EventList,
    fetched_at: Option<DateTime<Utc>>,
    phase: Phase,
    /// Slide-out class applied and waiting for its completion signal
    sliding: bool,
    /// Generation of the armed repeating timer; `None` while cancelled
    timer: Option<u64>,
    generations: u64,
}

impl LiveBetting {
    pub fn new(collab: Collaborators, renderer: Renderer, options: SchedulerOptions) -> Self {
        LiveBetting {
            feed: collab.feed,
            cache: collab.cache,
            clock: collab.clock,
            display: collab.display,
            renderer,
            options,
            events: EventList::default(),
            fetched_at: None,
            phase: Phase::Idle,
            sliding: false,
            timer: None,
            generations: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn events(&self) -> &EventList {
        &self.events
    }

    /// Changes every time the repeating timer is re-armed; `None` when cancelled.
    pub fn timer_generation(&self) -> Option<u64> {
        self.timer
    }

    pub fn completion_signal(&self) -> Option<&str> {
        self.options.completion_signal.as_deref()
    }

    /// Seed from the cache if possible, otherwise go straight to the feed.
    pub fn start(&mut self) {
        match self.cache.load() {
            Ok(Some(CacheEntry {
                payload,
                fetched_at,
            })) => {
                info!(
                    "Starting from cache: {} event(s) fetched at {}",
                    payload.len(),
                    fetched_at
                );
                self.events = payload;
                self.fetched_at = Some(fetched_at);
                self.phase = Phase::Idle;
                self.render();
                self.arm_timer();
            }
            Ok(None) => {
                info!("No cached live events, requesting feed");
                self.begin_fetch();
            }
            Err(e) => {
                warn!("Ignoring unreadable cache: {}", e);
                self.begin_fetch();
            }
        }
    }

    /// One period of the repeating timer.
    pub fn on_tick(&mut self) {
        if self.timer.is_none() {
            debug!("Tick after timer cancellation ignored");
            return;
        }

        if self.is_expired() {
            info!(
                "Live events older than {}s, refreshing",
                self.options.freshness_window.num_seconds()
            );
            if let Err(e) = self.cache.clear() {
                warn!("Failed to clear cache: {}", e);
            }
            self.begin_fetch();
            return;
        }

        match self.phase {
            Phase::Idle if !self.events.is_empty() => self.start_animation(),
            Phase::Animating => debug!("Still waiting for completion signal"),
            _ => {}
        }
    }

    /// The display finished the slide-out transition.
    pub fn on_animation_end(&mut self, signal: &str) {
        if !self.sliding {
            debug!("Completion signal '{}' outside animation ignored", signal);
            return;
        }
        if self.completion_signal() != Some(signal) {
            debug!("Unexpected completion signal '{}' ignored", signal);
            return;
        }

        self.display.set_markup(String::new());
        self.display.remove_class(SLIDE_OUT_CLASS);
        self.sliding = false;
        self.events.rotate();
        self.render();
        if self.phase == Phase::Animating {
            self.phase = Phase::Idle;
        }
        debug!("Rotated to next card");
    }

    /// A payload arrived from the feed.
    pub fn on_feed(&mut self, payload: EventList) {
        let now = self.clock.now().with_timezone(&Utc);
        if let Err(e) = self.cache.save(&payload, now) {
            warn!("Failed to cache live events: {}", e);
        }
        info!("Showing {} fresh live event(s)", payload.len());

        self.events = payload;
        self.fetched_at = Some(now);
        if self.sliding {
            self.sliding = false;
            self.display.remove_class(SLIDE_OUT_CLASS);
            self.display.clear_listener();
        }
        self.render();
        self.phase = Phase::Idle;
        self.arm_timer();
    }

    /// Abandon the outstanding request and issue a new one.
    pub fn retry_fetch(&mut self) {
        if !matches!(self.phase, Phase::Fetching | Phase::Expired) {
            return;
        }
        info!("Feed did not answer, retrying");
        self.feed.cancel_pending();
        self.begin_fetch();
    }

    fn is_expired(&self) -> bool {
        let now = self.clock.now().with_timezone(&Utc);
        self.fetched_at.is_some_and(|fetched_at| {
            cache::is_expired(fetched_at, now, self.options.freshness_window)
        })
    }

    fn begin_fetch(&mut self) {
        self.phase = Phase::Expired;
        self.cancel_timer();
        match self.feed.request_data() {
            Ok(()) => self.phase = Phase::Fetching,
            Err(e) => warn!("Could not request live events: {}", e),
        }
    }

    fn start_animation(&mut self) {
        self.display.add_class(SLIDE_OUT_CLASS);
        if let Some(signal) = &self.options.completion_signal {
            self.display.listen_once(signal);
        }
        self.sliding = true;
        self.phase = Phase::Animating;
    }

    fn render(&mut self) {
        let markup = self.renderer.render(&self.events, self.clock.now());
        self.display.set_markup(markup);
    }

    fn arm_timer(&mut self) {
        self.generations += 1;
        self.timer = Some(self.generations);
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }
}
