//! Single-task event loop driving [`LiveBetting`].
//!
//! Timer ticks, feed deliveries, completion signals and the optional retry
//! deadline are all handled from one `select!`, so renders never overlap.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{LiveBetting, Phase, SharedDisplay};
use crate::models::EventList;

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Period of the repeating rotation timer
    pub rotation_period: Duration,
    /// Emit the completion signal this long after an animation starts
    pub headless_transition: Option<Duration>,
    /// Re-request the feed when it stays silent this long
    pub fetch_retry: Option<Duration>,
}

/// Published after every event for the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatus {
    pub phase: Phase,
    pub event_count: usize,
}

impl Default for WidgetStatus {
    fn default() -> Self {
        WidgetStatus {
            phase: Phase::Idle,
            event_count: 0,
        }
    }
}

impl WidgetStatus {
    fn of(widget: &LiveBetting) -> Self {
        WidgetStatus {
            phase: widget.phase(),
            event_count: widget.events().len(),
        }
    }
}

/// Hands completion signals to the event loop, consuming the display's
/// one-shot listener on the way.
#[derive(Clone)]
pub struct CompletionSink {
    display: SharedDisplay,
    tx: mpsc::Sender<String>,
}

impl CompletionSink {
    pub fn new(display: SharedDisplay) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        (CompletionSink { display, tx }, rx)
    }

    /// Returns false when nothing is listening for `signal`.
    pub fn deliver(&self, signal: &str) -> bool {
        if !self.display.take_signal(signal) {
            return false;
        }
        if let Err(e) = self.tx.try_send(signal.to_string()) {
            warn!("Completion signal '{}' DROPPED: {}", signal, e);
            return false;
        }
        true
    }
}

/// Run the widget until the process exits.
pub async fn run(
    mut widget: LiveBetting,
    mut feed_rx: mpsc::Receiver<EventList>,
    mut signal_rx: mpsc::Receiver<String>,
    sink: CompletionSink,
    status: watch::Sender<WidgetStatus>,
    options: RuntimeOptions,
) {
    info!(
        "Widget loop started (rotation={:?}, headless transition={:?}, retry={:?})",
        options.rotation_period, options.headless_transition, options.fetch_retry
    );
    widget.start();

    let mut ticker: Option<(u64, Interval)> = None;
    let mut retry_at: Option<Instant> = None;

    loop {
        status.send_replace(WidgetStatus::of(&widget));
        sync_timer(&widget, &mut ticker, options.rotation_period);
        retry_at = match (widget.phase(), options.fetch_retry) {
            (Phase::Fetching | Phase::Expired, Some(after)) => {
                Some(retry_at.unwrap_or_else(|| Instant::now() + with_jitter(after)))
            }
            _ => None,
        };

        tokio::select! {
            _ = next_tick(&mut ticker) => {
                let before = widget.phase();
                widget.on_tick();
                if before != Phase::Animating && widget.phase() == Phase::Animating {
                    schedule_completion(&widget, &sink, options.headless_transition);
                }
            }
            Some(payload) = feed_rx.recv() => {
                widget.on_feed(payload);
            }
            Some(signal) = signal_rx.recv() => {
                widget.on_animation_end(&signal);
            }
            _ = wait_until(retry_at) => {
                retry_at = None;
                widget.retry_fetch();
            }
        }
    }
}

/// Keep the tokio interval in step with the widget's timer generation.
fn sync_timer(widget: &LiveBetting, ticker: &mut Option<(u64, Interval)>, period: Duration) {
    match (widget.timer_generation(), ticker.as_ref()) {
        (Some(generation), Some((armed, _))) if generation == *armed => {}
        (Some(generation), _) => {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some((generation, interval));
            debug!("Rotation timer armed (generation {})", generation);
        }
        (None, Some(_)) => {
            *ticker = None;
            debug!("Rotation timer cancelled");
        }
        (None, None) => {}
    }
}

async fn next_tick(ticker: &mut Option<(u64, Interval)>) {
    match ticker {
        Some((_, interval)) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn schedule_completion(widget: &LiveBetting, sink: &CompletionSink, delay: Option<Duration>) {
    let (Some(delay), Some(signal)) = (delay, widget.completion_signal()) else {
        return;
    };
    let sink = sink.clone();
    let signal = signal.to_string();
    tokio::spawn(async move {
        sleep(delay).await;
        if !sink.deliver(&signal) {
            debug!("Headless '{}' had no listener", signal);
        }
    });
}

/// Up to 10% extra so restarted widgets don't hit the feed in lockstep.
fn with_jitter(base: Duration) -> Duration {
    let spread = (base.as_millis() / 10) as u64;
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
}
