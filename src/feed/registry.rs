//! Explicit stand-in for the global JSONP callback.
//!
//! One request may be pending at a time. [`CallbackRegistry::begin`] hands out a
//! [`Ticket`] for it, and [`CallbackRegistry::complete`] delivers the payload
//! for that ticket at most once. Delivery goes through a channel drained by the
//! widget's event loop, so a payload can never reach the widget while
//! `request_data` is still on the stack.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::FeedError;
use crate::models::EventList;

/// Identifies one pending feed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    pending: Option<u64>,
}

#[derive(Clone)]
pub struct CallbackRegistry {
    name: Arc<str>,
    slot: Arc<Mutex<Slot>>,
    tx: mpsc::Sender<EventList>,
}

impl CallbackRegistry {
    /// Create a registry for `name` and the receiver its payloads arrive on.
    pub fn new(name: &str) -> (Self, mpsc::Receiver<EventList>) {
        let (tx, rx) = mpsc::channel(8);
        let registry = CallbackRegistry {
            name: Arc::from(name),
            slot: Arc::new(Mutex::new(Slot::default())),
            tx,
        };
        (registry, rx)
    }

    /// Callback name sent to the feed as `&callback=`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Claim the single pending slot.
    pub fn begin(&self) -> Result<Ticket, FeedError> {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if slot.pending.is_some() {
            return Err(FeedError::RequestInFlight);
        }
        slot.next_id += 1;
        let id = slot.next_id;
        slot.pending = Some(id);
        debug!("Callback '{}' armed (ticket {})", self.name, id);
        Ok(Ticket(id))
    }

    /// Deliver the payload for `ticket`, releasing the slot.
    ///
    /// Fails with [`FeedError::StaleTicket`] if the ticket was cancelled or
    /// already delivered.
    pub fn complete(&self, ticket: Ticket, payload: EventList) -> Result<(), FeedError> {
        {
            let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
            if slot.pending != Some(ticket.0) {
                return Err(FeedError::StaleTicket);
            }
            slot.pending = None;
        }

        match self.tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                error!("Feed delivery channel full, payload DROPPED");
                Err(FeedError::DeliveryDropped)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(FeedError::ChannelClosed),
        }
    }

    /// Release the slot without delivering anything.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(id) = slot.pending.take() {
            debug!("Callback '{}' cancelled (ticket {})", self.name, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::events;

    #[test]
    fn test_second_begin_is_rejected_while_pending() {
        let (registry, _rx) = CallbackRegistry::new("liveCallback");
        registry.begin().unwrap();
        assert!(matches!(registry.begin(), Err(FeedError::RequestInFlight)));
    }

    #[test]
    fn test_complete_delivers_once() {
        let (registry, mut rx) = CallbackRegistry::new("liveCallback");
        let ticket = registry.begin().unwrap();

        registry.complete(ticket, events(2)).unwrap();
        assert_eq!(rx.try_recv().unwrap().len(), 2);

        assert!(matches!(
            registry.complete(ticket, events(1)),
            Err(FeedError::StaleTicket)
        ));
        assert!(rx.try_recv().is_err());
        assert!(registry.begin().is_ok());
    }

    #[test]
    fn test_full_channel_reports_dropped_delivery() {
        let (registry, _rx) = CallbackRegistry::new("liveCallback");
        for _ in 0..8 {
            let ticket = registry.begin().unwrap();
            registry.complete(ticket, events(1)).unwrap();
        }

        let ticket = registry.begin().unwrap();
        assert!(matches!(
            registry.complete(ticket, events(1)),
            Err(FeedError::DeliveryDropped)
        ));
        assert!(registry.begin().is_ok());
    }

    #[test]
    fn test_closed_receiver_reports_channel_closed() {
        let (registry, rx) = CallbackRegistry::new("liveCallback");
        drop(rx);
        let ticket = registry.begin().unwrap();
        assert!(matches!(
            registry.complete(ticket, events(1)),
            Err(FeedError::ChannelClosed)
        ));
    }

    #[test]
    fn test_cancelled_ticket_is_stale() {
        let (registry, mut rx) = CallbackRegistry::new("liveCallback");
        let old = registry.begin().unwrap();
        registry.cancel();

        let fresh = registry.begin().unwrap();
        assert_ne!(old, fresh);
        assert!(matches!(
            registry.complete(old, events(1)),
            Err(FeedError::StaleTicket)
        ));
        assert!(matches!(registry.begin(), Err(FeedError::RequestInFlight)));
        assert!(rx.try_recv().is_err());
    }
}
