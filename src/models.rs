use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A live event as shown on one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Feed event ID, also the path segment of the bet link
    pub id: String,
    pub name: String,
    /// Raw sport name from the feed, e.g. "FOOTBALL"
    pub sport: String,
    pub home_score: u32,
    pub away_score: u32,
    pub start_time: DateTime<Utc>,
}

/// Ordered list of live events. Insertion order is the display rotation order.
///
/// Replaced wholesale on every refetch; the only in-place mutation is
/// [`EventList::rotate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventList(VecDeque<Event>);

impl EventList {
    pub fn new(events: Vec<Event>) -> Self {
        EventList(events.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.0.iter()
    }

    /// Left-rotate by one: the front event moves to the back.
    pub fn rotate(&mut self) {
        if !self.0.is_empty() {
            self.0.rotate_left(1);
        }
    }
}

impl From<Vec<Event>> for EventList {
    fn from(events: Vec<Event>) -> Self {
        EventList::new(events)
    }
}
