use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use super::FeedError;
use crate::models::{Event, EventList};

/// Decode a `{ "liveEvents": [...] }` payload into an [`EventList`].
///
/// Entries without an id, a name or a usable start time are dropped; a
/// payload without `liveEvents` decodes to an empty list.
pub fn parse_payload(json: &str) -> Result<EventList, FeedError> {
    let raw: Value = serde_json::from_str(json)?;
    Ok(parse_live_events(&raw))
}

fn parse_live_events(raw: &Value) -> EventList {
    let entries = match raw["liveEvents"].as_array() {
        Some(a) => a,
        None => return EventList::default(),
    };

    let events: Vec<Event> = entries
        .iter()
        .filter_map(|entry| {
            let parsed = parse_entry(entry);
            if parsed.is_none() {
                debug!("Dropping malformed live event: {}", entry["event"]["id"]);
            }
            parsed
        })
        .collect();

    EventList::new(events)
}

fn parse_entry(entry: &Value) -> Option<Event> {
    let ev = &entry["event"];
    let id = match &ev["id"] {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let name = ev["name"].as_str()?.to_string();
    let sport = ev["sport"].as_str().unwrap_or_default().to_string();
    let start_time = parse_start(&ev["start"])?;

    let score = &entry["liveData"]["score"];
    Some(Event {
        id,
        name,
        sport,
        home_score: parse_score(&score["home"]),
        away_score: parse_score(&score["away"]),
        start_time,
    })
}

fn parse_score(v: &Value) -> u32 {
    v.as_str()
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| v.as_u64().and_then(|n| u32::try_from(n).ok()))
        .unwrap_or(0)
}

/// Feed start times come as RFC 3339, as minute-precision `2017-09-09T18:30Z`,
/// or as epoch milliseconds.
fn parse_start(v: &Value) -> Option<DateTime<Utc>> {
    if let Some(ms) = v.as_i64() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    let s = v.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}
