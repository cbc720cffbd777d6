//! Card markup for the `#wrapper` container.
//!
//! Rendering is a pure function of the event list and the current time; the
//! output replaces the container's content wholesale.

use chrono::{DateTime, FixedOffset, Utc};
use clap::ValueEnum;
use std::fmt::Write;

use crate::models::{Event, EventList};

pub const NO_DATA_TEXT: &str = "Sorry, no data available";

/// Clock format used on the cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum TimeFormat {
    /// 18:05
    #[default]
    #[value(name = "24h")]
    TwentyFourHour,
    /// 6:05 PM
    #[value(name = "12h")]
    TwelveHour,
}

/// Icons we ship artwork for. Anything else gets the default icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportIcon {
    Tennis,
    Football,
    Basketball,
    Default,
}

impl SportIcon {
    pub fn resolve(sport: &str) -> Self {
        match sport.trim().to_lowercase().as_str() {
            "tennis" => SportIcon::Tennis,
            "football" => SportIcon::Football,
            "basketball" => SportIcon::Basketball,
            _ => SportIcon::Default,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            SportIcon::Tennis => "tennis",
            SportIcon::Football => "football",
            SportIcon::Basketball => "basketball",
            SportIcon::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Cards shown at once
    pub visible_count: usize,
    /// Directory (URL path) holding `<sport>.png` icons
    pub icon_base: String,
    /// Bet links are `<bet_url_root>/<event id>`
    pub bet_url_root: String,
    pub time_format: TimeFormat,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            visible_count: 2,
            icon_base: "./images/icons".into(),
            bet_url_root: "https://www.unibet.com/betting#/event/live".into(),
            time_format: TimeFormat::TwentyFourHour,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer { options }
    }

    /// Markup for the first `visible_count` events, or one placeholder card
    /// when there are none.
    pub fn render(&self, events: &EventList, now: DateTime<FixedOffset>) -> String {
        if events.is_empty() {
            return placeholder_card();
        }

        let mut markup = String::new();
        for event in events.iter().take(self.options.visible_count) {
            self.push_card(&mut markup, event, now);
        }
        markup
    }

    fn push_card(&self, out: &mut String, event: &Event, now: DateTime<FixedOffset>) {
        let icon = SportIcon::resolve(&event.sport).key();
        let _ = write!(
            out,
            concat!(
                r#"<div class="card">"#,
                r#"<span class="score">{home} – {away}</span>"#,
                r#"<div class="game">"#,
                r#"<img class="sport-icon" src="{icon_base}/{icon}.png" alt="{icon}" />"#,
                r#"<span class="name">{name}</span>"#,
                r#"</div>"#,
                r#"<span class="date">{date}</span>"#,
                r#"<a href="{bet_root}/{id}" target="_blank" class="betting-btn">Place a bet</a>"#,
                r#"</div>"#,
            ),
            home = event.home_score,
            away = event.away_score,
            icon_base = escape(&self.options.icon_base),
            icon = icon,
            name = escape(&event.name),
            date = format_start(event.start_time, now, self.options.time_format),
            bet_root = escape(&self.options.bet_url_root),
            id = escape(&event.id),
        );
    }
}

fn placeholder_card() -> String {
    format!(
        concat!(
            r#"<div class="card">"#,
            r#"<span class="score"></span>"#,
            r#"<div class="game"><span class="name">{}</span></div>"#,
            r#"<span class="date"></span>"#,
            r#"</div>"#,
        ),
        NO_DATA_TEXT
    )
}

/// "Today, HH:MM" when `start` falls on `now`'s calendar day (in `now`'s
/// offset), otherwise "YYYY/MM/DD, HH:MM".
pub fn format_start(
    start: DateTime<Utc>,
    now: DateTime<FixedOffset>,
    format: TimeFormat,
) -> String {
    let local = start.with_timezone(now.offset());
    let time = match format {
        TimeFormat::TwentyFourHour => local.format("%H:%M"),
        TimeFormat::TwelveHour => local.format("%-I:%M %p"),
    };
    if local.date_naive() == now.date_naive() {
        format!("Today, {}", time)
    } else {
        format!("{}, {}", local.format("%Y/%m/%d"), time)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{event, events};
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2017, 9, 9, 21, 0, 0)
            .unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn card_count(markup: &str) -> usize {
        markup.matches(r#"<div class="card">"#).count()
    }

    #[test]
    fn test_empty_list_renders_single_placeholder() {
        let markup = Renderer::default().render(&EventList::default(), now());
        assert_eq!(card_count(&markup), 1);
        assert!(markup.contains(NO_DATA_TEXT));
        assert!(markup.contains(r#"<span class="score"></span>"#));
        assert!(markup.contains(r#"<span class="date"></span>"#));
        assert!(!markup.contains("sport-icon"));
        assert!(!markup.contains("betting-btn"));
    }

    #[test]
    fn test_card_count_is_min_of_visible_and_len() {
        let renderer = Renderer::default();
        for (len, expected) in [(1, 1), (2, 2), (3, 2), (10, 2)] {
            assert_eq!(card_count(&renderer.render(&events(len), now())), expected, "len={len}");
        }

        let wide = Renderer::new(RenderOptions {
            visible_count: 4,
            ..RenderOptions::default()
        });
        assert_eq!(card_count(&wide.render(&events(3), now())), 3);
    }

    #[test]
    fn test_card_contents() {
        let mut ev = event("1004123", "TENNIS");
        ev.name = "Nadal - Federer".into();
        ev.home_score = 2;
        ev.away_score = 1;
        ev.start_time = utc(2017, 9, 9, 16, 5);

        let markup = Renderer::default().render(&EventList::new(vec![ev]), now());
        assert!(markup.contains(r#"<span class="score">2 – 1</span>"#));
        assert!(markup.contains(r#"src="./images/icons/tennis.png""#));
        assert!(markup.contains(r#"<span class="name">Nadal - Federer</span>"#));
        assert!(markup.contains(r#"<span class="date">Today, 18:05</span>"#));
        assert!(markup.contains(
            r#"href="https://www.unibet.com/betting#/event/live/1004123""#
        ));
    }

    #[test]
    fn test_card_follows_rotation_order() {
        let mut list = events(3);
        list.rotate();
        let markup = Renderer::default().render(&list, now());
        let first = markup.find("live/1001").unwrap();
        let second = markup.find("live/1002").unwrap();
        assert!(first < second);
        assert!(!markup.contains("live/1000"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut ev = event("1", "football");
        ev.name = r#"<script>alert("x")</script>"#.into();
        let markup = Renderer::default().render(&EventList::new(vec![ev]), now());
        assert!(!markup.contains("<script>"));
        assert!(markup.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"));
    }

    #[test]
    fn test_format_today() {
        // 19:30 UTC is 21:30 at +02:00, same day as now
        let out = format_start(utc(2017, 9, 9, 19, 30), now(), TimeFormat::TwentyFourHour);
        assert_eq!(out, "Today, 21:30");
    }

    #[test]
    fn test_format_now_is_today() {
        let n = now();
        let out = format_start(n.with_timezone(&Utc), n, TimeFormat::TwentyFourHour);
        assert_eq!(out, "Today, 21:00");
    }

    #[test]
    fn test_format_other_day() {
        let out = format_start(utc(2017, 9, 8, 7, 5), now(), TimeFormat::TwentyFourHour);
        assert_eq!(out, "2017/09/08, 09:05");
    }

    #[test]
    fn test_format_uses_local_calendar_day() {
        // 22:30 UTC on the 8th is 00:30 on the 9th at +02:00
        let out = format_start(utc(2017, 9, 8, 22, 30), now(), TimeFormat::TwentyFourHour);
        assert_eq!(out, "Today, 00:30");
    }

    #[test]
    fn test_format_twelve_hour() {
        assert_eq!(
            format_start(utc(2017, 9, 9, 16, 5), now(), TimeFormat::TwelveHour),
            "Today, 6:05 PM"
        );
        assert_eq!(
            format_start(utc(2017, 9, 8, 22, 0), now(), TimeFormat::TwelveHour),
            "Today, 12:00 AM"
        );
    }

    #[test]
    fn test_icon_resolution() {
        for sport in ["tennis", "TENNIS", "Football", "basketball"] {
            assert_eq!(SportIcon::resolve(sport).key(), sport.to_lowercase());
        }
        for sport in ["ICE_HOCKEY", "", "soccer", "tennis table"] {
            assert_eq!(SportIcon::resolve(sport), SportIcon::Default);
        }
    }
}
