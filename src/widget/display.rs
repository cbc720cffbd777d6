use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// The container the widget draws into.
pub trait Display: Send {
    /// Replace the container's content wholesale.
    fn set_markup(&mut self, markup: String);
    fn add_class(&mut self, class: &str);
    fn remove_class(&mut self, class: &str);
    /// Arm a one-shot listener for the named completion signal.
    fn listen_once(&mut self, signal: &str);
    fn clear_listener(&mut self);
}

/// What a browser (or anything else) needs to mirror the container.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    pub markup: String,
    pub classes: BTreeSet<String>,
    /// Signal the widget is waiting for, if any
    pub armed_signal: Option<String>,
    /// Bumped on every change so pollers can skip redundant DOM writes
    pub revision: u64,
}

/// Display backed by shared memory, read by the HTTP layer.
#[derive(Clone, Default)]
pub struct SharedDisplay {
    inner: Arc<RwLock<DisplaySnapshot>>,
}

impl SharedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Consume the armed listener if `signal` matches it.
    pub fn take_signal(&self, signal: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if inner.armed_signal.as_deref() == Some(signal) {
            inner.armed_signal = None;
            inner.revision += 1;
            true
        } else {
            false
        }
    }

    fn update(&self, f: impl FnOnce(&mut DisplaySnapshot)) {
        let mut inner = self.inner.write().unwrap_or_else(|p| p.into_inner());
        f(&mut inner);
        inner.revision += 1;
    }
}

impl Display for SharedDisplay {
    fn set_markup(&mut self, markup: String) {
        self.update(|s| s.markup = markup);
    }

    fn add_class(&mut self, class: &str) {
        self.update(|s| {
            s.classes.insert(class.to_string());
        });
    }

    fn remove_class(&mut self, class: &str) {
        self.update(|s| {
            s.classes.remove(class);
        });
    }

    fn listen_once(&mut self, signal: &str) {
        self.update(|s| s.armed_signal = Some(signal.to_string()));
    }

    fn clear_listener(&mut self) {
        self.update(|s| s.armed_signal = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_bump_revision() {
        let mut display = SharedDisplay::new();
        display.set_markup("<div></div>".into());
        display.add_class("slide-out");
        let snap = display.snapshot();
        assert_eq!(snap.revision, 2);
        assert!(snap.classes.contains("slide-out"));

        display.remove_class("slide-out");
        assert!(display.snapshot().classes.is_empty());
    }

    #[test]
    fn test_signal_is_one_shot() {
        let mut display = SharedDisplay::new();
        assert!(!display.take_signal("transitionend"));

        display.listen_once("transitionend");
        assert!(!display.take_signal("webkitTransitionEnd"));
        assert!(display.take_signal("transitionend"));
        assert!(!display.take_signal("transitionend"));
    }

    #[test]
    fn test_clear_listener_disarms() {
        let mut display = SharedDisplay::new();
        display.listen_once("transitionend");
        display.clear_listener();
        assert_eq!(display.snapshot().armed_signal, None);
        assert!(!display.take_signal("transitionend"));
    }
}
