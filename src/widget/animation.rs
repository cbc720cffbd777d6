//! Which "transition finished" event the display emits.
//!
//! Browsers historically exposed the transition-end event under vendor
//! prefixes. The host reports which style properties it honours; the first
//! match in [`TRANSITION_END_EVENTS`] decides the signal name, once, at
//! startup.

/// Style property → completion event, in detection order.
pub const TRANSITION_END_EVENTS: [(&str, &str); 4] = [
    ("transition", "transitionend"),
    ("WebkitTransition", "webkitTransitionEnd"),
    ("MozTransition", "transitionend"),
    ("OTransition", "otransitionend"),
];

/// Class toggled on the container while the cards slide out.
pub const SLIDE_OUT_CLASS: &str = "slide-out";

/// Resolve the completion signal for a host supporting `properties`.
///
/// `None` means no known property is supported; the widget then never leaves
/// the animating phase on its own, but refreshes still happen on schedule.
pub fn resolve_completion_signal<S: AsRef<str>>(properties: &[S]) -> Option<&'static str> {
    TRANSITION_END_EVENTS
        .iter()
        .find(|(prop, _)| properties.iter().any(|p| p.as_ref() == *prop))
        .map(|(_, event)| *event)
}
