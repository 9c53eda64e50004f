//! Change detector: gates the expensive item fetch behind the cheap
//! version marker.

/// What the current version marker means relative to persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Nothing persisted yet: record a baseline, notify nobody.
    Initialize,
    /// Marker matches the persisted one: skip the fetch entirely.
    Unchanged,
    /// Marker differs: fetch, diff and dispatch.
    Changed,
}

/// Stateless comparison of version markers.
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn detect(current: &str, persisted: Option<&str>) -> Detection {
        match persisted {
            None => Detection::Initialize,
            Some(previous) if previous == current => Detection::Unchanged,
            Some(_) => Detection::Changed,
        }
    }

    /// `true` only when a persisted marker exists and differs from `current`.
    pub fn has_changed(current: &str, persisted: Option<&str>) -> bool {
        Self::detect(current, persisted) == Detection::Changed
    }
}
