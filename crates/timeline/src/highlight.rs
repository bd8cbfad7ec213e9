use std::time::{Duration, Instant};

use tracelens_core::model::trace::{NO_HIGHLIGHT, SliceKey, TraceBreakdownSlice};

/// Coalesces bursts of calls: the first call after a quiet period fires at
/// once, later calls inside the window only keep the newest value, which
/// `poll` releases once the window has passed without another call.
#[derive(Debug)]
pub struct Debounce<T> {
    wait: Duration,
    last_call: Option<Instant>,
    pending: Option<T>,
}

impl<T> Debounce<T> {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            last_call: None,
            pending: None,
        }
    }

    pub fn call(&mut self, value: T, now: Instant) -> Option<T> {
        let idle = self
            .last_call
            .is_none_or(|last| now.saturating_duration_since(last) >= self.wait);
        self.last_call = Some(now);
        if idle {
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let last = self.last_call?;
        if now.saturating_duration_since(last) >= self.wait {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

type Observer = Box<dyn FnMut(&str)>;

/// Owner of the currently highlighted slice key. Table rows and the
/// breakdown bar read it and report hovers back through [`HighlightState::hover`].
pub struct HighlightState {
    current: Option<SliceKey>,
    debounce: Debounce<Option<SliceKey>>,
    observers: Vec<Observer>,
}

impl HighlightState {
    pub fn new(wait: Duration) -> Self {
        Self {
            current: None,
            debounce: Debounce::new(wait),
            observers: Vec::new(),
        }
    }

    /// [`NO_HIGHLIGHT`] when nothing is hovered.
    pub fn current_key(&self) -> &str {
        self.current.as_ref().map_or(NO_HIGHLIGHT, SliceKey::as_str)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&str) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Returns whether the highlight changed right away.
    pub fn hover(&mut self, key: Option<SliceKey>, now: Instant) -> bool {
        match self.debounce.call(key, now) {
            Some(key) => self.apply(key),
            None => false,
        }
    }

    /// Applies a trailing hover once the debounce window has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.debounce.poll(now) {
            Some(key) => self.apply(key),
            None => false,
        }
    }

    pub fn is_highlighted(&self, slice: &TraceBreakdownSlice) -> bool {
        match (&self.current, slice.key()) {
            (Some(current), Some(key)) => *current == key,
            _ => false,
        }
    }

    fn apply(&mut self, key: Option<SliceKey>) -> bool {
        if self.current == key {
            return false;
        }
        self.current = key;
        let current = self.current.as_ref().map_or(NO_HIGHLIGHT, SliceKey::as_str);
        for observer in &mut self.observers {
            observer(current);
        }
        true
    }
}

impl std::fmt::Debug for HighlightState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightState")
            .field("current", &self.current)
            .field("pending", &self.debounce.is_pending())
            .field("observers", &self.observers.len())
            .finish()
    }
}
