// src/renderer/idle.rs
use std::collections::HashSet;
use std::time::Instant;

use super::NetworkIdle;

/// Tracks in-flight requests by id and since when their number has stayed at
/// or below the idle threshold. A redirect reuses its request's id, so each
/// hop is one request, not several.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    cfg: NetworkIdle,
    inflight: HashSet<String>,
    settled_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(cfg: NetworkIdle, now: Instant) -> Self {
        Self {
            cfg,
            inflight: HashSet::new(),
            settled_since: Some(now),
        }
    }

    pub fn request_started(&mut self, id: &str, now: Instant) {
        self.inflight.insert(id.to_string());
        self.update(now);
    }

    /// Finished or failed. Requests issued before we started listening can
    /// complete unmatched; those are ignored.
    pub fn request_done(&mut self, id: &str, now: Instant) {
        self.inflight.remove(id);
        self.update(now);
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        self.settled_since
            .is_some_and(|t| now.saturating_duration_since(t) >= self.cfg.quiet)
    }

    fn update(&mut self, now: Instant) {
        if self.inflight.len() > self.cfg.max_inflight {
            self.settled_since = None;
        } else if self.settled_since.is_none() {
            self.settled_since = Some(now);
        }
    }
}
