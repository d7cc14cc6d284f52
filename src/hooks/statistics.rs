//! Per-node timing statistics built on the recorder hooks
//!
//! Attach a [`Statistics`] to a resolution as a recorder, then query how long
//! each node waited, how long its action ran and the total of the two. A
//! `Statistics` should not be reused between resolutions.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use super::Recorder;

#[derive(Debug, Clone, Copy, Default)]
struct Timeline {
    enter: Option<Instant>,
    start: Option<Instant>,
    finish: Option<Instant>,
    exit: Option<Instant>,
}

/// Timings for one node, as reported by [`Statistics::timings`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeTiming {
    pub name: String,
    pub wait: Duration,
    pub action: Duration,
    pub total: Duration,
    pub ran: bool,
}

#[derive(Debug, Default)]
pub struct Statistics {
    timelines: DashMap<String, Timeline>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp(&self, name: &str, apply: impl FnOnce(&mut Timeline, Instant)) {
        let now = Instant::now();
        let mut timeline = self.timelines.entry(name.to_owned()).or_default();
        apply(&mut timeline, now);
    }

    fn timeline(&self, name: &str) -> Timeline {
        self.timelines
            .get(name)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Names this Statistics has seen any event for
    pub fn names(&self) -> BTreeSet<String> {
        self.timelines.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Time between the node's task beginning and its action starting,
    /// or zero if the action never started
    pub fn wait(&self, name: &str) -> Duration {
        let timeline = self.timeline(name);
        between(timeline.enter, timeline.start)
    }

    /// Time spent inside the action, or zero if it never ran to completion
    pub fn action(&self, name: &str) -> Duration {
        let timeline = self.timeline(name);
        between(timeline.start, timeline.finish)
    }

    /// Wait plus action time, or zero if the action never started
    ///
    /// Bookkeeping done after the action returns is not attributed to the
    /// node, so `wait + action == total` for every node that ran. An action
    /// that started but never returned is measured up to its exit.
    pub fn total(&self, name: &str) -> Duration {
        let timeline = self.timeline(name);
        match (timeline.start, timeline.finish) {
            (None, _) => Duration::ZERO,
            (Some(_), Some(finish)) => between(timeline.enter, Some(finish)),
            (Some(_), None) => between(timeline.enter, timeline.exit),
        }
    }

    /// Time between the node's task beginning and ending, whether or not
    /// its action ran
    pub fn lifetime(&self, name: &str) -> Duration {
        let timeline = self.timeline(name);
        between(timeline.enter, timeline.exit)
    }

    /// True when the node's task ended without its action starting
    pub fn skipped(&self, name: &str) -> bool {
        let timeline = self.timeline(name);
        timeline.exit.is_some() && timeline.start.is_none()
    }

    /// Timings for every node seen, ordered by name
    pub fn timings(&self) -> Vec<NodeTiming> {
        self.names()
            .into_iter()
            .map(|name| NodeTiming {
                wait: self.wait(&name),
                action: self.action(&name),
                total: self.total(&name),
                ran: self.timeline(&name).finish.is_some(),
                name,
            })
            .collect()
    }
}

fn between(from: Option<Instant>, to: Option<Instant>) -> Duration {
    match (from, to) {
        (Some(from), Some(to)) => to.saturating_duration_since(from),
        _ => Duration::ZERO,
    }
}

impl Recorder for Statistics {
    fn enter(&self, name: &str) {
        self.stamp(name, |timeline, now| timeline.enter = Some(now));
    }

    fn start(&self, name: &str) {
        self.stamp(name, |timeline, now| timeline.start = Some(now));
    }

    fn finish(&self, name: &str) {
        self.stamp(name, |timeline, now| timeline.finish = Some(now));
    }

    fn exit(&self, name: &str) {
        self.stamp(name, |timeline, now| timeline.exit = Some(now));
    }
}
