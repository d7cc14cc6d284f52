//! Observability hooks for resolutions
//!
//! A [`Recorder`] is told about four moments in every node task's life:
//! `enter` (task begun), `start` (action about to run), `finish` (action
//! returned) and `exit` (task about to end, always called). Callbacks run on
//! the scheduler's tasks and must be fast and non-blocking.

pub mod statistics;

use std::sync::Arc;

pub use statistics::{NodeTiming, Statistics};

/// Receives per-node lifecycle callbacks during a resolution
pub trait Recorder: Send + Sync {
    /// The node's task has begun, before waiting on anything
    fn enter(&self, name: &str);

    /// The node's prerequisites are done and its action is about to run
    fn start(&self, name: &str);

    /// The node's action has returned
    fn finish(&self, name: &str);

    /// The node's task is about to end, whether or not the action ran
    fn exit(&self, name: &str);
}

/// Recorder that forwards every callback to a list of recorders in order
pub struct RecorderList {
    recorders: Vec<Arc<dyn Recorder>>,
}

impl RecorderList {
    pub fn new(recorders: Vec<Arc<dyn Recorder>>) -> Self {
        Self { recorders }
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

impl Recorder for RecorderList {
    fn enter(&self, name: &str) {
        for recorder in &self.recorders {
            recorder.enter(name);
        }
    }

    fn start(&self, name: &str) {
        for recorder in &self.recorders {
            recorder.start(name);
        }
    }

    fn finish(&self, name: &str) {
        for recorder in &self.recorders {
            recorder.finish(name);
        }
    }

    fn exit(&self, name: &str) {
        for recorder in &self.recorders {
            recorder.exit(name);
        }
    }
}

/// Recorder that does nothing
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn enter(&self, _name: &str) {}
    fn start(&self, _name: &str) {}
    fn finish(&self, _name: &str) {}
    fn exit(&self, _name: &str) {}
}

/// Recorder that logs every callback at debug level
pub struct LoggingRecorder;

impl Recorder for LoggingRecorder {
    fn enter(&self, name: &str) {
        tracing::debug!("Node entered: {}", name);
    }

    fn start(&self, name: &str) {
        tracing::debug!("Node started: {}", name);
    }

    fn finish(&self, name: &str) {
        tracing::debug!("Node finished: {}", name);
    }

    fn exit(&self, name: &str) {
        tracing::debug!("Node exited: {}", name);
    }
}

/// Collapse a list of recorders into one
pub(crate) fn combine(mut recorders: Vec<Arc<dyn Recorder>>) -> Arc<dyn Recorder> {
    match recorders.len() {
        0 => Arc::new(NoopRecorder),
        1 => recorders.remove(0),
        _ => Arc::new(RecorderList::new(recorders)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Tape {
        label: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Tape {
        fn push(&self, hook: &str, name: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.label, hook, name));
        }
    }

    impl Recorder for Tape {
        fn enter(&self, name: &str) {
            self.push("enter", name);
        }
        fn start(&self, name: &str) {
            self.push("start", name);
        }
        fn finish(&self, name: &str) {
            self.push("finish", name);
        }
        fn exit(&self, name: &str) {
            self.push("exit", name);
        }
    }

    #[test]
    fn test_list_forwards_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let first: Arc<dyn Recorder> = Arc::new(Tape { label: "a", events: events.clone() });
        let second: Arc<dyn Recorder> = Arc::new(Tape { label: "b", events: events.clone() });
        let list = combine(vec![first, second]);

        list.enter("x");
        list.exit("x");

        assert_eq!(
            *events.lock().unwrap(),
            vec!["a:enter:x", "b:enter:x", "a:exit:x", "b:exit:x"]
        );
    }

    #[test]
    fn test_single_recorder_used_directly() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let only: Arc<dyn Recorder> = Arc::new(Tape { label: "only", events: events.clone() });
        let recorder = combine(vec![only]);

        recorder.start("y");

        assert_eq!(*events.lock().unwrap(), vec!["only:start:y"]);
    }

    #[test]
    fn test_empty_list_is_noop() {
        let recorder = combine(Vec::new());
        recorder.enter("z");
        recorder.start("z");
        recorder.finish("z");
        recorder.exit("z");
    }
}
