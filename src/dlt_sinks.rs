//! Event logging for the replicated suite

use std::cell::RefCell;
use std::rc::Rc;

use log::{log, Level};

use crate::dlt_interface::{EventSink, SuiteEvent};

/// Forwards suite events to the `log` facade.
///
/// Replication boundaries go to `info`, per-scenario lines to `debug` and only
/// when `verbose` is set.
pub struct LoggingEventSink {
    verbose: bool,
}

impl LoggingEventSink {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Level and line logged for `event`, or `None` when it is filtered out
    pub fn render(&self, event: &SuiteEvent) -> Option<(Level, String)> {
        let rendered = match event {
            SuiteEvent::SuiteStarted {
                replications,
                seed_start,
            } => (
                Level::Info,
                format!("suite: {} replications from seed {}", replications, seed_start),
            ),
            SuiteEvent::ReplicationStarted { index, of, seed } => (
                Level::Info,
                format!("rep {}/{} seed:{} start", index + 1, of, seed),
            ),
            SuiteEvent::ScenarioCompleted {
                seed,
                key,
                total,
                successful,
                wall_time_secs,
            } => {
                if !self.verbose {
                    return None;
                }
                (
                    Level::Debug,
                    format!(
                        "rep seed:{} {} ok:{}/{} wall:{:.2}s",
                        seed, key, successful, total, wall_time_secs
                    ),
                )
            }
            SuiteEvent::ReplicationCompleted { seed } => {
                (Level::Info, format!("rep seed:{} done", seed))
            }
            SuiteEvent::ReplicationFailed { seed, cause } => {
                (Level::Error, format!("rep seed:{} failed: {}", seed, cause))
            }
            SuiteEvent::Aggregated { entries } => {
                (Level::Info, format!("aggregated {} metric entries", entries))
            }
        };
        Some(rendered)
    }
}

impl EventSink for LoggingEventSink {
    fn log(&mut self, event: SuiteEvent) {
        if let Some((level, line)) = self.render(&event) {
            log!(level, "{}", line);
        }
    }
}

/// Keeps every event in memory.
///
/// Clones share one buffer, so a clone kept by the caller still sees the events
/// logged through the copy boxed into the suite.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<SuiteEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far
    pub fn events(&self) -> Vec<SuiteEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn log(&mut self, event: SuiteEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlt_interface::{Network, ScenarioKey};

    fn scenario_event() -> SuiteEvent {
        SuiteEvent::ScenarioCompleted {
            seed: 3,
            key: ScenarioKey::scalability(Network::DagLedger, 100),
            total: 100,
            successful: 98,
            wall_time_secs: 1.5,
        }
    }

    #[test]
    fn test_logging_sink_levels() {
        let sink = LoggingEventSink::new(false);

        let (level, line) = sink
            .render(&SuiteEvent::ReplicationStarted {
                index: 0,
                of: 30,
                seed: 1,
            })
            .unwrap();
        assert_eq!(level, Level::Info);
        assert_eq!(line, "rep 1/30 seed:1 start");

        let (level, line) = sink
            .render(&SuiteEvent::ReplicationFailed {
                seed: 4,
                cause: "node not synced".into(),
            })
            .unwrap();
        assert_eq!(level, Level::Error);
        assert_eq!(line, "rep seed:4 failed: node not synced");

        // Scenario lines only in verbose mode
        assert!(sink.render(&scenario_event()).is_none());
    }

    #[test]
    fn test_logging_sink_verbose_scenarios() {
        let mut sink = LoggingEventSink::new(true);
        let (level, line) = sink.render(&scenario_event()).unwrap();

        assert_eq!(level, Level::Debug);
        assert_eq!(
            line,
            "rep seed:3 scalability/dag-ledger:batch_100 ok:98/100 wall:1.50s"
        );
        sink.log(scenario_event());
    }

    #[test]
    fn test_recording_sink_shares_buffer() {
        let recorder = RecordingSink::new();
        let mut boxed: Box<dyn EventSink> = Box::new(recorder.clone());
        assert!(recorder.is_empty());

        boxed.log(SuiteEvent::ReplicationCompleted { seed: 9 });
        boxed.log(SuiteEvent::Aggregated { entries: 4 });

        assert_eq!(recorder.len(), 2);
        assert_eq!(
            recorder.events(),
            vec![
                SuiteEvent::ReplicationCompleted { seed: 9 },
                SuiteEvent::Aggregated { entries: 4 },
            ]
        );
    }
}
