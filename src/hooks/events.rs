use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

/// How a worker process ended, as observed by the reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WorkerExit {
    /// Normal exit with the given status code.
    Code(i32),
    /// Killed by the given signal number.
    Signal(i32),
}

/// Names under which hooks register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Started,
    Stopping,
    Stopped,
    WorkerForking,
    WorkerForked,
    WorkerForkedFail,
    WorkerFinished,
    WorkerStopped,
}

/// Events announced at lifecycle moments of the daemonizer and the pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started {
        timestamp: DateTime<Utc>,
        pid: u32,
    },
    Stopping {
        timestamp: DateTime<Utc>,
    },
    Stopped {
        timestamp: DateTime<Utc>,
    },
    WorkerForking {
        timestamp: DateTime<Utc>,
    },
    WorkerForked {
        timestamp: DateTime<Utc>,
        pid: i32,
    },
    WorkerForkedFail {
        timestamp: DateTime<Utc>,
    },
    WorkerFinished {
        timestamp: DateTime<Utc>,
        pid: i32,
        status: WorkerExit,
    },
    WorkerStopped {
        timestamp: DateTime<Utc>,
        pid: u32,
    },
}

impl LifecycleEvent {
    pub fn started(pid: u32) -> Self {
        Self::Started {
            timestamp: Utc::now(),
            pid,
        }
    }

    pub fn stopping() -> Self {
        Self::Stopping {
            timestamp: Utc::now(),
        }
    }

    pub fn stopped() -> Self {
        Self::Stopped {
            timestamp: Utc::now(),
        }
    }

    pub fn worker_forking() -> Self {
        Self::WorkerForking {
            timestamp: Utc::now(),
        }
    }

    pub fn worker_forked(pid: i32) -> Self {
        Self::WorkerForked {
            timestamp: Utc::now(),
            pid,
        }
    }

    pub fn worker_forked_fail() -> Self {
        Self::WorkerForkedFail {
            timestamp: Utc::now(),
        }
    }

    pub fn worker_finished(pid: i32, status: WorkerExit) -> Self {
        Self::WorkerFinished {
            timestamp: Utc::now(),
            pid,
            status,
        }
    }

    pub fn worker_stopped(pid: u32) -> Self {
        Self::WorkerStopped {
            timestamp: Utc::now(),
            pid,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Started { timestamp, .. } => *timestamp,
            Self::Stopping { timestamp } => *timestamp,
            Self::Stopped { timestamp } => *timestamp,
            Self::WorkerForking { timestamp } => *timestamp,
            Self::WorkerForked { timestamp, .. } => *timestamp,
            Self::WorkerForkedFail { timestamp } => *timestamp,
            Self::WorkerFinished { timestamp, .. } => *timestamp,
            Self::WorkerStopped { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> HookKind {
        match self {
            Self::Started { .. } => HookKind::Started,
            Self::Stopping { .. } => HookKind::Stopping,
            Self::Stopped { .. } => HookKind::Stopped,
            Self::WorkerForking { .. } => HookKind::WorkerForking,
            Self::WorkerForked { .. } => HookKind::WorkerForked,
            Self::WorkerForkedFail { .. } => HookKind::WorkerForkedFail,
            Self::WorkerFinished { .. } => HookKind::WorkerFinished,
            Self::WorkerStopped { .. } => HookKind::WorkerStopped,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Stopping { .. } => "stopping",
            Self::Stopped { .. } => "stopped",
            Self::WorkerForking { .. } => "worker_forking",
            Self::WorkerForked { .. } => "worker_forked",
            Self::WorkerForkedFail { .. } => "worker_forked_fail",
            Self::WorkerFinished { .. } => "worker_finished",
            Self::WorkerStopped { .. } => "worker_stopped",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::Started { .. } => EventSeverity::Info,
            Self::Stopping { .. } => EventSeverity::Info,
            Self::Stopped { .. } => EventSeverity::Info,
            Self::WorkerForking { .. } => EventSeverity::Info,
            Self::WorkerForked { .. } => EventSeverity::Info,
            Self::WorkerForkedFail { .. } => EventSeverity::Error,
            Self::WorkerFinished { .. } => EventSeverity::Info,
            Self::WorkerStopped { .. } => EventSeverity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn event_type_matches_variant() {
        let ts = timestamp();

        let cases = vec![
            (
                LifecycleEvent::Started {
                    timestamp: ts,
                    pid: 42,
                },
                "started",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::Stopping { timestamp: ts },
                "stopping",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::Stopped { timestamp: ts },
                "stopped",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::WorkerForking { timestamp: ts },
                "worker_forking",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::WorkerForked {
                    timestamp: ts,
                    pid: 100,
                },
                "worker_forked",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::WorkerForkedFail { timestamp: ts },
                "worker_forked_fail",
                EventSeverity::Error,
            ),
            (
                LifecycleEvent::WorkerFinished {
                    timestamp: ts,
                    pid: 100,
                    status: WorkerExit::Code(0),
                },
                "worker_finished",
                EventSeverity::Info,
            ),
            (
                LifecycleEvent::WorkerStopped {
                    timestamp: ts,
                    pid: 42,
                },
                "worker_stopped",
                EventSeverity::Warning,
            ),
        ];

        for (event, event_type, severity) in cases {
            assert_eq!(event.event_type(), event_type);
            assert_eq!(event.severity(), severity);
            assert_eq!(event.timestamp(), ts);
        }
    }

    #[test]
    fn serializes_with_snake_case_tag() {
        let event = LifecycleEvent::WorkerFinished {
            timestamp: timestamp(),
            pid: 7,
            status: WorkerExit::Signal(15),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"worker_finished\""));
        assert!(json.contains("\"pid\":7"));
        assert!(json.contains("\"signal\""));
    }

    #[test]
    fn kind_round_trips_through_constructors() {
        assert_eq!(LifecycleEvent::started(1).kind(), HookKind::Started);
        assert_eq!(
            LifecycleEvent::worker_finished(9, WorkerExit::Code(0)).kind(),
            HookKind::WorkerFinished
        );
        assert_eq!(
            LifecycleEvent::worker_forked_fail().kind(),
            HookKind::WorkerForkedFail
        );
    }
}
