//! Structured lifecycle records for the allocators.
//!
//! Each allocator owns a [`LifecycleLog`]. Records below the configured
//! threshold are dropped before any formatting happens, so trace-level
//! events on the hot path cost one comparison when disabled.

use serde::{Deserialize, Serialize};

/// Severity level for lifecycle records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Structured allocator lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Monotonic event id within the owning log.
    pub decision_id: u64,
    /// Correlation id (`<component>::<symbol>::<id>`).
    pub trace_id: String,
    pub level: LogLevel,
    /// Emitting component (`pool`, `fallback`).
    pub component: &'static str,
    /// API symbol (`allocate`, `deallocate`, `chunk_alloc`, ...).
    pub symbol: &'static str,
    /// Event kind.
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addr: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    /// Size class index, when the event concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    pub details: String,
}

/// Event description passed to [`LifecycleLog::record`].
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub level: LogLevel,
    pub symbol: &'static str,
    pub event: &'static str,
    pub addr: Option<usize>,
    pub size: Option<usize>,
    pub class: Option<usize>,
    pub outcome: &'static str,
}

impl Event {
    #[must_use]
    pub const fn new(level: LogLevel, symbol: &'static str, event: &'static str) -> Self {
        Self {
            level,
            symbol,
            event,
            addr: None,
            size: None,
            class: None,
            outcome: "success",
        }
    }

    #[must_use]
    pub const fn addr(mut self, addr: usize) -> Self {
        self.addr = Some(addr);
        self
    }

    #[must_use]
    pub const fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub const fn class(mut self, class: usize) -> Self {
        self.class = Some(class);
        self
    }

    #[must_use]
    pub const fn outcome(mut self, outcome: &'static str) -> Self {
        self.outcome = outcome;
        self
    }
}

/// In-memory, level-filtered record buffer.
#[derive(Debug)]
pub struct LifecycleLog {
    component: &'static str,
    min_level: Option<LogLevel>,
    next_decision_id: u64,
    records: Vec<LogRecord>,
}

impl LifecycleLog {
    #[must_use]
    pub fn new(component: &'static str, min_level: Option<LogLevel>) -> Self {
        Self {
            component,
            min_level,
            next_decision_id: 1,
            records: Vec::new(),
        }
    }

    /// Returns true if a record at `level` would be kept.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.min_level.is_some_and(|min| level >= min)
    }

    /// Records an event. `details` is only evaluated when the level is enabled.
    pub fn record<D: Into<String>>(&mut self, event: Event, details: impl FnOnce() -> D) {
        if !self.enabled(event.level) {
            return;
        }
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        let trace_id = format!("{}::{}::{:016x}", self.component, event.symbol, decision_id);
        self.records.push(LogRecord {
            decision_id,
            trace_id,
            level: event.level,
            component: self.component,
            symbol: event.symbol,
            event: event.event,
            addr: event.addr,
            size: event.size,
            class: event.class,
            outcome: event.outcome,
            details: details().into(),
        });
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Removes and returns every buffered record.
    pub fn drain(&mut self) -> Vec<LogRecord> {
        std::mem::take(&mut self.records)
    }

    /// Number of buffered records carrying the given event name.
    #[must_use]
    pub fn count_event(&self, event: &str) -> usize {
        self.records.iter().filter(|r| r.event == event).count()
    }

    pub fn set_min_level(&mut self, min_level: Option<LogLevel>) {
        self.min_level = min_level;
    }
}
