//! Fallback allocator.
//!
//! Thin wrapper over the host heap. When the host refuses a request the
//! registered out-of-memory handler is invoked and the request retried,
//! indefinitely, until it succeeds. Without a handler the configured
//! [`OomPolicy`] decides between aborting the process and surfacing
//! [`AllocError::OutOfMemory`].

use crate::config::{OomPolicy, PoolConfig};
use crate::error::AllocError;
use crate::log::{Event, LifecycleLog, LogLevel, LogRecord};
use crate::metrics::FallbackStats;

use super::heap::HostHeap;

/// Out-of-memory handler. Expected to release memory somewhere so that the
/// retried host request can succeed.
pub type OomHandler = Box<dyn FnMut()>;

/// Host request being retried; selects the counter bumped on success.
#[derive(Debug, Clone, Copy)]
enum HostOp {
    Allocate,
    Reallocate,
}

impl HostOp {
    fn event(self) -> &'static str {
        match self {
            Self::Allocate => "host_alloc",
            Self::Reallocate => "host_realloc",
        }
    }
}

/// Host-heap allocator with an out-of-memory retry protocol.
pub struct FallbackAllocator {
    heap: Box<dyn HostHeap>,
    oom_handler: Option<OomHandler>,
    oom_policy: OomPolicy,
    log: LifecycleLog,
    stats: FallbackStats,
}

impl std::fmt::Debug for FallbackAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackAllocator")
            .field("oom_handler", &self.oom_handler.is_some())
            .field("oom_policy", &self.oom_policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl FallbackAllocator {
    /// Creates a fallback allocator over `heap`.
    pub fn new(heap: impl HostHeap + 'static, config: &PoolConfig) -> Self {
        Self {
            heap: Box::new(heap),
            oom_handler: None,
            oom_policy: config.oom_policy,
            log: LifecycleLog::new("fallback", config.log_level),
            stats: FallbackStats::default(),
        }
    }

    /// Requests `n` bytes, running the handler-retry loop on refusal.
    ///
    /// Only returns `Err` under [`OomPolicy::Error`] with no handler installed.
    pub fn allocate(&mut self, n: usize) -> Result<usize, AllocError> {
        if let Some(addr) = self.try_allocate(n) {
            return Ok(addr);
        }
        self.oom_retry("allocate", n, HostOp::Allocate, |heap| heap.malloc(n))
    }

    /// Single host request with no handler involvement.
    pub fn try_allocate(&mut self, n: usize) -> Option<usize> {
        self.stats.calls += 1;
        let result = self.heap.malloc(n);
        match result {
            Some(addr) => {
                self.stats.host_allocations += 1;
                self.stats.bytes_requested += n as u64;
                self.log.record(
                    Event::new(LogLevel::Debug, "allocate", "host_alloc")
                        .addr(addr)
                        .size(n),
                    String::new,
                );
            }
            None => {
                self.stats.host_refusals += 1;
                self.log.record(
                    Event::new(LogLevel::Info, "allocate", "host_refused")
                        .size(n)
                        .outcome("refused"),
                    String::new,
                );
            }
        }
        result
    }

    /// Returns a block to the host heap unconditionally.
    pub fn deallocate(&mut self, addr: usize, n: usize) {
        self.stats.calls += 1;
        self.stats.host_frees += 1;
        self.heap.free(addr, n);
        self.log.record(
            Event::new(LogLevel::Debug, "deallocate", "host_free")
                .addr(addr)
                .size(n),
            String::new,
        );
    }

    /// Resizes a block, running the handler-retry loop on refusal.
    pub fn reallocate(&mut self, addr: usize, old_n: usize, new_n: usize) -> Result<usize, AllocError> {
        self.stats.calls += 1;
        if let Some(moved) = self.heap.realloc(addr, old_n, new_n) {
            self.stats.host_reallocations += 1;
            self.log.record(
                Event::new(LogLevel::Debug, "reallocate", "host_realloc")
                    .addr(moved)
                    .size(new_n),
                || format!("old_addr={addr:#x} old_size={old_n}"),
            );
            return Ok(moved);
        }
        self.stats.host_refusals += 1;
        self.oom_retry("reallocate", new_n, HostOp::Reallocate, |heap| {
            heap.realloc(addr, old_n, new_n)
        })
    }

    /// Installs `handler`, returning the previous one. Last write wins.
    pub fn set_oom_handler(&mut self, handler: Option<OomHandler>) -> Option<OomHandler> {
        std::mem::replace(&mut self.oom_handler, handler)
    }

    #[must_use]
    pub fn has_oom_handler(&self) -> bool {
        self.oom_handler.is_some()
    }

    #[must_use]
    pub fn oom_policy(&self) -> OomPolicy {
        self.oom_policy
    }

    pub fn set_oom_policy(&mut self, oom_policy: OomPolicy) {
        self.oom_policy = oom_policy;
    }

    #[must_use]
    pub fn stats(&self) -> FallbackStats {
        self.stats
    }

    #[must_use]
    pub fn logs(&self) -> &[LogRecord] {
        self.log.records()
    }

    pub fn drain_logs(&mut self) -> Vec<LogRecord> {
        self.log.drain()
    }

    fn oom_retry(
        &mut self,
        symbol: &'static str,
        n: usize,
        op: HostOp,
        mut attempt: impl FnMut(&mut dyn HostHeap) -> Option<usize>,
    ) -> Result<usize, AllocError> {
        loop {
            if self.oom_handler.is_none() {
                return self.exhausted(symbol, n);
            }
            self.stats.oom_handler_invocations += 1;
            let round = self.stats.oom_handler_invocations;
            self.log.record(
                Event::new(LogLevel::Warn, symbol, "oom_handler_invoked")
                    .size(n)
                    .outcome("retry"),
                || format!("invocation={round}"),
            );
            if let Some(handler) = self.oom_handler.as_mut() {
                handler();
            }
            if let Some(addr) = attempt(self.heap.as_mut()) {
                match op {
                    HostOp::Allocate => {
                        self.stats.host_allocations += 1;
                        self.stats.bytes_requested += n as u64;
                    }
                    HostOp::Reallocate => self.stats.host_reallocations += 1,
                }
                self.log.record(
                    Event::new(LogLevel::Debug, symbol, op.event())
                        .addr(addr)
                        .size(n)
                        .outcome("recovered"),
                    || format!("after_invocations={round}"),
                );
                return Ok(addr);
            }
            self.stats.host_refusals += 1;
        }
    }

    fn exhausted(&mut self, symbol: &'static str, n: usize) -> Result<usize, AllocError> {
        if self.oom_policy.surfaces_errors() {
            self.log.record(
                Event::new(LogLevel::Error, symbol, "oom_surfaced")
                    .size(n)
                    .outcome("error"),
                || "no_oom_handler",
            );
            return Err(AllocError::OutOfMemory { requested: n });
        }
        self.log.record(
            Event::new(LogLevel::Fatal, symbol, "oom_fatal")
                .size(n)
                .outcome("abort"),
            || "no_oom_handler",
        );
        eprintln!("rbpool: out of memory ({n} bytes requested)");
        std::process::abort()
    }
}
