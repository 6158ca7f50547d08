//! Memory allocation.
//!
//! Two tiers over a host heap:
//! - Small requests (<=128 bytes): size-classed free lists refilled in batches
//!   from a bump arena ([`PoolAllocator`])
//! - Oversized requests and arena growth: the host heap behind an
//!   out-of-memory retry protocol ([`FallbackAllocator`])

pub mod fallback;
pub mod handle;
pub mod heap;
pub mod pool;
pub mod size_class;
pub mod typed;

pub use fallback::{FallbackAllocator, OomHandler};
pub use handle::PoolHandle;
pub use heap::{HeapStats, HostHeap, SimulatedHeap};
pub use pool::PoolAllocator;
pub use typed::TypedAllocator;
