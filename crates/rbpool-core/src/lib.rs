//! # rbpool-core
//!
//! A segregated-free-list pool allocator and a red-black tree engine whose
//! nodes come exclusively from that pool.
//!
//! Memory is modelled logically: a block is an address in a host heap's
//! offset space, handed out by a [`alloc::HostHeap`]. The pool never touches
//! bytes, it only decides which addresses are live, free, or still part of
//! the bump arena. No `unsafe` code is permitted at the crate level.
//!
//! Nothing here is thread-safe. Pools are shared between trees through
//! [`alloc::PoolHandle`], a single-threaded reference-counted handle.

#![deny(unsafe_code)]

pub mod alloc;
pub mod config;
pub mod construct;
pub mod error;
pub mod log;
pub mod metrics;
pub mod tree;

pub use alloc::{FallbackAllocator, PoolAllocator, PoolHandle, SimulatedHeap, TypedAllocator};
pub use config::{OomPolicy, PoolConfig, TreeConfig};
pub use error::{AllocError, InvariantViolation, TreeError};
pub use tree::{Cursor, First, Identity, KeyCompare, KeyOfValue, Less, Position, RbMap, RbSet, RbTree};
