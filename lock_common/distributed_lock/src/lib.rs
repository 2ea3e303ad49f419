//! Distributed lock module, providing lease based locks on top of Redis
//!
//! Locks are taken through a [`LockManager`] built on an injected
//! [`LeaseStore`]. Two modes are supported:
//!
//! * watchdog mode, where a background thread extends the lease every third
//!   of its lifetime until the lock is released;
//! * fixed lease mode, where the lease simply expires after its TTL.
//!
//! ```no_run
//! use std::sync::Arc;
//! use distributed_lock::{AcquireOptions, LockConfig, LockManager, RedisLeaseStore};
//!
//! let store = Arc::new(RedisLeaseStore::open("redis://127.0.0.1/").unwrap());
//! let manager = LockManager::new(store, LockConfig::default()).unwrap();
//! let handle = manager.acquire("Test-Lock", &AcquireOptions::watchdog()).unwrap();
//! // critical section
//! manager.release(&handle).unwrap();
//! ```

mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod lock;
pub mod manager;
pub mod memory;
pub mod scripts;
pub mod store;
mod watchdog;

pub use client::RedisLeaseStore;
pub use config::LockConfig;
pub use error::{DistributedLockError, Result};
pub use guard::LockGuard;
pub use lock::{LockHandle, LockState, ReleaseOutcome};
pub use manager::{AcquireOptions, LockManager};
pub use memory::MemoryLeaseStore;
pub use store::{Lease, LeaseStore};
