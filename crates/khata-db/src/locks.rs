//! # Per-Material Write Serialization
//!
//! Every mutation of a material's `quantity_base`/`avg_cost_per_base` is a
//! read-modify-write cycle; two interleaved cycles on the same material lose
//! updates or let a stale sufficiency check slip negative stock through.
//!
//! ## Locking Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Material Write Serialization                           │
//! │                                                                         │
//! │  Purchase(Flour)  ──► lock("flour-id") ──► read → validate → write ──►  │
//! │  Produce(Barfi)   ──► lock("flour-id",  ──► (waits for the purchase) ──►│
//! │                         "sugar-id")                                     │
//! │  Wastage(Ghee)    ──► lock("ghee-id")  ──► runs concurrently ──►        │
//! │                                                                         │
//! │  Multi-material operations (production) acquire their locks in sorted  │
//! │  id order, so two productions over overlapping recipes cannot deadlock.│
//! │  Reports take no locks: they are read-only scans.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-material async mutexes.
///
/// The outer std `Mutex` only guards the map itself and is never held
/// across an await; the per-material `tokio::sync::Mutex` is what
/// serializes the actual ledger operations.
#[derive(Debug, Default)]
pub struct MaterialLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MaterialLocks {
    pub fn new() -> Self {
        MaterialLocks {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, material_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.locks.lock().expect("material lock registry poisoned");
        map.entry(material_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquires the exclusive scope for one material.
    ///
    /// The returned guard must be held for the whole
    /// read → validate → write → append cycle.
    pub async fn acquire(&self, material_id: &str) -> OwnedMutexGuard<()> {
        self.entry(material_id).lock_owned().await
    }

    /// Acquires exclusive scopes for several materials.
    ///
    /// Ids are deduplicated and locked in sorted order; callers touching
    /// overlapping material sets therefore always lock in the same order.
    pub async fn acquire_many(&self, material_ids: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids: Vec<&String> = material_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.entry(id).lock_owned().await);
        }
        guards
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
