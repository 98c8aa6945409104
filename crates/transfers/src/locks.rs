use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use stockledger_core::{LedgerError, LedgerResult};

type UnitLock = Arc<Mutex<()>>;

/// Owned guard on a single mutation unit. Dropping releases it.
pub type UnitGuard = ArcMutexGuard<RawMutex, ()>;

/// Both mutation units of a transfer, held for the duration of the paired
/// write. Dropping releases them.
pub struct PairGuard {
    _guards: Vec<UnitGuard>,
}

// The guards carry no useful state to print.
impl fmt::Debug for PairGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairGuard").finish_non_exhaustive()
    }
}

/// Keyed mutation units.
///
/// The executor keys a table by `RecordKey`; the restock/audit path keys a
/// second table by `Sku`. Two-key acquisition always proceeds in ascending
/// key order, so two transfers touching the same two warehouses in opposite
/// directions cannot deadlock. Every acquisition is bounded: not getting the
/// lock within the timeout is a `ConcurrencyTimeout`, never an indefinite
/// wait.
#[derive(Debug)]
pub struct LockTable<K> {
    entries: Mutex<HashMap<K, UnitLock>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> LockTable<K>
where
    K: Eq + Hash + Ord + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &K) -> UnitLock {
        let mut entries = self.entries.lock();
        entries.entry(key.clone()).or_default().clone()
    }

    /// Acquire a single mutation unit with a bounded wait.
    pub fn acquire(&self, key: &K, timeout: Duration) -> LedgerResult<UnitGuard> {
        let lock = self.handle(key);
        lock.try_lock_arc_for(timeout)
            .ok_or_else(|| LedgerError::timeout(format!("mutation unit {key} held past {timeout:?}")))
    }

    /// Acquire both keys of a transfer in deterministic global order.
    pub fn acquire_pair(&self, a: &K, b: &K, timeout: Duration) -> LedgerResult<PairGuard> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };

        let mut guards = Vec::with_capacity(2);
        guards.push(self.acquire(first, timeout)?);
        if first != second {
            guards.push(self.acquire(second, timeout)?);
        }
        Ok(PairGuard { _guards: guards })
    }
}
