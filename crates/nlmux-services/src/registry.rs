//! Service registry: service type → handler, one slot per type.
//!
//! Lookups run on the receive path and never take a lock. Each slot is an
//! `AtomicPtr` to a heap cell holding the handler; `register` builds the new
//! cell and swaps it in, so a reader sees either the old cell or the new one
//! in full.
//!
//! A displaced cell may still be in use by a reader that loaded it just
//! before the swap. It is parked on a retired list and freed once a grace
//! period has passed: a moment after the swap at which no lookup is in
//! progress. Readers announce themselves through a shared counter for the
//! few instructions between loading a slot and cloning the handler out.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nlmux_core::ServiceType;

use crate::service::ServiceHandler;

/// Number of slots. The service tag is one byte.
pub const SERVICE_SLOTS: usize = 256;

type Cell = Arc<dyn ServiceHandler>;

/// A cell that has been swapped out of its slot.
struct Retired(*mut Cell);

// SAFETY: the pointer came from `Box::into_raw` on a `Cell`, which is
// `Send` because `ServiceHandler: Send + Sync`. Only the owning registry
// touches it again, when reclaiming.
unsafe impl Send for Retired {}

impl Drop for Retired {
    fn drop(&mut self) {
        // SAFETY: each retired cell was swapped out of its slot exactly once
        // and is only dropped after a grace period or with `&mut` registry.
        drop(unsafe { Box::from_raw(self.0) });
    }
}

/// Marks a lookup in progress for as long as it lives.
struct ReadGuard<'a>(&'a AtomicUsize);

impl<'a> ReadGuard<'a> {
    fn enter(readers: &'a AtomicUsize) -> Self {
        readers.fetch_add(1, Ordering::SeqCst);
        Self(readers)
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ServiceRegistry {
    slots: Box<[AtomicPtr<Cell>; SERVICE_SLOTS]>,
    readers: AtomicUsize,
    retired: Mutex<Vec<Retired>>,
}

impl ServiceRegistry {
    /// A registry with every slot unbound.
    pub fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut()))),
            readers: AtomicUsize::new(0),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Bind `handler` to `ty`, replacing whatever was there.
    ///
    /// The replaced handler is released as soon as no lookup can still be
    /// reading its cell. Callers that already cloned it keep their `Arc`.
    pub fn register(&self, ty: ServiceType, handler: Arc<dyn ServiceHandler>) {
        let name = handler.name().to_string();
        let fresh = Box::into_raw(Box::new(handler));
        let old = self.slots[ty.index()].swap(fresh, Ordering::SeqCst);

        let replaced = !old.is_null();
        let mut retired = self.retired.lock().unwrap_or_else(|e| e.into_inner());
        if replaced {
            retired.push(Retired(old));
        }
        // Every cell on the list was swapped out before this load. A reader
        // that saw one of them entered before the swap; zero means it is gone.
        let expired = if !retired.is_empty() && self.readers.load(Ordering::SeqCst) == 0 {
            std::mem::take(&mut *retired)
        } else {
            Vec::new()
        };
        let pending = retired.len();
        drop(retired);
        // Outside the lock: a handler's drop may register again.
        let reclaimed = expired.len();
        drop(expired);

        tracing::debug!(
            service_type = ty.0,
            handler = %name,
            replaced,
            reclaimed,
            pending,
            "service handler registered"
        );
    }

    /// The handler currently bound to `ty`, if any.
    pub fn lookup(&self, ty: ServiceType) -> Option<Arc<dyn ServiceHandler>> {
        let _guard = ReadGuard::enter(&self.readers);
        let cell = self.slots[ty.index()].load(Ordering::SeqCst);
        if cell.is_null() {
            return None;
        }
        // SAFETY: non-null slot values come from `Box::into_raw` in
        // `register`. A cell swapped out after the load above is retired,
        // and retired cells are freed only when no guard is live.
        Some(unsafe { (*cell).clone() })
    }

    pub fn is_bound(&self, ty: ServiceType) -> bool {
        !self.slots[ty.index()].load(Ordering::Acquire).is_null()
    }

    /// All currently bound service types, ascending.
    pub fn bound_types(&self) -> Vec<ServiceType> {
        (0..SERVICE_SLOTS)
            .map(|i| ServiceType(i as u8))
            .filter(|ty| self.is_bound(*ty))
            .collect()
    }

    /// Replaced cells still waiting for a grace period.
    pub fn pending_reclaim(&self) -> usize {
        self.retired.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            let cell = std::mem::replace(slot.get_mut(), ptr::null_mut());
            if !cell.is_null() {
                // SAFETY: `&mut self` excludes readers; the cell came from `Box::into_raw`.
                drop(unsafe { Box::from_raw(cell) });
            }
        }
        self.retired.get_mut().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
