//! Process-wide rig instance.
//!
//! One engine per process, initialized on first use. The instance is
//! thread-local on purpose: the engine is single-threaded by contract, and
//! a handle must never migrate to another thread. `install` swaps in a
//! fully wired rig (real back-end, real scheduler) before first use;
//! `reset` restores defaults for tests.

use std::cell::RefCell;

use crate::rig::Rig;

thread_local! {
    static RIG: RefCell<Option<Rig>> = const { RefCell::new(None) };
}

/// The shared rig for this thread, created on first use.
pub fn rig() -> Rig {
    RIG.with(|cell| {
        cell.borrow_mut()
            .get_or_insert_with(Rig::new)
            .clone()
    })
}

/// Replace the shared instance (call before anything uses [`rig`]).
pub fn install(instance: Rig) {
    RIG.with(|cell| {
        *cell.borrow_mut() = Some(instance);
    });
}

/// Reset the shared instance's state to defaults. The handle identity is
/// preserved so clones held by callers stay valid.
pub fn reset() {
    RIG.with(|cell| {
        if let Some(rig) = cell.borrow().as_ref() {
            rig.reset();
        }
    });
}
