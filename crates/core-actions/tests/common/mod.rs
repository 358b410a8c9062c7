//! Shared fixtures: a rig over a virtual cursor with a manual scheduler,
//! driven by explicit instants.
#![allow(dead_code)] // not every test binary uses every helper

use std::time::{Duration, Instant};

use core_actions::Rig;
use core_backend::{BackendRegistry, SharedVirtualBackend};
use core_config::RigConfig;
use core_events::ManualScheduler;

/// A rig whose cursor starts at `(x, y)`, with manual-movement detection
/// off so tests fully own the cursor.
pub fn rig_at(x: i32, y: i32) -> (Rig, SharedVirtualBackend) {
    let backend = SharedVirtualBackend::at(x, y);
    let registry = BackendRegistry::new(Box::new(backend.clone()));
    let rig = Rig::with_parts(
        registry,
        Box::new(ManualScheduler::new()),
        RigConfig {
            detect_manual_movement: false,
            ..RigConfig::default()
        },
    );
    (rig, backend)
}

pub fn at(base: Instant, ms: u64) -> Instant {
    base + Duration::from_millis(ms)
}

/// Tick at every step in `[from_ms, to_ms]` relative to `base`.
pub fn run(rig: &Rig, base: Instant, from_ms: u64, to_ms: u64, step_ms: u64) {
    let mut elapsed = from_ms;
    while elapsed <= to_ms {
        rig.tick_at(at(base, elapsed));
        elapsed += step_ms;
    }
}

/// Record the frame clock and start pending lifecycles at `t0`.
pub fn start(rig: &Rig, t0: Instant) {
    rig.tick_at(t0);
    rig.tick_at(t0);
}
