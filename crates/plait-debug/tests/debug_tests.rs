//! Integration tests for plait-debug.

use approx::assert_relative_eq;
use plait_debug::hooks::{InspectionHook, TelemetryHook};
use plait_debug::snapshot::StateSnapshot;
use plait_math::DVec3;
use plait_mesh::generators::quad_grid;
use plait_telemetry::events::{EventKind, Phase};

// ─── Hook Tests ───────────────────────────────────────────────

#[test]
fn telemetry_hook_collects_events() {
    let mut hook = TelemetryHook::new();
    hook.on_step_begin(1, 0.005, 0.005);
    hook.on_phase(1, Phase::Physics, 1e-3);
    hook.on_phase(1, Phase::Collision, 1e-4);
    hook.on_step_end(1, 2e-3);

    let events = hook.drain_events();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.step == 1));
    assert!(matches!(
        events[2].kind,
        EventKind::PhaseComplete {
            phase: Phase::Collision,
            ..
        }
    ));
}

#[test]
fn hook_drain_clears() {
    let mut hook = TelemetryHook::new();
    hook.on_step_begin(0, 0.0, 0.005);
    let _ = hook.drain_events();
    assert!(hook.drain_events().is_empty());
}

struct Counter(u32);

impl InspectionHook for Counter {
    fn on_step_end(&mut self, _step: u32, _wall_time: f64) {
        self.0 += 1;
    }

    fn name(&self) -> &str {
        "counter"
    }
}

#[test]
fn default_callbacks_are_no_ops() {
    let mut hook = Counter(0);
    hook.on_step_begin(0, 0.0, 0.005);
    hook.on_phase(0, Phase::Remeshing, 0.0);
    hook.on_step_end(0, 0.0);
    hook.on_simulation_end();
    assert_eq!(hook.0, 1);
    assert_eq!(TelemetryHook::new().name(), "telemetry_hook");
}

// ─── Snapshot Tests ───────────────────────────────────────────

#[test]
fn snapshot_round_trip() {
    let mut mesh = quad_grid(2, 2, 1.0, 1.0).unwrap();
    mesh.nodes[4].v = DVec3::new(0.1, -0.2, 0.3);

    let snap = StateSnapshot::capture(42, 0.7, &mesh);
    let bytes = snap.to_bytes().unwrap();
    let recovered = StateSnapshot::from_bytes(&bytes).unwrap();

    assert_eq!(recovered, snap);
    assert_eq!(recovered.node_count, 9);
    assert_relative_eq!(recovered.time, 0.7);
    assert_eq!(recovered.velocity(4), DVec3::new(0.1, -0.2, 0.3));
}

#[test]
fn snapshot_interleaving() {
    let mesh = quad_grid(1, 1, 2.0, 2.0).unwrap();
    let snap = StateSnapshot::capture(0, 0.0, &mesh);
    assert_eq!(snap.positions.len(), 12);
    assert_eq!(snap.position(3), mesh.nodes[3].x);
    assert_eq!(&snap.positions[3..6], &mesh.nodes[1].x.to_array());
}

#[test]
fn restore_and_diff() {
    let mut mesh = quad_grid(1, 1, 1.0, 1.0).unwrap();
    let before = StateSnapshot::capture(0, 0.0, &mesh);
    mesh.nodes[2].x.z += 0.25;
    let after = StateSnapshot::capture(1, 0.005, &mesh);
    assert_relative_eq!(before.max_displacement(&after).unwrap(), 0.25);

    before.restore(&mut mesh).unwrap();
    assert_eq!(mesh.nodes[2].x, before.position(2));

    let other = quad_grid(2, 1, 1.0, 1.0).unwrap();
    assert!(before.restore(&mut other.clone()).is_err());
    assert!(StateSnapshot::capture(0, 0.0, &other).max_displacement(&before).is_err());
}

#[test]
fn truncated_bytes_rejected() {
    let mesh = quad_grid(1, 1, 1.0, 1.0).unwrap();
    let bytes = StateSnapshot::capture(0, 0.0, &mesh).to_bytes().unwrap();
    assert!(StateSnapshot::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}
