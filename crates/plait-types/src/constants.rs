//! Physical constants and tuning defaults.

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.8;

/// Default simulation step (seconds).
pub const DEFAULT_STEP_TIME: f64 = 1.0 / 200.0;

/// Default number of steps per output frame.
pub const DEFAULT_FRAME_STEPS: u32 = 8;

/// Default obstacle pose smoothing time constant (seconds).
pub const OBSTACLE_DECAY_TIME: f64 = 0.1;

/// Penalty stiffness of a handle pin.
pub const DEFAULT_HANDLE_STIFFNESS: f64 = 1e3;

/// Penalty stiffness of a proximity constraint, per unit area.
pub const DEFAULT_COLLISION_STIFFNESS: f64 = 1e9;

/// Separation at which proximity constraints start repelling (meters).
pub const DEFAULT_REPULSION_THICKNESS: f64 = 1e-3;

/// Separation enforced by direct position projection (meters).
pub const DEFAULT_PROJECTION_THICKNESS: f64 = 1e-4;

/// Minimum improvement before the remesher flips an edge.
pub const DEFAULT_EDGE_FLIP_THRESHOLD: f64 = 1e-2;

/// Denominator clamp for cotangents and normalizations.
pub const EPSILON: f64 = 1e-10;

/// Triangles below this material-space area are treated as degenerate.
pub const DEGENERATE_AREA_THRESHOLD: f64 = 1e-12;
