//! Penalty constraints contributed to one implicit step.
//!
//! Constraints are soft: each supplies a scalar `value`, a penalty energy
//! with its first and second derivatives in that value, and a spatial
//! gradient per affected node. The integrator turns those into system
//! terms. Snapping pins and proximity constraints also supply a direct
//! position projection, and proximity constraints supply friction.
//!
//! | Variant | value | energy | friction | projection |
//! |---|---|---|---|---|
//! | [`EqCon`] (pin) | `n·(x − target)` | `k v²/2` | none | onto the target along `n`, when snapping |
//! | [`IneqCon`] (proximity) | `Σ wᵢ n·xᵢ − thickness` | `k v³/(6 thickness)` in violation | Coulomb | push free nodes out |

use plait_math::{outer, DMat3, DVec3};
use plait_types::NodeRef;

use crate::meshes::MeshSet;

/// Per-node spatial vectors (gradients, forces or position deltas).
pub type MeshGrad = Vec<(NodeRef, DVec3)>;

/// Per-node-pair 3×3 blocks.
pub type MeshHess = Vec<((NodeRef, NodeRef), DMat3)>;

/// Thicknesses shared by every proximity constraint of a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactThickness {
    pub repulsion: f64,
    pub projection: f64,
}

/// Holds one node along one direction at a target position.
#[derive(Debug, Clone, PartialEq)]
pub struct EqCon {
    pub node: NodeRef,
    pub target: DVec3,
    pub n: DVec3,
    pub stiff: f64,
    /// Whether [`project`](Self::project) snaps the node onto the target.
    pub snap: bool,
}

impl EqCon {
    /// A penalty-only pin.
    pub fn new(node: NodeRef, target: DVec3, n: DVec3, stiff: f64) -> Self {
        Self {
            node,
            target,
            n,
            stiff,
            snap: false,
        }
    }

    pub fn snapping(mut self, snap: bool) -> Self {
        self.snap = snap;
        self
    }

    pub fn value(&self, meshes: &MeshSet<'_>) -> f64 {
        self.n.dot(meshes.node(self.node).x - self.target)
    }

    pub fn energy(&self, value: f64) -> f64 {
        self.stiff * value * value / 2.0
    }

    pub fn energy_grad(&self, value: f64) -> f64 {
        self.stiff * value
    }

    pub fn energy_hess(&self, _value: f64) -> f64 {
        self.stiff
    }

    pub fn gradient(&self) -> MeshGrad {
        vec![(self.node, self.n)]
    }

    /// `(target − x)·n n` for a snapping pin; nothing otherwise.
    pub fn project(&self, meshes: &MeshSet<'_>) -> MeshGrad {
        if !self.snap {
            return Vec::new();
        }
        let d = self.value(meshes);
        if d == 0.0 {
            return Vec::new();
        }
        vec![(self.node, -d * self.n)]
    }
}

/// Keeps a cloth node on the positive side of a face (or an edge pair)
/// by at least the repulsion thickness.
///
/// `nodes[0]` carries weight 1; the other three carry the negated
/// barycentric weights of the closest point, so `Σ wᵢ xᵢ` is the
/// separation vector.
#[derive(Debug, Clone, PartialEq)]
pub struct IneqCon {
    pub nodes: [NodeRef; 4],
    pub w: [f64; 4],
    /// Whether each node may move (obstacle nodes may not).
    pub free: [bool; 4],
    pub n: DVec3,
    pub mu: f64,
    pub stiff: f64,
    pub thickness: ContactThickness,
}

#[inline]
fn violation(value: f64) -> f64 {
    (-value).max(0.0)
}

impl IneqCon {
    pub fn value(&self, meshes: &MeshSet<'_>) -> f64 {
        let d: f64 = (0..4)
            .map(|i| self.w[i] * self.n.dot(meshes.node(self.nodes[i]).x))
            .sum();
        d - self.thickness.repulsion
    }

    pub fn energy(&self, value: f64) -> f64 {
        let v = violation(value);
        self.stiff * v * v * v / self.thickness.repulsion / 6.0
    }

    pub fn energy_grad(&self, value: f64) -> f64 {
        let v = violation(value);
        -self.stiff * v * v / self.thickness.repulsion / 2.0
    }

    pub fn energy_hess(&self, value: f64) -> f64 {
        self.stiff * violation(value) / self.thickness.repulsion
    }

    pub fn gradient(&self) -> MeshGrad {
        (0..4).map(|i| (self.nodes[i], self.n * self.w[i])).collect()
    }

    fn inv_mass(&self, meshes: &MeshSet<'_>) -> f64 {
        (0..4)
            .filter(|&i| self.free[i])
            .map(|i| self.w[i] * self.w[i] / meshes.node(self.nodes[i]).m)
            .sum()
    }

    /// Moves free nodes so the separation reaches the projection thickness,
    /// distributed by inverse mass.
    pub fn project(&self, meshes: &MeshSet<'_>) -> MeshGrad {
        let d = self.value(meshes) + self.thickness.repulsion - self.thickness.projection;
        if d >= 0.0 {
            return Vec::new();
        }
        let inv_mass = self.inv_mass(meshes);
        if inv_mass == 0.0 || !inv_mass.is_finite() {
            return Vec::new();
        }
        (0..4)
            .filter(|&i| self.free[i])
            .map(|i| {
                let m = meshes.node(self.nodes[i]).m;
                (self.nodes[i], -(self.w[i] / m) / inv_mass * d * self.n)
            })
            .collect()
    }

    /// Tangential friction force and its velocity Jacobian.
    pub fn friction(&self, dt: f64, meshes: &MeshSet<'_>) -> (MeshGrad, MeshHess) {
        if self.mu == 0.0 {
            return (Vec::new(), Vec::new());
        }
        let fn_ = self.energy_grad(self.value(meshes)).abs();
        if fn_ == 0.0 {
            return (Vec::new(), Vec::new());
        }
        let v: DVec3 = (0..4)
            .map(|i| meshes.node(self.nodes[i]).v * self.w[i])
            .sum();
        let inv_mass = self.inv_mass(meshes);
        let t = DMat3::IDENTITY - outer(self.n, self.n);
        let tv = t * v;
        let vt = tv.length();
        if vt == 0.0 || inv_mass == 0.0 {
            return (Vec::new(), Vec::new());
        }
        let f_by_v = (self.mu * fn_ / vt).min(1.0 / (dt * inv_mass));

        let mut force = Vec::with_capacity(4);
        let mut jac = Vec::with_capacity(16);
        for i in 0..4 {
            if !self.free[i] {
                continue;
            }
            force.push((self.nodes[i], -self.w[i] * f_by_v * tv));
            for j in 0..4 {
                if self.free[j] {
                    jac.push((
                        (self.nodes[i], self.nodes[j]),
                        t * (-self.w[i] * self.w[j] * f_by_v),
                    ));
                }
            }
        }
        (force, jac)
    }
}

/// A constraint of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Pin(EqCon),
    Proximity(IneqCon),
}

impl Constraint {
    pub fn value(&self, meshes: &MeshSet<'_>) -> f64 {
        match self {
            Constraint::Pin(c) => c.value(meshes),
            Constraint::Proximity(c) => c.value(meshes),
        }
    }

    pub fn energy(&self, value: f64) -> f64 {
        match self {
            Constraint::Pin(c) => c.energy(value),
            Constraint::Proximity(c) => c.energy(value),
        }
    }

    pub fn energy_grad(&self, value: f64) -> f64 {
        match self {
            Constraint::Pin(c) => c.energy_grad(value),
            Constraint::Proximity(c) => c.energy_grad(value),
        }
    }

    pub fn energy_hess(&self, value: f64) -> f64 {
        match self {
            Constraint::Pin(c) => c.energy_hess(value),
            Constraint::Proximity(c) => c.energy_hess(value),
        }
    }

    pub fn gradient(&self) -> MeshGrad {
        match self {
            Constraint::Pin(c) => c.gradient(),
            Constraint::Proximity(c) => c.gradient(),
        }
    }

    /// Direct position correction.
    pub fn project(&self, meshes: &MeshSet<'_>) -> MeshGrad {
        match self {
            Constraint::Pin(c) => c.project(meshes),
            Constraint::Proximity(c) => c.project(meshes),
        }
    }

    /// Friction force and Jacobian; pins are frictionless.
    pub fn friction(&self, dt: f64, meshes: &MeshSet<'_>) -> (MeshGrad, MeshHess) {
        match self {
            Constraint::Pin(_) => (Vec::new(), Vec::new()),
            Constraint::Proximity(c) => c.friction(dt, meshes),
        }
    }

    #[inline]
    pub fn is_pin(&self) -> bool {
        matches!(self, Constraint::Pin(_))
    }

    #[inline]
    pub fn is_proximity(&self) -> bool {
        matches!(self, Constraint::Proximity(_))
    }
}

/// The constraints of one step. Dropped at the end of the step.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: Constraint) {
        self.constraints.push(c);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    /// Number of proximity constraints in the set.
    pub fn proximity_count(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_proximity()).count()
    }

    /// Sum of penalty energies at the current state.
    pub fn energy(&self, meshes: &MeshSet<'_>) -> f64 {
        self.constraints
            .iter()
            .map(|c| c.energy(c.value(meshes)))
            .sum()
    }
}

impl Extend<Constraint> for ConstraintSet {
    fn extend<I: IntoIterator<Item = Constraint>>(&mut self, iter: I) {
        self.constraints.extend(iter);
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self {
            constraints: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

impl IntoIterator for ConstraintSet {
    type Item = Constraint;
    type IntoIter = std::vec::IntoIter<Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.into_iter()
    }
}
