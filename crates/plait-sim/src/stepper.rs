//! The per-step pipeline.
//!
//! [`Simulation::advance_step`] runs the passes in a fixed order. Every
//! pass reads and writes the shared cloth meshes in place; remeshing
//! replaces them wholesale, so constraints are gathered fresh wherever a
//! pass needs them and never outlive the step.

use std::time::Instant;

use plait_contact::{collision_response, nearest_obstacle_planes, proximity_constraints, separate};
use plait_math::DVec3;
use plait_mesh::normals::compute_ws_data;
use plait_mesh::Mesh;
use plait_remesh::{back_up_residuals, dynamic_remesh, restore_residuals, static_remesh};
use plait_solver::external::add_external_forces;
use plait_solver::implicit::{implicit_update, snap_pins, ImplicitUpdate};
use plait_solver::plasticity::{optimize_plastic_embedding, plastic_update, reset_plasticity};
use plait_solver::pop_filter::apply_pop_filter;
use plait_solver::strain_limit::{pinned_nodes, strain_limit, StrainBounds};
use plait_solver::{ConstraintSet, ExternalForces, MeshSet, SolverConfig};
use plait_telemetry::{EventKind, Phase};
use plait_types::PlaitResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::obstacle::{active_meshes, active_meshes_mut};
use crate::simulation::{InitialRelaxation, Simulation};

/// Summary of one call to [`Simulation::advance_step`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u32,
    pub time: f64,
    /// Pins contributed by handles.
    pub handle_constraints: usize,
    pub proximity_constraints: usize,
    /// The step ended a frame and the cloths were remeshed.
    pub remeshed: bool,
    pub wall_time: f64,
}

/// Node positions of every cloth, cloth after cloth.
fn node_positions(sim: &Simulation) -> Vec<Vec<DVec3>> {
    sim.cloths
        .iter()
        .map(|c| c.mesh.nodes.iter().map(|n| n.x).collect())
        .collect()
}

impl Simulation {
    /// Advance the clock by one step and run every enabled pass.
    ///
    /// Not reentrant: the step owns all cloth and obstacle state until it
    /// returns. An `Err` leaves the simulation mid-step and must be treated
    /// as fatal.
    pub fn advance_step(&mut self) -> PlaitResult<StepReport> {
        let started = Instant::now();
        self.time += self.step_time;
        self.step += 1;
        self.begin_step();

        self.timed(Phase::Obstacles, |sim| {
            sim.update_obstacles(false);
            Ok(())
        })?;

        let cons = self.timed(Phase::Constraints, |sim| Ok(sim.gather_constraints(true)))?;
        let proximity = cons.proximity_count();
        let handles = cons.len() - proximity;
        self.emit(EventKind::ConstraintsGathered { handles, proximity });

        if self.modules.physics {
            self.timed(Phase::Physics, |sim| sim.physics_step(&cons))?;
        }
        if self.modules.plasticity {
            self.timed(Phase::Plasticity, |sim| sim.plasticity_step())?;
        }
        if self.modules.strain_limiting {
            self.timed(Phase::StrainLimiting, |sim| {
                sim.strain_limiting_step(&cons);
                Ok(())
            })?;
        }
        drop(cons);

        if self.modules.collision {
            self.timed(Phase::Collision, |sim| {
                sim.collision_step();
                Ok(())
            })?;
        }
        self.record_previous_positions();

        let mut remeshed = false;
        if self.step % self.frame_steps.max(1) == 0 {
            if self.modules.remeshing {
                self.timed(Phase::Remeshing, |sim| sim.remeshing_step(false))?;
                remeshed = true;
            }
            self.frame += 1;
            info!(frame = self.frame, time = self.time, "frame complete");
        }

        let report = StepReport {
            step: self.step,
            time: self.time,
            handle_constraints: handles,
            proximity_constraints: proximity,
            remeshed,
            wall_time: started.elapsed().as_secs_f64(),
        };
        self.end_step(started);
        Ok(report)
    }

    /// Run steps until the frame counter advances.
    pub fn advance_frame(&mut self) -> PlaitResult<Vec<StepReport>> {
        let frame = self.frame;
        let mut reports = Vec::with_capacity(self.frame_steps as usize);
        while self.frame == frame {
            reports.push(self.advance_step()?);
        }
        Ok(reports)
    }

    /// Settle the loaded scene before the first step.
    pub fn relax_initial_state(&mut self) -> PlaitResult<()> {
        self.validate_handles()?;
        if self.preserve_creases {
            self.cloths.iter_mut().for_each(reset_plasticity);
        }
        if self.modules.remeshing {
            match self.relaxation {
                InitialRelaxation::Equilibrate => {
                    self.equilibration_step()?;
                    self.remeshing_step(true)?;
                    self.equilibration_step()?;
                }
                InitialRelaxation::StrainZeroing => {
                    self.remeshing_step(true)?;
                    self.strain_zeroing_step();
                    self.remeshing_step(true)?;
                    self.strain_zeroing_step();
                }
            }
        }
        if self.preserve_creases {
            self.cloths.iter_mut().for_each(reset_plasticity);
        }
        self.preserve_creases = false;
        if self.fixed_high_res_mesh {
            self.modules.remeshing = false;
        }
        info!(
            nodes = self.cloths.iter().map(|c| c.mesh.node_count()).sum::<usize>(),
            "initial state relaxed"
        );
        Ok(())
    }

    /// Move obstacles to their blended pose at the current time. Without
    /// `update_positions` they stay at `x0` and only carry the velocity.
    pub fn update_obstacles(&mut self, update_positions: bool) {
        let (time, dt) = (self.time, self.step_time);
        for obstacle in &mut self.obstacles {
            obstacle.advance(time, dt, update_positions);
        }
    }

    /// Handle pins active now, plus proximity contacts when requested and
    /// enabled.
    pub fn gather_constraints(&mut self, include_proximity: bool) -> ConstraintSet {
        let time = self.time;
        let cloth_meshes: Vec<&Mesh> = self.cloths.iter().map(|c| &c.mesh).collect();
        let obstacle_meshes = active_meshes(&self.obstacles, time);
        let meshes = MeshSet::new(&cloth_meshes, &obstacle_meshes);

        let mut cons = ConstraintSet::new();
        for handle in &mut self.handles {
            cons.extend(handle.constraints(time, self.solver.handle_stiffness, &meshes));
        }
        if include_proximity && self.modules.proximity {
            cons.extend(proximity_constraints(&meshes, self.friction, &self.solver, &self.contact));
        }
        debug!(total = cons.len(), proximity = cons.proximity_count(), "constraints gathered");
        cons
    }

    fn physics_step(&mut self, cons: &ConstraintSet) -> PlaitResult<()> {
        let (time, dt) = (self.time, self.step_time);
        for c in 0..self.cloths.len() {
            let nn = self.cloths[c].mesh.node_count();
            let mut external = ExternalForces::zeros(nn);
            add_external_forces(&self.cloths[c].mesh, self.gravity, &self.wind, &mut external.fext);
            for morph in self.morphs.iter().filter(|m| m.cloth == c) {
                morph.add_forces(&self.cloths[c], time, dt, &mut external.fext, &mut external.jext);
            }
            let obstacle_meshes = active_meshes(&self.obstacles, time);
            let update = ImplicitUpdate {
                cloth: c,
                external: &external,
                constraints: cons,
                dt,
                update_positions: false,
            };
            let stats = implicit_update(&mut self.cloths, &obstacle_meshes, &update, &self.solver)?;
            self.emit(EventKind::LinearSolve {
                cloth: c,
                dofs: stats.dofs,
                nnz: stats.nnz,
            });
        }
        self.step_meshes();
        self.hold_pins(cons);
        Ok(())
    }

    /// Put pinned nodes back on their targets after integration. The
    /// correction goes into the velocity too, so `v` stays the step's
    /// displacement over `dt`.
    fn hold_pins(&mut self, cons: &ConstraintSet) {
        let (time, dt) = (self.time, self.step_time);
        for c in 0..self.cloths.len() {
            let obstacle_meshes = active_meshes(&self.obstacles, time);
            for (n, d) in snap_pins(&mut self.cloths, &obstacle_meshes, c, cons) {
                self.cloths[c].mesh.nodes[n].v += d / dt;
            }
        }
    }

    /// `x += v dt` for every cloth and active obstacle node.
    fn step_meshes(&mut self) {
        let (time, dt) = (self.time, self.step_time);
        let cloths = self.cloths.iter_mut().map(|c| &mut c.mesh);
        let obstacles = active_meshes_mut(&mut self.obstacles, time);
        for mesh in cloths.chain(obstacles) {
            mesh.nodes.par_iter_mut().for_each(|node| node.x += node.v * dt);
            compute_ws_data(mesh);
        }
    }

    fn plasticity_step(&mut self) -> PlaitResult<()> {
        for cloth in &mut self.cloths {
            let yielded = plastic_update(cloth);
            optimize_plastic_embedding(cloth, &self.solver)?;
            debug!(yielded, "plastic update");
        }
        Ok(())
    }

    fn strain_limiting_step(&mut self, cons: &ConstraintSet) {
        let xold = node_positions(self);
        self.limit_strain(cons, StrainBounds::Material);
        self.update_velocities(&xold);
    }

    fn limit_strain(&mut self, cons: &ConstraintSet, bounds: StrainBounds) {
        for (c, cloth) in self.cloths.iter_mut().enumerate() {
            let pinned = pinned_nodes(cons, c, cloth.mesh.node_count());
            strain_limit(cloth, &pinned, bounds, &self.solver);
            compute_ws_data(&mut cloth.mesh);
        }
    }

    /// Resolve penetrations under the handle pins, then fold the position
    /// change into the velocities.
    fn collision_step(&mut self) {
        let xold = node_positions(self);
        let cons = self.gather_constraints(false);
        self.resolve_collisions(&cons);
        self.update_velocities(&xold);
    }

    /// End-of-step bookkeeping: the current positions become the previous
    /// positions of the next step. Runs whichever passes are enabled.
    fn record_previous_positions(&mut self) {
        let time = self.time;
        for cloth in &mut self.cloths {
            cloth.mesh.update_x0();
        }
        for mesh in active_meshes_mut(&mut self.obstacles, time) {
            mesh.update_x0();
        }
    }

    fn resolve_collisions(&mut self, cons: &ConstraintSet) {
        let time = self.time;
        let mut cloths: Vec<&mut Mesh> = self.cloths.iter_mut().map(|c| &mut c.mesh).collect();
        let mut obstacles = active_meshes_mut(&mut self.obstacles, time);
        collision_response(&mut cloths, &mut obstacles, cons, &self.contact);
    }

    /// `v += (x − xold) / dt`.
    fn update_velocities(&mut self, xold: &[Vec<DVec3>]) {
        let inv_dt = 1.0 / self.step_time;
        for (cloth, xold) in self.cloths.iter_mut().zip(xold) {
            cloth
                .mesh
                .nodes
                .par_iter_mut()
                .zip(xold.par_iter())
                .for_each(|(node, &x)| node.v += (node.x - x) * inv_dt);
        }
    }

    /// Zero accelerations, settle each cloth with a lightly regularized
    /// static solve, then resolve collisions under the handle pins.
    pub fn equilibration_step(&mut self) -> PlaitResult<()> {
        let config = SolverConfig {
            pop_filter_regularization: 1.0,
            ..self.solver.clone()
        };
        let none = ConstraintSet::new();
        let time = self.time;
        for c in 0..self.cloths.len() {
            for node in &mut self.cloths[c].mesh.nodes {
                node.acceleration = DVec3::ZERO;
            }
            let obstacle_meshes = active_meshes(&self.obstacles, time);
            apply_pop_filter(&mut self.cloths, &obstacle_meshes, c, &none, &config)?;
        }
        if self.modules.collision {
            let cons = self.gather_constraints(false);
            self.resolve_collisions(&cons);
        }
        Ok(())
    }

    /// Pull every face to zero strain under the proximity contacts, then
    /// resolve collisions with no pins.
    pub fn strain_zeroing_step(&mut self) {
        let time = self.time;
        let cons = {
            let cloth_meshes: Vec<&Mesh> = self.cloths.iter().map(|c| &c.mesh).collect();
            let obstacle_meshes = active_meshes(&self.obstacles, time);
            let meshes = MeshSet::new(&cloth_meshes, &obstacle_meshes);
            proximity_constraints(&meshes, self.friction, &self.solver, &self.contact)
        };
        self.limit_strain(&cons, StrainBounds::Uniform(1.0, 1.0));
        if self.modules.collision {
            self.resolve_collisions(&ConstraintSet::new());
        }
    }

    /// Remesh every cloth, transplant plastic state, separate from the
    /// obstacles and filter pops. `initializing` skips the residual
    /// transplant and the pop filter.
    pub fn remeshing_step(&mut self, initializing: bool) -> PlaitResult<()> {
        if !self.modules.remeshing {
            return Ok(());
        }
        self.validate_handles()?;
        let time = self.time;
        let old: Vec<Mesh> = self.cloths.iter().map(|c| c.mesh.clone()).collect();
        let residuals = (self.modules.plasticity && !initializing).then(|| {
            self.cloths
                .iter()
                .map(|c| back_up_residuals(&c.mesh))
                .collect::<Vec<_>>()
        });

        for c in 0..self.cloths.len() {
            let outcome = if self.fixed_high_res_mesh {
                static_remesh(&mut self.cloths[c])
            } else {
                let obstacle_meshes = active_meshes(&self.obstacles, time);
                let planes = nearest_obstacle_planes(
                    &self.cloths[c].mesh,
                    &obstacle_meshes,
                    self.contact.plane_radius,
                );
                dynamic_remesh(&mut self.cloths[c], &planes)?
            };
            for handle in &mut self.handles {
                handle.remap(c, &outcome.node_map);
            }
            self.emit(EventKind::Remeshed {
                cloth: c,
                splits: outcome.splits,
                flips: outcome.flips,
                collapses: outcome.collapses,
                nodes_before: outcome.nodes_before,
                nodes_after: outcome.nodes_after,
            });
        }

        if let Some(residuals) = residuals {
            for ((cloth, old), res) in self.cloths.iter_mut().zip(&old).zip(&residuals) {
                restore_residuals(&mut cloth.mesh, old, res);
            }
        }
        if self.modules.separation {
            let old_refs: Vec<&Mesh> = old.iter().collect();
            let mut cloths: Vec<&mut Mesh> = self.cloths.iter_mut().map(|c| &mut c.mesh).collect();
            let obstacle_meshes = active_meshes(&self.obstacles, time);
            let moved = separate(&mut cloths, &old_refs, &obstacle_meshes, &self.contact);
            debug!(moved, "separation");
        }
        if self.modules.pop_filter && !initializing {
            let cons = self.gather_constraints(true);
            for c in 0..self.cloths.len() {
                let obstacle_meshes = active_meshes(&self.obstacles, time);
                apply_pop_filter(&mut self.cloths, &obstacle_meshes, c, &cons, &self.solver)?;
            }
        }
        Ok(())
    }
}
