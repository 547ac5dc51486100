//! Scene validation.
//!
//! Validates a scene description before the simulation is built from it,
//! catching configuration errors early with clear diagnostics. Checks that
//! need the loaded meshes (handle node indices) happen when the scene is
//! instantiated.

use plait_types::{PlaitError, PlaitResult};

use crate::scene::{ClothDescription, Keyframe, SceneDescription};

/// Validates a complete scene description.
///
/// Checks:
/// - Timing is positive and the frame has at least one step
/// - At least one cloth, each with materials of positive density
/// - Remeshing limits are ordered and positive
/// - Handles reference existing cloths; keyframes are time-ordered
/// - Contact thicknesses and friction are non-negative
pub fn validate_scene(scene: &SceneDescription) -> PlaitResult<()> {
    if !(scene.step_time > 0.0) {
        return Err(PlaitError::InvalidConfig(format!(
            "Step time must be positive, got {}",
            scene.step_time
        )));
    }
    if scene.frame_steps == 0 {
        return Err(PlaitError::InvalidConfig("Frame must have at least one step".into()));
    }
    if let Some(end) = scene.end_time {
        if end < 0.0 {
            return Err(PlaitError::InvalidConfig("End time must be non-negative".into()));
        }
    }
    if scene.cloths.is_empty() {
        return Err(PlaitError::InvalidConfig("Scene has no cloth".into()));
    }
    for (i, cloth) in scene.cloths.iter().enumerate() {
        validate_cloth(cloth).map_err(|e| match e {
            PlaitError::InvalidMaterial(m) => PlaitError::InvalidMaterial(format!("Cloth {i}: {m}")),
            PlaitError::InvalidConfig(m) => PlaitError::InvalidConfig(format!("Cloth {i}: {m}")),
            other => other,
        })?;
    }
    for (i, obstacle) in scene.obstacles.iter().enumerate() {
        validate_keyframes(&obstacle.motion)
            .map_err(|m| PlaitError::InvalidConfig(format!("Obstacle {i}: {m}")))?;
    }
    for (i, handle) in scene.handles.iter().enumerate() {
        if handle.cloth >= scene.cloths.len() {
            return Err(PlaitError::InvalidConfig(format!(
                "Handle {i} references cloth {} but the scene has {}",
                handle.cloth,
                scene.cloths.len()
            )));
        }
        if handle.fade_time < 0.0 {
            return Err(PlaitError::InvalidConfig(format!(
                "Handle {i}: fade time must be non-negative"
            )));
        }
        validate_keyframes(&handle.motion)
            .map_err(|m| PlaitError::InvalidConfig(format!("Handle {i}: {m}")))?;
    }

    let solver = &scene.solver;
    if solver.repulsion_thickness < 0.0 || solver.projection_thickness < 0.0 {
        return Err(PlaitError::InvalidConfig(
            "Contact thicknesses must be non-negative".into(),
        ));
    }
    if solver.projection_thickness > solver.repulsion_thickness {
        return Err(PlaitError::InvalidConfig(format!(
            "Projection thickness ({}) exceeds repulsion thickness ({})",
            solver.projection_thickness, solver.repulsion_thickness
        )));
    }
    if scene.friction.cloth < 0.0 || scene.friction.obstacle < 0.0 {
        return Err(PlaitError::InvalidConfig("Friction must be non-negative".into()));
    }
    Ok(())
}

fn validate_cloth(cloth: &ClothDescription) -> PlaitResult<()> {
    let fabrics = cloth.fabrics()?;
    if fabrics.is_empty() {
        return Err(PlaitError::InvalidMaterial("no materials".into()));
    }
    for material in &fabrics {
        if !(material.density > 0.0) {
            return Err(PlaitError::InvalidMaterial(format!(
                "material '{}' has non-positive density {}",
                material.name, material.density
            )));
        }
    }
    let r = &cloth.remeshing;
    if !(r.size_min > 0.0) || r.size_min > r.size_max {
        return Err(PlaitError::InvalidConfig(format!(
            "Remesh sizes must satisfy 0 < min <= max, got [{}, {}]",
            r.size_min, r.size_max
        )));
    }
    if !(r.aspect_min > 0.0 && r.aspect_min <= 1.0) {
        return Err(PlaitError::InvalidConfig(format!(
            "Aspect minimum must be in (0, 1], got {}",
            r.aspect_min
        )));
    }
    if r.refine_angle <= 0.0 || r.refine_velocity <= 0.0 || r.refine_compression <= 0.0 {
        return Err(PlaitError::InvalidConfig("Refinement targets must be positive".into()));
    }
    Ok(())
}

fn validate_keyframes(keys: &[Keyframe]) -> Result<(), String> {
    if keys.windows(2).any(|w| w[1].time < w[0].time) {
        return Err("keyframes are not in time order".into());
    }
    Ok(())
}
