//! # plait-io
//!
//! Mesh interchange format, scene description and scene validation.
//!
//! Defines the boundary types that hosts (viewers, batch drivers, asset
//! pipelines) use to hand a scene to the plait simulation core and to
//! read cloth state back out.

pub mod obj;
pub mod scene;
pub mod validator;

pub use obj::{load_obj, obj_string, parse_obj, read_obj, save_obj, write_obj};
pub use scene::{
    ClothDescription, HandleDescription, Keyframe, MeshSource, Modules, NodeSelection,
    ObstacleDescription, SceneDescription,
};
pub use validator::validate_scene;
