//! Integration tests for plait-io.

use approx::assert_relative_eq;
use plait_io::scene::{motion_from_keyframes, place_mesh};
use plait_io::{
    obj_string, parse_obj, validate_scene, ClothDescription, HandleDescription, Keyframe,
    MeshSource, Modules, NodeSelection, ObstacleDescription, SceneDescription,
};
use plait_material::FabricProperties;
use plait_math::motion::Transform;
use plait_math::{DMat2, DVec2, DVec3, DVec4};
use plait_mesh::generators::quad_grid;
use plait_solver::RemeshConfig;
use plait_types::{FaceId, NodeId, PlaitError};

const TRIANGLE: &str = "\
# one labelled triangle
vt 0 0
vt 1 0
vt 0 1
vl 3
v 0 0 0
v 1 0 0
nv 0 0 -1
v 0 1 0
ny 0 1 0.5
nl 7
e 1 2
ea 0.25
ed 0.5
el 2
f 1/1 2/2 3/3
tl 0
ts 1 2 2 4
td 0.125
";

// ─── Parsing Tests ────────────────────────────────────────────

#[test]
fn parses_extension_records() {
    let mesh = parse_obj(TRIANGLE).unwrap();
    assert_eq!(mesh.node_count(), 3);
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.verts[2].label, 3);
    assert_eq!(mesh.nodes[1].v, DVec3::new(0.0, 0.0, -1.0));
    assert_eq!(mesh.nodes[2].y, DVec3::new(0.0, 1.0, 0.5));
    assert_eq!(mesh.nodes[2].label, 7);
    assert_eq!(mesh.nodes[0].y, mesh.nodes[0].x);

    let e = mesh.find_edge(NodeId(0), NodeId(1)).unwrap();
    assert_eq!(mesh.edge(e).theta_ideal, 0.25);
    assert_eq!(mesh.edge(e).damage, 0.5);
    assert_eq!(mesh.edge(e).label, 2);

    let face = mesh.face(FaceId(0));
    // Rows are (s00, s01), (s10, s11).
    assert_eq!(face.s_plastic.x_axis, DVec2::new(1.0, 2.0));
    assert_eq!(face.s_plastic.y_axis, DVec2::new(2.0, 4.0));
    assert_eq!(face.damage, 0.125);
    assert_relative_eq!(face.a, 0.5);
}

#[test]
fn load_marks_boundary_nodes_preserved() {
    let mesh = parse_obj(TRIANGLE).unwrap();
    assert!(mesh.nodes.iter().all(|n| n.preserve));
}

#[test]
fn polygons_are_fanned() {
    let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\ntd 0.5\n";
    let mesh = parse_obj(text).unwrap();
    assert_eq!(mesh.face_count(), 2);
    assert!(mesh.faces.iter().all(|f| f.damage == 0.5));
    // Without vt records material coordinates come from x and y.
    assert_eq!(mesh.verts.len(), 4);
    assert_eq!(mesh.verts[2].u, DVec2::new(1.0, 1.0));
}

#[test]
fn undefined_node_is_rejected() {
    let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2 3\n").unwrap_err();
    assert!(matches!(err, PlaitError::Parse { line: 3, .. }), "{err}");
}

#[test]
fn record_without_owner_is_rejected() {
    let err = parse_obj("nv 0 0 1\n").unwrap_err();
    assert!(matches!(err, PlaitError::Parse { line: 1, .. }));
}

#[test]
fn edge_record_must_match_a_face_edge() {
    let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 5 5 5\ne 1 4\nea 0.1\nf 1 2 3\n";
    assert!(parse_obj(text).is_err());
}

#[test]
fn malformed_number_reports_line() {
    let err = parse_obj("v 0 zero 0\n").unwrap_err();
    assert!(matches!(err, PlaitError::Parse { line: 1, .. }));
}

#[test]
fn unused_verts_are_dropped() {
    let text = "vt 0 0\nvt 9 9\nvt 1 0\nvt 0 1\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1 2/3 3/4\n";
    let mesh = parse_obj(text).unwrap();
    assert_eq!(mesh.verts.len(), 3);
    assert_eq!(mesh.face_uvs(FaceId(0))[1], DVec2::new(1.0, 0.0));
}

// ─── Writing Tests ────────────────────────────────────────────

#[test]
fn defaults_are_not_written() {
    let mesh = quad_grid(2, 2, 1.0, 1.0).unwrap();
    let text = obj_string(&mesh).unwrap();
    for record in ["nv ", "ny ", "nl ", "e ", "ts ", "td ", "tl ", "vl "] {
        assert!(!text.lines().any(|l| l.starts_with(record)), "found {record}");
    }
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 8);
}

#[test]
fn round_trip_is_bit_exact() {
    let mut mesh = quad_grid(3, 2, 1.3, 0.7).unwrap();
    for (i, node) in mesh.nodes.iter_mut().enumerate() {
        let t = i as f64;
        node.x.z = (0.1 * t).sin() / 3.0;
        node.v = DVec3::new(1.0 / (t + 3.0), 0.0, -t * 1e-7);
        if i % 3 == 0 {
            node.y = node.x + DVec3::splat(std::f64::consts::PI * 1e-3);
        } else {
            node.y = node.x;
        }
        node.label = (i % 2) as u32;
    }
    mesh.edges[3].theta_ideal = 0.1 + 0.2;
    mesh.edges[3].damage = 1e-300;
    mesh.edges[5].label = 4;
    mesh.faces[1].s_plastic = DMat2::from_cols(DVec2::new(1.0 / 3.0, 0.2), DVec2::new(-0.7, 2e10));
    mesh.faces[2].damage = f64::MIN_POSITIVE;
    mesh.faces[4].label = 1;

    let text = obj_string(&mesh).unwrap();
    let back = parse_obj(&text).unwrap();
    assert_eq!(obj_string(&back).unwrap(), text);

    for (a, b) in mesh.nodes.iter().zip(&back.nodes) {
        assert_eq!(a.x.to_array().map(f64::to_bits), b.x.to_array().map(f64::to_bits));
        assert_eq!(a.y, b.y);
        assert_eq!(a.v, b.v);
        assert_eq!(a.label, b.label);
    }
    for (a, b) in mesh.edges.iter().zip(&back.edges) {
        assert_eq!(a.n, b.n);
        assert_eq!(a.theta_ideal.to_bits(), b.theta_ideal.to_bits());
        assert_eq!(a.damage, b.damage);
        assert_eq!(a.label, b.label);
    }
    for (a, b) in mesh.faces.iter().zip(&back.faces) {
        assert_eq!(a.v, b.v);
        assert_eq!(a.s_plastic, b.s_plastic);
        assert_eq!(a.damage, b.damage);
        assert_eq!(a.label, b.label);
    }
}

#[test]
fn save_and_load_file() {
    let mesh = parse_obj(TRIANGLE).unwrap();
    let path = std::env::temp_dir().join(format!("plait_io_{}.obj", std::process::id()));
    plait_io::save_obj(&mesh, &path).unwrap();
    let back = plait_io::load_obj(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(back.nodes[2].y, mesh.nodes[2].y);
    assert!(matches!(
        plait_io::load_obj(&path),
        Err(PlaitError::Io(_))
    ));
}

// ─── Scene Tests ──────────────────────────────────────────────

fn fabric() -> FabricProperties {
    let mut fabric =
        FabricProperties::uniform("test", 0.1, DVec4::new(50.0, 10.0, 50.0, 10.0), 1e-6);
    // JSON has no infinity.
    fabric.yield_curv = 1e3;
    fabric
}

fn valid_scene() -> SceneDescription {
    SceneDescription {
        cloths: vec![ClothDescription {
            mesh: MeshSource::Grid {
                cols: 4,
                rows: 4,
                width: 1.0,
                height: 1.0,
            },
            transform: Transform::from_translation(DVec3::new(0.0, 0.0, 0.5)),
            materials: vec![fabric()],
            presets: vec![],
            bending: Default::default(),
            remeshing: RemeshConfig::default(),
        }],
        obstacles: vec![ObstacleDescription {
            mesh: MeshSource::Grid {
                cols: 2,
                rows: 2,
                width: 3.0,
                height: 3.0,
            },
            transform: Transform::IDENTITY,
            motion: vec![],
            start_time: 0.0,
            end_time: None,
        }],
        handles: vec![HandleDescription {
            cloth: 0,
            select: NodeSelection::Nodes(vec![0, 4]),
            motion: vec![],
            start_time: 0.0,
            end_time: Some(1.0),
            fade_time: 0.5,
        }],
        ..Default::default()
    }
}

#[test]
fn default_scene() {
    let scene = SceneDescription::default();
    assert_relative_eq!(scene.gravity.z, -9.8);
    assert_eq!(scene.modules, Modules::all());
    assert_relative_eq!(scene.frame_time(), scene.step_time * 8.0);
}

#[test]
fn scene_json_round_trip() {
    let scene = valid_scene();
    let json = serde_json::to_string(&scene).unwrap();
    let back: SceneDescription = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scene);
}

#[test]
fn partial_toml_scene_uses_defaults() {
    let text = r#"
        step_time = 0.002
        frame_steps = 4

        [modules]
        remeshing = false
    "#;
    let scene: SceneDescription = toml::from_str(text).unwrap();
    assert_eq!(scene.step_time, 0.002);
    assert!(!scene.modules.remeshing);
    assert!(scene.modules.collision);
    assert_eq!(scene.solver, Default::default());
}

#[test]
fn mesh_sources_load() {
    let grid = MeshSource::Grid {
        cols: 2,
        rows: 1,
        width: 2.0,
        height: 1.0,
    }
    .load()
    .unwrap();
    assert_eq!(grid.face_count(), 4);
    assert!(grid.nodes.iter().all(|n| n.preserve));
    let text = MeshSource::Text {
        obj: TRIANGLE.into(),
    }
    .load()
    .unwrap();
    assert_eq!(text.face_count(), 1);
}

#[test]
fn place_mesh_moves_state() {
    let mut mesh = quad_grid(1, 1, 1.0, 1.0).unwrap();
    place_mesh(&mut mesh, &Transform::from_translation(DVec3::Z));
    assert!(mesh.nodes.iter().all(|n| n.x.z == 1.0 && n.x0 == n.x && n.y == n.x));
}

#[test]
fn keyframes_build_motion() {
    assert!(motion_from_keyframes(&[]).is_none());
    let motion = motion_from_keyframes(&[
        Keyframe {
            time: 0.0,
            transform: Transform::IDENTITY,
        },
        Keyframe {
            time: 1.0,
            transform: Transform::from_translation(DVec3::X),
        },
    ])
    .unwrap();
    assert_relative_eq!(motion.at(1.0).translation.x, 1.0, epsilon = 1e-12);
}

#[test]
fn modules_by_name() {
    let mut modules = Modules::all();
    modules.disable("strainlimiting").unwrap();
    modules.disable("popfilter").unwrap();
    assert!(!modules.strain_limiting && !modules.pop_filter);
    modules.enable("strain_limiting").unwrap();
    assert!(modules.strain_limiting);
    assert!(modules.disable("teleport").is_err());
    assert!(Modules::physics_only().physics && !Modules::physics_only().collision);
}

// ─── Validator Tests ──────────────────────────────────────────

#[test]
fn valid_scene_passes() {
    validate_scene(&valid_scene()).unwrap();
}

#[test]
fn non_positive_step_rejected() {
    let mut scene = valid_scene();
    scene.step_time = 0.0;
    assert!(validate_scene(&scene).is_err());
    scene.step_time = f64::NAN;
    assert!(validate_scene(&scene).is_err());
}

#[test]
fn empty_scene_rejected() {
    assert!(validate_scene(&SceneDescription::default()).is_err());
}

#[test]
fn missing_material_rejected() {
    let mut scene = valid_scene();
    scene.cloths[0].materials.clear();
    assert!(matches!(validate_scene(&scene), Err(PlaitError::InvalidMaterial(_))));
}

#[test]
fn presets_stand_in_for_materials() {
    let mut scene = valid_scene();
    scene.cloths[0].materials.clear();
    scene.cloths[0].presets = vec!["denim_14oz".into()];
    validate_scene(&scene).unwrap();
    let fabrics = scene.cloths[0].fabrics().unwrap();
    assert_eq!(fabrics.len(), 1);
    assert_eq!(fabrics[0].name, "denim_14oz");

    scene.cloths[0].presets.push("velvet".into());
    assert!(matches!(validate_scene(&scene), Err(PlaitError::InvalidMaterial(_))));
}

#[test]
fn zero_density_rejected() {
    let mut scene = valid_scene();
    scene.cloths[0].materials[0].density = 0.0;
    assert!(validate_scene(&scene).is_err());
}

#[test]
fn inverted_remesh_sizes_rejected() {
    let mut scene = valid_scene();
    scene.cloths[0].remeshing.size_min = 1.0;
    assert!(validate_scene(&scene).is_err());
}

#[test]
fn handle_on_missing_cloth_rejected() {
    let mut scene = valid_scene();
    scene.handles[0].cloth = 3;
    assert!(validate_scene(&scene).is_err());
}

#[test]
fn unordered_keyframes_rejected() {
    let mut scene = valid_scene();
    scene.obstacles[0].motion = vec![
        Keyframe {
            time: 1.0,
            transform: Transform::IDENTITY,
        },
        Keyframe {
            time: 0.5,
            transform: Transform::IDENTITY,
        },
    ];
    assert!(validate_scene(&scene).is_err());
}

#[test]
fn projection_beyond_repulsion_rejected() {
    let mut scene = valid_scene();
    scene.solver.projection_thickness = 1.0;
    assert!(validate_scene(&scene).is_err());
}
