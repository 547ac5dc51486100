//! Integration tests for plait-types.

use plait_types::{FaceId, MeshRef, NodeId, NodeRef, PlaitError, VertId};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn node_id_index() {
    let id = NodeId(42);
    assert_eq!(id.index(), 42);
}

#[test]
fn ids_convert_from_raw() {
    assert_eq!(FaceId::from(7u32).index(), 7);
    assert_eq!(VertId::from(3u32), VertId(3));
    assert_eq!(NodeId::from(9usize), NodeId(9));
}

#[test]
fn node_refs_order_by_mesh_then_node() {
    let a = NodeRef::cloth(0, 5);
    let b = NodeRef::cloth(1, 0);
    let c = NodeRef::obstacle(0, 0);
    assert!(a < b);
    assert!(b < c);
    assert!(a.mesh.is_cloth());
    assert!(!c.mesh.is_cloth());
    assert_eq!(c.mesh, MeshRef::Obstacle(0));
}

#[test]
fn ids_are_serializable() {
    let id = NodeRef::obstacle(2, 100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: NodeRef = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn error_display() {
    let err = PlaitError::InvalidMesh("face 3 references undefined vert 17".into());
    assert!(err.to_string().contains("undefined vert"));
}

#[test]
fn parse_error_reports_line() {
    let err = PlaitError::Parse {
        line: 12,
        message: "bad index".into(),
    };
    assert!(err.to_string().contains("line 12"));
}

#[test]
fn singular_system_display() {
    let err = PlaitError::SingularSystem {
        dimension: 27,
        reason: "not positive definite".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("27"));
    assert!(msg.contains("positive definite"));
}

#[test]
fn io_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let err: PlaitError = io.into();
    assert!(matches!(err, PlaitError::Io(_)));
}
