use flow_instancing::{
    LoadError, Model,
    error::Unavailable,
    gpu::BufferRole,
    resources::{load_mesh, try_load_mesh},
};

use crate::common::test_utils::{RecordingGpu, write_file};
mod common;

fn assert_fallback_cube(path: &std::path::Path) {
    let mesh = load_mesh(path);
    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.index_count(), 36);
    assert_eq!(mesh.indices(), flow_instancing::MeshData::fallback_cube().indices());
}

#[test]
fn missing_file_falls_back_to_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nowhere.obj");
    assert!(matches!(
        try_load_mesh(&path),
        Err(LoadError::SourceUnavailable {
            reason: Unavailable::Missing,
            ..
        })
    ));
    assert_fallback_cube(&path);
}

#[test]
fn directory_falls_back_to_cube() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        try_load_mesh(dir.path()),
        Err(LoadError::SourceUnavailable {
            reason: Unavailable::Directory,
            ..
        })
    ));
    assert_fallback_cube(dir.path());
}

#[test]
fn empty_file_falls_back_to_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "empty.obj", "");
    assert!(matches!(
        try_load_mesh(&path),
        Err(LoadError::SourceUnavailable {
            reason: Unavailable::Empty,
            ..
        })
    ));
    assert_fallback_cube(&path);
}

#[test]
fn latin1_header_comment_still_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mueller.obj");
    std::fs::write(
        &path,
        b"# Export von M\xfcller\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
    )
    .unwrap();

    let mesh = try_load_mesh(&path).unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.index_count(), 3);
    assert_eq!(load_mesh(&path).vertex_count(), 3);
}

#[test]
fn comments_only_falls_back_to_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "comments.obj", "# exported by hand\n\n# nothing here\n");
    assert!(matches!(try_load_mesh(&path), Err(LoadError::EmptyResult)));
    assert_fallback_cube(&path);
}

#[test]
fn malformed_file_falls_back_to_cube() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "broken.obj",
        "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 2 x\n",
    );
    assert!(matches!(
        try_load_mesh(&path),
        Err(LoadError::MalformedGeometry { line: 5, .. })
    ));
    assert_fallback_cube(&path);
}

#[cfg(unix)]
#[test]
fn unreadable_file_reports_permission() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "locked.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();
    if std::fs::File::open(&path).is_ok() {
        // privileged users can read it anyway
        return;
    }
    assert!(matches!(
        try_load_mesh(&path),
        Err(LoadError::SourceUnavailable {
            reason: Unavailable::PermissionDenied(_),
            ..
        })
    ));
    assert_fallback_cube(&path);
}

#[test]
fn valid_file_is_loaded_with_shared_vertices() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "pyramid.obj",
        "\
v 0 1 0
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vn 0 1 0
f 2//1 3//1 4//1 5//1
f 1 3 2
f 1 4 3
f 1 5 4
f 1 2 5
",
    );
    let mesh = try_load_mesh(&path).unwrap();
    // base corners carry a normal, side corners use the default one which happens to match
    assert_eq!(mesh.vertex_count(), 5);
    assert_eq!(mesh.index_count(), 6 + 4 * 3);
    assert!(
        mesh.indices()
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count())
    );
}

#[test]
fn model_always_has_geometry() {
    let gpu = RecordingGpu::new();
    let dir = tempfile::tempdir().unwrap();
    let model: Model<RecordingGpu> = Model::load(&gpu, dir.path().join("ghost.obj"));
    assert_eq!(model.mesh().vertex_count(), 8);
    assert_eq!(model.buffers().index_count, 36);
    assert_eq!(model.buffers().vertex_buffer.label, "ghost Vertex Buffer");
    assert_eq!(gpu.created_with_role(BufferRole::Vertex), 1);
    assert_eq!(gpu.created_with_role(BufferRole::Index), 1);
    assert_eq!(gpu.created_with_role(BufferRole::Instance), 0);
}
