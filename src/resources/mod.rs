use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::Path,
};

use crate::{
    data_structures::mesh::MeshData,
    error::{LoadError, Unavailable},
};

/**
 * This module contains all logic for loading meshes and textures from external files.
 */
pub mod obj;
pub mod texture;

/// Load a mesh, substituting the fallback cube for anything that can't be used.
pub fn load_mesh(path: impl AsRef<Path>) -> MeshData {
    let path = path.as_ref();
    match try_load_mesh(path) {
        Ok(mesh) => {
            log::info!(
                "Loaded {} with {} vertices and {} indices.",
                path.display(),
                mesh.vertex_count(),
                mesh.index_count()
            );
            mesh
        }
        Err(err) => {
            log::warn!("{} wasn't loaded, using the fallback cube: {}", path.display(), err);
            MeshData::fallback_cube()
        }
    }
}

/// Load a mesh and report why it can't be used instead of falling back.
pub fn try_load_mesh(path: impl AsRef<Path>) -> Result<MeshData, LoadError> {
    let path = path.as_ref();
    let file = open_source(path)?;
    let mesh = obj::parse_obj(BufReader::new(file), path)?;
    if mesh.is_empty() {
        return Err(LoadError::EmptyResult);
    }
    Ok(mesh)
}

/// Open a model or texture source after checking that it exists, is a regular file and isn't empty.
pub fn open_source(path: &Path) -> Result<File, LoadError> {
    let metadata = fs::metadata(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => LoadError::unavailable(path, Unavailable::Missing),
        io::ErrorKind::PermissionDenied => LoadError::unavailable(
            path,
            Unavailable::PermissionDenied("a parent directory can't be searched"),
        ),
        _ => LoadError::unavailable(path, err),
    })?;
    if metadata.is_dir() {
        return Err(LoadError::unavailable(path, Unavailable::Directory));
    }
    if metadata.len() == 0 {
        return Err(LoadError::unavailable(path, Unavailable::Empty));
    }
    File::open(path).map_err(|err| match err.kind() {
        io::ErrorKind::PermissionDenied => LoadError::unavailable(
            path,
            Unavailable::PermissionDenied(permission_reason(&metadata)),
        ),
        _ => LoadError::unavailable(path, err),
    })
}

#[cfg(unix)]
fn permission_reason(metadata: &fs::Metadata) -> &'static str {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    if mode & 0o444 == 0 {
        "nobody has read permission"
    } else if mode & 0o400 == 0 {
        "the owner lacks read permission"
    } else {
        "the current user lacks read permission"
    }
}

#[cfg(not(unix))]
fn permission_reason(_metadata: &fs::Metadata) -> &'static str {
    "access denied"
}
