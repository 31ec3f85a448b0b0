//! Asset loading: surface meshes from OBJ-like text files.

pub mod mesh;
pub mod obj;

pub use mesh::{Bounds, DEFAULT_VERTEX_COLOR, SurfaceMesh};
pub use obj::{load_obj_from_path, load_obj_from_reader, load_obj_from_str};
