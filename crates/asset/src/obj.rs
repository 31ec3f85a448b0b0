//! Lenient OBJ-like parser: `v`, `vn` and `f` directives, everything else is skipped.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};

use crate::mesh::{DEFAULT_VERTEX_COLOR, SurfaceMesh};

/// Load a surface mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Cannot open OBJ file: {}", path.display()))?;
    let mesh = load_obj_from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read OBJ file: {}", path.display()))?;

    log::info!(
        "Loaded {}: {} vertices, {} triangles, normals={}",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        mesh.read_normals
    );
    Ok(mesh)
}

/// Load a surface mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> Result<SurfaceMesh> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> Result<SurfaceMesh> {
    parse_obj(io::Cursor::new(contents))
}

/// One face corner: 0-based position index plus the normal it names, if any.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Corner {
    position: i64,
    normal: Option<i64>,
}

/// Face whose corners were converted to 0-based indices but not yet checked
/// against the final vertex count.
struct PendingFace {
    line_no: usize,
    corners: Vec<Corner>,
}

fn parse_obj<R: BufRead>(reader: R) -> Result<SurfaceMesh> {
    let mut mesh = SurfaceMesh::new();
    let mut file_normals: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<PendingFace> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let (position, color) = parse_vertex(parts);
                mesh.push_vertex(position, color);
            }
            "vn" => {
                mesh.read_normals = true;
                // Unreadable normals still take a slot so later `vn` indices line up.
                file_normals.push(parse_normal(parts).unwrap_or([0.0; 3]));
            }
            "f" => match parse_face(parts, mesh.vertices.len(), file_normals.len()) {
                Some(corners) => faces.push(PendingFace { line_no, corners }),
                None => log::warn!("Skipping malformed face on line {}", line_no + 1),
            },
            _ => {
                // Comments and unsupported directives (g/o/s/usemtl/vt/...)
            }
        }
    }

    if u32::try_from(mesh.vertices.len()).is_err() {
        anyhow::bail!("Too many vertices in OBJ (>{})", u32::MAX);
    }

    let vertex_count = mesh.vertices.len() as i64;
    let normal_count = file_normals.len() as i64;
    let mut vertex_normals: Option<Vec<[f32; 3]>> = None;

    for face in faces {
        if face.corners.iter().any(|c| c.position < 0 || c.position >= vertex_count) {
            log::warn!(
                "Skipping face on line {}: index out of range (vertices={})",
                face.line_no + 1,
                vertex_count
            );
            continue;
        }

        for corner in &face.corners {
            let Some(n) = corner.normal else {
                continue;
            };
            if n < 0 || n >= normal_count {
                log::warn!("Ignoring normal index out of range on line {}", face.line_no + 1);
                continue;
            }
            let stream = vertex_normals.get_or_insert_with(|| vec![[0.0; 3]; vertex_count as usize]);
            stream[corner.position as usize] = file_normals[n as usize];
        }

        triangulate_fan(&face.corners, &mut mesh.indices);
    }

    // Per-vertex normals when faces reference them, file order otherwise.
    mesh.normals = vertex_normals.unwrap_or(file_normals);

    Ok(mesh)
}

/// Positions default to 0 when a coordinate is missing or unreadable, so every
/// `v` line yields exactly one vertex. Six or seven numbers carry a color.
fn parse_vertex<'a>(parts: impl Iterator<Item = &'a str>) -> ([f32; 3], [f32; 4]) {
    let values: Vec<Option<f32>> = parts.take(7).map(|t| t.parse::<f32>().ok()).collect();
    let at = |i: usize| values.get(i).copied().flatten();

    let position = [
        at(0).unwrap_or(0.0),
        at(1).unwrap_or(0.0),
        at(2).unwrap_or(0.0),
    ];

    let color = match (at(3), at(4), at(5)) {
        (Some(r), Some(g), Some(b)) => [r, g, b, at(6).unwrap_or(DEFAULT_VERTEX_COLOR[3])],
        _ => DEFAULT_VERTEX_COLOR,
    };

    (position, color)
}

fn parse_normal<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<[f32; 3]> {
    let mut next = || parts.next()?.parse::<f32>().ok();
    Some([next()?, next()?, next()?])
}

/// Corner tokens may be `v`, `v/vt`, `v//vn` or `v/vt/vn`; the texture index
/// is ignored. Returns `None` if any position index is unreadable or zero. An
/// unreadable normal index only drops that corner's normal.
fn parse_face<'a>(
    parts: impl Iterator<Item = &'a str>,
    vertices_so_far: usize,
    normals_so_far: usize,
) -> Option<Vec<Corner>> {
    parts
        .map(|token| {
            let mut fields = token.split('/');
            let position = resolve_index(fields.next()?, vertices_so_far)?;
            let normal = fields
                .nth(1)
                .filter(|t| !t.is_empty())
                .and_then(|t| resolve_index(t, normals_so_far));
            Some(Corner { position, normal })
        })
        .collect()
}

/// 1-based to 0-based; negative values count back from `len`. Zero is invalid.
fn resolve_index(token: &str, len: usize) -> Option<i64> {
    match token.parse::<i64>().ok()? {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(len as i64 + r),
    }
}

/// Fan around the first corner: `k` corners produce `k - 2` triangles.
fn triangulate_fan(corners: &[Corner], out: &mut Vec<u32>) {
    for i in 2..corners.len() {
        out.push(corners[0].position as u32);
        out.push(corners[i - 1].position as u32);
        out.push(corners[i].position as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    #[test]
    fn quad_is_split_into_two_triangles() {
        let mesh = load_obj_from_str(QUAD).expect("parse quad");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(!mesh.read_normals);
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn ngon_emits_k_minus_two_triangles_around_first_corner() {
        let mut src = String::new();
        for i in 0..7 {
            src.push_str(&format!("v {i} {} 0\n", i * i));
        }
        src.push_str("f 3 4 5 6 7 1 2\n");
        let mesh = load_obj_from_str(&src).unwrap();
        assert_eq!(mesh.triangle_count(), 5);
        for tri in mesh.indices.chunks(3) {
            assert_eq!(tri[0], 2);
        }
        assert_eq!(&mesh.indices[12..], &[2, 0, 1]);
    }

    #[test]
    fn vertex_count_matches_v_lines_even_when_malformed() {
        let src = "v 1 2 3\nv 4 oops 6\nv\nv 7 8\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.colors.len(), 4);
        assert_eq!(mesh.vertices[1], [4.0, 0.0, 6.0]);
        assert_eq!(mesh.vertices[2], [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[3], [7.0, 8.0, 0.0]);
    }

    #[test]
    fn vertices_get_default_gray_unless_colored() {
        let src = "v 0 0 0\nv 1 0 0 1 0 0\nv 0 1 0 0 1 0 0.25\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.colors[0], DEFAULT_VERTEX_COLOR);
        assert_eq!(mesh.colors[1], [1.0, 0.0, 0.0, DEFAULT_VERTEX_COLOR[3]]);
        assert_eq!(mesh.colors[2], [0.0, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn any_vn_line_sets_the_normals_flag() {
        let mesh = load_obj_from_str("v 0 0 0\nvn garbage\n").unwrap();
        assert!(mesh.read_normals);
        assert_eq!(mesh.normals, vec![[0.0; 3]]);

        let mesh = load_obj_from_str("vn 0 0 1\nvn 0 1 0\n").unwrap();
        assert!(mesh.read_normals);
        assert_eq!(mesh.normals, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn face_normal_indices_attach_to_their_corners() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.normals_for_upload(), vec![[0.0, 0.0, 1.0]; 3]);

        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nvn 0 1 0\nf 1/1/2 2/2/1 3/3/2\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(
            mesh.normals_for_upload(),
            vec![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn normals_without_face_references_stay_in_file_order() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 1 0\nf 1 2 3\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.normals, vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
    }

    #[test]
    fn bad_normal_index_keeps_face_but_not_normal() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//7 3//x\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.normals, vec![[0.0, 0.0, 1.0], [0.0; 3], [0.0; 3]]);
    }

    #[test]
    fn directives_are_matched_by_first_token() {
        // Leading whitespace and tabs separate tokens like spaces do.
        let src = "  v 1 2 3\nv\t4 5 6\n\tf 1 2 1\nvn\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.vertices, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(mesh.indices, vec![0, 1, 0]);
        // A bare `vn` still counts as a normal directive.
        assert!(mesh.read_normals);

        // Glued prefixes are different directives.
        let mesh = load_obj_from_str("v1 2 3\nvt 0 0\nvnx 1 0 0\nfo 1 2 3\n").unwrap();
        assert_eq!(mesh, SurfaceMesh::new());
    }

    #[test]
    fn unrecognized_lines_do_not_mutate() {
        let src = "# comment\ng group\nusemtl steel\no thing\ns off\nvt 0.5 0.5\n\n   \n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh, SurfaceMesh::new());
    }

    #[test]
    fn slash_corners_use_position_index() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1/1/1 2//1 3/3\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn negative_indices_are_relative_to_preceding_vertices() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nv 5 5 5\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn faces_may_reference_vertices_declared_later() {
        let src = "f 1 2 3\nv 0 0 0\nv 1 0 0\nv 0 1 0\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn invalid_faces_are_dropped_and_indices_stay_in_range() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\nf 0 1 2\nf 1 x 3\nf 1 2\nf 3 2 1\n";
        let mesh = load_obj_from_str(src).unwrap();
        assert_eq!(mesh.indices, vec![2, 1, 0]);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_obj_from_path("/definitely/not/here.obj").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.obj"));
    }

    #[test]
    fn loads_from_disk() {
        let path = std::env::temp_dir().join(format!("surfview-quad-{}.obj", std::process::id()));
        std::fs::write(&path, QUAD).unwrap();
        let mesh = load_obj_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(mesh.triangle_count(), 2);
    }
}
