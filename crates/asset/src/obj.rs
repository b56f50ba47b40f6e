//! OBJ scene parser: positions, normals, texture coordinates and material runs.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};

use crate::{
    material::MaterialProperties,
    mesh::{MeshGroup, SceneData, Vertex},
    mtl, paths,
    text::lossy_lines,
};

/// Load an OBJ scene from a file path.
///
/// `mtllib` references are resolved relative to the scene file's directory.
/// A library that cannot be read is logged and the scene continues without it.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<SceneData> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let base = paths::base_dir(path);

    load_obj_from_reader(BufReader::new(file), |name| {
        let lib = paths::resolve(&base, name);
        mtl::load_mtl_from_path(&lib)
    })
}

/// Load an OBJ scene from a [`BufRead`] implementation.
/// `load_materials` is called once per referenced material library.
pub fn load_obj_from_reader<R, F>(reader: R, load_materials: F) -> Result<SceneData>
where
    R: BufRead,
    F: FnMut(&str) -> Result<Vec<MaterialProperties>>,
{
    parse_obj(reader, load_materials)
}

/// Convenience helper to parse an OBJ string literal that references no material library.
pub fn load_obj_from_str(contents: &str) -> Result<SceneData> {
    parse_obj(io::Cursor::new(contents), |name| {
        Err(anyhow!("No material library source for '{}'", name))
    })
}

/// One face corner: position index plus optional texcoord and normal indices.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Corner(usize, Option<usize>, Option<usize>);

struct Builder {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    materials: Vec<MaterialProperties>,
    material_ids: HashMap<String, usize>,
    current_material: Option<usize>,
    groups: Vec<MeshGroup>,
}

impl Builder {
    fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            materials: Vec::new(),
            material_ids: HashMap::new(),
            current_material: None,
            groups: Vec::new(),
        }
    }

    fn add_materials(&mut self, materials: Vec<MaterialProperties>) {
        for mat in materials {
            let id = self.materials.len();
            // First definition of a name wins.
            self.material_ids.entry(mat.name.clone()).or_insert(id);
            self.materials.push(mat);
        }
    }

    fn use_material(&mut self, name: &str, line_no: usize) {
        self.current_material = self.material_ids.get(name).copied();
        if self.current_material.is_none() {
            log::warn!(
                "OBJ line {}: unknown material '{}', faces will use no material",
                line_no + 1,
                name
            );
        }
    }

    /// Append a triangle, starting a new group whenever the material changes.
    fn emit(&mut self, tri: [Vertex; 3]) {
        let material = self.current_material;
        match self.groups.last_mut() {
            Some(group) if group.material_id == material => group.push_triangle(tri),
            _ => {
                let mut group = MeshGroup::new(material);
                group.push_triangle(tri);
                self.groups.push(group);
            }
        }
    }

    fn vertex(&self, corner: Corner, face_normal: [f32; 3]) -> Vertex {
        let Corner(vi, vti, vni) = corner;
        let position = self.positions[vi];
        let uv = vti.map(|i| self.texcoords[i]).unwrap_or([0.0, 0.0]);
        let normal = vni.map(|i| self.normals[i]).unwrap_or(face_normal);
        Vertex::new(position, normal, uv)
    }

    fn face(&mut self, corners: &[Corner]) {
        // Triangulate fan
        for tri in 1..(corners.len() - 1) {
            let c = [corners[0], corners[tri], corners[tri + 1]];
            let normal = face_normal(
                self.positions[c[0].0],
                self.positions[c[1].0],
                self.positions[c[2].0],
            );
            let v = [
                self.vertex(c[0], normal),
                self.vertex(c[1], normal),
                self.vertex(c[2], normal),
            ];
            self.emit(v);
        }
    }

    fn finish(self) -> SceneData {
        SceneData {
            groups: self.groups,
            materials: self.materials,
        }
    }
}

fn parse_obj<R, F>(reader: R, mut load_materials: F) -> Result<SceneData>
where
    R: BufRead,
    F: FnMut(&str) -> Result<Vec<MaterialProperties>>,
{
    let mut builder = Builder::new();
    let mut skipped_faces = 0usize;

    for (line_no, line) in lossy_lines(reader).enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "v" => match parse_vec3(&mut parts, line_no) {
                Ok(p) => builder.positions.push(p),
                Err(err) => log::warn!("{:#}", err),
            },
            "vt" => {
                let uv = parse_f32(parts.next(), line_no, "u coordinate").and_then(|u| {
                    // `vt u` alone is legal, v defaults to 0.
                    let v = match parts.next() {
                        Some(token) => parse_f32(Some(token), line_no, "v coordinate")?,
                        None => 0.0,
                    };
                    Ok([u, v])
                });
                match uv {
                    Ok(uv) => builder.texcoords.push(uv),
                    Err(err) => log::warn!("{:#}", err),
                }
            }
            "vn" => match parse_vec3(&mut parts, line_no) {
                Ok(n) => builder.normals.push(n),
                Err(err) => log::warn!("{:#}", err),
            },
            "f" => {
                let corners = parts
                    .map(|part| {
                        parse_face_vertex(
                            part,
                            builder.positions.len(),
                            builder.texcoords.len(),
                            builder.normals.len(),
                            line_no,
                        )
                    })
                    .collect::<Result<Vec<Corner>>>();

                match corners {
                    Ok(corners) if corners.len() >= 3 => builder.face(&corners),
                    Ok(_) => {
                        skipped_faces += 1;
                        log::warn!("Degenerate face on line {} skipped", line_no + 1);
                    }
                    Err(err) => {
                        skipped_faces += 1;
                        log::warn!("Face skipped: {:#}", err);
                    }
                }
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                builder.use_material(&name, line_no);
            }
            "mtllib" => {
                for lib in parts {
                    match load_materials(lib) {
                        Ok(materials) => {
                            log::debug!("Loaded {} materials from '{}'", materials.len(), lib);
                            builder.add_materials(materials);
                        }
                        Err(err) => log::warn!("Material library '{}' unavailable: {:#}", lib, err),
                    }
                }
            }
            _ => {
                // Ignore other directives (o/g/s/etc.)
            }
        }
    }

    if skipped_faces > 0 {
        log::warn!("{} malformed faces were skipped", skipped_faces);
    }

    let scene = builder.finish();
    if !scene.is_valid() {
        log::warn!("OBJ contained no triangles");
    }

    Ok(scene)
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > f32::EPSILON {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>, line_no: usize) -> Result<[f32; 3]> {
    let x = parse_f32(parts.next(), line_no, "x coordinate")?;
    let y = parse_f32(parts.next(), line_no, "y coordinate")?;
    let z = parse_f32(parts.next(), line_no, "z coordinate")?;
    Ok([x, y, z])
}

fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> Result<f32> {
    let token = value.ok_or_else(|| anyhow!("Missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Failed to parse {} on line {}", what, line_no + 1))
}

fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    tex_count: usize,
    norm_count: usize,
    line_no: usize,
) -> Result<Corner> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, tex_count, line_no)?),
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, norm_count, line_no)?),
        _ => None,
    };

    Ok(Corner(pos_idx, tex_idx, norm_idx))
}

fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<usize> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1);
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };

    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_materials(_: &str) -> Result<Vec<MaterialProperties>> {
        let mut red = MaterialProperties::named("red");
        red.diffuse = [1.0, 0.0, 0.0];
        let mut blue = MaterialProperties::named("blue");
        blue.diffuse = [0.0, 0.0, 1.0];
        Ok(vec![red, blue])
    }

    const QUAD_POSITIONS: &str = r#"
        v 0.0 0.0 0.0
        v 1.0 0.0 0.0
        v 1.0 1.0 0.0
        v 0.0 1.0 0.0
    "#;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let scene = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(scene.groups.len(), 1);
        assert_eq!(scene.groups[0].vertices.len(), 3);
        assert_eq!(scene.groups[0].material_id, None);
        assert_eq!(scene.groups[0].vertices[1].uv, [1.0, 0.0]);
        assert!(scene.is_valid());
    }

    #[test]
    fn quads_are_fan_triangulated() {
        let src = format!("{QUAD_POSITIONS}\nf 1 2 3 4\nf 1 2 3 4 1\n");
        let scene = load_obj_from_str(&src).expect("parse quad");
        assert_eq!(scene.triangle_count(), 2 + 3);
    }

    #[test]
    fn groups_follow_contiguous_material_runs() {
        let src = format!(
            "mtllib scene.mtl\n{QUAD_POSITIONS}\n\
             usemtl red\nf 1 2 3\nf 1 3 4\n\
             usemtl blue\nf 1 2 3\n\
             usemtl red\nf 1 2 4\n\
             usemtl red\nf 2 3 4\n"
        );
        let scene = load_obj_from_reader(io::Cursor::new(src), two_materials).expect("parse");
        let runs: Vec<_> = scene
            .groups
            .iter()
            .map(|g| (g.material_id, g.triangle_count()))
            .collect();
        assert_eq!(runs, vec![(Some(0), 2), (Some(1), 1), (Some(0), 2)]);
    }

    #[test]
    fn out_of_range_faces_are_skipped() {
        let src = format!("{QUAD_POSITIONS}\nf 1 2 9\nf 1 2 3\nf 0 1 2\nf 1/5 2 3\nf -1 -2 -3\n");
        let scene = load_obj_from_str(&src).expect("parse");
        assert_eq!(scene.triangle_count(), 2);
        for v in &scene.groups[0].vertices {
            assert!(v.position.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn no_triangles_yields_invalid_scene() {
        let src = format!("{QUAD_POSITIONS}\nf 1 2\nf 7 8 9\n");
        let scene = load_obj_from_str(&src).expect("parse");
        assert!(!scene.is_valid());
        assert!(scene.groups.is_empty());
    }

    #[test]
    fn missing_normals_get_face_normal() {
        let src = format!("{QUAD_POSITIONS}\nf 1 2 3\n");
        let scene = load_obj_from_str(&src).expect("parse");
        for v in &scene.groups[0].vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
            assert_eq!(v.uv, [0.0, 0.0]);
        }
    }

    #[test]
    fn latin1_comment_does_not_fail_scene() {
        let bytes: &[u8] = b"# Cr\xe9\xe9 par exporter\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let scene = load_obj_from_reader(io::Cursor::new(bytes), |_| Ok(vec![])).expect("parse");
        assert!(scene.is_valid());
        assert_eq!(scene.triangle_count(), 1);
    }

    #[test]
    fn latin1_material_name_still_matches_its_library() {
        let bytes: &[u8] = b"mtllib lib.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl b\xe9ton\nf 1 2 3\n";
        let scene = load_obj_from_reader(io::Cursor::new(bytes), |_| {
            Ok(vec![MaterialProperties::named("b\u{FFFD}ton")])
        })
        .expect("parse");
        assert_eq!(scene.groups[0].material_id, Some(0));
    }

    #[test]
    fn unknown_material_means_no_material() {
        let src = format!("{QUAD_POSITIONS}\nusemtl ghost\nf 1 2 3\n");
        let scene = load_obj_from_str(&src).expect("parse");
        assert_eq!(scene.groups[0].material_id, None);
        assert!(scene.materials.is_empty());
    }
}
