//! Material library (MTL) parser.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};

use crate::{
    material::{MaterialProperties, TextureSlot},
    paths::normalize_separators,
    text::lossy_lines,
};

/// Load a material library from a file path.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> Result<Vec<MaterialProperties>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open MTL file: {}", path.as_ref().display()))?;
    parse_mtl(BufReader::new(file))
}

/// Convenience helper to parse an MTL string literal.
pub fn load_mtl_from_str(contents: &str) -> Result<Vec<MaterialProperties>> {
    parse_mtl(io::Cursor::new(contents))
}

fn parse_mtl<R: BufRead>(reader: R) -> Result<Vec<MaterialProperties>> {
    let mut materials: Vec<MaterialProperties> = Vec::new();

    for (line_no, line) in lossy_lines(reader).enumerate() {
        let line = line.with_context(|| format!("Failed to read MTL line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };
        let rest: Vec<&str> = parts.collect();

        if tag == "newmtl" {
            let name = rest.join(" ");
            materials.push(MaterialProperties::named(name));
            continue;
        }

        let Some(current) = materials.last_mut() else {
            log::warn!("MTL line {}: '{}' before any newmtl, ignored", line_no + 1, tag);
            continue;
        };

        if let Err(err) = apply_directive(current, tag, &rest) {
            log::warn!("MTL line {}: {:#}", line_no + 1, err);
        }
    }

    Ok(materials)
}

fn apply_directive(mat: &mut MaterialProperties, tag: &str, args: &[&str]) -> Result<()> {
    match tag {
        "Ka" => mat.ambient = parse_color(args)?,
        "Kd" => mat.diffuse = parse_color(args)?,
        "Ks" => mat.specular = parse_color(args)?,
        "Ke" => mat.emission = parse_color(args)?,
        "Kt" | "Tf" => mat.transmittance = parse_color(args)?,
        "Ns" => mat.shininess = parse_scalar(args)?,
        "Ni" => mat.ior = parse_scalar(args)?,
        "d" => mat.dissolve = parse_scalar(args)?,
        "Tr" => mat.dissolve = 1.0 - parse_scalar(args)?,
        "illum" => {
            let token = args.first().ok_or_else(|| anyhow!("Missing illum value"))?;
            mat.illum = token
                .parse::<i32>()
                .with_context(|| format!("Invalid illum '{}'", token))?;
        }
        _ => {
            if let Some(slot) = texture_slot(tag) {
                let name = texture_file(args)
                    .ok_or_else(|| anyhow!("Missing file name for '{}'", tag))?;
                mat.textures.set(slot, Some(name));
            }
            // Other directives (sharpness, PBR extensions, ...) are ignored.
        }
    }
    Ok(())
}

fn texture_slot(tag: &str) -> Option<TextureSlot> {
    Some(match tag {
        "map_Ka" => TextureSlot::Ambient,
        "map_Kd" => TextureSlot::Diffuse,
        "map_Ks" => TextureSlot::Specular,
        "map_Ns" => TextureSlot::SpecularHighlight,
        "map_bump" | "map_Bump" | "bump" => TextureSlot::Bump,
        "map_d" => TextureSlot::Alpha,
        "refl" | "map_refl" => TextureSlot::Reflection,
        _ => return None,
    })
}

/// Number of arguments a texture option consumes, as `(min, max)`.
fn option_arity(flag: &str) -> Option<(usize, usize)> {
    Some(match flag {
        "-blendu" | "-blendv" | "-boost" | "-texres" | "-clamp" | "-bm" | "-imfchan"
        | "-type" | "-cc" => (1, 1),
        "-mm" => (2, 2),
        // u [v [w]]
        "-o" | "-s" | "-t" => (1, 3),
        _ => return None,
    })
}

/// File name of a texture directive after its option flags
/// (`-bm 0.5 file.png`, `-o 1 1 1 my file.png`). Names may contain spaces.
fn texture_file(args: &[&str]) -> Option<String> {
    let mut rest = args;
    while let Some((flag, tail)) = rest.split_first() {
        let Some((min, max)) = option_arity(flag) else {
            if flag.starts_with('-') && flag.len() > 1 && flag.parse::<f32>().is_err() {
                log::warn!("Unknown texture option '{}', skipping it", flag);
                rest = tail;
                continue;
            }
            break;
        };
        let mut taken = min.min(tail.len());
        while taken < max && tail.get(taken).is_some_and(|t| t.parse::<f32>().is_ok()) {
            taken += 1;
        }
        rest = &tail[taken..];
    }
    if rest.is_empty() {
        return None;
    }
    Some(normalize_separators(&rest.join(" ")))
}

fn parse_scalar(args: &[&str]) -> Result<f32> {
    let token = args.first().ok_or_else(|| anyhow!("Missing scalar value"))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Invalid scalar '{}'", token))
}

/// `Kd r g b`, or `Kd r` which repeats the single component.
fn parse_color(args: &[&str]) -> Result<[f32; 3]> {
    let values = args
        .iter()
        .take(3)
        .map(|t| t.parse::<f32>().with_context(|| format!("Invalid color component '{}'", t)))
        .collect::<Result<Vec<f32>>>()?;
    match values.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        [v] => Ok([*v; 3]),
        _ => Err(anyhow!("Expected 1 or 3 color components, found {}", values.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_material() {
        let src = r#"
            # two materials
            newmtl brick
            Ka 0.1 0.2 0.3
            Kd 0.4 0.5 0.6
            Ks 0.7 0.8 0.9
            Ke 0.0 0.1 0.0
            Tf 1 1 1
            Ns 32
            Ni 1.45
            d 0.75
            illum 2
            map_Kd textures\brick.png
            map_bump -bm 0.5 brick_n.png
            map_d brick_alpha.png
            refl sky.png

            newmtl plain
            Tr 0.25
        "#;
        let mats = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(mats.len(), 2);

        let brick = &mats[0];
        assert_eq!(brick.name, "brick");
        assert_eq!(brick.ambient, [0.1, 0.2, 0.3]);
        assert_eq!(brick.diffuse, [0.4, 0.5, 0.6]);
        assert_eq!(brick.specular, [0.7, 0.8, 0.9]);
        assert_eq!(brick.transmittance, [1.0, 1.0, 1.0]);
        assert_eq!(brick.shininess, 32.0);
        assert_eq!(brick.ior, 1.45);
        assert_eq!(brick.dissolve, 0.75);
        assert_eq!(brick.illum, 2);
        assert_eq!(brick.textures.get(TextureSlot::Diffuse), Some("textures/brick.png"));
        assert_eq!(brick.textures.get(TextureSlot::Bump), Some("brick_n.png"));
        assert_eq!(brick.textures.get(TextureSlot::Alpha), Some("brick_alpha.png"));
        assert_eq!(brick.textures.get(TextureSlot::Reflection), Some("sky.png"));
        assert_eq!(brick.textures.get(TextureSlot::Ambient), None);

        let plain = &mats[1];
        assert_eq!(plain.dissolve, 0.75);
        assert_eq!(plain.diffuse, [0.6; 3]);
    }

    #[test]
    fn texture_options_are_skipped() {
        assert_eq!(texture_file(&["brick.png"]).as_deref(), Some("brick.png"));
        assert_eq!(texture_file(&["my", "tex.png"]).as_deref(), Some("my tex.png"));
        assert_eq!(
            texture_file(&["-s", "1", "1", "1", "-o", "0.5", "file.png"]).as_deref(),
            Some("file.png")
        );
        assert_eq!(
            texture_file(&["-mm", "0", "1", "-clamp", "on", "dir\\a b.png"]).as_deref(),
            Some("dir/a b.png")
        );
        // -o takes at most three values
        assert_eq!(
            texture_file(&["-o", "1", "2", "3", "4.png"]).as_deref(),
            Some("4.png")
        );
    }

    #[test]
    fn options_without_file_name_leave_slot_empty() {
        assert_eq!(texture_file(&["-o", "1", "1", "1"]), None);
        assert_eq!(texture_file(&[]), None);

        let materials = load_mtl_from_str("newmtl m\nmap_Kd -o 1 1 1\nmap_Ks my tex.png\n")
            .expect("parse");
        assert_eq!(materials[0].textures.get(TextureSlot::Diffuse), None);
        assert_eq!(
            materials[0].textures.get(TextureSlot::Specular),
            Some("my tex.png")
        );
    }

    #[test]
    fn latin1_comment_in_library_is_tolerated() {
        let bytes: &[u8] = b"# \xa9 studio\nnewmtl m\nKd 0.5 0.5 0.5\n";
        let materials = parse_mtl(io::Cursor::new(bytes)).expect("parse");
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].diffuse, [0.5; 3]);
    }

    #[test]
    fn bad_lines_are_skipped() {
        let src = "Kd 1 1 1\nnewmtl a\nKd red\nNs 8\n";
        let mats = load_mtl_from_str(src).expect("parse mtl");
        assert_eq!(mats.len(), 1);
        assert_eq!(mats[0].diffuse, [0.6; 3]);
        assert_eq!(mats[0].shininess, 8.0);
    }

    #[test]
    fn single_component_color_is_grey() {
        let mats = load_mtl_from_str("newmtl g\nKa 0.5\n").expect("parse mtl");
        assert_eq!(mats[0].ambient, [0.5; 3]);
    }
}
