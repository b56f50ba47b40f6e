//! Path helpers for files referenced from inside a scene file.

use std::path::{Path, PathBuf};

/// Directory that relative references inside `scene` resolve against.
pub fn base_dir(scene: &Path) -> PathBuf {
    match scene.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Replace the alternate (Windows) separator with `/`.
pub fn normalize_separators(reference: &str) -> String {
    reference.trim().replace('\\', "/")
}

/// Resolve a file reference found in a scene or material file.
/// Absolute references are kept as-is.
pub fn resolve(base: &Path, reference: &str) -> PathBuf {
    let normalized = normalize_separators(reference);
    let candidate = Path::new(&normalized);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_dir_of_bare_file_is_cwd() {
        assert_eq!(base_dir(Path::new("cube.obj")), PathBuf::from("."));
        assert_eq!(
            base_dir(Path::new("models/cube.obj")),
            PathBuf::from("models")
        );
    }

    #[test]
    fn backslashes_are_normalized() {
        let resolved = resolve(Path::new("models"), "textures\\wood.png");
        assert_eq!(resolved, Path::new("models").join("textures").join("wood.png"));
    }
}
