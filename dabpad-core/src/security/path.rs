//! Traversal-safe path validation against an allow-list of roots.

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::SecurityConfig;
use crate::error::IngestError;

/// Validates filesystem paths before any file access happens.
///
/// A path is rejected if it contains a traversal pattern (literal or
/// percent-encoded), a NUL byte, or if its canonical form does not sit
/// under one of the allow-listed roots. The prefix match is per path
/// component, so `/srv/slides-evil` never passes for root `/srv/slides`.
#[derive(Debug, Clone)]
pub struct PathValidator {
    allow_roots: Vec<PathBuf>,
    strict: bool,
}

impl PathValidator {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            allow_roots: config.allow_roots.clone(),
            strict: config.strict,
        }
    }

    /// Validate `path` and return its canonical form.
    ///
    /// The string checks run before any filesystem access, so a
    /// traversal attempt never touches the disk.
    pub fn validate(&self, path: &Path) -> Result<PathBuf, IngestError> {
        let raw = path.to_string_lossy();

        if let Some(reason) = traversal_pattern(&raw) {
            debug!("PathValidator: rejected {:?}: {}", path, reason);
            return Err(IngestError::PathUnsafe(reason.to_string()));
        }

        if self.allow_roots.is_empty() {
            if self.strict {
                return Err(IngestError::PathUnsafe(
                    "no allowed roots configured".to_string(),
                ));
            }
            return canonicalize(path);
        }

        let canonical = canonicalize(path)?;
        for root in &self.allow_roots {
            let canonical_root = std::fs::canonicalize(root).unwrap_or_else(|_| root.clone());
            if canonical.starts_with(&canonical_root) {
                return Ok(canonical);
            }
        }

        debug!("PathValidator: {:?} outside allowed roots", path);
        Err(IngestError::PathUnsafe(
            "path outside allowed roots".to_string(),
        ))
    }

    /// Returns true when `path` passes validation.
    pub fn is_safe(&self, path: &Path) -> bool {
        self.validate(path).is_ok()
    }
}

/// Returns the first traversal pattern found in `raw`, if any.
fn traversal_pattern(raw: &str) -> Option<&'static str> {
    if raw.contains('\0') {
        return Some("NUL byte in path");
    }
    if raw.contains("..") {
        return Some("parent-directory traversal");
    }
    if raw.contains('~') {
        return Some("home-directory reference");
    }
    if raw.contains("//") {
        return Some("doubled separator");
    }
    let lower = raw.to_ascii_lowercase();
    for encoded in ["%2e%2e", "%2f", "%5c"] {
        if lower.contains(encoded) {
            return Some("percent-encoded traversal");
        }
    }
    None
}

fn canonicalize(path: &Path) -> Result<PathBuf, IngestError> {
    std::fs::canonicalize(path)
        .map_err(|e| IngestError::PathUnsafe(format!("cannot resolve {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(roots: Vec<PathBuf>, strict: bool) -> PathValidator {
        PathValidator::new(&SecurityConfig {
            allow_roots: roots,
            strict,
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dabpad-path-{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_rejects_parent_traversal_without_touching_disk() {
        let v = validator(vec![PathBuf::from("/data/slides")], true);
        // Rejected on the string check even though the resolved target
        // might exist.
        let err = v
            .validate(Path::new("/data/slides/../../etc/passwd"))
            .unwrap_err();
        assert!(matches!(err, IngestError::PathUnsafe(_)));

        let err = v.validate(Path::new("foo/../bar")).unwrap_err();
        assert!(matches!(err, IngestError::PathUnsafe(_)));
    }

    #[test]
    fn test_rejects_encoded_traversal() {
        let v = validator(vec![PathBuf::from("/data/slides")], true);
        for path in ["/data/%2e%2e/etc", "/data/a%2Fb", "a%5cb", "~root/x"] {
            assert!(!v.is_safe(Path::new(path)), "{path} should be rejected");
        }
    }

    #[test]
    fn test_rejects_nul_and_double_slash() {
        let v = validator(vec![PathBuf::from("/data")], true);
        assert!(!v.is_safe(Path::new("/data//x.jpg")));
        assert!(!v.is_safe(Path::new("/data/a\0b.jpg")));
    }

    #[test]
    fn test_accepts_file_under_allowed_root() {
        let root = temp_root("accept");
        let file = root.join("slide.jpg");
        std::fs::write(&file, b"x").unwrap();

        let v = validator(vec![root], true);
        let canonical = v.validate(&file).unwrap();
        assert!(canonical.ends_with("slide.jpg"));
    }

    #[test]
    fn test_rejects_file_outside_allowed_root() {
        let root = temp_root("outside-a");
        let other = temp_root("outside-b");
        let file = other.join("slide.jpg");
        std::fs::write(&file, b"x").unwrap();

        let v = validator(vec![root], true);
        assert!(!v.is_safe(&file));
    }

    #[test]
    fn test_prefix_match_respects_component_boundary() {
        let root = temp_root("bound");
        let sibling = temp_root("bound-evil");
        let file = sibling.join("slide.jpg");
        std::fs::write(&file, b"x").unwrap();

        // "bound-evil" starts with the same characters as "bound" but is
        // a different directory.
        let v = validator(vec![root], true);
        assert!(!v.is_safe(&file));
    }

    #[test]
    fn test_strict_mode_with_no_roots_rejects_everything() {
        let root = temp_root("strictless");
        let file = root.join("slide.jpg");
        std::fs::write(&file, b"x").unwrap();

        assert!(!validator(Vec::new(), true).is_safe(&file));
        assert!(validator(Vec::new(), false).is_safe(&file));
    }
}
