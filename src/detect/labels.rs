//! Label canonicalization.
//!
//! Canonical names are lowercase, hyphen-separated and safe to embed in a
//! filename. The local table folds a general-purpose vocabulary onto the
//! closest wildlife category. Several folds are deliberately lossy (every
//! hoofed farm animal becomes `deer`, for instance); downstream review relies
//! on the raw label kept next to each canonical name.

use crate::config::BackendKind;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Name used when a label normalizes to nothing.
const UNKNOWN_LABEL: &str = "unknown";

/// General-purpose detector vocabulary folded onto wildlife categories.
static LOCAL_LABELS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("horse", "deer"),
        ("sheep", "deer"),
        ("cow", "deer"),
        ("zebra", "large-mammal"),
        ("giraffe", "large-mammal"),
        ("elephant", "large-mammal"),
        ("cat", "small-mammal"),
        ("teddy bear", "small-mammal"),
        ("mouse", "rodent"),
        ("dog", "canid"),
        ("bear", "bear"),
        ("bird", "bird"),
        ("person", "human"),
        ("car", "vehicle"),
        ("truck", "vehicle"),
        ("motorcycle", "vehicle"),
        ("bicycle", "vehicle"),
        ("bus", "vehicle"),
    ])
});

/// Synonyms folded for the camera-trap specialist, keyed by normalized label.
static REMOTE_SYNONYMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("person", "human"),
        ("people", "human"),
        ("human", "human"),
        ("car", "vehicle"),
        ("vehicle", "vehicle"),
        ("odocoileus-virginianus", "white-tailed-deer"),
        ("whitetail-deer", "white-tailed-deer"),
        ("white-tail-deer", "white-tailed-deer"),
        ("animal", "unidentified-animal"),
    ])
});

/// Result of mapping one raw label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonical {
    /// Canonical name.
    pub name: String,
    /// False when the label had no table entry and passed through.
    pub mapped: bool,
}

/// Map a raw backend label to its canonical name.
///
/// Pure: the same `(raw_label, backend)` always yields the same result.
pub fn canonicalize(raw_label: &str, backend: BackendKind) -> Canonical {
    match backend {
        BackendKind::Local => {
            let key = raw_label.trim().to_lowercase();
            LOCAL_LABELS.get(key.as_str()).map_or_else(
                || Canonical {
                    name: normalize_label(raw_label),
                    mapped: false,
                },
                |name| Canonical {
                    name: (*name).to_string(),
                    mapped: true,
                },
            )
        }
        BackendKind::Remote => {
            let normalized = normalize_label(raw_label);
            let mapped = normalized != UNKNOWN_LABEL;
            let name = REMOTE_SYNONYMS
                .get(normalized.as_str())
                .map_or(normalized, |s| (*s).to_string());
            Canonical { name, mapped }
        }
    }
}

/// Lowercase, hyphen-separate and strip characters unsafe in filenames.
///
/// Letters and digits outside ASCII are kept as-is.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if (c.is_whitespace() || c == '_' || c == '-') && !out.ends_with('-') {
            out.push('-');
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        UNKNOWN_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_folds_onto_wildlife_categories() {
        assert_eq!(canonicalize("horse", BackendKind::Local).name, "deer");
        assert_eq!(canonicalize("cow", BackendKind::Local).name, "deer");
        assert_eq!(canonicalize("mouse", BackendKind::Local).name, "rodent");
        assert_eq!(
            canonicalize("teddy bear", BackendKind::Local).name,
            "small-mammal"
        );
        assert!(canonicalize("dog", BackendKind::Local).mapped);
    }

    #[test]
    fn test_local_unmapped_passes_through_flagged() {
        let c = canonicalize("Fire Hydrant", BackendKind::Local);
        assert_eq!(c.name, "fire-hydrant");
        assert!(!c.mapped);
    }

    #[test]
    fn test_remote_normalizes_and_folds_synonyms() {
        assert_eq!(
            canonicalize("Odocoileus virginianus", BackendKind::Remote).name,
            "white-tailed-deer"
        );
        assert_eq!(canonicalize("People", BackendKind::Remote).name, "human");
        let c = canonicalize("Red_Fox", BackendKind::Remote);
        assert_eq!(c.name, "red-fox");
        assert!(c.mapped);
    }

    #[test]
    fn test_same_label_differs_by_backend() {
        assert_eq!(canonicalize("horse", BackendKind::Local).name, "deer");
        assert_eq!(canonicalize("horse", BackendKind::Remote).name, "horse");
    }

    #[test]
    fn test_canonicalize_is_pure() {
        for _ in 0..3 {
            assert_eq!(
                canonicalize("sheep", BackendKind::Local),
                canonicalize("sheep", BackendKind::Local)
            );
        }
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Wild   Turkey "), "wild-turkey");
        assert_eq!(normalize_label("coyote/dog?"), "coyotedog");
        assert_eq!(normalize_label("__"), "unknown");
        assert_eq!(normalize_label("Élan"), "élan");
        assert_eq!(normalize_label("Grévy's Zebra"), "grévys-zebra");
    }

    #[test]
    fn test_remote_keeps_accented_names() {
        let c = canonicalize("Chevreuil Européen", BackendKind::Remote);
        assert_eq!(c.name, "chevreuil-européen");
        assert!(c.mapped);
    }

    #[test]
    fn test_remote_empty_label_is_flagged() {
        let c = canonicalize("???", BackendKind::Remote);
        assert_eq!(c.name, "unknown");
        assert!(!c.mapped);
    }
}
