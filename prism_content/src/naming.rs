//! Canonical names of derived assets.
//!
//! A variant lives next to its original and carries the suffix of its profile right
//! in front of the extension: `Assets/Rock.png` becomes `Assets/Rock_DXT.png`. The
//! suffix is matched as a token, i.e. it has to be followed by the end of the stem
//! or by another `_` segment. That way `Rock_DXT.png` and `Level_DXT_URP.unity` are
//! variants for `_DXT` while `Road_DXTiles.png` is not.

use std::path::Path;

use crate::{AssetKey, Error, Result, SlotKind, SlotRules};

/// Inserts `suffix` immediately before the extension of `path`.
///
/// # Example
///
/// ```rust
/// use prism_content::naming::derive_variant_path;
/// let derived = derive_variant_path("Assets/Textures/Rock.png", "_DXT").unwrap();
/// assert_eq!(derived.as_str(), "Assets/Textures/Rock_DXT.png");
/// ```
pub fn derive_variant_path(path: impl AsRef<Path>, suffix: &str) -> Result<AssetKey> {
    let path = path.as_ref();
    let invalid = || Error::InvalidPath(path.to_owned());
    if path.as_os_str().is_empty() {
        return Err(invalid());
    }
    let stem = path.file_stem().and_then(|stem| stem.to_str()).ok_or_else(invalid)?;
    let extension = path.extension().and_then(|extension| extension.to_str()).ok_or_else(invalid)?;
    if stem.is_empty() || extension.is_empty() {
        return Err(invalid());
    }
    Ok(AssetKey::new(path.with_file_name(format!("{stem}{suffix}.{extension}"))))
}

/// Appends the suffix to the name of an asset.
pub fn derive_variant_name(name: &str, suffix: &str) -> String {
    format!("{name}{suffix}")
}

/// Returns `true` when the file stem of `path` already carries `suffix`.
pub fn is_variant(path: impl AsRef<Path>, suffix: &str) -> bool {
    path.as_ref()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| is_variant_name(stem, suffix))
}

/// Returns `true` when `name` contains `suffix` followed by the end of the name or by `_`.
pub fn is_variant_name(name: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    name.match_indices(suffix).any(|(index, _)| {
        let rest = &name[index + suffix.len()..];
        rest.is_empty() || rest.starts_with('_')
    })
}

/// Determines whether the slot holds a normal map by matching its name against the patterns of the rules.
pub fn classify_slot(slot_name: &str, rules: &SlotRules) -> SlotKind {
    let slot_name = slot_name.to_lowercase();
    let is_normal_map = rules
        .normal_map_patterns
        .iter()
        .any(|pattern| !pattern.is_empty() && slot_name.contains(&pattern.to_lowercase()));
    if is_normal_map {
        SlotKind::NormalMap
    } else {
        SlotKind::Default
    }
}
