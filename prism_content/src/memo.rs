use prism_shared::ahash::AHashMap;

use crate::{AssetKey, AssetRef, SlotKind};

/// Remembers which variant was produced for an (original, profile) pair during one pipeline run.
#[derive(Debug, Default)]
pub struct VariantMemo {
    variants: AHashMap<(AssetKey, String), AssetRef>,
    texture_kinds: AHashMap<AssetKey, SlotKind>,
}

impl VariantMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original: &AssetKey, profile: &str) -> Option<&AssetRef> {
        self.variants.get(&(original.clone(), profile.to_owned()))
    }

    pub fn insert(&mut self, original: &AssetKey, profile: &str, derived: AssetRef) {
        self.variants.insert((original.clone(), profile.to_owned()), derived);
    }

    /// Encoding the derived texture was produced or found with.
    pub fn texture_kind(&self, derived: &AssetKey) -> Option<SlotKind> {
        self.texture_kinds.get(derived).copied()
    }

    pub fn set_texture_kind(&mut self, derived: &AssetKey, kind: SlotKind) {
        self.texture_kinds.insert(derived.clone(), kind);
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_per_profile() {
        let mut memo = VariantMemo::new();
        let original = AssetKey::new("T.png");
        memo.insert(&original, "Desktop", AssetRef::texture("T_DXT.png"));
        assert_eq!(memo.get(&original, "Desktop"), Some(&AssetRef::texture("T_DXT.png")));
        assert_eq!(memo.get(&original, "Mobile"), None);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn texture_kinds() {
        let mut memo = VariantMemo::new();
        let derived = AssetKey::new("N_DXT.png");
        assert_eq!(memo.texture_kind(&derived), None);
        memo.set_texture_kind(&derived, SlotKind::NormalMap);
        assert_eq!(memo.texture_kind(&derived), Some(SlotKind::NormalMap));
    }
}
