//! Materials that reference the texture variants of a profile.

use prism_shared::log::{info, trace};

use crate::{
    materializer::Materializer, naming, nodes::MaterialNode, report::Outcome, Asset, AssetRef, Error, Result,
    VariantProfile, VariantTag,
};

impl Materializer<'_> {
    /// Returns the variant of the material `original` for `profile` with all texture slots pointing at texture variants.
    ///
    /// An existing variant is overwritten with the data of the original but keeps its
    /// name. Textures that can't be materialized are reported and the slot keeps the
    /// reference to the original texture.
    pub fn materialize_material(&mut self, original: &MaterialNode, profile: &VariantProfile) -> Result<MaterialNode> {
        let key = &original.asset.key;
        match &original.data.variant_of {
            Some(tag) if tag.profile == profile.name => {
                return Ok(self.unchanged_material(original, profile));
            }
            Some(tag) => {
                // A variant of another profile. The variant for this profile is derived from the same original.
                trace!("{} is a variant of {} for '{}'", original.asset, tag.original, tag.profile);
                let source = MaterialNode::load(&*self.store, &tag.original, &profile.slot_rules)?;
                if source.data.variant_of.is_some() || &source.asset.key == key {
                    return Err(Error::InvalidAssetData(key.as_path().to_owned()));
                }
                return self.materialize_material(&source, profile);
            }
            None => {}
        }
        if naming::is_variant(original.asset.path(), &profile.suffix)
            || naming::is_variant_name(&original.data.name, &profile.suffix)
        {
            return Ok(self.unchanged_material(original, profile));
        }

        if let Some(derived) = self.memo.get(key, &profile.name).cloned() {
            return MaterialNode::load(&*self.store, &derived.key, &profile.slot_rules);
        }

        let derived = AssetRef::material(naming::derive_variant_path(original.asset.path(), &profile.suffix)?);
        let mut data = original.data.clone();
        let outcome = if self.store.exists(&derived.key) {
            data.name = self.store.load(&derived.key)?.into_material(&derived.key)?.name;
            Outcome::Updated
        } else {
            data.name = naming::derive_variant_name(&original.data.name, &profile.suffix);
            Outcome::Created
        };
        data.variant_of = Some(VariantTag::new(key, profile));

        for (slot_name, slot) in &original.slots {
            let Some(texture) = &slot.texture else {
                continue;
            };
            match self.materialize_texture(texture, profile, slot.kind) {
                Ok(derived_texture) => {
                    data.textures.insert(slot_name.clone(), Some(derived_texture.key));
                }
                Err(err) => {
                    self.record_skip(&err, key, profile, Some(format!("slot '{slot_name}' with {texture}")));
                }
            }
        }

        self.store.save(&derived.key, &Asset::Material(data.clone()))?;
        info! {
            "{} {derived} for '{}'",
            if outcome == Outcome::Created { "Created" } else { "Updated" },
            profile.name
        };
        self.memo.insert(key, &profile.name, derived.clone());
        self.record(&original.asset, profile, &derived, outcome);
        Ok(MaterialNode::new(derived, data, &profile.slot_rules))
    }

    fn unchanged_material(&mut self, original: &MaterialNode, profile: &VariantProfile) -> MaterialNode {
        if self.memo.get(&original.asset.key, &profile.name).is_none() {
            trace!("{} already is a variant for '{}'", original.asset, profile.name);
            self.memo.insert(&original.asset.key, &profile.name, original.asset.clone());
            self.record(&original.asset, profile, &original.asset, Outcome::Unchanged);
        }
        original.clone()
    }
}

#[cfg(test)]
mod tests {
    use prism_test::setup_logger;

    use crate::{
        profile::{desktop, mobile},
        report::SkipKind,
        AssetKey, AssetStore, MaterialAsset, MemoryAssetStore, SlotKind, TextureAsset,
    };

    use super::*;

    const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

    fn store() -> MemoryAssetStore {
        setup_logger();
        let material = MaterialAsset::new("M")
            .with_texture("_MainTex", "T.png")
            .with_texture("_BumpMap", "N.png");
        let mut store = MemoryAssetStore::new();
        store
            .insert("T.png", Asset::Texture(TextureAsset::default()))
            .insert("N.png", Asset::Texture(TextureAsset::default()))
            .insert("M.mat", Asset::Material(material));
        store
    }

    fn load(store: &MemoryAssetStore, key: &str) -> MaterialNode {
        MaterialNode::load(store, &key.into(), &Default::default()).unwrap()
    }

    fn texture_kind(store: &MemoryAssetStore, key: &str) -> SlotKind {
        store.load(&key.into()).unwrap().into_texture(&key.into()).unwrap().import.kind
    }

    #[test]
    fn slots_point_at_texture_variants() {
        let mut store = store();
        let original = load(&store, "M.mat");
        let mut materializer = Materializer::new(&mut store, EXTENSIONS);
        let derived = materializer.materialize_material(&original, &desktop()).unwrap();
        assert_eq!(derived.asset, AssetRef::material("M_DXT.mat"));
        assert_eq!(derived.data.name, "M_DXT");
        assert_eq!(derived.data.textures["_MainTex"], Some(AssetKey::new("T_DXT.png")));
        assert_eq!(derived.data.textures["_BumpMap"], Some(AssetKey::new("N_DXT.png")));
        assert_eq!(derived.data.variant_of, Some(VariantTag::new("M.mat", &desktop())));

        assert_eq!(texture_kind(&store, "T_DXT.png"), SlotKind::Default);
        assert_eq!(texture_kind(&store, "N_DXT.png"), SlotKind::NormalMap);
        // The original is untouched.
        assert_eq!(load(&store, "M.mat").data.textures["_MainTex"], Some(AssetKey::new("T.png")));
    }

    #[test]
    fn existing_variant_keeps_its_name() {
        let mut store = store();
        store.insert("M_DXT.mat", Asset::Material(MaterialAsset::new("Renamed by hand")));
        let original = load(&store, "M.mat");
        let mut materializer = Materializer::new(&mut store, EXTENSIONS);
        let derived = materializer.materialize_material(&original, &desktop()).unwrap();
        assert_eq!(materializer.report().count(Outcome::Updated), 1);
        assert_eq!(derived.data.name, "Renamed by hand");
        assert_eq!(derived.data.textures.len(), 2);
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut store = store();
        let original = load(&store, "M.mat");
        let first = Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&original, &mobile())
            .unwrap();
        let keys = store.keys().unwrap();
        let second = Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&original, &mobile())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.keys().unwrap(), keys);
        assert_eq!(store.statistics().copies, 2);
        assert_eq!(store.statistics().reimports, 2);
    }

    #[test]
    fn variant_is_returned_unchanged() {
        let mut store = store();
        let original = load(&store, "M.mat");
        Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&original, &desktop())
            .unwrap();
        let variant = load(&store, "M_DXT.mat");
        let mut materializer = Materializer::new(&mut store, EXTENSIONS);
        let result = materializer.materialize_material(&variant, &desktop()).unwrap();
        assert_eq!(result, variant);
        assert_eq!(materializer.report().count(Outcome::Unchanged), 1);
        assert!(!store.exists(&"M_DXT_DXT.mat".into()));
    }

    #[test]
    fn variant_of_another_profile_uses_the_original() {
        let mut store = store();
        let original = load(&store, "M.mat");
        Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&original, &desktop())
            .unwrap();
        let desktop_variant = load(&store, "M_DXT.mat");
        let derived = Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&desktop_variant, &mobile())
            .unwrap();
        assert_eq!(derived.asset, AssetRef::material("M_ASTC.mat"));
        assert_eq!(derived.data.textures["_MainTex"], Some(AssetKey::new("T_ASTC.png")));
        assert!(!store.exists(&"M_DXT_ASTC.mat".into()));
    }

    #[test]
    fn failing_slot_keeps_the_original_texture() {
        let mut store = store();
        let material = MaterialAsset::new("M")
            .with_texture("_MainTex", "T.png")
            .with_texture("_DetailAlbedoMap", "Gone.png");
        store.insert("M.mat", Asset::Material(material));
        let original = load(&store, "M.mat");
        let mut materializer = Materializer::new(&mut store, EXTENSIONS);
        let derived = materializer.materialize_material(&original, &desktop()).unwrap();
        assert_eq!(derived.data.textures["_MainTex"], Some(AssetKey::new("T_DXT.png")));
        assert_eq!(derived.data.textures["_DetailAlbedoMap"], Some(AssetKey::new("Gone.png")));
        let skips = materializer.report().skips.clone();
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].kind, SkipKind::MissingAsset);
        assert_eq!(skips[0].asset, AssetKey::new("M.mat"));
        assert!(skips[0].context.as_deref().unwrap().contains("_DetailAlbedoMap"));
    }

    #[test]
    fn empty_slot_stays_empty() {
        let mut store = store();
        let mut material = MaterialAsset::new("M").with_texture("_MainTex", "T.png");
        material.textures.insert("_BumpMap".to_owned(), None);
        store.insert("M.mat", Asset::Material(material));
        let original = load(&store, "M.mat");
        let mut materializer = Materializer::new(&mut store, EXTENSIONS);
        let derived = materializer.materialize_material(&original, &desktop()).unwrap();
        assert_eq!(derived.data.textures["_BumpMap"], None);
        assert!(materializer.report().skips.is_empty());
    }

    #[test]
    fn texture_in_two_slots_is_materialized_once() {
        let mut store = store();
        let material = MaterialAsset::new("M")
            .with_texture("_MainTex", "T.png")
            .with_texture("_EmissionMap", "T.png");
        store.insert("M.mat", Asset::Material(material));
        let original = load(&store, "M.mat");
        let derived = Materializer::new(&mut store, EXTENSIONS)
            .materialize_material(&original, &desktop())
            .unwrap();
        assert_eq!(derived.data.textures["_MainTex"], Some(AssetKey::new("T_DXT.png")));
        assert_eq!(derived.data.textures["_EmissionMap"], Some(AssetKey::new("T_DXT.png")));
        assert_eq!(store.statistics().copies, 1);
    }
}
