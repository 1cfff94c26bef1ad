//! Compressed copies of textures.

use prism_shared::log::{error, info, trace, warn};

use crate::{
    common::extract_extension_from_path, materializer::Materializer, naming, report::Outcome, Asset, AssetRef,
    Error, Result, SlotKind, TextureImportSettings, VariantProfile, VariantTag,
};

impl Materializer<'_> {
    /// Returns the variant of the texture `original` for `profile` and creates it when it doesn't exist yet.
    ///
    /// A new variant is a copy of the original that is reimported with the compression
    /// settings of the profile. An existing variant is reused without encoding it again.
    /// The texture is encoded according to `kind`, so requesting a texture that was
    /// already encoded as a normal map as a plain texture is a [`Error::SlotKindConflict`].
    pub fn materialize_texture(&mut self, original: &AssetRef, profile: &VariantProfile, kind: SlotKind) -> Result<AssetRef> {
        if original.key.is_empty() {
            return Err(Error::MissingAsset(original.path().to_owned()));
        }
        let extension = extract_extension_from_path(original.path())?;
        if !self.accepts_texture_extension(&extension) {
            return Err(Error::InvalidExtension(extension, original.path().to_owned()));
        }

        let tag = self
            .store
            .load(&original.key)
            .ok()
            .and_then(|asset| asset.variant_of().cloned());
        match tag {
            Some(tag) if tag.profile == profile.name => {
                return Ok(self.unchanged_texture(original, profile));
            }
            Some(tag) => {
                // A variant of another profile. The variant for this profile is derived from the same original.
                trace!("{original} is a variant of {} for '{}'", tag.original, tag.profile);
                let is_original = self.store.load(&tag.original)?.variant_of().is_none();
                if tag.original == original.key || !is_original {
                    return Err(Error::InvalidAssetData(original.path().to_owned()));
                }
                return self.materialize_texture(&AssetRef::texture(tag.original), profile, kind);
            }
            None => {}
        }
        if naming::is_variant(original.path(), &profile.suffix) {
            return Ok(self.unchanged_texture(original, profile));
        }

        if let Some(derived) = self.memo.get(&original.key, &profile.name).cloned() {
            self.check_texture_kind(&derived, kind)?;
            return Ok(derived);
        }

        let derived = AssetRef::texture(naming::derive_variant_path(original.path(), &profile.suffix)?);
        if !self.store.exists(&original.key) {
            return Err(Error::MissingAsset(original.path().to_owned()));
        }

        let outcome = if self.store.exists(&derived.key) {
            let existing = self.store.load(&derived.key)?.into_texture(&derived.key)?;
            if existing.variant_of != Some(VariantTag::new(&original.key, profile)) {
                // The texture was copied but never encoded for the profile.
                warn!("{derived} is not tagged as the variant of {original} for '{}', encoding it again", profile.name);
                self.encode_texture(original, &derived, profile, kind)?;
                Outcome::Updated
            } else if existing.import.kind != kind {
                return Err(Error::SlotKindConflict {
                    texture: derived.path().to_owned(),
                    existing: existing.import.kind,
                    requested: kind,
                });
            } else {
                info!("Reusing {derived} for '{}'", profile.name);
                Outcome::Reused
            }
        } else {
            self.store.copy(&original.key, &derived.key)?;
            if let Err(err) = self.encode_texture(original, &derived, profile, kind) {
                if let Err(delete_err) = self.store.delete(&derived.key) {
                    error!("Failed to remove the unfinished {derived}: {delete_err}");
                }
                return Err(err);
            }
            info!("Created {derived} as {} {kind} for '{}'", profile.format, profile.name);
            Outcome::Created
        };

        self.memo.set_texture_kind(&derived.key, kind);
        self.memo.insert(&original.key, &profile.name, derived.clone());
        self.record(original, profile, &derived, outcome);
        Ok(derived)
    }

    /// Reimports `derived` with the compression settings of `profile` and tags it as the variant of `original`.
    fn encode_texture(&mut self, original: &AssetRef, derived: &AssetRef, profile: &VariantProfile, kind: SlotKind) -> Result<()> {
        self.store
            .reimport(&derived.key, &TextureImportSettings::for_profile(profile, kind))?;
        let mut texture = self.store.load(&derived.key)?.into_texture(&derived.key)?;
        texture.variant_of = Some(VariantTag::new(&original.key, profile));
        self.store.save(&derived.key, &Asset::Texture(texture))
    }

    fn unchanged_texture(&mut self, original: &AssetRef, profile: &VariantProfile) -> AssetRef {
        if self.memo.get(&original.key, &profile.name).is_none() {
            trace!("{original} already is a variant for '{}'", profile.name);
            self.memo.insert(&original.key, &profile.name, original.clone());
            self.record(original, profile, original, Outcome::Unchanged);
        }
        original.clone()
    }

    fn check_texture_kind(&self, derived: &AssetRef, requested: SlotKind) -> Result<()> {
        match self.memo.texture_kind(&derived.key) {
            Some(existing) if existing != requested => Err(Error::SlotKindConflict {
                texture: derived.path().to_owned(),
                existing,
                requested,
            }),
            _ => Ok(()),
        }
    }
}
