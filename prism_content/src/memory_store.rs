use std::collections::{BTreeMap, BTreeSet};

use prism_shared::log::trace;

use crate::{Asset, AssetKey, AssetKind, AssetStore, Error, Result, TextureImportSettings};

/// Counts the mutating operations that reached a [`MemoryAssetStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub copies: usize,
    pub saves: usize,
    pub reimports: usize,
    pub deletes: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    asset: Asset,
    labels: BTreeSet<String>,
}

/// [`AssetStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    entries: BTreeMap<AssetKey, Entry>,
    failing: BTreeSet<AssetKey>,
    failing_reimports: usize,
    statistics: StoreStatistics,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an asset without counting it as a store operation.
    pub fn insert(&mut self, key: impl Into<AssetKey>, asset: Asset) -> &mut Self {
        self.entries.insert(
            key.into(),
            Entry {
                asset,
                labels: BTreeSet::new(),
            },
        );
        self
    }

    /// Inserts an asset with labels without counting it as a store operation.
    pub fn insert_labeled<'a>(&mut self, key: impl Into<AssetKey>, asset: Asset, labels: impl IntoIterator<Item = &'a str>) -> &mut Self {
        self.entries.insert(
            key.into(),
            Entry {
                asset,
                labels: labels.into_iter().map(ToOwned::to_owned).collect(),
            },
        );
        self
    }

    /// Lets every copy, save and reimport that writes to `key` fail.
    pub fn fail_on(&mut self, key: impl Into<AssetKey>) -> &mut Self {
        self.failing.insert(key.into());
        self
    }

    /// Lets the next `count` reimports fail, whatever key they write to.
    pub fn fail_next_reimports(&mut self, count: usize) -> &mut Self {
        self.failing_reimports = count;
        self
    }

    pub fn get(&self, key: &AssetKey) -> Option<&Asset> {
        self.entries.get(key).map(|entry| &entry.asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statistics(&self) -> StoreStatistics {
        self.statistics
    }

    fn check_writable(&self, key: &AssetKey) -> Result<()> {
        if self.failing.contains(key) {
            return Err(Error::Store {
                path: key.as_path().to_owned(),
                message: "write rejected by the store".to_owned(),
            });
        }
        Ok(())
    }

    fn entry_mut(&mut self, key: &AssetKey) -> Result<&mut Entry> {
        self.entries
            .get_mut(key)
            .ok_or_else(|| Error::MissingAsset(key.as_path().to_owned()))
    }
}

impl AssetStore for MemoryAssetStore {
    fn exists(&self, key: &AssetKey) -> bool {
        self.entries.contains_key(key)
    }

    fn copy(&mut self, src: &AssetKey, dst: &AssetKey) -> Result<()> {
        self.check_writable(dst)?;
        let asset = self
            .entries
            .get(src)
            .map(|entry| entry.asset.clone())
            .ok_or_else(|| Error::MissingAsset(src.as_path().to_owned()))?;
        if self.entries.contains_key(dst) {
            return Err(Error::Store {
                path: dst.as_path().to_owned(),
                message: "destination of the copy already exists".to_owned(),
            });
        }
        trace!("Copying {src} to {dst}");
        self.entries.insert(
            dst.clone(),
            Entry {
                asset,
                labels: BTreeSet::new(),
            },
        );
        self.statistics.copies += 1;
        Ok(())
    }

    fn load(&self, key: &AssetKey) -> Result<Asset> {
        self.entries
            .get(key)
            .map(|entry| entry.asset.clone())
            .ok_or_else(|| Error::MissingAsset(key.as_path().to_owned()))
    }

    fn save(&mut self, key: &AssetKey, asset: &Asset) -> Result<()> {
        self.check_writable(key)?;
        match self.entries.get_mut(key) {
            Some(entry) => entry.asset = asset.clone(),
            None => {
                self.entries.insert(
                    key.clone(),
                    Entry {
                        asset: asset.clone(),
                        labels: BTreeSet::new(),
                    },
                );
            }
        }
        self.statistics.saves += 1;
        Ok(())
    }

    fn reimport(&mut self, key: &AssetKey, settings: &TextureImportSettings) -> Result<()> {
        self.check_writable(key)?;
        if self.failing_reimports > 0 {
            self.failing_reimports -= 1;
            return Err(Error::Store {
                path: key.as_path().to_owned(),
                message: "reimport rejected by the store".to_owned(),
            });
        }
        let entry = self.entry_mut(key)?;
        let found = entry.asset.kind();
        let Asset::Texture(texture) = &mut entry.asset else {
            return Err(Error::UnexpectedKind {
                path: key.as_path().to_owned(),
                expected: AssetKind::Texture,
                found,
            });
        };
        texture.import = settings.clone();
        self.statistics.reimports += 1;
        Ok(())
    }

    fn labels(&self, key: &AssetKey) -> Result<BTreeSet<String>> {
        self.entries
            .get(key)
            .map(|entry| entry.labels.clone())
            .ok_or_else(|| Error::MissingAsset(key.as_path().to_owned()))
    }

    fn set_label(&mut self, key: &AssetKey, label: &str) -> Result<()> {
        self.entry_mut(key)?.labels.insert(label.to_owned());
        Ok(())
    }

    fn delete(&mut self, key: &AssetKey) -> Result<()> {
        self.entries
            .remove(key)
            .ok_or_else(|| Error::MissingAsset(key.as_path().to_owned()))?;
        self.statistics.deletes += 1;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<AssetKey>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::{MaterialAsset, TextureAsset};

    use super::*;

    #[test]
    fn copy_does_not_carry_labels() {
        let mut store = MemoryAssetStore::new();
        store.insert_labeled("T.png", Asset::Texture(TextureAsset::default()), ["A"]);
        store.copy(&"T.png".into(), &"T_DXT.png".into()).unwrap();
        assert!(store.exists(&"T_DXT.png".into()));
        assert!(store.labels(&"T_DXT.png".into()).unwrap().is_empty());
        assert_eq!(store.statistics().copies, 1);
    }

    #[test]
    fn copy_refuses_to_overwrite() {
        let mut store = MemoryAssetStore::new();
        store
            .insert("T.png", Asset::Texture(TextureAsset::default()))
            .insert("T_DXT.png", Asset::Texture(TextureAsset::default()));
        assert!(matches!(
            store.copy(&"T.png".into(), &"T_DXT.png".into()),
            Err(Error::Store { .. })
        ));
    }

    #[test]
    fn missing_assets() {
        let mut store = MemoryAssetStore::new();
        assert!(matches!(store.load(&"M.mat".into()), Err(Error::MissingAsset(_))));
        assert!(matches!(store.copy(&"M.mat".into(), &"M_DXT.mat".into()), Err(Error::MissingAsset(_))));
        assert!(matches!(store.set_label(&"M.mat".into(), "A"), Err(Error::MissingAsset(_))));
        assert!(matches!(store.delete(&"M.mat".into()), Err(Error::MissingAsset(_))));
    }

    #[test]
    fn reimport_only_applies_to_textures() {
        let mut store = MemoryAssetStore::new();
        store.insert("M.mat", Asset::Material(MaterialAsset::new("M")));
        let result = store.reimport(&"M.mat".into(), &TextureImportSettings::default());
        assert!(matches!(result, Err(Error::UnexpectedKind { .. })));
    }

    #[test]
    fn failing_key_rejects_writes() {
        let mut store = MemoryAssetStore::new();
        store.fail_on("M.mat");
        let result = store.save(&"M.mat".into(), &Asset::Material(MaterialAsset::new("M")));
        assert!(matches!(result, Err(Error::Store { .. })));
        assert!(!store.exists(&"M.mat".into()));
    }

    #[test]
    fn failing_reimports_recover() {
        let mut store = MemoryAssetStore::new();
        store
            .insert("T.png", Asset::Texture(TextureAsset::default()))
            .fail_next_reimports(1);
        let settings = TextureImportSettings::default();
        assert!(matches!(store.reimport(&"T.png".into(), &settings), Err(Error::Store { .. })));
        store.reimport(&"T.png".into(), &settings).unwrap();
        assert_eq!(store.statistics().reimports, 1);
    }
}
