use std::collections::BTreeSet;

use crate::{Asset, AssetKey, Result, TextureImportSettings};

/// Persistence layer the pipeline works against.
///
/// All operations are keyed by the canonical path of the asset and are synchronous.
/// Implementations must report I/O problems as errors instead of ignoring them.
pub trait AssetStore {
    /// Returns `true` when an asset is stored at `key`.
    fn exists(&self, key: &AssetKey) -> bool;

    /// Copies the asset at `src` to `dst`. Labels are not copied.
    fn copy(&mut self, src: &AssetKey, dst: &AssetKey) -> Result<()>;

    /// Loads the asset at `key`.
    fn load(&self, key: &AssetKey) -> Result<Asset>;

    /// Writes `asset` to `key`, replacing whatever was stored there.
    fn save(&mut self, key: &AssetKey, asset: &Asset) -> Result<()>;

    /// Applies the import settings to the texture at `key` and re-encodes it.
    fn reimport(&mut self, key: &AssetKey, settings: &TextureImportSettings) -> Result<()>;

    /// Labels that are attached to the asset at `key`.
    fn labels(&self, key: &AssetKey) -> Result<BTreeSet<String>>;

    /// Attaches `label` to the asset at `key`. Attaching a label twice has no effect.
    fn set_label(&mut self, key: &AssetKey, label: &str) -> Result<()>;

    /// Removes the asset at `key`.
    fn delete(&mut self, key: &AssetKey) -> Result<()>;

    /// Keys of all stored assets in ascending order.
    fn keys(&self) -> Result<Vec<AssetKey>>;
}
