//! [`AssetStore`] on top of a directory.
//!
//! Every asset is a file below the root directory and its key is the path relative
//! to the root. Materials and graphs are YAML documents. Textures keep their encoded
//! bytes untouched; their import settings live in a `.meta` sidecar next to them,
//! e.g. `Textures/Rock.png.meta`. The sidecar also holds the labels of the asset.
//!
//! ```text
//! root/
//! ├─ Textures/
//! │  ├─ Rock.png
//! │  ├─ Rock.png.meta
//! ├─ Materials/
//! │  ├─ Rock.mat
//! ├─ Prefabs/
//! │  ├─ Rock.prefab
//! │  ├─ Rock.prefab.meta
//! ```

use std::{
    collections::BTreeSet,
    ffi::OsString,
    fs, io,
    path::{Component, Path, PathBuf},
};

use prism_shared::{
    log::{info, trace, warn},
    pathdiff,
    walkdir::WalkDir,
};
use serde::{Deserialize, Serialize};

use crate::{
    common::META_FILE_EXTENSION, Asset, AssetKey, AssetKind, AssetStore, Error, Result, TextureAsset, TextureImportSettings,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaData {
    #[serde(default)]
    labels: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    texture: Option<TextureAsset>,
}

pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Creates a new [`FileSystemStore`] and checks that the given root directory exists.
    ///
    /// # Example
    ///
    /// ```
    /// use prism_content::FileSystemStore;
    /// let root = std::env::temp_dir().join("prism_store");
    /// std::fs::create_dir_all(&root).unwrap();
    /// let store = FileSystemStore::new(&root).unwrap();
    /// assert_eq!(store.root(), root);
    /// ```
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_owned();
        if !root.is_dir() {
            return Err(io::Error::new(io::ErrorKind::NotFound, format!("Directory '{}' does not exist", root.display())).into());
        }
        info!("Opened asset store in '{}'", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_path(&self, key: &AssetKey) -> Result<PathBuf> {
        check_path(key)?;
        Ok(self.root.join(key.as_path()))
    }

    fn meta_path(&self, key: &AssetKey) -> Result<PathBuf> {
        let asset_path = self.asset_path(key)?;
        let mut file_name = asset_path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_else(OsString::new);
        file_name.push(".");
        file_name.push(META_FILE_EXTENSION);
        Ok(asset_path.with_file_name(file_name))
    }

    fn read_meta_data(&self, key: &AssetKey) -> Result<MetaData> {
        let meta_path = self.meta_path(key)?;
        if !meta_path.exists() {
            return Ok(MetaData::default());
        }
        let content = fs::read_to_string(&meta_path)?;
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidAssetData(meta_path))
    }

    fn write_meta_data(&self, key: &AssetKey, meta_data: &MetaData) -> Result<()> {
        let meta_path = self.meta_path(key)?;
        let content = serde_yaml::to_string(meta_data).map_err(|err| Error::Other(Box::new(err)))?;
        fs::write(meta_path, content)?;
        Ok(())
    }

    fn require_existing(&self, key: &AssetKey) -> Result<PathBuf> {
        let path = self.asset_path(key)?;
        if !path.is_file() {
            return Err(Error::MissingAsset(key.as_path().to_owned()));
        }
        Ok(path)
    }
}

/// Keys must be relative and must not leave the root directory.
fn check_path(key: &AssetKey) -> Result<()> {
    let path = key.as_path();
    let escapes_root = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || path.is_absolute() || escapes_root {
        return Err(Error::InvalidPath(path.to_owned()));
    }
    Ok(())
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_yaml::to_string(value).map_err(|err| Error::Other(Box::new(err)))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

impl AssetStore for FileSystemStore {
    fn exists(&self, key: &AssetKey) -> bool {
        self.asset_path(key).map(|path| path.is_file()).unwrap_or(false)
    }

    fn copy(&mut self, src: &AssetKey, dst: &AssetKey) -> Result<()> {
        let src_path = self.require_existing(src)?;
        let dst_path = self.asset_path(dst)?;
        if dst_path.exists() {
            return Err(Error::Store {
                path: dst.as_path().to_owned(),
                message: "destination of the copy already exists".to_owned(),
            });
        }
        if let Some(parent) = dst_path.parent() {
            fs::create_dir_all(parent)?;
        }
        trace!("Copying '{}' to '{}'", src_path.display(), dst_path.display());
        fs::copy(&src_path, &dst_path)?;

        // The copy keeps the import settings of the original but starts without labels.
        let meta_data = self.read_meta_data(src)?;
        if meta_data.texture.is_some() {
            let meta_data = MetaData {
                labels: BTreeSet::new(),
                texture: meta_data.texture,
            };
            self.write_meta_data(dst, &meta_data)?;
        }
        Ok(())
    }

    fn load(&self, key: &AssetKey) -> Result<Asset> {
        let path = self.require_existing(key)?;
        match AssetKind::from_path(key.as_path())? {
            AssetKind::Texture => {
                let meta_data = self.read_meta_data(key)?;
                Ok(Asset::Texture(meta_data.texture.unwrap_or_default()))
            }
            AssetKind::Material => {
                let content = fs::read_to_string(&path)?;
                let material = serde_yaml::from_str(&content).map_err(|_| Error::InvalidAssetData(path))?;
                Ok(Asset::Material(material))
            }
            AssetKind::Graph => {
                let content = fs::read_to_string(&path)?;
                let graph = serde_yaml::from_str(&content).map_err(|_| Error::InvalidAssetData(path))?;
                Ok(Asset::Graph(graph))
            }
        }
    }

    fn save(&mut self, key: &AssetKey, asset: &Asset) -> Result<()> {
        let path = self.asset_path(key)?;
        let kind = AssetKind::from_path(key.as_path())?;
        if kind != asset.kind() {
            return Err(Error::UnexpectedKind {
                path: key.as_path().to_owned(),
                expected: kind,
                found: asset.kind(),
            });
        }
        match asset {
            Asset::Texture(texture) => {
                // The encoded bytes can only come from a copy of an existing texture.
                if !path.is_file() {
                    return Err(Error::MissingAsset(key.as_path().to_owned()));
                }
                let mut meta_data = self.read_meta_data(key)?;
                meta_data.texture = Some(texture.clone());
                self.write_meta_data(key, &meta_data)
            }
            Asset::Material(material) => write_yaml(&path, material),
            Asset::Graph(graph) => write_yaml(&path, graph),
        }
    }

    fn reimport(&mut self, key: &AssetKey, settings: &TextureImportSettings) -> Result<()> {
        self.require_existing(key)?;
        let kind = AssetKind::from_path(key.as_path())?;
        if kind != AssetKind::Texture {
            return Err(Error::UnexpectedKind {
                path: key.as_path().to_owned(),
                expected: AssetKind::Texture,
                found: kind,
            });
        }
        let mut meta_data = self.read_meta_data(key)?;
        let mut texture = meta_data.texture.unwrap_or_default();
        texture.import = settings.clone();
        meta_data.texture = Some(texture);
        self.write_meta_data(key, &meta_data)?;
        info! {
            "Reimported {key} as {} ({}, max size {:?}, platform {:?})",
            settings.format.map(|format| format.to_string()).unwrap_or_else(|| "uncompressed".to_owned()),
            settings.kind,
            settings.max_size,
            settings.platform
        };
        Ok(())
    }

    fn labels(&self, key: &AssetKey) -> Result<BTreeSet<String>> {
        self.require_existing(key)?;
        Ok(self.read_meta_data(key)?.labels)
    }

    fn set_label(&mut self, key: &AssetKey, label: &str) -> Result<()> {
        self.require_existing(key)?;
        let mut meta_data = self.read_meta_data(key)?;
        if meta_data.labels.insert(label.to_owned()) {
            self.write_meta_data(key, &meta_data)?;
        }
        Ok(())
    }

    fn delete(&mut self, key: &AssetKey) -> Result<()> {
        let path = self.require_existing(key)?;
        fs::remove_file(&path)?;
        let meta_path = self.meta_path(key)?;
        if meta_path.exists() {
            fs::remove_file(meta_path)?;
        }
        info!("Deleted {key}");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<AssetKey>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Failed to read directory entry below '{}': {err}", self.root.display());
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Some(relative_path) = pathdiff::diff_paths(entry.path(), &self.root) else {
                warn!("Failed to get relative path of '{}' relative to '{}'", entry.path().display(), self.root.display());
                continue;
            };
            // Sidecars and unrelated files like the group table are not assets.
            if AssetKind::from_path(&relative_path).is_err() {
                continue;
            }
            keys.push(AssetKey::new(relative_path));
        }
        keys.sort();
        Ok(keys)
    }
}
