use std::{
    borrow::Cow,
    cmp::Ordering,
    fmt::{self, Formatter},
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
    result,
};

use prism_shared::thiserror;
use serde::{Deserialize, Serialize};

/// Extension of the sidecar file that stores labels and import settings next to an asset.
pub const META_FILE_EXTENSION: &str = "meta";

pub const TEXTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "psd", "tif", "tiff", "bmp", "exr", "hdr"];
pub const MATERIAL_EXTENSIONS: &[&str] = &["mat"];
pub const GRAPH_EXTENSIONS: &[&str] = &["prefab", "unity"];

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
    #[error("Invalid extension '{0}' in path {1}")]
    InvalidExtension(String, PathBuf),
    #[error("Invalid suffix '{0}': a suffix is '_' followed by ASCII letters, digits or underscores")]
    InvalidSuffix(String),
    #[error("Missing asset: {0}")]
    MissingAsset(PathBuf),
    #[error("Expected a {expected} at {path} but found a {found}")]
    UnexpectedKind {
        path: PathBuf,
        expected: AssetKind,
        found: AssetKind,
    },
    #[error("Texture {texture} is encoded as {existing} but was requested as {requested}")]
    SlotKindConflict {
        texture: PathBuf,
        existing: SlotKind,
        requested: SlotKind,
    },
    #[error("Failed to read the asset: {0}")]
    InvalidAssetData(PathBuf),
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("Store operation on {path} failed: {message}")]
    Store { path: PathBuf, message: String },
    #[error("Other: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Identifies the asset. It's the relative path of the asset in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(PathBuf);

impl AssetKey {
    /// Create a new [`AssetKey`] from a path. No validation is done on the path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use prism_content::AssetKey;
    /// let asset_key = AssetKey::new("Assets/Textures/character.png");
    /// assert_eq!(asset_key.as_str(), "Assets/Textures/character.png");
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the path of the asset.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use std::ffi::OsStr;
    /// use prism_content::AssetKey;
    /// let asset_key = AssetKey::new("Assets/Textures/character.png");
    /// assert_eq!(asset_key.as_path().extension(), Some(OsStr::new("png")));
    /// ```
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Returns the path of the asset as a string.
    pub fn as_str(&self) -> Cow<str> {
        self.0.to_string_lossy()
    }

    /// Returns `true` when the key doesn't name anything.
    pub fn is_empty(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Key of an object that lives inside this asset, e.g. a node of a prefab.
    pub fn sub_object(&self, id: &str) -> AssetKey {
        AssetKey(PathBuf::from(format!("{}#{id}", self.as_str())))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AssetKey({})", self.as_str())
    }
}

impl From<&str> for AssetKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&Path> for AssetKey {
    fn from(value: &Path) -> Self {
        Self::new(value)
    }
}

impl From<&AssetKey> for AssetKey {
    fn from(value: &AssetKey) -> Self {
        value.clone()
    }
}

/// The three kinds of assets the pipeline deals with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Graph,
    Material,
    Texture,
}

impl AssetKind {
    /// Determines the kind from the extension of the path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use prism_content::AssetKind;
    /// assert_eq!(AssetKind::from_path("Assets/Hero.prefab".as_ref()).unwrap(), AssetKind::Graph);
    /// assert_eq!(AssetKind::from_path("Assets/Hero.PNG".as_ref()).unwrap(), AssetKind::Texture);
    /// assert!(AssetKind::from_path("Assets/Hero.txt".as_ref()).is_err());
    /// ```
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = extract_extension_from_path(path)?;
        if TEXTURE_EXTENSIONS.contains(&extension.as_str()) {
            Ok(AssetKind::Texture)
        } else if MATERIAL_EXTENSIONS.contains(&extension.as_str()) {
            Ok(AssetKind::Material)
        } else if GRAPH_EXTENSIONS.contains(&extension.as_str()) {
            Ok(AssetKind::Graph)
        } else {
            Err(Error::InvalidExtension(extension, path.to_owned()))
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Graph => write!(f, "graph"),
            AssetKind::Material => write!(f, "material"),
            AssetKind::Texture => write!(f, "texture"),
        }
    }
}

/// Determines how the content of a texture slot is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    #[default]
    Default,
    NormalMap,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Default => write!(f, "default texture"),
            SlotKind::NormalMap => write!(f, "normal map"),
        }
    }
}

/// Identity of a stored asset. Two [`AssetRef`]s are the same asset iff their keys are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    pub key: AssetKey,
    pub kind: AssetKind,
}

impl AssetRef {
    pub fn new(key: impl Into<AssetKey>, kind: AssetKind) -> Self {
        Self { key: key.into(), kind }
    }

    /// Creates an [`AssetRef`] and derives the kind from the extension of the key.
    pub fn from_key(key: impl Into<AssetKey>) -> Result<Self> {
        let key = key.into();
        let kind = AssetKind::from_path(key.as_path())?;
        Ok(Self { key, kind })
    }

    pub fn graph(key: impl Into<AssetKey>) -> Self {
        Self::new(key, AssetKind::Graph)
    }

    pub fn material(key: impl Into<AssetKey>) -> Self {
        Self::new(key, AssetKind::Material)
    }

    pub fn texture(key: impl Into<AssetKey>) -> Self {
        Self::new(key, AssetKind::Texture)
    }

    pub fn path(&self) -> &Path {
        self.key.as_path()
    }
}

impl PartialEq for AssetRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AssetRef {}

impl Hash for AssetRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for AssetRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssetRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.key.as_str())
    }
}

pub(crate) fn extract_extension_from_path(path: &Path) -> Result<String> {
    Ok(path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
        .ok_or(Error::InvalidPath(path.to_owned()))?
        .to_owned())
}
