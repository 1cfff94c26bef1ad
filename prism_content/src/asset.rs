//! Data of the assets as they are persisted by an [`AssetStore`](crate::AssetStore).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AssetKey, AssetKind, Error, Result, SlotKind, TextureFormat, VariantProfile};

/// Local identifier of a node inside a graph asset.
pub type NodeId = String;

/// Marks an asset as derived from `original` for the profile named `profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTag {
    pub original: AssetKey,
    pub profile: String,
}

impl VariantTag {
    pub fn new(original: impl Into<AssetKey>, profile: &VariantProfile) -> Self {
        Self {
            original: original.into(),
            profile: profile.name.clone(),
        }
    }
}

/// Settings the texture is imported with. Changing them requires a reimport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureImportSettings {
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub format: Option<TextureFormat>,
    #[serde(default)]
    pub max_size: Option<u32>,
    #[serde(default)]
    pub kind: SlotKind,
    /// Platform for which the format and the max size are overridden.
    #[serde(default)]
    pub platform: Option<String>,
}

impl TextureImportSettings {
    /// Compressed import settings for the given profile.
    pub fn for_profile(profile: &VariantProfile, kind: SlotKind) -> Self {
        Self {
            compressed: true,
            format: Some(profile.format),
            max_size: Some(profile.max_dimension),
            kind,
            platform: Some(profile.platform.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureAsset {
    #[serde(default)]
    pub import: TextureImportSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<VariantTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Float(f32),
    Vector([f32; 4]),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialAsset {
    pub name: String,
    #[serde(default)]
    pub shader: String,
    /// Texture slots of the material. `None` is an empty slot.
    #[serde(default)]
    pub textures: BTreeMap<String, Option<AssetKey>>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<VariantTag>,
}

impl MaterialAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, slot: impl Into<String>, texture: impl Into<AssetKey>) -> Self {
        self.textures.insert(slot.into(), Some(texture.into()));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderer {
    /// Material list of the renderer. `None` is a missing material.
    pub materials: Vec<Option<AssetKey>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<Renderer>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            renderer: None,
        }
    }

    pub fn with_materials(mut self, materials: impl IntoIterator<Item = Option<AssetKey>>) -> Self {
        self.renderer = Some(Renderer {
            materials: materials.into_iter().collect(),
        });
        self
    }
}

/// A prefab or a scene. The nodes form a hierarchy through their `children` lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAsset {
    pub name: String,
    pub root: NodeId,
    pub nodes: BTreeMap<NodeId, SceneNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_of: Option<VariantTag>,
}

impl GraphAsset {
    /// Creates a graph that only consists of the root node.
    pub fn new(name: impl Into<String>, root_id: impl Into<NodeId>, root: SceneNode) -> Self {
        let root_id = root_id.into();
        Self {
            name: name.into(),
            nodes: BTreeMap::from([(root_id.clone(), root)]),
            root: root_id,
            variant_of: None,
        }
    }

    /// Adds `node` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// If `parent` is not a node of the graph.
    pub fn with_child(mut self, parent: &str, id: impl Into<NodeId>, node: SceneNode) -> Self {
        let id = id.into();
        self.nodes
            .get_mut(parent)
            .unwrap_or_else(|| panic!("parent node '{parent}' doesn't exist"))
            .children
            .push(id.clone());
        self.nodes.insert(id, node);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Asset {
    Texture(TextureAsset),
    Material(MaterialAsset),
    Graph(GraphAsset),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Texture(_) => AssetKind::Texture,
            Asset::Material(_) => AssetKind::Material,
            Asset::Graph(_) => AssetKind::Graph,
        }
    }

    pub fn variant_of(&self) -> Option<&VariantTag> {
        match self {
            Asset::Texture(texture) => texture.variant_of.as_ref(),
            Asset::Material(material) => material.variant_of.as_ref(),
            Asset::Graph(graph) => graph.variant_of.as_ref(),
        }
    }

    /// Returns the texture or [`Error::UnexpectedKind`] when the asset at `key` is something else.
    pub fn into_texture(self, key: &AssetKey) -> Result<TextureAsset> {
        match self {
            Asset::Texture(texture) => Ok(texture),
            other => Err(unexpected_kind(key, AssetKind::Texture, other.kind())),
        }
    }

    /// Returns the material or [`Error::UnexpectedKind`] when the asset at `key` is something else.
    pub fn into_material(self, key: &AssetKey) -> Result<MaterialAsset> {
        match self {
            Asset::Material(material) => Ok(material),
            other => Err(unexpected_kind(key, AssetKind::Material, other.kind())),
        }
    }

    /// Returns the graph or [`Error::UnexpectedKind`] when the asset at `key` is something else.
    pub fn into_graph(self, key: &AssetKey) -> Result<GraphAsset> {
        match self {
            Asset::Graph(graph) => Ok(graph),
            other => Err(unexpected_kind(key, AssetKind::Graph, other.kind())),
        }
    }
}

fn unexpected_kind(key: &AssetKey, expected: AssetKind, found: AssetKind) -> Error {
    Error::UnexpectedKind {
        path: key.as_path().to_owned(),
        expected,
        found,
    }
}
