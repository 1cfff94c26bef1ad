//! Views on stored materials and graphs that the materializers traverse.

use std::collections::BTreeMap;

use prism_shared::{
    ahash::AHashSet,
    log::{trace, warn},
};

use crate::{asset::NodeId, AssetKey, AssetRef, AssetStore, Error, MaterialAsset, Result, SlotKind, SlotRules};

/// A named texture reference on a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub material: AssetRef,
    pub name: String,
    /// `None` is an empty slot.
    pub texture: Option<AssetRef>,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialNode {
    pub asset: AssetRef,
    pub slots: BTreeMap<String, TextureSlot>,
    pub data: MaterialAsset,
}

impl MaterialNode {
    /// Creates the view on `data` that is stored at `asset`. The slots are classified with `rules`.
    pub fn new(asset: AssetRef, data: MaterialAsset, rules: &SlotRules) -> Self {
        let slots = data
            .textures
            .iter()
            .map(|(name, texture)| {
                let slot = TextureSlot {
                    material: asset.clone(),
                    name: name.clone(),
                    texture: texture.as_ref().map(AssetRef::texture),
                    kind: rules.classify(name),
                };
                (name.clone(), slot)
            })
            .collect();
        Self { asset, slots, data }
    }

    pub fn load(store: &dyn AssetStore, key: &AssetKey, rules: &SlotRules) -> Result<Self> {
        let data = store.load(key)?.into_material(key)?;
        Ok(Self::new(AssetRef::material(key), data, rules))
    }

    /// Textures of all non-empty slots in slot order. A texture in several slots appears once per slot.
    pub fn textures(&self) -> impl Iterator<Item = &AssetRef> {
        self.slots.values().filter_map(|slot| slot.texture.as_ref())
    }
}

/// A node of a graph together with its children.
///
/// The root node is identified by the key of the graph, every other node by the
/// sub-object key `<graph path>#<node id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub asset: AssetRef,
    pub id: NodeId,
    /// Material list of the renderer of the node. Empty when the node doesn't render anything.
    pub materials: Vec<Option<AssetRef>>,
    pub children: Vec<GraphNode>,
}

impl GraphNode {
    /// Loads the graph at `key` and builds the node hierarchy.
    ///
    /// The node table of a graph can reference nodes twice or even contain cycles when
    /// the file was edited by hand. Every node is only taken once; further references to
    /// it and references to nodes that don't exist are dropped with a warning.
    pub fn load(store: &dyn AssetStore, key: &AssetKey) -> Result<Self> {
        let graph = store.load(key)?.into_graph(key)?;

        struct Pending {
            node: GraphNode,
            parent: Option<usize>,
        }

        let mut pending: Vec<Pending> = Vec::new();
        let mut visited = AHashSet::new();
        let mut stack = vec![(graph.root.clone(), None)];
        while let Some((id, parent)) = stack.pop() {
            let asset = if id == graph.root {
                AssetRef::graph(key)
            } else {
                AssetRef::graph(key.sub_object(&id))
            };
            if !visited.insert(asset.clone()) {
                warn!("Node '{id}' of {key} is referenced more than once, ignoring the reference");
                continue;
            }
            let Some(scene_node) = graph.nodes.get(&id) else {
                warn!("Node '{id}' of {key} doesn't exist, ignoring the reference");
                continue;
            };
            trace!("Found node '{id}' ({}) in {key}", scene_node.name);
            let materials = scene_node
                .renderer
                .as_ref()
                .map(|renderer| {
                    renderer
                        .materials
                        .iter()
                        .map(|material| material.as_ref().map(AssetRef::material))
                        .collect()
                })
                .unwrap_or_default();
            let index = pending.len();
            pending.push(Pending {
                node: GraphNode {
                    asset,
                    id,
                    materials,
                    children: Vec::new(),
                },
                parent,
            });
            for child in scene_node.children.iter().rev() {
                stack.push((child.clone(), Some(index)));
            }
        }

        // Descendants always come after their ancestors, so the hierarchy is assembled back to front.
        while pending.len() > 1 {
            let Some(Pending { mut node, parent }) = pending.pop() else {
                break;
            };
            node.children.reverse();
            if let Some(parent) = parent {
                pending[parent].node.children.push(node);
            }
        }
        let mut root = pending
            .pop()
            .map(|pending| pending.node)
            .ok_or_else(|| Error::InvalidAssetData(key.as_path().to_owned()))?;
        root.children.reverse();
        Ok(root)
    }

    /// Whether the node has a renderer with at least one material entry.
    pub fn is_renderable(&self) -> bool {
        !self.materials.is_empty()
    }

    /// All nodes of the hierarchy in depth-first order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Asset, GraphAsset, MemoryAssetStore, SceneNode};

    use super::*;

    #[test]
    fn material_slots_are_classified() {
        let material = MaterialAsset::new("Rock")
            .with_texture("_MainTex", "T.png")
            .with_texture("_BumpMap", "N.png");
        let node = MaterialNode::new(AssetRef::material("M.mat"), material, &SlotRules::default());
        assert_eq!(node.slots["_MainTex"].kind, SlotKind::Default);
        assert_eq!(node.slots["_BumpMap"].kind, SlotKind::NormalMap);
        assert_eq!(node.slots["_BumpMap"].texture, Some(AssetRef::texture("N.png")));
        assert_eq!(node.textures().count(), 2);
    }

    #[test]
    fn graph_hierarchy_keeps_child_order() {
        let graph = GraphAsset::new("G", "root", SceneNode::new("G"))
            .with_child("root", "a", SceneNode::new("A").with_materials([Some("M.mat".into())]))
            .with_child("root", "b", SceneNode::new("B"))
            .with_child("a", "c", SceneNode::new("C"));
        let mut store = MemoryAssetStore::new();
        store.insert("G.prefab", Asset::Graph(graph));

        let root = GraphNode::load(&store, &"G.prefab".into()).unwrap();
        assert_eq!(root.asset, AssetRef::graph("G.prefab"));
        let ids = root.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["root", "a", "c", "b"]);
        assert_eq!(root.children[0].asset, AssetRef::graph("G.prefab#a"));
        assert_eq!(root.children[0].materials, vec![Some(AssetRef::material("M.mat"))]);
        assert!(!root.is_renderable());
    }

    #[test]
    fn cycles_and_dangling_children_are_dropped() {
        let mut graph = GraphAsset::new("G", "root", SceneNode::new("G")).with_child("root", "a", SceneNode::new("A"));
        graph.nodes.get_mut("a").unwrap().children = vec!["root".to_owned(), "a".to_owned(), "missing".to_owned()];
        let mut store = MemoryAssetStore::new();
        store.insert("G.prefab", Asset::Graph(graph));

        let root = GraphNode::load(&store, &"G.prefab".into()).unwrap();
        assert_eq!(root.iter().count(), 2);
        assert!(root.children[0].children.is_empty());
    }
}
