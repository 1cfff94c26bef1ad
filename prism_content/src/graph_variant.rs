//! Prefabs and scenes whose renderers use the material variants of a profile.

use std::collections::{BTreeMap, BTreeSet};

use prism_shared::{
    ahash::AHashSet,
    log::{info, trace, warn},
};

use crate::{
    asset::NodeId,
    group::{register_and_label, DistributionGroup},
    materializer::Materializer,
    naming,
    nodes::{GraphNode, MaterialNode},
    report::Outcome,
    Asset, AssetKey, AssetRef, Error, GraphAsset, Result, VariantProfile, VariantTag,
};

impl Materializer<'_> {
    /// Returns the variant of the graph `original` for `profile` and registers it in `target_group`.
    ///
    /// The nodes are visited depth-first, root first. Every material of every renderer is
    /// materialized. A material that can't be materialized is reported and the renderer
    /// keeps the reference to the original material. The derived graph, its materials
    /// and its textures are registered in `target_group` with the labels of their
    /// originals and the label of the profile.
    pub fn materialize_graph(
        &mut self,
        original: &GraphNode,
        profile: &VariantProfile,
        target_group: &mut DistributionGroup,
    ) -> Result<GraphNode> {
        let key = original.asset.key.clone();
        let graph = self.store.load(&key)?.into_graph(&key)?;
        match &graph.variant_of {
            Some(tag) if tag.profile == profile.name => {
                return self.unchanged_graph(original, profile, target_group);
            }
            Some(tag) => {
                trace!("{} is a variant of {} for '{}'", original.asset, tag.original, tag.profile);
                let is_original = self.store.load(&tag.original)?.variant_of().is_none();
                if tag.original == key || !is_original {
                    return Err(Error::InvalidAssetData(key.as_path().to_owned()));
                }
                let source = GraphNode::load(&*self.store, &tag.original)?;
                return self.materialize_graph(&source, profile, target_group);
            }
            None => {}
        }
        if naming::is_variant(original.asset.path(), &profile.suffix) || naming::is_variant_name(&graph.name, &profile.suffix) {
            return self.unchanged_graph(original, profile, target_group);
        }

        if let Some(derived) = self.memo.get(&key, &profile.name).cloned() {
            return GraphNode::load(&*self.store, &derived.key);
        }

        let mut rewired: BTreeMap<NodeId, Vec<Option<AssetKey>>> = BTreeMap::new();
        let mut registrations: BTreeSet<(AssetKey, AssetKey)> = BTreeSet::new();
        let mut visited = AHashSet::new();
        let mut stack = vec![original];
        let mut renderer_index = 0;
        while let Some(node) = stack.pop() {
            if !visited.insert(node.asset.clone()) {
                warn!("{} was reached twice while traversing {key}, skipping it", node.asset);
                continue;
            }
            trace!("Visiting {}", node.asset);
            stack.extend(node.children.iter().rev());
            if !node.is_renderable() {
                continue;
            }

            let mut materials = Vec::with_capacity(node.materials.len());
            for (material_index, material) in node.materials.iter().enumerate() {
                let context = format!("node '{}', renderer {renderer_index}, material {material_index}", node.id);
                let Some(material) = material else {
                    let err = Error::MissingAsset(node.asset.path().to_owned());
                    self.record_skip(&err, &key, profile, Some(context));
                    materials.push(None);
                    continue;
                };
                match self.derive_material(material, profile) {
                    Ok(derived) => {
                        self.collect_registrations(&derived, profile, &mut registrations);
                        materials.push(Some(derived.asset.key));
                    }
                    Err(err) => {
                        self.record_skip(&err, &key, profile, Some(format!("{context}, {material}")));
                        materials.push(Some(material.key.clone()));
                    }
                }
            }
            rewired.insert(node.id.clone(), materials);
            renderer_index += 1;
        }

        let derived = AssetRef::graph(naming::derive_variant_path(original.asset.path(), &profile.suffix)?);
        let outcome = if self.store.exists(&derived.key) {
            Outcome::Updated
        } else {
            Outcome::Created
        };
        let name = match outcome {
            Outcome::Updated => self.store.load(&derived.key)?.into_graph(&derived.key)?.name,
            _ => naming::derive_variant_name(&graph.name, &profile.suffix),
        };
        let mut data = GraphAsset {
            name,
            variant_of: Some(VariantTag::new(&key, profile)),
            ..graph
        };
        for (id, materials) in rewired {
            match data.nodes.get_mut(&id).and_then(|node| node.renderer.as_mut()) {
                Some(renderer) => renderer.materials = materials,
                None => warn!("Node '{id}' of {key} has no renderer to rewire"),
            }
        }
        if outcome == Outcome::Created {
            self.store.copy(&key, &derived.key)?;
        }
        self.store.save(&derived.key, &Asset::Graph(data))?;

        register_and_label(&mut *self.store, target_group, &derived.key, &key, profile.label())?;
        for (asset, origin) in registrations {
            if let Err(err) = register_and_label(&mut *self.store, target_group, &asset, &origin, profile.label()) {
                self.record_skip(&err, &asset, profile, Some(format!("registration in group '{}'", target_group.name)));
            }
        }

        info! {
            "{} {derived} for '{}' in group '{}'",
            if outcome == Outcome::Created { "Created" } else { "Updated" },
            profile.name,
            target_group.name
        };
        self.memo.insert(&key, &profile.name, derived.clone());
        self.record(&original.asset, profile, &derived, outcome);
        GraphNode::load(&*self.store, &derived.key)
    }

    fn derive_material(&mut self, material: &AssetRef, profile: &VariantProfile) -> Result<MaterialNode> {
        let original = MaterialNode::load(&*self.store, &material.key, &profile.slot_rules)?;
        self.materialize_material(&original, profile)
    }

    /// Collects the derived material and its derived textures together with the assets they were derived from.
    fn collect_registrations(
        &self,
        derived: &MaterialNode,
        profile: &VariantProfile,
        registrations: &mut BTreeSet<(AssetKey, AssetKey)>,
    ) {
        for asset in std::iter::once(&derived.asset).chain(derived.textures()) {
            if let Some(origin) = self.origin_of(asset, profile) {
                registrations.insert((asset.key.clone(), origin));
            }
        }
    }

    /// The original of `asset` when it's a variant for `profile`. A variant without a tag is its own origin.
    fn origin_of(&self, asset: &AssetRef, profile: &VariantProfile) -> Option<AssetKey> {
        let tag = self
            .store
            .load(&asset.key)
            .ok()
            .and_then(|stored| stored.variant_of().cloned());
        match tag {
            Some(tag) if tag.profile == profile.name => Some(tag.original),
            Some(_) => None,
            None if naming::is_variant(asset.path(), &profile.suffix) => Some(asset.key.clone()),
            None => None,
        }
    }

    fn unchanged_graph(
        &mut self,
        original: &GraphNode,
        profile: &VariantProfile,
        target_group: &mut DistributionGroup,
    ) -> Result<GraphNode> {
        let key = &original.asset.key;
        if self.memo.get(key, &profile.name).is_none() {
            trace!("{} already is a variant for '{}'", original.asset, profile.name);
            self.memo.insert(key, &profile.name, original.asset.clone());
            self.record(&original.asset, profile, &original.asset, Outcome::Unchanged);
        }
        register_and_label(&mut *self.store, target_group, key, key, profile.label())?;
        Ok(original.clone())
    }
}
