//! Runs the materializers for a working set of graphs and a list of profiles.

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use prism_shared::log::{error, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    common::extract_extension_from_path,
    group::{label_members, GroupStore},
    materializer::Materializer,
    naming,
    nodes::{GraphNode, MaterialNode},
    profile,
    report::{PipelineReport, Skip},
    AssetKey, AssetKind, AssetStore, Error, Result, VariantProfile,
};

/// What happens to the originals after their variants were created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Originals that were materialized for every profile without a skip are removed.
    Destructive,
    #[default]
    NonDestructive,
}

fn default_graph_extensions() -> Vec<String> {
    vec!["prefab".to_owned(), "unity".to_owned()]
}

fn default_texture_extensions() -> Vec<String> {
    vec!["png".to_owned(), "jpg".to_owned(), "jpeg".to_owned()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "profile::default_profiles")]
    pub profiles: Vec<VariantProfile>,
    #[serde(default)]
    pub strategy: Strategy,
    /// Extensions of the group members that are taken into the working set.
    #[serde(default = "default_graph_extensions")]
    pub graph_extensions: Vec<String>,
    /// Extensions of the textures that are compressed.
    #[serde(default = "default_texture_extensions")]
    pub texture_extensions: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profiles: profile::default_profiles(),
            strategy: Strategy::default(),
            graph_extensions: default_graph_extensions(),
            texture_extensions: default_texture_extensions(),
        }
    }
}

impl PipelineConfig {
    /// Reads the configuration from a YAML file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|_| Error::InvalidAssetData(path.to_owned()))?;
        config.validate()?;
        info!("Loaded pipeline configuration from '{}'", path.display());
        Ok(config)
    }

    /// Checks every profile and that no two profiles share a name or a suffix.
    pub fn validate(&self) -> Result<()> {
        let mut names = BTreeSet::new();
        let mut suffixes = BTreeSet::new();
        for profile in &self.profiles {
            profile.validate()?;
            if !names.insert(profile.name.as_str()) {
                return Err(Error::Other(format!("profile '{}' is configured twice", profile.name).into()));
            }
            if !suffixes.insert(profile.suffix.as_str()) {
                return Err(Error::Other(
                    format!("suffix '{}' of profile '{}' is used by another profile", profile.suffix, profile.name).into(),
                ));
            }
        }
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&VariantProfile> {
        self.profiles.iter().find(|profile| profile.name == name)
    }

    /// Names of the groups that receive variants.
    pub fn profile_groups(&self) -> BTreeSet<String> {
        self.profiles.iter().map(|profile| profile.group().to_owned()).collect()
    }

    fn is_graph_extension(&self, extension: &str) -> bool {
        self.graph_extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(extension))
    }

    fn is_variant_of_any_profile(&self, key: &AssetKey) -> bool {
        self.profiles
            .iter()
            .any(|profile| naming::is_variant(key.as_path(), &profile.suffix))
    }
}

/// Stops a running pipeline before the next graph is processed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct VariantPipeline {
    config: PipelineConfig,
    cancellation: CancellationToken,
}

impl VariantPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Graphs that are members of a group which doesn't belong to a profile.
    ///
    /// When no such group has any members, all graphs of the store are taken.
    pub fn collect_working_set(&self, store: &dyn AssetStore, groups: &dyn GroupStore) -> Result<Vec<AssetKey>> {
        let profile_groups = self.config.profile_groups();
        let mut candidates = BTreeSet::new();
        for name in groups.group_names() {
            if profile_groups.contains(&name) {
                trace!("Group '{name}' belongs to a profile and is not part of the working set");
                continue;
            }
            if let Some(group) = groups.group(&name) {
                candidates.extend(group.members.iter().cloned());
            }
        }
        if candidates.is_empty() {
            info!("No group has any members, taking all graphs of the store");
            candidates.extend(store.keys()?);
        }
        let working_set = candidates
            .into_iter()
            .filter(|key| {
                extract_extension_from_path(key.as_path())
                    .map(|extension| self.config.is_graph_extension(&extension))
                    .unwrap_or(false)
            })
            .filter(|key| !self.config.is_variant_of_any_profile(key))
            .collect::<Vec<_>>();
        info!("Working set contains {} graphs", working_set.len());
        Ok(working_set)
    }

    /// Materializes every graph of `working_set` for every profile.
    ///
    /// Failures are collected in the returned report and never abort the run.
    pub fn run(&self, store: &mut dyn AssetStore, groups: &mut dyn GroupStore, working_set: &[AssetKey]) -> PipelineReport {
        let mut profiles = Vec::with_capacity(self.config.profiles.len());
        let mut invalid_profiles = Vec::new();
        for profile in &self.config.profiles {
            match profile.validate() {
                Ok(()) => profiles.push(profile.clone()),
                Err(err) => {
                    error!("Profile '{}' is invalid: {err}", profile.name);
                    invalid_profiles.push(Skip::new(&err, &AssetKey::new(""), &profile.name, Some("profile".to_owned())));
                }
            }
        }

        let mut materializer = Materializer::new(&mut *store, self.config.texture_extensions.as_slice());
        materializer.report.skips.extend(invalid_profiles);
        let mut complete = Vec::new();
        for (index, key) in working_set.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                warn!("Pipeline was cancelled with {} graphs left", working_set.len() - index);
                materializer.report.cancelled = true;
                materializer.report.unprocessed = working_set[index..].to_vec();
                break;
            }
            info!("Processing {key} ({}/{})", index + 1, working_set.len());
            let original = match GraphNode::load(&*materializer.store, key) {
                Ok(original) => original,
                Err(err) => {
                    for profile in &profiles {
                        materializer.record_skip(&err, key, profile, None);
                    }
                    continue;
                }
            };
            let mut is_complete = true;
            for profile in &profiles {
                let skips_before = materializer.report.skips.len();
                let group = groups.find_or_create_group(profile.group());
                if let Err(err) = materializer.materialize_graph(&original, profile, group) {
                    materializer.record_skip(&err, key, profile, None);
                }
                is_complete &= materializer.report.skips.len() == skips_before;
            }
            if is_complete {
                complete.push(original);
            }
        }
        let mut report = materializer.into_report();

        let label_failures = label_group_members(store, groups, &profiles);
        report.skips.extend(label_failures);

        if self.config.strategy == Strategy::Destructive && !report.cancelled {
            let deleted = self.delete_originals(store, groups, &complete, &report);
            report.deleted = deleted;
        }
        info!("Pipeline finished: {}", report.to_string().trim_end());
        report
    }

    /// Removes the originals of the complete graphs together with the materials and textures
    /// that no other original graph and no other material uses.
    fn delete_originals(
        &self,
        store: &mut dyn AssetStore,
        groups: &mut dyn GroupStore,
        complete: &[GraphNode],
        report: &PipelineReport,
    ) -> Vec<AssetKey> {
        let complete_keys = complete.iter().map(|graph| graph.asset.key.clone()).collect::<BTreeSet<_>>();
        let mut candidates = BTreeSet::new();
        for graph in complete {
            candidates.extend(self.originals_of(&*store, graph));
        }

        // Everything that an original outside of the complete graphs still uses is kept.
        let all_keys = match store.keys() {
            Ok(keys) => keys,
            Err(err) => {
                error!("Failed to list the store, keeping all originals: {err}");
                return Vec::new();
            }
        };
        let mut kept = BTreeSet::new();
        for key in &all_keys {
            match AssetKind::from_path(key.as_path()) {
                Ok(AssetKind::Graph) if !complete_keys.contains(key) && !self.config.is_variant_of_any_profile(key) => {
                    match GraphNode::load(&*store, key) {
                        Ok(graph) => kept.extend(self.originals_of(&*store, &graph)),
                        Err(_) => {
                            kept.insert(key.clone());
                        }
                    }
                }
                // Materials outside of the complete graphs, variants included, keep their textures.
                Ok(AssetKind::Material) if !candidates.contains(key) => {
                    match MaterialNode::load(&*store, key, &Default::default()) {
                        Ok(material) => kept.extend(material.textures().map(|texture| texture.key.clone())),
                        Err(err) => trace!("Can't read the textures of {key}: {err}"),
                    }
                }
                _ => {}
            }
        }
        let derived = report
            .materialized
            .iter()
            .map(|materialized| materialized.derived.key.clone())
            .collect::<BTreeSet<_>>();

        let profile_groups = self.config.profile_groups();
        let mut deleted = Vec::new();
        for key in candidates.difference(&kept) {
            if derived.contains(key) || !store.exists(key) {
                continue;
            }
            if let Err(err) = store.delete(key) {
                error!("Failed to delete the original {key}: {err}");
                continue;
            }
            for name in groups.group_names() {
                if profile_groups.contains(&name) {
                    continue;
                }
                if let Some(group) = groups.group_mut(&name) {
                    if group.remove_member(key) {
                        trace!("Removed {key} from group '{name}'");
                    }
                }
            }
            deleted.push(key.clone());
        }
        info!("Deleted {} originals", deleted.len());
        deleted
    }

    /// The graph, its materials and their textures without the assets that are variants themselves.
    fn originals_of(&self, store: &dyn AssetStore, graph: &GraphNode) -> BTreeSet<AssetKey> {
        let mut originals = BTreeSet::new();
        originals.insert(graph.asset.key.clone());
        for material in graph.iter().flat_map(|node| node.materials.iter().flatten()) {
            originals.insert(material.key.clone());
            match MaterialNode::load(store, &material.key, &Default::default()) {
                Ok(material) => originals.extend(material.textures().map(|texture| texture.key.clone())),
                Err(err) => trace!("Can't read the textures of {material}: {err}"),
            }
        }
        originals.retain(|key| {
            let is_tagged = store
                .load(key)
                .map(|asset| asset.variant_of().is_some())
                .unwrap_or(false);
            !is_tagged && !self.config.is_variant_of_any_profile(key)
        });
        originals
    }
}

/// Gives every member of every profile group the label of its profile.
pub fn label_group_members(
    store: &mut dyn AssetStore,
    groups: &mut dyn GroupStore,
    profiles: &[VariantProfile],
) -> Vec<Skip> {
    let mut skips = Vec::new();
    for profile in profiles {
        let Some(group) = groups.group_mut(profile.group()) else {
            continue;
        };
        for (key, err) in label_members(&mut *store, group, profile.label()) {
            skips.push(Skip::new(&err, &key, &profile.name, Some(format!("labeling group '{}'", profile.group()))));
        }
    }
    skips
}

/// Materializes `working_set` for `profiles` with the default configuration and the given strategy.
pub fn run_variant_pipeline(
    store: &mut dyn AssetStore,
    groups: &mut dyn GroupStore,
    profiles: &[VariantProfile],
    working_set: &[AssetKey],
    strategy: Strategy,
) -> PipelineReport {
    let config = PipelineConfig {
        profiles: profiles.to_vec(),
        strategy,
        ..Default::default()
    };
    VariantPipeline::new(config).run(store, groups, working_set)
}

/// All graphs of non-profile groups with the default configuration for `profiles`.
pub fn collect_working_set(store: &dyn AssetStore, groups: &dyn GroupStore, profiles: &[VariantProfile]) -> Result<Vec<AssetKey>> {
    let config = PipelineConfig {
        profiles: profiles.to_vec(),
        ..Default::default()
    };
    VariantPipeline::new(config).collect_working_set(store, groups)
}
