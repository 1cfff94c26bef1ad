//! Distribution groups bundle the assets that are shipped together. Every profile
//! registers its variants in a group of its own and labels them with its name.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use prism_shared::log::{info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{AssetKey, AssetStore, Error, Result};

pub const GROUPS_FILE_NAME: &str = "groups.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionGroup {
    pub name: String,
    #[serde(default)]
    pub members: BTreeSet<AssetKey>,
    #[serde(default)]
    pub labels: BTreeMap<AssetKey, BTreeSet<String>>,
}

impl DistributionGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds `key` to the group. Returns `false` when it was already a member.
    pub fn add_member(&mut self, key: &AssetKey) -> bool {
        self.members.insert(key.clone())
    }

    /// Removes `key` and its labels from the group. Returns `false` when it wasn't a member.
    pub fn remove_member(&mut self, key: &AssetKey) -> bool {
        self.labels.remove(key);
        self.members.remove(key)
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.members.contains(key)
    }

    /// Records `label` for `key`. Returns `false` when the label was already recorded.
    pub fn add_label(&mut self, key: &AssetKey, label: &str) -> bool {
        self.labels.entry(key.clone()).or_default().insert(label.to_owned())
    }

    pub fn labels_of(&self, key: &AssetKey) -> Option<&BTreeSet<String>> {
        self.labels.get(key)
    }
}

/// Where the distribution groups are kept.
pub trait GroupStore {
    /// Returns the group with the given name and creates it when it doesn't exist yet.
    fn find_or_create_group(&mut self, name: &str) -> &mut DistributionGroup;

    fn group(&self, name: &str) -> Option<&DistributionGroup>;

    fn group_mut(&mut self, name: &str) -> Option<&mut DistributionGroup>;

    /// Names of all groups in ascending order.
    fn group_names(&self) -> Vec<String>;
}

/// [`GroupStore`] that can be persisted as a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Groups {
    groups: BTreeMap<String, DistributionGroup>,
}

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the groups from `path`. A missing file is an empty set of groups.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No group file at '{}', starting without groups", path.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidAssetData(path.to_owned()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|err| Error::Other(Box::new(err)))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistributionGroup> {
        self.groups.values()
    }
}

impl GroupStore for Groups {
    fn find_or_create_group(&mut self, name: &str) -> &mut DistributionGroup {
        self.groups.entry(name.to_owned()).or_insert_with(|| {
            info!("Creating distribution group '{name}'");
            DistributionGroup::new(name)
        })
    }

    fn group(&self, name: &str) -> Option<&DistributionGroup> {
        self.groups.get(name)
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut DistributionGroup> {
        self.groups.get_mut(name)
    }

    fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }
}

/// Registers `asset` in `group` and gives it the labels of `original` plus `profile_label`.
///
/// Labels and membership are set unions, so registering an asset again doesn't change anything.
pub fn register_and_label(
    store: &mut dyn AssetStore,
    group: &mut DistributionGroup,
    asset: &AssetKey,
    original: &AssetKey,
    profile_label: &str,
) -> Result<()> {
    let mut labels = store.labels(original)?;
    labels.insert(profile_label.to_owned());
    for label in &labels {
        store.set_label(asset, label)?;
        group.add_label(asset, label);
    }
    if group.add_member(asset) {
        trace!("Registered {asset} in group '{}' with labels {labels:?}", group.name);
    }
    Ok(())
}

/// Gives every member of `group` the label `label`. Members that can't be labeled are returned with their error.
pub fn label_members(store: &mut dyn AssetStore, group: &mut DistributionGroup, label: &str) -> Vec<(AssetKey, Error)> {
    let mut failures = Vec::new();
    let members = group.members.iter().cloned().collect::<Vec<_>>();
    for member in members {
        match store.set_label(&member, label) {
            Ok(()) => {
                group.add_label(&member, label);
            }
            Err(err) => {
                warn!("Failed to label {member} with '{label}' in group '{}': {err}", group.name);
                failures.push((member, err));
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use prism_shared::{function_name, maplit::btreeset};
    use prism_test::{create_test_result_folder_for_function, setup_logger, spectral::prelude::*};

    use crate::{Asset, MemoryAssetStore, TextureAsset};

    use super::*;

    fn store() -> MemoryAssetStore {
        let mut store = MemoryAssetStore::new();
        store
            .insert_labeled("T.png", Asset::Texture(TextureAsset::default()), ["A", "B"])
            .insert("T_ASTC.png", Asset::Texture(TextureAsset::default()));
        store
    }

    #[test]
    fn labels_are_propagated_once() {
        setup_logger();
        let mut store = store();
        let mut group = DistributionGroup::new("Mobile");
        let asset = AssetKey::new("T_ASTC.png");
        let original = AssetKey::new("T.png");
        for _ in 0..3 {
            register_and_label(&mut store, &mut group, &asset, &original, "Mobile").unwrap();
        }
        let expected = btreeset! {"A".to_owned(), "B".to_owned(), "Mobile".to_owned()};
        assert_eq!(store.labels(&asset).unwrap(), expected);
        assert_eq!(group.labels_of(&asset), Some(&expected));
        assert_that(&group.members.iter().collect::<Vec<_>>()).has_length(1);
        // The original keeps its labels.
        assert_eq!(store.labels(&original).unwrap(), btreeset! {"A".to_owned(), "B".to_owned()});
    }

    #[test]
    fn register_with_missing_original_fails() {
        let mut store = store();
        let mut group = DistributionGroup::new("Mobile");
        let result = register_and_label(&mut store, &mut group, &"T_ASTC.png".into(), &"Gone.png".into(), "Mobile");
        assert!(matches!(result, Err(Error::MissingAsset(_))));
        assert!(group.members.is_empty());
    }

    #[test]
    fn find_or_create_group_creates_once() {
        let mut groups = Groups::new();
        groups.find_or_create_group("Desktop").add_member(&"G_DXT.prefab".into());
        groups.find_or_create_group("Desktop").add_member(&"G_DXT.prefab".into());
        assert_eq!(groups.group_names(), vec!["Desktop".to_owned()]);
        assert_eq!(groups.group("Desktop").unwrap().members.len(), 1);
        assert!(groups.group("Mobile").is_none());
    }

    #[test]
    fn label_members_reports_failures() {
        let mut store = store();
        let mut group = DistributionGroup::new("Mobile");
        group.add_member(&"T_ASTC.png".into());
        group.add_member(&"Gone.png".into());
        let failures = label_members(&mut store, &mut group, "Mobile");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, AssetKey::new("Gone.png"));
        assert!(store.labels(&"T_ASTC.png".into()).unwrap().contains("Mobile"));
    }

    #[test]
    fn remove_member_drops_labels() {
        let mut group = DistributionGroup::new("Default");
        let key = AssetKey::new("G.prefab");
        group.add_member(&key);
        group.add_label(&key, "A");
        assert!(group.remove_member(&key));
        assert!(group.labels_of(&key).is_none());
        assert!(!group.remove_member(&key));
    }

    #[test]
    fn groups_yaml_roundtrip() {
        let folder = create_test_result_folder_for_function(function_name!());
        let path = folder.join(GROUPS_FILE_NAME);
        let mut groups = Groups::new();
        let group = groups.find_or_create_group("Default");
        group.add_member(&"Prefabs/G.prefab".into());
        group.add_label(&"Prefabs/G.prefab".into(), "Characters");
        groups.save(&path).unwrap();
        assert_eq!(Groups::load(&path).unwrap(), groups);
        assert_eq!(Groups::load(folder.join("missing.yaml")).unwrap(), Groups::new());
    }
}
