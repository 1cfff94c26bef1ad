use std::{collections::BTreeSet, fs};

use prism_content::{
    group::GROUPS_FILE_NAME, profile, Asset, AssetKey, AssetStore, FileSystemStore, GraphAsset, GroupStore, Groups,
    MaterialAsset, MemoryAssetStore, Outcome, SceneNode, SkipKind, SlotKind, Strategy, TextureAsset, TextureFormat,
};
use prism_shared::maplit::btreeset;
use prism_test::{setup_logger, spectral::prelude::*};
use tempdir::TempDir;

/// G.prefab → M.mat → T.png and N.png, with G in the group "Default".
fn file_system_store() -> (TempDir, FileSystemStore, Groups) {
    setup_logger();
    let root = TempDir::new("prism").unwrap();
    fs::write(root.path().join("T.png"), b"\x89PNG albedo").unwrap();
    fs::write(root.path().join("N.png"), b"\x89PNG normal").unwrap();
    let mut store = FileSystemStore::new(root.path()).unwrap();

    let material = MaterialAsset::new("M")
        .with_texture("_MainTex", "T.png")
        .with_texture("_BumpMap", "N.png");
    store.save(&"M.mat".into(), &Asset::Material(material)).unwrap();
    let graph = GraphAsset::new("G", "root", SceneNode::new("G"))
        .with_child("root", "body", SceneNode::new("Body").with_materials([Some("M.mat".into())]));
    store.save(&"G.prefab".into(), &Asset::Graph(graph)).unwrap();
    for key in ["G.prefab", "M.mat", "T.png"] {
        store.set_label(&key.into(), "A").unwrap();
        store.set_label(&key.into(), "B").unwrap();
    }

    let mut groups = Groups::new();
    groups.find_or_create_group("Default").add_member(&"G.prefab".into());
    (root, store, groups)
}

fn run(store: &mut dyn AssetStore, groups: &mut Groups, strategy: Strategy) -> prism_content::PipelineReport {
    let profiles = profile::default_profiles();
    let working_set = prism_content::collect_working_set(&*store, &*groups, &profiles).unwrap();
    prism_content::run_variant_pipeline(store, groups, &profiles, &working_set, strategy)
}

fn labels(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[test]
fn end_to_end_non_destructive() {
    let (root, mut store, mut groups) = file_system_store();
    let report = run(&mut store, &mut groups, Strategy::NonDestructive);
    assert!(report.is_clean(), "{report}");

    for (profile, suffix, format) in [("Desktop", "_DXT", TextureFormat::Dxt5), ("Mobile", "_ASTC", TextureFormat::Astc4x4)] {
        let graph_key = AssetKey::new(format!("G{suffix}.prefab"));
        let material_key = AssetKey::new(format!("M{suffix}.mat"));
        let texture_key = AssetKey::new(format!("T{suffix}.png"));
        let normal_key = AssetKey::new(format!("N{suffix}.png"));

        let graph = store.load(&graph_key).unwrap().into_graph(&graph_key).unwrap();
        assert_eq!(graph.nodes["body"].renderer.as_ref().unwrap().materials, vec![Some(material_key.clone())]);
        let material = store.load(&material_key).unwrap().into_material(&material_key).unwrap();
        assert_eq!(material.textures["_MainTex"], Some(texture_key.clone()));
        assert_eq!(material.textures["_BumpMap"], Some(normal_key.clone()));

        let texture = store.load(&texture_key).unwrap().into_texture(&texture_key).unwrap();
        assert!(texture.import.compressed);
        assert_eq!(texture.import.format, Some(format));
        assert_eq!(texture.import.kind, SlotKind::Default);
        let normal = store.load(&normal_key).unwrap().into_texture(&normal_key).unwrap();
        assert_eq!(normal.import.kind, SlotKind::NormalMap);
        assert_eq!(fs::read(root.path().join(texture_key.as_path())).unwrap(), b"\x89PNG albedo");

        let group = groups.group(profile).unwrap();
        assert_eq!(group.members, btreeset! {graph_key.clone(), material_key.clone(), texture_key.clone(), normal_key.clone()});
        assert_eq!(store.labels(&graph_key).unwrap(), labels(&["A", "B", profile]));
        assert_eq!(store.labels(&texture_key).unwrap(), labels(&["A", "B", profile]));
        assert_eq!(store.labels(&normal_key).unwrap(), labels(&[profile]));
        assert_eq!(group.labels_of(&material_key), Some(&labels(&["A", "B", profile])));
    }

    // Originals are untouched.
    for key in ["G.prefab", "M.mat", "T.png", "N.png"] {
        assert!(store.exists(&key.into()), "{key}");
    }
    assert_eq!(store.labels(&"G.prefab".into()).unwrap(), labels(&["A", "B"]));
    assert!(groups.group("Default").unwrap().contains(&"G.prefab".into()));

    groups.save(root.path().join(GROUPS_FILE_NAME)).unwrap();
    assert_eq!(Groups::load(root.path().join(GROUPS_FILE_NAME)).unwrap(), groups);
}

#[test]
fn second_run_changes_nothing() {
    let (_root, mut store, mut groups) = file_system_store();
    run(&mut store, &mut groups, Strategy::NonDestructive);
    let keys = store.keys().unwrap();
    let groups_after_first_run = groups.clone();

    let report = run(&mut store, &mut groups, Strategy::NonDestructive);
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.count(Outcome::Created), 0);
    assert_eq!(report.count(Outcome::Reused), 4);
    assert_eq!(store.keys().unwrap(), keys);
    assert_eq!(groups, groups_after_first_run);
    assert_that(&keys.iter().filter(|key| key.as_str().contains("_DXT_") || key.as_str().contains("_ASTC_")).count())
        .is_equal_to(0);
}

#[test]
fn end_to_end_destructive() {
    let (_root, mut store, mut groups) = file_system_store();
    let report = run(&mut store, &mut groups, Strategy::Destructive);
    assert!(report.is_clean(), "{report}");
    assert_eq!(
        report.deleted.iter().cloned().collect::<BTreeSet<_>>(),
        btreeset! {AssetKey::new("G.prefab"), AssetKey::new("M.mat"), AssetKey::new("T.png"), AssetKey::new("N.png")}
    );
    for key in ["G.prefab", "M.mat", "T.png", "N.png"] {
        assert!(!store.exists(&key.into()), "{key}");
    }
    for key in ["G_DXT.prefab", "G_ASTC.prefab", "M_DXT.mat", "T_ASTC.png"] {
        assert!(store.exists(&key.into()), "{key}");
    }
    assert!(groups.group("Default").unwrap().members.is_empty());
    assert_eq!(groups.group("Desktop").unwrap().members.len(), 4);
}

#[test]
fn scenes_and_shared_materials() {
    setup_logger();
    let mut store = MemoryAssetStore::new();
    store
        .insert("T.png", Asset::Texture(TextureAsset::default()))
        .insert("M.mat", Asset::Material(MaterialAsset::new("M").with_texture("_MainTex", "T.png")))
        .insert(
            "Level.unity",
            Asset::Graph(GraphAsset::new("Level", "0", SceneNode::new("Level").with_materials([Some("M.mat".into())]))),
        )
        .insert(
            "Prop.prefab",
            Asset::Graph(GraphAsset::new("Prop", "0", SceneNode::new("Prop").with_materials([Some("M.mat".into()), None]))),
        );
    let mut groups = Groups::new();
    let report = run(&mut store, &mut groups, Strategy::NonDestructive);

    assert!(store.exists(&"Level_DXT.unity".into()));
    assert!(store.exists(&"Prop_ASTC.prefab".into()));
    assert_eq!(store.statistics().copies, 2 + 4);
    assert_eq!(store.statistics().reimports, 2);
    assert_eq!(report.skips_of_kind(SkipKind::MissingAsset).count(), 2);
    assert_eq!(report.skips.len(), 2);
}
