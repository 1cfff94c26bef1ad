//! # Overview
//!
//! Crate for creating the [platform variants](VariantProfile) of bundled assets.
//!
//! The input is a set of composite assets: graphs (prefabs and scenes) whose
//! renderers reference materials, which in turn reference textures. For every
//! configured profile the [`VariantPipeline`] derives one copy of each graph,
//! recompresses its textures with the settings of the profile, points the copied
//! materials at the new textures and the copied graph at the new materials.
//! The results are registered in the distribution group of the profile.
//!
//! ## Example:
//!
//! **Before:**
//!
//! ```text
//! Assets/
//! ├─ Hero.prefab        → Hero.mat
//! ├─ Hero.mat           → Hero.png, Hero_Normal.png
//! ├─ Hero.png
//! ├─ Hero_Normal.png
//! ```
//!
//! **After** running the default profiles:
//!
//! ```text
//! Assets/
//! ├─ Hero.prefab
//! ├─ Hero_DXT.prefab    → Hero_DXT.mat       (group "Desktop")
//! ├─ Hero_ASTC.prefab   → Hero_ASTC.mat      (group "Mobile")
//! ├─ Hero_DXT.mat       → Hero_DXT.png, Hero_Normal_DXT.png
//! ├─ Hero_ASTC.mat      → Hero_ASTC.png, Hero_Normal_ASTC.png
//! ├─ ...
//! ```
//!
//! # Components
//!
//! Assets are accessed through the [`AssetStore`] trait. [`FileSystemStore`] keeps
//! them in a directory and [`MemoryAssetStore`] in memory. The [`Materializer`]
//! derives single textures, materials and graphs and the [`VariantPipeline`] runs
//! it for a whole working set. Every run returns a [`PipelineReport`].

mod asset_store;
mod common;
mod file_system_store;
mod graph_variant;
mod material_variant;
mod materializer;
mod memory_store;
mod texture_variant;

pub mod asset;
pub mod group;
pub mod memo;
pub mod naming;
pub mod nodes;
pub mod pipeline;
pub mod profile;
pub mod report;

pub use asset::{Asset, GraphAsset, MaterialAsset, PropertyValue, Renderer, SceneNode, TextureAsset, TextureImportSettings, VariantTag};
pub use asset_store::AssetStore;
pub use common::{AssetKey, AssetKind, AssetRef, Error, Result, SlotKind, GRAPH_EXTENSIONS, MATERIAL_EXTENSIONS, TEXTURE_EXTENSIONS};
pub use file_system_store::FileSystemStore;
pub use group::{DistributionGroup, GroupStore, Groups};
pub use materializer::Materializer;
pub use memory_store::{MemoryAssetStore, StoreStatistics};
pub use pipeline::{collect_working_set, run_variant_pipeline, CancellationToken, PipelineConfig, Strategy, VariantPipeline};
pub use profile::{SlotRules, TextureFormat, VariantProfile};
pub use report::{Outcome, PipelineReport, Skip, SkipKind};
