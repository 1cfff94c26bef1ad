use prism_shared::log::{error, warn};

use crate::{
    memo::VariantMemo,
    report::{Materialized, Outcome, PipelineReport, Skip, SkipKind},
    AssetKey, AssetRef, AssetStore, Error, VariantProfile,
};

/// Produces the variants of textures, materials and graphs.
///
/// The materializer remembers every variant it produced so that an asset that is
/// shared between several materials or graphs is only materialized once per profile.
/// Recoverable failures below the level of a graph are collected in the report.
pub struct Materializer<'a> {
    pub(crate) store: &'a mut dyn AssetStore,
    pub(crate) memo: VariantMemo,
    pub(crate) report: PipelineReport,
    texture_extensions: Vec<String>,
}

impl<'a> Materializer<'a> {
    /// Creates a new [`Materializer`] that accepts textures with the given extensions.
    pub fn new<S: AsRef<str>>(store: &'a mut dyn AssetStore, texture_extensions: &[S]) -> Self {
        Self {
            store,
            memo: VariantMemo::new(),
            report: PipelineReport::new(),
            texture_extensions: texture_extensions
                .iter()
                .map(|extension| extension.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    pub fn memo(&self) -> &VariantMemo {
        &self.memo
    }

    pub fn into_report(self) -> PipelineReport {
        self.report
    }

    pub(crate) fn accepts_texture_extension(&self, extension: &str) -> bool {
        self.texture_extensions.iter().any(|accepted| accepted == extension)
    }

    pub(crate) fn record(&mut self, original: &AssetRef, profile: &VariantProfile, derived: &AssetRef, outcome: Outcome) {
        self.report
            .materialized
            .push(Materialized::new(original.clone(), profile.name.clone(), derived.clone(), outcome));
    }

    /// Logs the error and adds it to the report.
    pub(crate) fn record_skip(&mut self, error: &Error, asset: &AssetKey, profile: &VariantProfile, context: Option<String>) {
        let skip = Skip::new(error, asset, &profile.name, context);
        match skip.kind {
            SkipKind::StoreFailure => error!("Skipped {skip}"),
            _ => warn!("Skipped {skip}"),
        }
        self.report.skips.push(skip);
    }
}
