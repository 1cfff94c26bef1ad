//! Outcome of a pipeline run.

use std::fmt::{self, Formatter};

use prism_shared::{derive_new::new, itertools::Itertools};

use crate::{AssetKey, AssetRef, Error};

/// What happened to the derived asset of one (original, profile) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The derived asset didn't exist and was created.
    Created,
    /// The derived asset already existed and was reused as it is.
    Reused,
    /// The derived asset already existed and was overwritten from the original.
    Updated,
    /// The original already is a variant for the profile.
    Unchanged,
}

#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub original: AssetRef,
    pub profile: String,
    pub derived: AssetRef,
    pub outcome: Outcome,
}

/// Category of a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipKind {
    InvalidPath,
    MissingAsset,
    Conflict,
    StoreFailure,
}

impl From<&Error> for SkipKind {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidPath(_) | Error::InvalidExtension(..) | Error::InvalidSuffix(_) => SkipKind::InvalidPath,
            Error::MissingAsset(_) | Error::UnexpectedKind { .. } => SkipKind::MissingAsset,
            Error::SlotKindConflict { .. } => SkipKind::Conflict,
            Error::InvalidAssetData(_) | Error::IoError(_) | Error::Store { .. } | Error::Other(_) => SkipKind::StoreFailure,
        }
    }
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkipKind::InvalidPath => write!(f, "invalid path"),
            SkipKind::MissingAsset => write!(f, "missing asset"),
            SkipKind::Conflict => write!(f, "conflict"),
            SkipKind::StoreFailure => write!(f, "store failure"),
        }
    }
}

/// A node that was skipped because of a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub kind: SkipKind,
    /// The asset that was being materialized when the failure happened.
    pub asset: AssetKey,
    pub profile: String,
    /// Where in the asset the failure happened, e.g. the slot of a material.
    pub context: Option<String>,
    pub message: String,
}

impl Skip {
    pub fn new(error: &Error, asset: &AssetKey, profile: &str, context: Option<String>) -> Self {
        Self {
            kind: SkipKind::from(error),
            asset: asset.clone(),
            profile: profile.to_owned(),
            context,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} for '{}'", self.kind, self.asset, self.profile)?;
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub materialized: Vec<Materialized>,
    pub skips: Vec<Skip>,
    /// `true` when the run was cancelled before all graphs were processed.
    pub cancelled: bool,
    /// Graphs of the working set that were not processed because the run was cancelled.
    pub unprocessed: Vec<AssetKey>,
    /// Originals that were removed by the destructive strategy.
    pub deleted: Vec<AssetKey>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.skips.is_empty() && !self.cancelled
    }

    pub fn skips_of_kind(&self, kind: SkipKind) -> impl Iterator<Item = &Skip> {
        self.skips.iter().filter(move |skip| skip.kind == kind)
    }

    /// Derived asset of `original` for `profile` when it was materialized in this run.
    pub fn derived_of(&self, original: &AssetKey, profile: &str) -> Option<&AssetRef> {
        self.materialized
            .iter()
            .find(|materialized| &materialized.original.key == original && materialized.profile == profile)
            .map(|materialized| &materialized.derived)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.materialized.iter().filter(|materialized| materialized.outcome == outcome).count()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} created, {} updated, {} reused, {} unchanged, {} skipped, {} deleted",
            self.count(Outcome::Created),
            self.count(Outcome::Updated),
            self.count(Outcome::Reused),
            self.count(Outcome::Unchanged),
            self.skips.len(),
            self.deleted.len()
        )?;
        let skip_counts = self.skips.iter().counts_by(|skip| skip.kind);
        for (kind, count) in skip_counts.into_iter().sorted() {
            writeln!(f, "  {kind}: {count}")?;
        }
        if self.cancelled {
            writeln!(f, "cancelled with {} unprocessed graphs", self.unprocessed.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn skip_kind_from_error() {
        assert_eq!(SkipKind::from(&Error::InvalidSuffix("x".to_owned())), SkipKind::InvalidPath);
        assert_eq!(
            SkipKind::from(&Error::InvalidExtension("txt".to_owned(), PathBuf::from("a.txt"))),
            SkipKind::InvalidPath
        );
        assert_eq!(SkipKind::from(&Error::MissingAsset(PathBuf::from("a.png"))), SkipKind::MissingAsset);
        assert_eq!(
            SkipKind::from(&Error::Store {
                path: PathBuf::from("a.png"),
                message: "disk full".to_owned()
            }),
            SkipKind::StoreFailure
        );
    }

    #[test]
    fn derived_lookup_and_summary() {
        let mut report = PipelineReport::new();
        report.materialized.push(Materialized::new(
            AssetRef::texture("T.png"),
            "Mobile".to_owned(),
            AssetRef::texture("T_ASTC.png"),
            Outcome::Created,
        ));
        report.skips.push(Skip::new(
            &Error::MissingAsset(PathBuf::from("M.mat")),
            &AssetKey::new("G.prefab"),
            "Mobile",
            Some("renderer 1, material 0".to_owned()),
        ));
        assert_eq!(report.derived_of(&"T.png".into(), "Mobile"), Some(&AssetRef::texture("T_ASTC.png")));
        assert_eq!(report.derived_of(&"T.png".into(), "Desktop"), None);
        assert!(!report.is_clean());
        let summary = report.to_string();
        assert!(summary.starts_with("1 created, 0 updated, 0 reused, 0 unchanged, 1 skipped, 0 deleted"));
        assert!(summary.contains("missing asset: 1"));
    }
}
