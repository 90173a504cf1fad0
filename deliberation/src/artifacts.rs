//! Rendered-artifact naming and basename-only lookup.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Track;
use crate::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Long-form document combining every stage output.
    Dossier,
    /// Condensed verdict-and-metrics document.
    Summary,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [Self::Dossier, Self::Summary];
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dossier => write!(f, "Dossier"),
            Self::Summary => write!(f, "ExecutiveSummary"),
        }
    }
}

/// `<product>_<Company_Name>_<TRACK>_<Kind>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn artifact_filename(
    product: &str,
    target: &Target,
    track: Track,
    kind: DocumentKind,
    at: NaiveDateTime,
    ext: &str,
) -> String {
    format!(
        "{}_{}_{}_{}_{}.{}",
        product.trim(),
        target.file_stem(),
        track.label(),
        kind,
        at.format("%Y%m%d_%H%M%S"),
        ext.trim_start_matches('.'),
    )
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    #[error("artifact not found: {0}")]
    NotFound(String),
}

/// Directory of rendered documents. Lookups never leave it.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a bare filename to a file inside the store.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::InvalidName`] for anything other than a plain
    /// basename, [`ArtifactError::NotFound`] when no such file exists.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        if !is_basename(name) {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        let path = self.root.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ArtifactError::NotFound(name.to_string()))
        }
    }
}

fn is_basename(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    if name.contains(['/', '\\', '\0']) || name.starts_with('.') {
        return false;
    }
    Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn filename_is_deterministic() {
        let target = Target::parse("https://www.acme-corp.io").unwrap();
        let name = artifact_filename("ALLYVEX", &target, Track::Partner, DocumentKind::Summary, at(), "md");
        assert_eq!(name, "ALLYVEX_Acme_Corp_PARTNER_ExecutiveSummary_20260309_140507.md");
    }

    #[test]
    fn resolve_finds_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.md"), "# hi").unwrap();
        let store = ArtifactStore::new(dir.path());
        assert_eq!(store.resolve("report.md").unwrap(), dir.path().join("report.md"));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        for bad in ["../etc/passwd", "a/b.md", "..", "", "..\\x", ".hidden", "/abs.md"] {
            assert_eq!(
                store.resolve(bad),
                Err(ArtifactError::InvalidName(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn resolve_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert_eq!(
            store.resolve("nope.md"),
            Err(ArtifactError::NotFound("nope.md".into()))
        );
    }

    #[test]
    fn directories_are_not_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.resolve("sub"), Err(ArtifactError::NotFound(_))));
    }
}
