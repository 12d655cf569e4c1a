use crate::integrations::mrpack::OverrideEntry;
use crate::utils::file_utils;
use log::{error, info};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    Applied,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideReport {
    pub path: PathBuf,
    pub outcome: OverrideOutcome,
}

/// Writes every override into `profile_dir`, replacing existing files
/// unconditionally. Entries are applied in order, so a later entry for the
/// same path wins. A failed write is reported and does not stop the rest.
pub async fn apply_overrides(profile_dir: &Path, overrides: &[OverrideEntry]) -> Vec<OverrideReport> {
    info!(
        "Applying {} overrides to {:?}",
        overrides.len(),
        profile_dir
    );

    let mut reports = Vec::with_capacity(overrides.len());
    for entry in overrides {
        let target_path = profile_dir.join(&entry.path);
        let outcome = match file_utils::write_file(&target_path, &entry.content).await {
            Ok(()) => {
                info!("{} (override applied)", entry.path.display());
                OverrideOutcome::Applied
            }
            Err(e) => {
                error!("Failed to apply override {}: {}", entry.path.display(), e);
                OverrideOutcome::Failed(e.to_string())
            }
        };
        reports.push(OverrideReport {
            path: entry.path.clone(),
            outcome,
        });
    }
    reports
}
