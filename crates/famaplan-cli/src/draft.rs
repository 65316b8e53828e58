//! Draft files: a plan session serialized as pretty JSON on disk.

use std::path::Path;

use anyhow::{Context, Result, bail};

use famaplan_core::plan::PlanSession;

/// Read a draft file.
pub fn load_draft(path: &Path) -> Result<PlanSession> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read draft file {}", path.display()))?;
    let session: PlanSession = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse draft file {}", path.display()))?;
    Ok(session)
}

/// Write a draft file, replacing any previous content.
pub fn save_draft(path: &Path, session: &PlanSession) -> Result<()> {
    let contents = serde_json::to_string_pretty(session).context("failed to serialize draft")?;
    std::fs::write(path, contents + "\n")
        .with_context(|| format!("failed to write draft file {}", path.display()))?;
    Ok(())
}

/// Write a draft file that must not already exist, unless `force` is set.
pub fn create_draft(path: &Path, session: &PlanSession, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "draft file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    save_draft(path, session)
}
