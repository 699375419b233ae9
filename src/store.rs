use crate::model::Offense;
use anyhow::{Context, Result};
use std::path::Path;

pub fn load_offenses(path: &Path) -> Result<Vec<Offense>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read offenses file {}", path.display()))?;
    let offenses = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse offenses file {}", path.display()))?;
    Ok(offenses)
}

pub fn save_offenses(path: &Path, offenses: &[Offense]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }

    let serialized = serde_json::to_string_pretty(offenses)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write offenses file {}", path.display()))?;
    Ok(())
}
