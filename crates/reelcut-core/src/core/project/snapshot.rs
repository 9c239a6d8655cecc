//! Project snapshot file format.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::{
    assets::Asset,
    timeline::{Sequence, SequenceFormat},
    CoreError, CoreResult,
};

/// Current snapshot format version
pub const PROJECT_FILE_VERSION: u32 = 1;

/// On-disk project snapshot: imported assets plus one sequence
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: u32,
    pub name: String,
    pub created_at: String,
    pub modified_at: String,
    pub assets: Vec<Asset>,
    pub sequence: Sequence,
}

impl ProjectFile {
    pub fn new(name: &str, format: SequenceFormat) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: PROJECT_FILE_VERSION,
            name: name.to_string(),
            created_at: now.clone(),
            modified_at: now,
            assets: vec![],
            sequence: Sequence::new(name, format),
        }
    }

    /// Registers an imported asset
    pub fn add_asset(&mut self, asset: Asset) {
        self.assets.push(asset);
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }

    /// Gets an asset by ID
    pub fn get_asset(&self, asset_id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == asset_id)
    }

    /// Checks the timeline invariants and that every clip's asset
    /// reference resolves. Dangling references only warn: removing an
    /// asset is allowed to leave placeholder clips behind.
    pub fn validate(&self) -> CoreResult<()> {
        self.sequence.validate()?;
        for track in &self.sequence.tracks {
            for clip in &track.clips {
                let Some(asset_id) = &clip.asset_id else {
                    continue;
                };
                match self.get_asset(asset_id) {
                    Some(asset) => clip.validate_trim(asset.duration_sec)?,
                    None => {
                        warn!(clip_id = %clip.id, %asset_id, "clip references missing asset");
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes the snapshot as pretty-printed JSON
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        info!(path = %path.display(), "project saved");
        Ok(())
    }

    /// Reads and validates a snapshot
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ProjectNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        let project: ProjectFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CoreError::ProjectCorrupted(e.to_string()))?;
        if project.version > PROJECT_FILE_VERSION {
            return Err(CoreError::ProjectCorrupted(format!(
                "unsupported project version {}",
                project.version
            )));
        }
        project.validate()?;
        Ok(project)
    }
}

// =============================================================================
// Tests
// =============================================================================
