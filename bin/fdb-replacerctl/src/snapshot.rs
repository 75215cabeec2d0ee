//! ---
//! fdbr_section: "05-networking-external-interfaces"
//! fdbr_subsection: "binary"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Control CLI for operators running replacement passes."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fdb_replacements::ClusterObservedStatus;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// YAML for `.yaml`/`.yml`, JSON for everything else.
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SnapshotFormat::Yaml
            }
            _ => SnapshotFormat::Json,
        }
    }
}

/// Read an observed status snapshot.
pub fn load(path: &Path) -> Result<ClusterObservedStatus> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read snapshot {}", path.display()))?;
    let format = SnapshotFormat::for_path(path);
    debug!(snapshot = %path.display(), ?format, "loading status snapshot");
    match format {
        SnapshotFormat::Json => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON snapshot {}", path.display())),
        SnapshotFormat::Yaml => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML snapshot {}", path.display())),
    }
}

/// Persist a snapshot in the format implied by `path`.
pub fn write(path: &Path, status: &ClusterObservedStatus) -> Result<()> {
    let rendered = match SnapshotFormat::for_path(path) {
        SnapshotFormat::Json => serde_json::to_string_pretty(status)?,
        SnapshotFormat::Yaml => serde_yaml::to_string(status)?,
    };
    fs::write(path, rendered)
        .with_context(|| format!("unable to write snapshot {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdb_replacements::ProcessGroupStatus;

    #[test]
    fn format_follows_extension() {
        assert_eq!(SnapshotFormat::for_path(Path::new("a.yaml")), SnapshotFormat::Yaml);
        assert_eq!(SnapshotFormat::for_path(Path::new("a.YML")), SnapshotFormat::Yaml);
        assert_eq!(SnapshotFormat::for_path(Path::new("a.json")), SnapshotFormat::Json);
        assert_eq!(SnapshotFormat::for_path(Path::new("snapshot")), SnapshotFormat::Json);
    }

    #[test]
    fn write_then_load_preserves_status() {
        let dir = tempfile::tempdir().unwrap();
        let status = ClusterObservedStatus::new(vec![ProcessGroupStatus::new("storage-1", "zone-a")
            .with_address("10.0.0.1:4501")])
        .with_maintenance_zone("zone-b");
        for name in ["status.json", "status.yaml"] {
            let path = dir.path().join(name);
            write(&path, &status).unwrap();
            assert_eq!(load(&path).unwrap(), status);
        }
    }
}
