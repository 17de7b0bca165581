//! Input file discovery: locating per-aspect `.mpk` blobs and optional side
//! inputs across a list of input directories (§6, "Input file layout").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::{Error, Result};

/// The set of input files discovered for one replay.
#[derive(Debug, Default)]
pub struct DiscoveredInputs {
    /// Aspect name → the `.mpk` file to read it from. Later directories
    /// override earlier ones on a name collision.
    pub aspect_files: HashMap<String, PathBuf>,
    /// The unit-definitions side table, if any `defs.csv` was found.
    pub unit_defs_path: Option<PathBuf>,
    /// Opaque replay metadata bytes, if any `game_meta.json` was found.
    pub game_meta_path: Option<PathBuf>,
}

/// Scans `input_dirs` in order, collecting `.mpk` aspect files and the
/// optional `defs.csv`/`game_meta.json` side inputs.
///
/// A duplicate aspect name across directories is not an error: the last
/// directory read wins, and a warning is logged.
pub fn discover_inputs(input_dirs: &[PathBuf]) -> Result<DiscoveredInputs> {
    let mut inputs = DiscoveredInputs::default();

    for dir in input_dirs {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::file_ingestion_io(dir, "failed to read input directory", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::file_ingestion_io(dir, "failed to read directory entry", e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match path.file_name().and_then(|n| n.to_str()) {
                Some("defs.csv") => inputs.unit_defs_path = Some(path),
                Some("game_meta.json") => inputs.game_meta_path = Some(path),
                _ if path.extension().and_then(|e| e.to_str()) == Some("mpk") => {
                    let aspect = aspect_name(&path)?;
                    if let Some(previous) = inputs.aspect_files.insert(aspect.clone(), path.clone()) {
                        warn!(
                            "duplicate aspect '{aspect}': '{}' overrides '{}'",
                            path.display(),
                            previous.display()
                        );
                    }
                }
                _ => {}
            }
        }
    }

    Ok(inputs)
}

fn aspect_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::file_ingestion(path, "cannot derive aspect name from file stem"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_aspect_files_and_side_inputs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("team_stats.mpk"), b"").unwrap();
        fs::write(dir.path().join("defs.csv"), b"id,name,translatedHumanName\n").unwrap();
        fs::write(dir.path().join("game_meta.json"), b"{}").unwrap();

        let inputs = discover_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert!(inputs.aspect_files.contains_key("team_stats"));
        assert!(inputs.unit_defs_path.is_some());
        assert!(inputs.game_meta_path.is_some());
    }

    #[test]
    fn later_directory_wins_on_duplicate_aspect() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        fs::write(dir_a.path().join("team_stats.mpk"), b"a").unwrap();
        fs::write(dir_b.path().join("team_stats.mpk"), b"b").unwrap();

        let inputs = discover_inputs(&[dir_a.path().to_path_buf(), dir_b.path().to_path_buf()]).unwrap();
        let resolved = &inputs.aspect_files["team_stats"];
        assert_eq!(resolved, &dir_b.path().join("team_stats.mpk"));
    }
}
