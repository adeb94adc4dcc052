//! Best-effort replacement of installer resources
//!
//! Files in the configured replacement directory are matched by file name
//! against every entry of the extracted `Resources/` tree. Matching entries
//! are overwritten; anything that goes wrong becomes a warning.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a substitution pass did
#[derive(Debug, Default, Clone)]
pub struct SubstitutionReport {
    pub replaced: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Replace entries under `resources_dir` with same-named files from
/// `replacements_dir`
///
/// Runs synchronously; call it from a blocking task.
#[must_use]
pub fn substitute_resources(replacements_dir: &Path, resources_dir: &Path) -> SubstitutionReport {
    let mut report = SubstitutionReport::default();

    let mut replacements: HashMap<OsString, PathBuf> = HashMap::new();
    for entry in WalkDir::new(replacements_dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                replacements.insert(entry.file_name().to_os_string(), entry.into_path());
            }
            Ok(_) => {}
            Err(e) => report
                .warnings
                .push(format!("cannot read replacement resources: {e}")),
        }
    }

    if replacements.is_empty() {
        return report;
    }

    let mut slots = Vec::new();
    for entry in WalkDir::new(resources_dir).min_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if let Some(source) = replacements.get(entry.file_name()) {
                    slots.push((source.clone(), entry.into_path()));
                }
            }
            Ok(_) => {}
            Err(e) => report
                .warnings
                .push(format!("cannot scan installer resources: {e}")),
        }
    }

    for (source, slot) in slots {
        match std::fs::copy(&source, &slot) {
            Ok(_) => {
                tracing::debug!(slot = %slot.display(), "resource replaced");
                report.replaced.push(slot);
            }
            Err(e) => report.warnings.push(format!(
                "failed to replace {} with {}: {e}",
                slot.display(),
                source.display()
            )),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_matching_files_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let replacements = dir.path().join("bundled");
        let resources = dir.path().join("Resources");
        std::fs::create_dir_all(&replacements).unwrap();
        std::fs::create_dir_all(resources.join("en.lproj")).unwrap();

        std::fs::write(replacements.join("background.png"), "new").unwrap();
        std::fs::write(replacements.join("unused.txt"), "x").unwrap();
        std::fs::write(resources.join("background.png"), "old").unwrap();
        std::fs::write(resources.join("en.lproj/background.png"), "old").unwrap();
        std::fs::write(resources.join("en.lproj/License.rtf"), "keep").unwrap();

        let report = substitute_resources(&replacements, &resources);

        assert_eq!(report.replaced.len(), 2);
        assert!(report.warnings.is_empty());
        assert_eq!(
            std::fs::read_to_string(resources.join("en.lproj/background.png")).unwrap(),
            "new"
        );
        assert_eq!(
            std::fs::read_to_string(resources.join("en.lproj/License.rtf")).unwrap(),
            "keep"
        );
        assert!(!resources.join("unused.txt").exists());
    }

    #[test]
    fn missing_directories_only_warn() {
        let dir = tempfile::tempdir().unwrap();
        let replacements = dir.path().join("bundled");
        std::fs::create_dir_all(&replacements).unwrap();
        std::fs::write(replacements.join("background.png"), "new").unwrap();

        let report = substitute_resources(&replacements, &dir.path().join("absent"));
        assert!(report.replaced.is_empty());
        assert_eq!(report.warnings.len(), 1);

        let report = substitute_resources(&dir.path().join("absent"), &replacements);
        assert!(report.replaced.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }
}
