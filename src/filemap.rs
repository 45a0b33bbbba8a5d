//! The persisted file map.
//!
//! A JSON document at the root of the git working tree mapping each named
//! target to the set of tracked files it mirrors:
//!
//! ```json
//! {
//!     "_targets": {
//!         "<target name>": {
//!             "_document_profiles": { "<filename>": "<document profile id>" },
//!             "_module_directory": "<module directory path>"
//!         }
//!     }
//! }
//! ```
//!
//! The map is operator-maintained, read-only state: it is fully validated on
//! every load (profile files must exist in the working tree; module
//! directories must exist both where configured and under the working-tree
//! root) and never auto-repaired. A missing or invalid map is fatal before
//! any network activity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use crate::git;
use crate::prompt;

/// Media type attached to every pushed file. The remote side does not
/// recognize script types like `application/javascript`.
pub const FILE_CONTENT_TYPE: &str = "text/plain";

/// One target's record in the map document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Local relative file path → remote document identifier.
    #[serde(rename = "_document_profiles")]
    pub document_profiles: BTreeMap<String, String>,
    /// Directory this target mirrors verbatim on push, if any.
    #[serde(rename = "_module_directory", default)]
    pub module_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MapDocument {
    #[serde(rename = "_targets")]
    targets: BTreeMap<String, TargetRecord>,
}

/// A file read from the working tree, ready for submission.
#[derive(Debug, Clone)]
pub struct MappedFile {
    pub filename: String,
    pub contents: String,
    pub content_type: &'static str,
}

/// The validated, ready-to-use file map.
#[derive(Debug, Clone)]
pub struct FileMap {
    toplevel: PathBuf,
    targets: BTreeMap<String, TargetRecord>,
}

impl FileMap {
    /// Load the map from the working tree containing `dir` (or the current
    /// directory), validating every entry.
    ///
    /// If the map document is absent, offers to write an inert template and
    /// fails either way — the system never proceeds on a freshly created,
    /// unpopulated map.
    pub fn load(filename: &str, dir: Option<&Path>) -> Result<FileMap> {
        let toplevel = git::toplevel(dir)?;
        let path = toplevel.join(filename);

        if !path.is_file() {
            if prompt::confirm_default_no(&format!("Creating new file map at {}.", path.display()))
            {
                scaffold_template(&path)?;
                bail!(
                    "initialize keys and values in the new template file map at {}",
                    path.display()
                );
            }
            bail!("create a file map at {} before continuing", path.display());
        }

        Self::load_validated(&path, toplevel)
    }

    /// Load and validate an existing map document. Exposed for callers that
    /// manage the working-tree location themselves.
    pub fn load_validated(path: &Path, toplevel: PathBuf) -> Result<FileMap> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read file map at {}", path.display()))?;
        let document: MapDocument = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse file map at {}", path.display()))?;
        debug!(path = %path.display(), "loaded file map");

        let map = FileMap {
            toplevel,
            targets: document.targets,
        };
        map.validate()?;
        Ok(map)
    }

    pub fn toplevel(&self) -> &Path {
        &self.toplevel
    }

    /// Names of every configured target.
    pub fn target_names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    /// Requested target names not present in the map.
    pub fn missing_targets<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|name| !self.targets.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// True iff every requested target name is present in the map. Missing
    /// names are logged. Used as a pre-flight gate before contacting any
    /// remote endpoint.
    pub fn has_all_targets(&self, requested: &[String]) -> bool {
        let missing = self.missing_targets(requested);
        if missing.is_empty() {
            true
        } else {
            error!(?missing, "file map is missing targets");
            false
        }
    }

    /// The filename → document-identifier mapping for a target.
    pub fn document_profiles(&self, target: &str) -> Result<&BTreeMap<String, String>> {
        Ok(&self.target(target)?.document_profiles)
    }

    /// The optional mirrored-directory path for a target.
    pub fn module_directory(&self, target: &str) -> Result<Option<&Path>> {
        Ok(self.target(target)?.module_directory.as_deref())
    }

    /// Read each profiled file's full contents from the working tree.
    ///
    /// Returns document identifier → file. A file that cannot be read is
    /// logged and excluded — a target's profile list may reference files
    /// that were intentionally removed, so push proceeds best-effort with
    /// whatever is available.
    pub fn materialize_files(
        &self,
        document_profiles: &BTreeMap<String, String>,
    ) -> BTreeMap<String, MappedFile> {
        let mut files = BTreeMap::new();

        for (filename, doc_id) in document_profiles {
            let path = self.toplevel.join(filename);
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    info!(file = %path.display(), "added file");
                    files.insert(
                        doc_id.clone(),
                        MappedFile {
                            filename: filename.clone(),
                            contents,
                            content_type: FILE_CONTENT_TYPE,
                        },
                    );
                }
                Err(e) => {
                    error!(file = %path.display(), %e, "failed to read file");
                }
            }
        }

        files
    }

    fn target(&self, target: &str) -> Result<&TargetRecord> {
        self.targets
            .get(target)
            .with_context(|| format!("target {} is not in the file map", target))
    }

    fn validate(&self) -> Result<()> {
        for (target, record) in &self.targets {
            let mut seen_ids: BTreeMap<&str, &str> = BTreeMap::new();
            for (filename, doc_id) in &record.document_profiles {
                let path = self.toplevel.join(filename);
                if !path.is_file() {
                    bail!(
                        "file {} is in document profiles for target {} but does not exist on disk",
                        filename,
                        target
                    );
                }
                if let Some(other) = seen_ids.insert(doc_id, filename) {
                    bail!(
                        "document identifier {} is mapped by both {} and {} in target {}",
                        doc_id,
                        other,
                        filename,
                        target
                    );
                }
            }
            debug!("validated all document profiles for {target}");

            if let Some(dirname) = &record.module_directory {
                if !dirname.is_dir() {
                    bail!(
                        "module directory `{}` does not exist or is not a directory on {}",
                        dirname.display(),
                        target
                    );
                }
                debug!(dir = %dirname.display(), "validated module directory for {target}");

                let local_name = dirname
                    .file_name()
                    .with_context(|| format!("module directory for {} has no name", target))?;
                let local_dir = self.toplevel.join(local_name);
                if !local_dir.is_dir() {
                    bail!(
                        "module directory `{}` does not exist or is not a directory in the local git toplevel",
                        local_dir.display()
                    );
                }
                debug!(dir = %local_dir.display(), "validated local module directory");
            }
        }
        Ok(())
    }
}

/// Write the placeholder map document. The template is inert: loading it
/// still fails until the operator fills it in.
pub fn scaffold_template(path: &Path) -> Result<()> {
    let template = json!({
        "_targets": {
            "<target name>": {
                "_document_profiles": {
                    "<filename>": "<document profile id>"
                },
                "_module_directory": "<module directory path>"
            }
        }
    });
    std::fs::write(path, format!("{:#}\n", template))
        .with_context(|| format!("failed to write file map template at {}", path.display()))?;
    info!(path = %path.display(), "created file map template");
    Ok(())
}
