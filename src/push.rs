//! Push orchestration.
//!
//! Coordinates one push run: commit-state validation, per-target submission
//! (multipart upload, module-directory mirror, commit marker), reversal of
//! remote document identifiers back to local filenames, and a single
//! annotated git tag recording the outcome.
//!
//! Push is not atomic across targets: each target is attempted
//! independently, failures are logged and degrade that target to "no
//! response", and the tag covers whichever targets answered. No tag is
//! created when every target failed.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::api::{ApiAdaptor, Credentials, FormPart, ResponseBody};
use crate::config::Config;
use crate::filemap::FileMap;
use crate::git;
use crate::prompt;

/// Route posted to the action endpoint; the server plugin dispatches on it.
const PUSH_ROUTE: &str = "push";

/// Version-increment kind stored with each new document version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Major,
    #[default]
    Minor,
}

/// The fixed record sent with every push. Field names are a wire contract
/// with the server plugin and must not drift without coordinated change.
#[derive(Debug, Clone, Serialize)]
pub struct ClientMetadata {
    pub current_branch: String,
    pub current_sha_hash: String,
    pub current_commit_msg: String,
    pub version_type: VersionKind,
}

impl ClientMetadata {
    /// Identify the local branch, commit, and requested version kind.
    pub fn collect(version: VersionKind, dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            current_branch: git::current_branch(dir)?,
            current_sha_hash: git::head_sha(dir)?,
            current_commit_msg: git::last_commit_message(dir)?,
            version_type: version,
        })
    }
}

pub struct PushOptions {
    pub allow_uncommitted: bool,
    pub version: VersionKind,
}

/// Run a push against the requested targets.
///
/// State machine: validate → send → remap → tag, terminal on the first
/// failing gate. Only the gates are fatal; everything past them degrades
/// per target.
pub fn run_push(
    config: &Config,
    filemap: &FileMap,
    credentials: &Credentials,
    targets: &[String],
    options: &PushOptions,
) -> Result<()> {
    if !filemap.has_all_targets(targets) {
        bail!(
            "file map is missing targets: {}",
            filemap.missing_targets(targets).join(", ")
        );
    }
    if git::has_uncommitted_changes(None)? && !options.allow_uncommitted {
        bail!("git has uncommitted changes; commit and try again, or use --allow-uncommitted");
    }

    let connections = ApiAdaptor::connect_all(config, credentials, targets)?;
    let client_data = ClientMetadata::collect(options.version, None)?;
    debug!(targets = ?targets, "executing push");

    let outcomes = send_all(filemap, &connections, &client_data);
    let responses = record_responses(outcomes);
    conclude_push(filemap, responses, Utc::now(), None);
    Ok(())
}

/// Send files to every target in sequence, collecting each target's raw
/// submission outcome. A target declined at the prompt is skipped entirely
/// and produces no outcome at all.
fn send_all(
    filemap: &FileMap,
    connections: &[(String, ApiAdaptor)],
    client_data: &ClientMetadata,
) -> Vec<(String, Option<Map<String, Value>>)> {
    let mut outcomes = Vec::new();

    for (target, api) in connections {
        if !prompt::confirm_default_yes(&format!("Sending files to {}.", target)) {
            continue;
        }

        let response = post_files_to_target(filemap, target, api, client_data);

        if let Err(e) = mirror_module_directory(filemap, target, client_data) {
            error!(%e, "error copying module files to {target}");
        }

        outcomes.push((target.clone(), response));
    }

    outcomes
}

/// Keep the targets that answered with a document map; a target that errored
/// or answered with anything else degrades to "no response".
fn record_responses(
    outcomes: Vec<(String, Option<Map<String, Value>>)>,
) -> Vec<(String, Map<String, Value>)> {
    outcomes
        .into_iter()
        .filter_map(|(target, response)| match response {
            Some(doc_map) => Some((target, doc_map)),
            None => {
                error!("no response from target: {target}");
                None
            }
        })
        .collect()
}

/// Remap and tag whatever the send loop produced. Returns false when no
/// target answered — a push where every target failed must leave no tag in
/// git history.
fn conclude_push(
    filemap: &FileMap,
    responses: Vec<(String, Map<String, Value>)>,
    now: DateTime<Utc>,
    dir: Option<&Path>,
) -> bool {
    if responses.is_empty() {
        error!("no target produced a response; nothing to tag");
        return false;
    }

    let remapped = remap_responses(filemap, responses);
    create_push_tag(&remapped, now, dir);
    true
}

/// Submit one target's materialized files plus the client metadata record.
fn post_files_to_target(
    filemap: &FileMap,
    target: &str,
    api: &ApiAdaptor,
    client_data: &ClientMetadata,
) -> Option<Map<String, Value>> {
    let profiles = match filemap.document_profiles(target) {
        Ok(profiles) => profiles,
        Err(e) => {
            error!(%e, "cannot resolve document profiles for {target}");
            return None;
        }
    };

    let files = filemap.materialize_files(profiles);
    let mut parts: Vec<FormPart> = files
        .into_iter()
        .map(|(doc_id, file)| FormPart {
            name: doc_id,
            file_name: Some(file.filename),
            content_type: file.content_type.to_string(),
            body: file.contents,
        })
        .collect();

    let metadata = match serde_json::to_string(client_data) {
        Ok(json) => json,
        Err(e) => {
            error!(%e, "cannot serialize client metadata");
            return None;
        }
    };
    parts.push(FormPart {
        name: "client_data".to_string(),
        file_name: None,
        content_type: "application/json".to_string(),
        body: metadata,
    });

    match api.submit_files(PUSH_ROUTE, parts) {
        Ok(ResponseBody::Json(Value::Object(doc_map))) => Some(doc_map),
        Ok(other) => {
            debug!(?other, "response body from {target} is not a document map");
            None
        }
        Err(e) => {
            error!(url = api.base_url(), %e, "error pushing files for {target}");
            None
        }
    }
}

/// Mirror the target's module directory: clear its current contents, copy
/// the same-named local subtree verbatim, then write a commit marker file.
///
/// The clear and copy phases are destructive by design — the mirror must
/// exactly match the local subtree afterwards. Each failed item is logged
/// and skipped rather than aborting the remainder.
fn mirror_module_directory(
    filemap: &FileMap,
    target: &str,
    client_data: &ClientMetadata,
) -> Result<()> {
    let Some(target_dir) = filemap.module_directory(target)? else {
        info!("no modules to copy to {target}: no module directory configured");
        return Ok(());
    };
    let target_dir = target_dir.to_path_buf();

    let dir_name = target_dir
        .file_name()
        .with_context(|| format!("module directory for {} has no name", target))?;
    let source_dir = filemap.toplevel().join(dir_name);

    // Phase 1: clear.
    for entry in std::fs::read_dir(&target_dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!(%e, "unreadable entry while clearing module directory for {target}");
                continue;
            }
        };
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match removed {
            Ok(()) => debug!(item = %path.display(), "removed from {target}"),
            Err(e) => error!(item = %path.display(), %e, "failed to remove from {target}"),
        }
    }

    // Phase 2: copy.
    for entry in WalkDir::new(&source_dir).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!(%e, "unreadable entry while copying module directory for {target}");
                continue;
            }
        };
        let relative = match entry.path().strip_prefix(&source_dir) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let destination = target_dir.join(relative);
        let copied = if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)
        } else {
            std::fs::copy(entry.path(), &destination).map(|_| ())
        };
        match copied {
            Ok(()) => debug!(item = %entry.path().display(), "copied to {target}"),
            Err(e) => error!(item = %entry.path().display(), %e, "failed to copy to {target}"),
        }
    }

    // Phase 3: commit marker, a local audit artifact of what was pushed.
    let marker = target_dir.join(format!("{}.commit", client_data.current_sha_hash));
    let body = serde_json::to_string_pretty(client_data)?;
    std::fs::write(&marker, body)
        .with_context(|| format!("failed to write commit marker {}", marker.display()))?;
    debug!(marker = %marker.display(), "created commit marker for {target}");

    Ok(())
}

/// Translate each target's response keys from remote document identifiers
/// back to local filenames. Identifiers absent from the target's profile
/// map pass through unchanged.
fn remap_responses(
    filemap: &FileMap,
    responses: Vec<(String, Map<String, Value>)>,
) -> Vec<(String, Map<String, Value>)> {
    responses
        .into_iter()
        .map(|(target, doc_map)| {
            let reversed: std::collections::BTreeMap<&str, &str> = filemap
                .document_profiles(&target)
                .map(|profiles| {
                    profiles
                        .iter()
                        .map(|(filename, doc_id)| (doc_id.as_str(), filename.as_str()))
                        .collect()
                })
                .unwrap_or_default();

            let remapped = doc_map
                .into_iter()
                .map(|(doc_id, versions)| match reversed.get(doc_id.as_str()) {
                    Some(filename) => (filename.to_string(), versions),
                    None => (doc_id, versions),
                })
                .collect();
            (target, remapped)
        })
        .collect()
}

/// Create one annotated tag named `push.<targets>.<timestamp>` whose body is
/// the pretty-printed, filename-keyed response map.
///
/// Tag creation failure is logged, not raised; the run's exit status does
/// not currently reflect it.
fn create_push_tag(responses: &[(String, Map<String, Value>)], now: DateTime<Utc>, dir: Option<&Path>) {
    let name = tag_name(responses.iter().map(|(target, _)| target.as_str()), now);

    let annotation: Map<String, Value> = responses
        .iter()
        .map(|(target, doc_map)| (target.clone(), Value::Object(doc_map.clone())))
        .collect();
    let message = match serde_json::to_string_pretty(&Value::Object(annotation)) {
        Ok(message) => message,
        Err(e) => {
            error!(%e, "cannot serialize tag annotation");
            return;
        }
    };

    match git::create_annotated_tag(&name, &message, dir) {
        Ok(()) => info!(tag = name, "tagged push"),
        Err(e) => error!(tag = name, %e, "failed to create push tag"),
    }
}

/// `push.<targets-joined-by-dash>.<UTC %Y%m%dT%H%M%S>`
fn tag_name<'a>(targets: impl Iterator<Item = &'a str>, now: DateTime<Utc>) -> String {
    let joined = targets.collect::<Vec<_>>().join("-");
    format!("{}.{}.{}", PUSH_ROUTE, joined, now.format("%Y%m%dT%H%M%S"))
}
