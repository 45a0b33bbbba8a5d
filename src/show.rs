//! Show orchestration.
//!
//! For every mapped file on every requested target, asks the remote
//! repository for the most recent stored version and renders the combined
//! answer as a flattened text report. Lookups are keyed by filename from the
//! start, so no identifier reversal is needed here.

use anyhow::{bail, Result};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::api::{ApiAdaptor, Credentials, ResponseBody};
use crate::config::Config;
use crate::filemap::FileMap;
use crate::query::{Attribute, ColumnSpec, FindListQuery, SortDirection};

/// Entity type holding one row per stored document version.
const DOC_VERSION_ENTITY: &str = "AeDocumentVersion";

pub struct ShowOptions {
    /// Declared but never consulted; kept for interface compatibility.
    pub check_synced: bool,
}

/// Query each target for the current version of each mapped file and print
/// a human-readable summary.
pub fn run_show(
    config: &Config,
    filemap: &FileMap,
    credentials: &Credentials,
    targets: &[String],
    _options: &ShowOptions,
) -> Result<()> {
    if !filemap.has_all_targets(targets) {
        bail!(
            "file map is missing targets: {}",
            filemap.missing_targets(targets).join(", ")
        );
    }

    let connections = ApiAdaptor::connect_all(config, credentials, targets)?;

    let mut report: Map<String, Value> = Map::new();
    for (target, api) in &connections {
        let versions = current_versions_from_target(filemap, target, api);
        if versions.is_empty() {
            error!("no response from target: {target}");
        } else {
            report.insert(target.clone(), Value::Object(versions));
        }
    }

    if !report.is_empty() {
        let rendered = serde_json::to_string_pretty(&Value::Object(report))?;
        println!("{}", flatten_report(&rendered));
    }
    Ok(())
}

/// Fetch the most recent version descriptor for each of the target's mapped
/// files. Files without a stored version, and per-file request errors, are
/// logged and omitted.
fn current_versions_from_target(
    filemap: &FileMap,
    target: &str,
    api: &ApiAdaptor,
) -> Map<String, Value> {
    let profiles = match filemap.document_profiles(target) {
        Ok(profiles) => profiles,
        Err(e) => {
            error!(%e, "cannot resolve document profiles for {target}");
            return Map::new();
        }
    };

    let mut versions = Map::new();
    for (filename, doc_id) in profiles {
        match api.find_list(DOC_VERSION_ENTITY, &current_version_query(doc_id)) {
            Ok(body) => match first_result(&body) {
                Some(row) => {
                    versions.insert(filename.clone(), row);
                }
                None => info!("no stored version of {filename} on {target}"),
            },
            Err(e) => {
                error!(%e, "error getting most recent version of {filename} from {target}");
            }
        }
    }
    versions
}

/// Single-row query for the latest version of one document: identifier,
/// version identifier and label, edit date (most recent first), check-in
/// metadata, and content URL.
fn current_version_query(doc_id: &str) -> FindListQuery {
    let mut query = FindListQuery::new(0, 1);
    query.add_attribute(Attribute::equals("docId", doc_id));
    query.add_column(ColumnSpec::new("docId"));
    query.add_column(ColumnSpec::new("docVerId"));
    query.add_column(ColumnSpec::new("versionLabel"));
    query.add_column(ColumnSpec::sorted("editDate", SortDirection::Descending));
    query.add_column(ColumnSpec::new("checkedInBy"));
    query.add_column(ColumnSpec::new("checkedInComment"));
    query.add_column(ColumnSpec::new("contentUrl"));
    query
}

/// First row of a find-list result body, if any.
fn first_result(body: &ResponseBody) -> Option<Value> {
    body.as_json()?
        .get("results")?
        .as_array()?
        .first()
        .cloned()
}

/// Strip JSON structural characters for terminal readability. Presentation
/// only; the underlying data is untouched.
fn flatten_report(rendered: &str) -> String {
    rendered
        .replace(['[', ']', '{', '}'], "")
        .replace("\\\"", "")
        .replace('"', "")
        .replace(",\n", "\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_query_requests_one_row_most_recent_first() {
        let body = current_version_query("docId123").body();
        assert_eq!(body["start"], 0);
        assert_eq!(body["batchSize"], 1);
        assert_eq!(body["query"]["attributes"], json!([{ "docId": "docId123" }]));

        let columns = body["columnSpecifications"].as_array().unwrap();
        let properties: Vec<&str> = columns
            .iter()
            .map(|c| c["property"].as_str().unwrap())
            .collect();
        assert_eq!(
            properties,
            vec![
                "docId",
                "docVerId",
                "versionLabel",
                "editDate",
                "checkedInBy",
                "checkedInComment",
                "contentUrl"
            ]
        );
        assert_eq!(columns[3]["direction"], "DESCENDING");
    }

    #[test]
    fn first_result_takes_the_leading_row() {
        let body = ResponseBody::Json(json!({
            "results": [{ "docVerId": "v2" }, { "docVerId": "v1" }]
        }));
        assert_eq!(first_result(&body), Some(json!({ "docVerId": "v2" })));
    }

    #[test]
    fn first_result_is_none_for_empty_or_unstructured_bodies() {
        assert_eq!(first_result(&ResponseBody::Json(json!({ "results": [] }))), None);
        assert_eq!(first_result(&ResponseBody::Json(json!({}))), None);
        assert_eq!(first_result(&ResponseBody::Text("ok".to_string())), None);
        assert_eq!(first_result(&ResponseBody::Empty), None);
    }

    #[test]
    fn flatten_strips_structure_but_keeps_key_value_lines() {
        let rendered = serde_json::to_string_pretty(&json!({
            "prod": {
                "file.js": {
                    "docVerId": "v7",
                    "versionLabel": "1.3"
                }
            }
        }))
        .unwrap();

        let flat = flatten_report(&rendered);
        assert!(!flat.contains('{'));
        assert!(!flat.contains('['));
        assert!(!flat.contains('"'));
        assert!(flat.contains("prod:"));
        assert!(flat.contains("docVerId: v7"));
        assert!(flat.contains("versionLabel: 1.3"));
    }
}
