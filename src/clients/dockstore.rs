//! Dockstore search and workflow download.
//!
//! Search goes through the extended GA4GH Elasticsearch endpoint; download
//! walks the regular workflows API (published list, version pick, source
//! files) and writes the tree to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::error::GatewayError;
use crate::domain::DockstoreSearchParams;
use crate::infra::config::ToolConfig;
use crate::infra::http::headers::{add_standard_headers, generate_request_id};
use crate::infra::runtime::limits::{make_http_client, make_http_client_with, retry_async};

const SEARCH_PATH: &str = "/api/api/ga4gh/v2/extended/tools/entry/_search";

/// Fields echoed back by the search endpoint for each hit.
const SOURCE_FIELDS: [&str; 21] = [
    "all_authors",
    "approvedAITopic",
    "descriptorType",
    "descriptorTypeSubclass",
    "full_workflow_path",
    "gitUrl",
    "name",
    "namespace",
    "organization",
    "private_access",
    "providerUrl",
    "repository",
    "starredUsers",
    "toolname",
    "tool_path",
    "topicAutomatic",
    "topicSelection",
    "verified",
    "workflowName",
    "description",
    "workflowVersions",
];

#[derive(Clone)]
pub struct DockstoreClient {
    base: String,
    http: Client,
    retries: u32,
}

#[derive(Debug, Deserialize)]
pub struct EsResponse {
    pub hits: EsHits,
}

#[derive(Debug, Deserialize)]
pub struct EsHits {
    #[serde(default)]
    pub hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
pub struct EsHit {
    #[serde(rename = "_score", default)]
    pub score: f64,
    #[serde(rename = "_source")]
    pub source: EsSource,
}

#[derive(Debug, Default, Deserialize)]
pub struct EsSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "workflowName", default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub full_workflow_path: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(rename = "descriptorType", default)]
    pub descriptor_type: Option<String>,
}

impl EsSource {
    /// Display name, preferring the explicit workflow name.
    pub fn label(&self) -> &str {
        self.workflow_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.name.as_deref())
            .unwrap_or("unnamed")
    }

    /// Text handed to the reranker for this hit.
    pub fn rerank_text(&self) -> String {
        format!("{} - {}", self.label(), self.description.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Deserialize)]
pub struct WorkflowSummary {
    pub id: i64,
    #[serde(rename = "workflowName", default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub full_workflow_path: Option<String>,
    #[serde(rename = "descriptorType", default)]
    pub descriptor_type: Option<String>,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<Value>,
    #[serde(rename = "workflowVersions", default)]
    pub workflow_versions: Vec<WorkflowVersion>,
}

#[derive(Debug, Deserialize)]
pub struct WorkflowVersion {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub valid: bool,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SourceFile {
    #[serde(rename = "absolutePath", default)]
    pub absolute_path: String,
    #[serde(default)]
    pub content: String,
}

/// What `fetch_wdl_from_dockstore` hands back to the model.
#[derive(Debug)]
pub struct DownloadReport {
    pub save_directory: PathBuf,
    pub organization: String,
    pub workflow_name: String,
    pub files: Vec<PathBuf>,
    pub wdl_save_directory: Option<PathBuf>,
}

/// Pull `(organization, workflow_name)` out of a Dockstore workflow URL.
/// Accepts full URLs, bare `/workflows/...` paths, and `org/repo/name`
/// fragments; a leading host-like segment is skipped.
pub fn parse_workflow_url(url: &str) -> Result<(String, String), GatewayError> {
    let mut path = url;
    if let Some(rest) = path.strip_prefix("https://").or_else(|| path.strip_prefix("http://")) {
        path = rest.split_once('/').map(|(_, p)| p).unwrap_or("");
    }
    // After the host is stripped the path starts with a bare "workflows/".
    path = path.trim_start_matches('/');
    if let Some((_, rest)) = path.split_once("/workflows/") {
        path = rest;
    } else if let Some(rest) = path.strip_prefix("workflows/") {
        path = rest;
    }
    let parts: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() < 3 {
        return Err(GatewayError::InvalidParams(format!(
            "cannot parse organization and workflow name from {url}"
        )));
    }
    let host_like = [".com", ".cn", ".org", ".io", ".net"]
        .iter()
        .any(|d| parts[0].contains(d));
    let org = if host_like { parts[1] } else { parts[0] };
    let name = parts[parts.len() - 1];
    Ok((org.to_string(), name.to_string()))
}

fn recency_key(v: &Option<Value>) -> (i64, String) {
    match v {
        Some(Value::Number(n)) => (n.as_i64().unwrap_or(0), String::new()),
        Some(Value::String(s)) => (0, s.clone()),
        _ => (0, String::new()),
    }
}

/// Name-matching cascade over an organization's published workflows: exact
/// workflowName, then case-insensitive, then repository, then substring.
/// Ties go to the most recently updated entry.
pub fn find_workflow_by_name(
    workflows: Vec<WorkflowSummary>,
    name: &str,
) -> Option<WorkflowSummary> {
    let lowered = name.to_lowercase();
    let passes: [&dyn Fn(&WorkflowSummary) -> bool; 4] = [
        &|w| w.workflow_name.as_deref() == Some(name),
        &|w| w.workflow_name.as_deref().map(str::to_lowercase) == Some(lowered.clone()),
        &|w| w.repository.as_deref().map(str::to_lowercase) == Some(lowered.clone()),
        &|w| {
            w.workflow_name
                .as_deref()
                .map(|n| n.to_lowercase().contains(&lowered))
                .unwrap_or(false)
                || w.repository
                    .as_deref()
                    .map(|r| r.to_lowercase().contains(&lowered))
                    .unwrap_or(false)
        },
    ];
    for pass in passes {
        let mut matches: Vec<&WorkflowSummary> = workflows.iter().filter(|w| pass(w)).collect();
        if matches.is_empty() {
            continue;
        }
        matches.sort_by_key(|w| recency_key(&w.last_updated));
        let id = matches.last()?.id;
        return workflows.into_iter().find(|w| w.id == id);
    }
    None
}

/// Newest valid version, falling back to newest overall when none is valid.
pub fn latest_version(workflow: &WorkflowSummary) -> Option<&WorkflowVersion> {
    let valid: Vec<&WorkflowVersion> =
        workflow.workflow_versions.iter().filter(|v| v.valid).collect();
    let pool: Vec<&WorkflowVersion> = if valid.is_empty() {
        workflow.workflow_versions.iter().collect()
    } else {
        valid
    };
    pool.into_iter().max_by_key(|v| recency_key(&v.last_updated))
}

impl DockstoreClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: make_http_client(),
            retries: 2,
        }
    }

    pub fn from_config(cfg: &ToolConfig, default_base: &str) -> Self {
        let base = cfg.base_url.clone().unwrap_or_else(|| default_base.to_string());
        Self {
            base,
            http: make_http_client_with(cfg),
            retries: cfg.retries.unwrap_or(2),
        }
    }

    /// Elasticsearch request body for one search call. Wildcard clauses get
    /// the path-field boost the Dockstore UI uses.
    pub fn build_search_body(params: &DockstoreSearchParams) -> Value {
        let mut should = Vec::new();
        for clause in &params.query {
            if clause.len() != 3 {
                continue;
            }
            let (field, term) = (clause[0].as_str(), clause[2].as_str());
            if params.query_type == "wildcard" {
                let boost = if field == "full_workflow_path" || field == "tool_path" {
                    14
                } else {
                    2
                };
                should.push(json!({
                    "wildcard": {
                        field: {
                            "value": format!("*{term}*"),
                            "case_insensitive": true,
                            "boost": boost
                        }
                    }
                }));
            } else {
                should.push(json!({
                    "match": { field: { "query": term, "boost": 2 } }
                }));
            }
        }
        json!({
            "size": 201,
            "_source": SOURCE_FIELDS,
            "sort": [
                { "archived": { "order": "asc" } },
                { "_score": { "order": "desc" } }
            ],
            "highlight": {
                "type": "unified",
                "pre_tags": ["<b>"],
                "post_tags": ["</b>"],
                "fields": {
                    "full_workflow_path": {},
                    "tool_path": {},
                    "workflowVersions.sourceFiles.content": {},
                    "tags.sourceFiles.content": {},
                    "description": {},
                    "labels": {},
                    "all_authors.name": {},
                    "topicAutomatic": {},
                    "categories.topic": {},
                    "categories.displayName": {}
                }
            },
            "query": {
                "bool": {
                    "must": { "match": { "_index": "workflows" } },
                    "should": should,
                    "minimum_should_match": 1
                }
            }
        })
    }

    pub async fn search(&self, params: &DockstoreSearchParams) -> Result<EsResponse, GatewayError> {
        if params.query.iter().all(|c| c.len() != 3) {
            return Err(GatewayError::InvalidParams(
                "query must contain at least one [field, operator, term] clause".into(),
            ));
        }
        let url = format!("{}{SEARCH_PATH}", self.base.trim_end_matches('/'));
        let body = Self::build_search_body(params);
        tracing::debug!(endpoint = %url, clauses = params.query.len(), "dockstore.search request");
        let req_id = generate_request_id();
        let start = Instant::now();
        let http = self.http.clone();
        let res: Result<EsResponse, GatewayError> = retry_async(self.retries, move |_| {
            let http = http.clone();
            let url = url.clone();
            let req_id = req_id.clone();
            let body = body.clone();
            async move {
                let (builder, _rid) = add_standard_headers(http.post(url), Some(req_id));
                let resp = builder.json(&body).send().await?;
                if !resp.status().is_success() {
                    return Err(GatewayError::Upstream(format!(
                        "dockstore search returned {}",
                        resp.status()
                    )));
                }
                Ok(resp.json::<EsResponse>().await?)
            }
        })
        .await;
        if res.is_err() {
            crate::infra::logging::log_metric("dockstore.search", "remote_error_total", 1.0);
        }
        let out = res?;
        crate::infra::logging::log_metric(
            "dockstore.search",
            "remote_latency_ms",
            start.elapsed().as_millis() as f64,
        );
        Ok(out)
    }

    /// `name -> workflow URL` map for the top hits, the shape the search tool
    /// returns to the model.
    pub fn result_map(&self, hits: &[&EsHit]) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for hit in hits {
            if let Some(path) = &hit.source.full_workflow_path {
                map.insert(
                    hit.source.label().to_string(),
                    format!("{}/workflows/{path}", self.base.trim_end_matches('/')),
                );
            }
        }
        map
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, GatewayError> {
        let http = self.http.clone();
        retry_async(self.retries, move |_| {
            let http = http.clone();
            let url = url.clone();
            async move {
                let (builder, _rid) = add_standard_headers(http.get(url), None);
                let resp = builder.send().await?;
                if !resp.status().is_success() {
                    return Err(GatewayError::Upstream(format!(
                        "dockstore returned {}",
                        resp.status()
                    )));
                }
                Ok(resp.json::<T>().await?)
            }
        })
        .await
    }

    pub async fn published_workflows(
        &self,
        organization: &str,
    ) -> Result<Vec<WorkflowSummary>, GatewayError> {
        let url = format!(
            "{}/api/workflows/organization/{organization}/published",
            self.base.trim_end_matches('/')
        );
        self.get_json(url).await
    }

    pub async fn source_files(
        &self,
        workflow_id: i64,
        version_id: i64,
    ) -> Result<Vec<SourceFile>, GatewayError> {
        let url = format!(
            "{}/api/workflows/{workflow_id}/workflowVersions/{version_id}/sourcefiles",
            self.base.trim_end_matches('/')
        );
        self.get_json(url).await
    }

    /// Full download: resolve the URL, pick the newest valid version, write
    /// every source file under `<output>/<org>_<name>/` plus a metadata file.
    pub async fn download(&self, url: &str, output_dir: &str) -> Result<DownloadReport, GatewayError> {
        let (org, name) = parse_workflow_url(url)?;
        tracing::info!(organization = %org, workflow = %name, "dockstore.download start");

        let published = self.published_workflows(&org).await?;
        if published.is_empty() {
            return Err(GatewayError::Upstream(format!(
                "organization {org} has no published workflows"
            )));
        }
        let workflow = find_workflow_by_name(published, &name).ok_or_else(|| {
            GatewayError::Upstream(format!("no workflow named {name} under {org}"))
        })?;
        let version = latest_version(&workflow).ok_or_else(|| {
            GatewayError::Upstream(format!("workflow {name} has no versions"))
        })?;
        let files = self.source_files(workflow.id, version.id).await?;
        if files.is_empty() {
            return Err(GatewayError::Upstream(format!(
                "workflow {name} version {} has no source files",
                version.id
            )));
        }

        let save_dir = Path::new(output_dir).join(format!("{org}_{name}"));
        let mut written = Vec::new();
        for file in &files {
            if file.absolute_path.is_empty() || file.content.is_empty() {
                continue;
            }
            let rel = file.absolute_path.trim_start_matches('/');
            let path = save_dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &file.content)?;
            written.push(path);
        }

        let metadata = json!({
            "organization": org,
            "workflowName": name,
            "workflowId": workflow.id,
            "versionId": version.id,
            "versionName": version.name,
            "fullWorkflowPath": workflow.full_workflow_path,
            "descriptorType": workflow.descriptor_type.clone().unwrap_or_default(),
            "downloadDate": chrono::Utc::now().to_rfc3339(),
        });
        let metadata_path = save_dir.join("workflow_metadata.json");
        std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;
        written.push(metadata_path);

        let wdl_save_directory = find_wdl_leaf_dir(&save_dir);
        tracing::info!(files = written.len(), dir = %save_dir.display(), "dockstore.download done");
        Ok(DownloadReport {
            save_directory: save_dir,
            organization: org,
            workflow_name: name,
            files: written,
            wdl_save_directory,
        })
    }
}

/// First directory under `root` that holds a `.wdl` file and no
/// subdirectories, the place a runner should be pointed at.
fn find_wdl_leaf_dir(root: &Path) -> Option<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut leaves = Vec::new();
    while let Some(dir) = stack.pop() {
        // A directory we cannot read must not discard leaves found elsewhere.
        let Ok(rd) = std::fs::read_dir(&dir) else {
            continue;
        };
        let entries: Vec<_> = rd.flatten().collect();
        let subdirs: Vec<PathBuf> = entries
            .iter()
            .filter(|e| e.path().is_dir())
            .map(|e| e.path())
            .collect();
        if subdirs.is_empty() {
            let has_wdl = entries
                .iter()
                .any(|e| e.path().extension().map(|x| x == "wdl").unwrap_or(false));
            if has_wdl {
                leaves.push(dir);
            }
        } else {
            stack.extend(subdirs);
        }
    }
    leaves.sort();
    leaves.into_iter().next()
}
