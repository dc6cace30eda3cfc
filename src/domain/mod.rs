//! Typed parameter model for every tool the gateway exposes.
//!
//! Each struct deserializes straight from the MCP `arguments` object; field
//! names and defaults match the upstream CLI/HTTP surfaces they feed.

use serde::Deserialize;

fn default_dot() -> String {
    ".".to_string()
}

fn default_registry() -> String {
    "registry-vpc.miracle.ac.cn".to_string()
}

fn default_namespace() -> String {
    "auto-build".to_string()
}

fn default_top_n() -> usize {
    3
}

fn default_query_type() -> String {
    "match_phrase".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WdlValidateParams {
    pub wdl_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowInputValidateParams {
    pub wdl_path: String,
    pub input_json: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeInputsParams {
    pub template_json: String,
    pub output_json: String,
    pub sample_count: usize,
    /// Single sample object, or one object per sample.
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowImportParams {
    pub workspace_name: String,
    pub workflow_name: String,
    pub workflow_source: String,
    pub workflow_desc: String,
    #[serde(default)]
    pub main_workflow_path: Option<String>,
    #[serde(default)]
    pub ak: Option<String>,
    #[serde(default)]
    pub sk: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowImportStatusParams {
    pub workspace_name: String,
    pub workflow_id: String,
    #[serde(default)]
    pub ak: Option<String>,
    #[serde(default)]
    pub sk: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitWorkflowParams {
    pub workspace_name: String,
    pub workflow_name: String,
    pub input_json: String,
    #[serde(default)]
    pub ak: Option<String>,
    #[serde(default)]
    pub sk: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub data_model_name: Option<String>,
    #[serde(default)]
    pub call_caching: bool,
    #[serde(default)]
    pub submission_desc: Option<String>,
    #[serde(default)]
    pub force_reupload: bool,
    #[serde(default)]
    pub mount_tos: bool,
    #[serde(default)]
    pub monitor: bool,
    /// Poll interval in seconds when monitoring; must be >= 1.
    #[serde(default)]
    pub monitor_interval: Option<u32>,
    #[serde(default)]
    pub download_results: bool,
    #[serde(default)]
    pub download_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowStatusParams {
    pub workspace_name: String,
    pub submission_id: String,
    #[serde(default)]
    pub ak: Option<String>,
    #[serde(default)]
    pub sk: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowLogsParams {
    pub workspace_name: String,
    pub submission_id: String,
    #[serde(default = "default_dot")]
    pub output_dir: String,
    #[serde(default)]
    pub ak: Option<String>,
    #[serde(default)]
    pub sk: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockstoreSearchParams {
    /// Search clauses, each `[field, operator, term]`.
    pub query: Vec<Vec<String>>,
    #[serde(default = "default_query_type")]
    pub query_type: String,
    #[serde(default)]
    pub sentence: bool,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockstoreDownloadParams {
    pub url: String,
    #[serde(default = "default_dot")]
    pub output_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerBuildParams {
    pub repo_name: String,
    pub tag: String,
    /// Dockerfile or archive handed to the build service. Not required for
    /// `get_docker_image_url`.
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default = "default_registry")]
    pub registry: String,
    #[serde(default = "default_namespace")]
    pub namespace_name: String,
}

impl DockerBuildParams {
    /// `<registry>/<namespace>/<repo>:<tag>`
    pub fn image_url(&self) -> String {
        format!(
            "{}/{}/{}:{}",
            self.registry, self.namespace_name, self.repo_name, self.tag
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildStatusParams {
    pub task_id: String,
}
