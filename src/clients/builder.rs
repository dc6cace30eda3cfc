//! Client for the container image build service.
//!
//! `POST /build` takes a multipart form with the Dockerfile (or build
//! context archive) plus image coordinates; `GET /build/status/<task_id>`
//! reports progress.

use std::path::Path;
use std::time::Instant;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;

use crate::core::error::GatewayError;
use crate::domain::DockerBuildParams;
use crate::infra::config::ToolConfig;
use crate::infra::http::headers::add_standard_headers;
use crate::infra::runtime::limits::{make_http_client, make_http_client_with};

#[derive(Clone)]
pub struct ImageBuilderClient {
    base: String,
    http: Client,
}

impl ImageBuilderClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: make_http_client(),
        }
    }

    /// `None` when no base URL is configured; the build tools then report
    /// the missing configuration instead of dialing a default.
    pub fn from_config(cfg: &ToolConfig) -> Option<Self> {
        let base = cfg.base_url.clone()?;
        Some(Self {
            base,
            http: make_http_client_with(cfg),
        })
    }

    /// Submit a build. The response is passed through verbatim with the
    /// final image URL added, so task ids and service messages survive.
    pub async fn submit_build(&self, params: &DockerBuildParams) -> Result<Value, GatewayError> {
        let source_path = params.source_path.as_deref().ok_or_else(|| {
            GatewayError::InvalidParams("source_path is required to build an image".into())
        })?;
        if !Path::new(source_path).is_file() {
            return Err(GatewayError::InvalidParams(format!(
                "build source not found: {source_path}"
            )));
        }
        let bytes = tokio::fs::read(source_path).await?;
        let file_name = Path::new(source_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Dockerfile".to_string());

        let form = Form::new()
            .part("Source", Part::bytes(bytes).file_name(file_name))
            .text("Registry", params.registry.clone())
            .text("NamespaceName", params.namespace_name.clone())
            .text("RepoName", params.repo_name.clone())
            .text("ToTag", params.tag.clone());

        let url = format!("{}/build", self.base.trim_end_matches('/'));
        tracing::info!(image = %params.image_url(), "image build submit");
        let start = Instant::now();
        let (builder, _rid) = add_standard_headers(self.http.post(url), None);
        let resp = builder.multipart(form).send().await?;
        if !resp.status().is_success() {
            crate::infra::logging::log_metric("build.submit", "remote_error_total", 1.0);
            return Err(GatewayError::Upstream(format!(
                "build service returned {}",
                resp.status()
            )));
        }
        let mut result: Value = resp.json().await?;
        if let Some(obj) = result.as_object_mut() {
            obj.insert("ImageURL".into(), Value::String(params.image_url()));
        }
        crate::infra::logging::log_metric(
            "build.submit",
            "remote_latency_ms",
            start.elapsed().as_millis() as f64,
        );
        Ok(result)
    }

    pub async fn build_status(&self, task_id: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/build/status/{task_id}", self.base.trim_end_matches('/'));
        let (builder, _rid) = add_standard_headers(self.http.get(url), None);
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Upstream(format!(
                "build status returned {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn params(source: Option<&str>) -> DockerBuildParams {
        let mut v = json!({ "repo_name": "samtools", "tag": "1.19" });
        if let Some(s) = source {
            v["source_path"] = json!(s);
        }
        serde_json::from_value(v).unwrap()
    }

    #[tokio::test]
    async fn submit_posts_multipart_and_appends_image_url() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/build")
                .header_exists("x-request-id")
                .body_contains("FROM ubuntu:22.04")
                .body_contains("registry-vpc.miracle.ac.cn")
                .body_contains("auto-build")
                .body_contains("samtools");
            then.status(200).json_body(json!({ "TaskID": "t-123" }));
        });

        let mut dockerfile = tempfile::NamedTempFile::new().unwrap();
        writeln!(dockerfile, "FROM ubuntu:22.04").unwrap();

        let cli = ImageBuilderClient::new(server.base_url());
        let out = cli
            .submit_build(&params(dockerfile.path().to_str()))
            .await
            .unwrap();
        m.assert();
        assert_eq!(out["TaskID"], "t-123");
        assert_eq!(
            out["ImageURL"],
            "registry-vpc.miracle.ac.cn/auto-build/samtools:1.19"
        );
    }

    #[tokio::test]
    async fn submit_requires_an_existing_source() {
        let cli = ImageBuilderClient::new("http://127.0.0.1:1");
        let err = cli.submit_build(&params(None)).await.unwrap_err();
        assert!(err.to_string().contains("source_path"));

        let err = cli
            .submit_build(&params(Some("/no/such/Dockerfile")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn status_fetches_by_task_id() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/build/status/t-123");
            then.status(200)
                .json_body(json!({ "Status": "Building", "Progress": "2/5" }));
        });
        let cli = ImageBuilderClient::new(server.base_url());
        let out = cli.build_status("t-123").await.unwrap();
        m.assert();
        assert_eq!(out["Status"], "Building");
    }

    #[tokio::test]
    async fn upstream_failure_carries_the_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/build/status/t-err");
            then.status(502).body("bad gateway");
        });
        let cli = ImageBuilderClient::new(server.base_url());
        let err = cli.build_status("t-err").await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
