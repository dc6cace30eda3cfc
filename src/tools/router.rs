//! The unified MCP handler: one service struct carrying every backend,
//! with a tool router generated over it.

use std::future::Future;

use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::model::{
    GetPromptRequestParam, GetPromptResult, Implementation, JsonObject, ListPromptsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::{json, Value};

use crate::clients::builder::ImageBuilderClient;
use crate::clients::dockstore::{DockstoreClient, EsHit};
use crate::clients::rerank::RerankClient;
use crate::compose;
use crate::core::error::GatewayError;
use crate::domain::{
    BuildStatusParams, ComposeInputsParams, DockerBuildParams, DockstoreDownloadParams,
    DockstoreSearchParams, SubmitWorkflowParams, WdlValidateParams, WorkflowImportParams,
    WorkflowImportStatusParams, WorkflowInputValidateParams, WorkflowLogsParams,
    WorkflowStatusParams,
};
use crate::exec::bw::BwSuite;
use crate::exec::womtool::Womtool;
use crate::exec::ProcessOutput;
use crate::infra::config::{Config, Credentials, DEFAULT_DOCKSTORE_BASE};
use crate::tools::prompts;

#[derive(Clone)]
pub struct BioosGatewaySvc {
    tool_router: ToolRouter<Self>,
    womtool: Womtool,
    bw: BwSuite,
    dockstore: DockstoreClient,
    builder: Option<ImageBuilderClient>,
    rerank: Option<RerankClient>,
}

fn parse<T: serde::de::DeserializeOwned>(params: JsonObject) -> Result<T, ErrorData> {
    serde_json::from_value(Value::Object(params))
        .map_err(|e| ErrorData::invalid_params(e.to_string(), None))
}

/// Common reply shape for the CLI-backed tools.
fn process_reply(out: ProcessOutput) -> rmcp::Json<Value> {
    rmcp::Json(json!({
        "success": out.success,
        "status": out.status,
        "output": out.combined(),
    }))
}

#[rmcp::tool_router]
impl BioosGatewaySvc {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            tool_router: Self::tool_router(),
            womtool: Womtool::new(cfg.womtool_bin.clone()),
            bw: BwSuite::new(cfg.endpoint.clone()),
            dockstore: DockstoreClient::from_config(&cfg.dockstore, DEFAULT_DOCKSTORE_BASE),
            builder: ImageBuilderClient::from_config(&cfg.builder),
            rerank: RerankClient::from_config(&cfg.rerank),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect()
    }

    fn builder_client(&self) -> Result<&ImageBuilderClient, ErrorData> {
        self.builder.as_ref().ok_or_else(|| {
            GatewayError::NotConfigured("image builder", "IMAGE_BUILDER_BASE_URL").into_mcp()
        })
    }

    #[rmcp::tool(
        name = "validate_wdl",
        description = "Validate WDL syntax with womtool. Input: wdl_path."
    )]
    async fn validate_wdl(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WdlValidateParams = parse(params.0)?;
        let out = self
            .womtool
            .validate(&p.wdl_path)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "validate_workflow_input_json",
        description = "Validate an inputs JSON against a WDL with womtool. Input: wdl_path, input_json."
    )]
    async fn validate_workflow_input_json(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WorkflowInputValidateParams = parse(params.0)?;
        let out = self
            .womtool
            .validate_inputs(&p.wdl_path, &p.input_json)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "compose_input_json",
        description = "Fill a womtool inputs template per sample and write the result. Input: template_json, output_json, sample_count, params (one object or a list)."
    )]
    async fn compose_input_json(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: ComposeInputsParams = parse(params.0)?;
        let samples = compose::normalize_samples(&p.params, p.sample_count)
            .map_err(GatewayError::into_mcp)?;
        let (filled, errors) =
            compose::build_inputs(&p.template_json, &samples).map_err(GatewayError::into_mcp)?;
        if !errors.is_empty() {
            return Ok(rmcp::Json(json!({
                "success": false,
                "errors": errors,
            })));
        }
        compose::write_inputs(&p.output_json, &filled).map_err(GatewayError::into_mcp)?;
        Ok(rmcp::Json(json!({
            "success": true,
            "output_json": p.output_json,
            "sample_count": filled.len(),
        })))
    }

    #[rmcp::tool(
        name = "import_workflow",
        description = "Import a WDL workflow into a Bio-OS workspace via bw_import. Input: workspace_name, workflow_name, workflow_source, workflow_desc, optional main_workflow_path/ak/sk/endpoint."
    )]
    async fn import_workflow(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WorkflowImportParams = parse(params.0)?;
        let creds =
            Credentials::resolve(p.ak.clone(), p.sk.clone()).map_err(GatewayError::into_mcp)?;
        let out = self.bw.import(&p, &creds).await.map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "check_workflow_import_status",
        description = "Check a Bio-OS workflow import via bw_import_status_check. Input: workspace_name, workflow_id, optional ak/sk/endpoint."
    )]
    async fn check_workflow_import_status(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WorkflowImportStatusParams = parse(params.0)?;
        let creds =
            Credentials::resolve(p.ak.clone(), p.sk.clone()).map_err(GatewayError::into_mcp)?;
        let out = self
            .bw
            .import_status(&p, &creds)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "submit_workflow",
        description = "Submit a Bio-OS workflow run via bw. Input: workspace_name, workflow_name, input_json, plus optional flags (call_caching, monitor, monitor_interval, download_results, ...)."
    )]
    async fn submit_workflow(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: SubmitWorkflowParams = parse(params.0)?;
        let creds =
            Credentials::resolve(p.ak.clone(), p.sk.clone()).map_err(GatewayError::into_mcp)?;
        let out = self.bw.submit(&p, &creds).await.map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "check_workflow_run_status",
        description = "Check a Bio-OS submission via bw_status_check. Input: workspace_name, submission_id, optional ak/sk/endpoint."
    )]
    async fn check_workflow_run_status(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WorkflowStatusParams = parse(params.0)?;
        let creds =
            Credentials::resolve(p.ak.clone(), p.sk.clone()).map_err(GatewayError::into_mcp)?;
        let out = self
            .bw
            .run_status(&p, &creds)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "get_workflow_logs",
        description = "Download logs for a Bio-OS submission via get_submission_logs. Input: workspace_name, submission_id, optional output_dir/ak/sk/endpoint."
    )]
    async fn get_workflow_logs(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: WorkflowLogsParams = parse(params.0)?;
        let creds =
            Credentials::resolve(p.ak.clone(), p.sk.clone()).map_err(GatewayError::into_mcp)?;
        let out = self.bw.logs(&p, &creds).await.map_err(GatewayError::into_mcp)?;
        Ok(process_reply(out))
    }

    #[rmcp::tool(
        name = "search_dockstore",
        description = "Search Dockstore workflows. Input: query as [[field, operator, term], ...], optional query_type (match_phrase|wildcard), sentence, top_n. Returns a name-to-URL map of the best hits."
    )]
    async fn search_dockstore(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: DockstoreSearchParams = parse(params.0)?;
        if !matches!(p.query_type.as_str(), "match_phrase" | "wildcard") {
            return Err(ErrorData::invalid_params(
                format!("unknown query_type: {} (use match_phrase or wildcard)", p.query_type),
                None,
            ));
        }
        let resp = self.dockstore.search(&p).await.map_err(GatewayError::into_mcp)?;
        let hits = resp.hits.hits;
        if hits.is_empty() {
            return Err(ErrorData::internal_error(
                "no matching workflows found".to_string(),
                None,
            ));
        }
        let top = self.pick_top_hits(&p, &hits).await;
        let results = self.dockstore.result_map(&top);
        Ok(rmcp::Json(json!({ "results": results })))
    }

    #[rmcp::tool(
        name = "fetch_wdl_from_dockstore",
        description = "Download a workflow's source files from Dockstore. Input: url (workflow path or full URL), optional output_path."
    )]
    async fn fetch_wdl_from_dockstore(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: DockstoreDownloadParams = parse(params.0)?;
        let report = self
            .dockstore
            .download(&p.url, &p.output_path)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(rmcp::Json(json!({
            "success": true,
            "save_directory": report.save_directory,
            "organization": report.organization,
            "workflow_name": report.workflow_name,
            "files": report.files,
            "wdl_save_directory": report.wdl_save_directory,
        })))
    }

    #[rmcp::tool(
        name = "build_docker_image",
        description = "Submit a container image build. Input: repo_name, tag, source_path (Dockerfile or context archive), optional registry/namespace_name."
    )]
    async fn build_docker_image(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: DockerBuildParams = parse(params.0)?;
        let client = self.builder_client()?;
        let result = client
            .submit_build(&p)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(rmcp::Json(result))
    }

    #[rmcp::tool(
        name = "check_build_status",
        description = "Check a container image build. Input: task_id from build_docker_image."
    )]
    async fn check_build_status(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: BuildStatusParams = parse(params.0)?;
        let client = self.builder_client()?;
        let result = client
            .build_status(&p.task_id)
            .await
            .map_err(GatewayError::into_mcp)?;
        Ok(rmcp::Json(result))
    }

    #[rmcp::tool(
        name = "get_docker_image_url",
        description = "Compute the full image URL for given coordinates. Input: repo_name, tag, optional registry/namespace_name."
    )]
    async fn get_docker_image_url(
        &self,
        params: Parameters<JsonObject>,
    ) -> Result<rmcp::Json<Value>, ErrorData> {
        let p: DockerBuildParams = parse(params.0)?;
        Ok(rmcp::Json(json!({ "image_url": p.image_url() })))
    }
}

impl BioosGatewaySvc {
    /// Rerank the hits when a reranker is configured, otherwise keep the
    /// upstream score order. A rerank failure falls back rather than failing
    /// the search.
    async fn pick_top_hits<'a>(
        &self,
        p: &DockstoreSearchParams,
        hits: &'a [EsHit],
    ) -> Vec<&'a EsHit> {
        if let Some(rerank) = &self.rerank {
            let texts: Vec<String> = hits.iter().map(|h| h.source.rerank_text()).collect();
            let user_query: String = p
                .query
                .iter()
                .filter(|c| c.len() == 3)
                .map(|c| c[2].as_str())
                .collect::<Vec<_>>()
                .join(" ");
            match rerank.rerank(&user_query, &texts, p.top_n).await {
                Ok(ranked) => {
                    return ranked.iter().filter_map(|r| hits.get(r.index)).collect();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rerank failed, keeping search order");
                }
            }
        }
        hits.iter().take(p.top_n).collect()
    }
}

#[rmcp::tool_handler]
impl ServerHandler for BioosGatewaySvc {
    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(prompts::list())
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        prompts::get(&request.name)
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Bio-OS workflow gateway. Typical flow: validate_wdl, \
                 compose_input_json, validate_workflow_input_json, \
                 import_workflow, check_workflow_import_status, \
                 submit_workflow, check_workflow_run_status, \
                 get_workflow_logs. search_dockstore and \
                 fetch_wdl_from_dockstore find existing workflows; \
                 build_docker_image, check_build_status and \
                 get_docker_image_url manage container images."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn svc() -> BioosGatewaySvc {
        BioosGatewaySvc::from_config(&Config::from_env())
    }

    fn args(v: Value) -> Parameters<JsonObject> {
        match v {
            Value::Object(map) => Parameters(map),
            _ => panic!("arguments must be an object"),
        }
    }

    #[test]
    fn router_exposes_every_tool() {
        let names = svc().tool_names();
        for expected in [
            "validate_wdl",
            "validate_workflow_input_json",
            "compose_input_json",
            "import_workflow",
            "check_workflow_import_status",
            "submit_workflow",
            "check_workflow_run_status",
            "get_workflow_logs",
            "search_dockstore",
            "fetch_wdl_from_dockstore",
            "build_docker_image",
            "check_build_status",
            "get_docker_image_url",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing tool {expected}");
        }
        assert_eq!(names.len(), 13);
    }

    #[tokio::test]
    async fn get_docker_image_url_is_pure() {
        let out = svc()
            .get_docker_image_url(args(json!({ "repo_name": "bwa", "tag": "0.7.17" })))
            .await
            .unwrap();
        assert_eq!(
            out.0["image_url"],
            "registry-vpc.miracle.ac.cn/auto-build/bwa:0.7.17"
        );
    }

    #[tokio::test]
    async fn malformed_arguments_are_invalid_params() {
        let err = svc().validate_wdl(args(json!({}))).await.map(|_| ()).unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn unknown_query_type_is_rejected() {
        let err = svc()
            .search_dockstore(args(json!({
                "query": [["description", "AND", "gatk"]],
                "query_type": "regexp"
            })))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("query_type"));
    }

    #[tokio::test]
    #[serial]
    async fn missing_credentials_surface_as_invalid_params() {
        std::env::remove_var("MIRACLE_ACCESS_KEY");
        std::env::remove_var("MIRACLE_SECRET_KEY");
        let err = svc()
            .check_workflow_run_status(args(json!({
                "workspace_name": "ws",
                "submission_id": "sub-1"
            })))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("MIRACLE_ACCESS_KEY"));
    }

    #[tokio::test]
    #[serial]
    async fn build_tools_require_configuration() {
        std::env::remove_var("IMAGE_BUILDER_BASE_URL");
        let err = svc()
            .check_build_status(args(json!({ "task_id": "t-1" })))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.code.0, -32603);
        assert!(err.message.contains("IMAGE_BUILDER_BASE_URL"));
    }

    #[tokio::test]
    async fn compose_tool_writes_the_inputs_file() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("template.json");
        std::fs::write(
            &tpl,
            r#"{ "wf.name": "String", "wf.threads": "Int (optional, default = 4)" }"#,
        )
        .unwrap();
        let out_path = dir.path().join("inputs.json");

        let out = svc()
            .compose_input_json(args(json!({
                "template_json": tpl.to_str().unwrap(),
                "output_json": out_path.to_str().unwrap(),
                "sample_count": 2,
                "params": { "wf.name": "s" }
            })))
            .await
            .unwrap();
        assert_eq!(out.0["success"], true);
        assert_eq!(out.0["sample_count"], 2);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(written[0]["wf.threads"], 4);
    }

    #[tokio::test]
    async fn compose_tool_reports_rule_violations() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("template.json");
        std::fs::write(&tpl, r#"{ "wf.name": "String" }"#).unwrap();

        let out = svc()
            .compose_input_json(args(json!({
                "template_json": tpl.to_str().unwrap(),
                "output_json": dir.path().join("inputs.json").to_str().unwrap(),
                "sample_count": 1,
                "params": { "wf.unknown": 1 }
            })))
            .await
            .unwrap();
        assert_eq!(out.0["success"], false);
        let errors = out.0["errors"].as_array().unwrap();
        assert!(errors[0].as_str().unwrap().contains("wf.name"));
        assert!(errors[0].as_str().unwrap().contains("wf.unknown"));
    }

    #[test]
    fn info_advertises_tools_and_prompts() {
        let info = svc().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert!(info.instructions.unwrap().contains("validate_wdl"));
    }
}
