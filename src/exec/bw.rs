//! Wrappers for the Bio-OS `bw*` CLI suite (import, submit, status, logs).
//!
//! The argv layouts mirror the upstream tools exactly; optional flags are
//! emitted only when set.

use crate::core::error::GatewayError;
use crate::domain::{
    SubmitWorkflowParams, WorkflowImportParams, WorkflowImportStatusParams, WorkflowLogsParams,
    WorkflowStatusParams,
};
use crate::exec::{run_capture, ProcessOutput};
use crate::infra::config::Credentials;

/// Entry point for every Bio-OS workflow-lifecycle call.
#[derive(Clone)]
pub struct BwSuite {
    /// Endpoint used when a call does not carry its own.
    pub default_endpoint: String,
}

fn common_args(
    tool_endpoint: Option<&str>,
    default_endpoint: &str,
    creds: &Credentials,
    workspace_name: &str,
) -> Vec<String> {
    vec![
        "--ak".into(),
        creds.access_key.clone(),
        "--sk".into(),
        creds.secret_key.clone(),
        "--endpoint".into(),
        tool_endpoint.unwrap_or(default_endpoint).to_string(),
        "--workspace_name".into(),
        workspace_name.into(),
    ]
}

impl BwSuite {
    pub fn new(default_endpoint: impl Into<String>) -> Self {
        Self {
            default_endpoint: default_endpoint.into(),
        }
    }

    pub fn import_args(&self, p: &WorkflowImportParams, creds: &Credentials) -> Vec<String> {
        let mut args = common_args(
            p.endpoint.as_deref(),
            &self.default_endpoint,
            creds,
            &p.workspace_name,
        );
        args.extend([
            "--workflow_name".into(),
            p.workflow_name.clone(),
            "--workflow_source".into(),
            p.workflow_source.clone(),
            "--workflow_desc".into(),
            p.workflow_desc.clone(),
        ]);
        if let Some(main) = &p.main_workflow_path {
            args.extend(["--main_path".into(), main.clone()]);
        }
        args
    }

    pub fn import_status_args(
        &self,
        p: &WorkflowImportStatusParams,
        creds: &Credentials,
    ) -> Vec<String> {
        let mut args = common_args(
            p.endpoint.as_deref(),
            &self.default_endpoint,
            creds,
            &p.workspace_name,
        );
        args.extend(["--workflow_id".into(), p.workflow_id.clone()]);
        args
    }

    pub fn submit_args(&self, p: &SubmitWorkflowParams, creds: &Credentials) -> Vec<String> {
        let mut args = common_args(
            p.endpoint.as_deref(),
            &self.default_endpoint,
            creds,
            &p.workspace_name,
        );
        args.extend([
            "--workflow_name".into(),
            p.workflow_name.clone(),
            "--input_json".into(),
            p.input_json.clone(),
        ]);
        if let Some(v) = &p.data_model_name {
            args.extend(["--data_model_name".into(), v.clone()]);
        }
        if p.call_caching {
            args.push("--call_caching".into());
        }
        if let Some(v) = &p.submission_desc {
            args.extend(["--submission_desc".into(), v.clone()]);
        }
        if p.force_reupload {
            args.push("--force_reupload".into());
        }
        if p.mount_tos {
            args.push("--mount_tos".into());
        }
        if p.monitor {
            args.push("--monitor".into());
        }
        if let Some(v) = p.monitor_interval {
            args.extend(["--monitor_interval".into(), v.to_string()]);
        }
        if p.download_results {
            args.push("--download_results".into());
        }
        if let Some(v) = &p.download_dir {
            args.extend(["--download_dir".into(), v.clone()]);
        }
        args
    }

    pub fn status_args(&self, p: &WorkflowStatusParams, creds: &Credentials) -> Vec<String> {
        let mut args = common_args(
            p.endpoint.as_deref(),
            &self.default_endpoint,
            creds,
            &p.workspace_name,
        );
        args.extend(["--submission_id".into(), p.submission_id.clone()]);
        args
    }

    pub fn logs_args(&self, p: &WorkflowLogsParams, creds: &Credentials) -> Vec<String> {
        let mut args = common_args(
            p.endpoint.as_deref(),
            &self.default_endpoint,
            creds,
            &p.workspace_name,
        );
        args.extend(["--submission_id".into(), p.submission_id.clone()]);
        if p.output_dir != "." {
            args.extend(["--output_dir".into(), p.output_dir.clone()]);
        }
        args
    }

    pub async fn import(
        &self,
        p: &WorkflowImportParams,
        creds: &Credentials,
    ) -> Result<ProcessOutput, GatewayError> {
        run_capture("bw_import", &self.import_args(p, creds), None).await
    }

    pub async fn import_status(
        &self,
        p: &WorkflowImportStatusParams,
        creds: &Credentials,
    ) -> Result<ProcessOutput, GatewayError> {
        run_capture(
            "bw_import_status_check",
            &self.import_status_args(p, creds),
            None,
        )
        .await
    }

    /// May run for the whole workflow lifetime when `--monitor` is set, so no
    /// timeout here.
    pub async fn submit(
        &self,
        p: &SubmitWorkflowParams,
        creds: &Credentials,
    ) -> Result<ProcessOutput, GatewayError> {
        if let Some(interval) = p.monitor_interval {
            if interval == 0 {
                return Err(GatewayError::InvalidParams(
                    "monitor_interval must be >= 1".into(),
                ));
            }
        }
        run_capture("bw", &self.submit_args(p, creds), None).await
    }

    pub async fn run_status(
        &self,
        p: &WorkflowStatusParams,
        creds: &Credentials,
    ) -> Result<ProcessOutput, GatewayError> {
        run_capture("bw_status_check", &self.status_args(p, creds), None).await
    }

    pub async fn logs(
        &self,
        p: &WorkflowLogsParams,
        creds: &Credentials,
    ) -> Result<ProcessOutput, GatewayError> {
        run_capture("get_submission_logs", &self.logs_args(p, creds), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials {
            access_key: "AK".into(),
            secret_key: "SK".into(),
        }
    }

    fn suite() -> BwSuite {
        BwSuite::new("https://bio-top.miracle.ac.cn")
    }

    #[test]
    fn submit_args_minimal_layout() {
        let p: SubmitWorkflowParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "workflow_name": "wf",
            "input_json": "/tmp/inputs.json"
        }))
        .unwrap();
        let args = suite().submit_args(&p, &creds());
        assert_eq!(
            args,
            vec![
                "--ak",
                "AK",
                "--sk",
                "SK",
                "--endpoint",
                "https://bio-top.miracle.ac.cn",
                "--workspace_name",
                "ws",
                "--workflow_name",
                "wf",
                "--input_json",
                "/tmp/inputs.json",
            ]
        );
    }

    #[test]
    fn submit_args_emit_flags_only_when_set() {
        let p: SubmitWorkflowParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "workflow_name": "wf",
            "input_json": "/tmp/inputs.json",
            "call_caching": true,
            "monitor": true,
            "monitor_interval": 30,
            "submission_desc": "nightly run",
            "download_results": true,
            "download_dir": "/data/out"
        }))
        .unwrap();
        let args = suite().submit_args(&p, &creds());
        assert!(args.contains(&"--call_caching".to_string()));
        assert!(args.contains(&"--monitor".to_string()));
        let i = args.iter().position(|a| a == "--monitor_interval").unwrap();
        assert_eq!(args[i + 1], "30");
        assert!(args.contains(&"--download_results".to_string()));
        assert!(!args.contains(&"--force_reupload".to_string()));
        assert!(!args.contains(&"--mount_tos".to_string()));
    }

    #[test]
    fn per_call_endpoint_overrides_default() {
        let p: WorkflowStatusParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "submission_id": "sub-1",
            "endpoint": "https://other.example"
        }))
        .unwrap();
        let args = suite().status_args(&p, &creds());
        let i = args.iter().position(|a| a == "--endpoint").unwrap();
        assert_eq!(args[i + 1], "https://other.example");
    }

    #[test]
    fn import_args_include_main_path_when_given() {
        let p: WorkflowImportParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "workflow_name": "wf",
            "workflow_source": "/wdl/dir",
            "workflow_desc": "demo",
            "main_workflow_path": "/wdl/dir/main.wdl"
        }))
        .unwrap();
        let args = suite().import_args(&p, &creds());
        let i = args.iter().position(|a| a == "--main_path").unwrap();
        assert_eq!(args[i + 1], "/wdl/dir/main.wdl");
    }

    #[test]
    fn logs_args_skip_default_output_dir() {
        let p: WorkflowLogsParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "submission_id": "sub-1"
        }))
        .unwrap();
        let args = suite().logs_args(&p, &creds());
        assert!(!args.contains(&"--output_dir".to_string()));

        let p: WorkflowLogsParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "submission_id": "sub-1",
            "output_dir": "/tmp/logs"
        }))
        .unwrap();
        let args = suite().logs_args(&p, &creds());
        let i = args.iter().position(|a| a == "--output_dir").unwrap();
        assert_eq!(args[i + 1], "/tmp/logs");
    }

    #[tokio::test]
    async fn zero_monitor_interval_is_rejected_before_spawn() {
        let p: SubmitWorkflowParams = serde_json::from_value(json!({
            "workspace_name": "ws",
            "workflow_name": "wf",
            "input_json": "/tmp/in.json",
            "monitor_interval": 0
        }))
        .unwrap();
        let err = suite().submit(&p, &creds()).await.unwrap_err();
        assert!(err.to_string().contains("monitor_interval"));
    }
}
