use std::path::Path;
use std::time::Duration;

use crate::core::error::GatewayError;
use crate::exec::{run_capture, ProcessOutput};

const WOMTOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Wrapper around the Cromwell `womtool` syntax checker.
#[derive(Clone)]
pub struct Womtool {
    bin: String,
}

impl Womtool {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// `womtool validate <wdl>`
    pub async fn validate(&self, wdl_path: &str) -> Result<ProcessOutput, GatewayError> {
        if !Path::new(wdl_path).is_file() {
            return Err(GatewayError::InvalidParams(format!(
                "WDL file not found: {wdl_path}"
            )));
        }
        let args = vec!["validate".to_string(), wdl_path.to_string()];
        run_capture(&self.bin, &args, Some(WOMTOOL_TIMEOUT)).await
    }

    /// `womtool validate <wdl> --inputs <json>`
    pub async fn validate_inputs(
        &self,
        wdl_path: &str,
        input_json: &str,
    ) -> Result<ProcessOutput, GatewayError> {
        for (label, path) in [("WDL file", wdl_path), ("input file", input_json)] {
            if !Path::new(path).is_file() {
                return Err(GatewayError::InvalidParams(format!(
                    "{label} not found: {path}"
                )));
            }
        }
        let args = vec![
            "validate".to_string(),
            wdl_path.to_string(),
            "--inputs".to_string(),
            input_json.to_string(),
        ];
        run_capture(&self.bin, &args, Some(WOMTOOL_TIMEOUT)).await
    }

    /// Connectivity probe used by the admin CLI.
    pub async fn version(&self) -> Result<ProcessOutput, GatewayError> {
        run_capture(&self.bin, &["--version".to_string()], Some(WOMTOOL_TIMEOUT)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn validate_rejects_missing_wdl_path() {
        let tool = Womtool::new("womtool");
        let err = tool.validate("/no/such/file.wdl").await.unwrap_err();
        assert!(err.to_string().contains("WDL file not found"));
    }

    #[tokio::test]
    async fn validate_inputs_names_the_missing_file() {
        let mut wdl = tempfile::NamedTempFile::new().unwrap();
        writeln!(wdl, "version 1.0").unwrap();

        let tool = Womtool::new("womtool");
        let err = tool
            .validate_inputs(wdl.path().to_str().unwrap(), "/no/inputs.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input file not found"));
    }

    #[tokio::test]
    async fn missing_womtool_binary_is_reported() {
        let mut wdl = tempfile::NamedTempFile::new().unwrap();
        writeln!(wdl, "version 1.0").unwrap();

        let tool = Womtool::new("womtool-test-missing-binary");
        let err = tool.validate(wdl.path().to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("womtool-test-missing-binary"));
    }
}
