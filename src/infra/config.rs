use crate::core::error::GatewayError;

/// Default Bio-OS platform endpoint, overridable per call or via env.
pub const DEFAULT_ENDPOINT: &str = "https://bio-top.miracle.ac.cn";
/// Default Dockstore instance for search and workflow download.
pub const DEFAULT_DOCKSTORE_BASE: &str = "https://dockstore.org";

pub struct Config {
    pub mode: String, // "server" or "stdio"
    pub port: u16,
    pub endpoint: String,
    pub womtool_bin: String,
    pub dockstore: ToolConfig,
    pub builder: ToolConfig,
    pub rerank: ToolConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let mode = std::env::var("MODE").unwrap_or_else(|_| "server".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let endpoint =
            std::env::var("BIOOS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let womtool_bin = std::env::var("WOMTOOL_BIN").unwrap_or_else(|_| "womtool".into());

        let mut dockstore = ToolConfig::from_env("DOCKSTORE");
        if dockstore.base_url.is_none() {
            dockstore.base_url = Some(DEFAULT_DOCKSTORE_BASE.into());
        }
        let builder = ToolConfig::from_env("IMAGE_BUILDER");
        let rerank = ToolConfig::from_env("RERANK");

        Self {
            mode,
            port,
            endpoint,
            womtool_bin,
            dockstore,
            builder,
            rerank,
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if !matches!(self.mode.as_str(), "server" | "stdio") {
            return Err(GatewayError::InvalidParams(format!(
                "invalid MODE: {}. Must be 'server' or 'stdio'",
                self.mode
            )));
        }
        if self.mode == "server" && self.port == 0 {
            return Err(GatewayError::InvalidParams("PORT cannot be 0".into()));
        }
        Ok(())
    }
}

/// Per-backend knobs (base URL, timeouts, retries) read from
/// `<PREFIX>_BASE_URL`, `<PREFIX>_TIMEOUT_MS`, `<PREFIX>_CONNECT_TIMEOUT_MS`
/// and `<PREFIX>_RETRIES`.
#[derive(Clone, Default)]
pub struct ToolConfig {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

impl ToolConfig {
    pub fn from_env(prefix: &str) -> Self {
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();
        Self {
            base_url: var("BASE_URL").filter(|s| !s.trim().is_empty()),
            timeout_ms: var("TIMEOUT_MS").and_then(|s| s.parse().ok()),
            connect_timeout_ms: var("CONNECT_TIMEOUT_MS").and_then(|s| s.parse().ok()),
            retries: var("RETRIES").and_then(|s| s.parse().ok()),
        }
    }
}

/// Bio-OS access/secret key pair. Explicit parameters win over environment.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn resolve(ak: Option<String>, sk: Option<String>) -> Result<Self, GatewayError> {
        let access_key = ak
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("MIRACLE_ACCESS_KEY").ok().filter(|s| !s.is_empty()))
            .ok_or(GatewayError::MissingCredential("MIRACLE_ACCESS_KEY"))?;
        let secret_key = sk
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("MIRACLE_SECRET_KEY").ok().filter(|s| !s.is_empty()))
            .ok_or(GatewayError::MissingCredential("MIRACLE_SECRET_KEY"))?;
        Ok(Self {
            access_key,
            secret_key,
        })
    }
}

impl std::fmt::Debug for Credentials {
    // Keys never land in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_to_server_8080() {
        std::env::remove_var("MODE");
        std::env::remove_var("PORT");
        std::env::remove_var("BIOOS_ENDPOINT");
        let cfg = Config::from_env();
        assert_eq!(cfg.mode, "server");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.womtool_bin, "womtool");
        assert_eq!(cfg.dockstore.base_url.as_deref(), Some(DEFAULT_DOCKSTORE_BASE));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    #[serial]
    fn parses_env_overrides() {
        std::env::set_var("MODE", "stdio");
        std::env::set_var("PORT", "9090");
        std::env::set_var("WOMTOOL_BIN", "/opt/cromwell/womtool");
        let cfg = Config::from_env();
        assert_eq!(cfg.mode, "stdio");
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.womtool_bin, "/opt/cromwell/womtool");
        std::env::remove_var("MODE");
        std::env::remove_var("PORT");
        std::env::remove_var("WOMTOOL_BIN");
    }

    #[test]
    #[serial]
    fn rejects_unknown_mode() {
        std::env::set_var("MODE", "nope");
        let cfg = Config::from_env();
        assert!(cfg.validate().is_err());
        std::env::remove_var("MODE");
    }

    #[test]
    #[serial]
    fn tool_config_reads_prefixed_vars() {
        std::env::set_var("IMAGE_BUILDER_BASE_URL", "http://builder:3001");
        std::env::set_var("IMAGE_BUILDER_RETRIES", "4");
        let tc = ToolConfig::from_env("IMAGE_BUILDER");
        assert_eq!(tc.base_url.as_deref(), Some("http://builder:3001"));
        assert_eq!(tc.retries, Some(4));
        std::env::remove_var("IMAGE_BUILDER_BASE_URL");
        std::env::remove_var("IMAGE_BUILDER_RETRIES");
    }

    #[test]
    #[serial]
    fn explicit_credentials_win_over_env() {
        std::env::set_var("MIRACLE_ACCESS_KEY", "env-ak");
        std::env::set_var("MIRACLE_SECRET_KEY", "env-sk");
        let creds = Credentials::resolve(Some("ak".into()), Some("sk".into())).unwrap();
        assert_eq!(creds.access_key, "ak");
        assert_eq!(creds.secret_key, "sk");

        let creds = Credentials::resolve(None, None).unwrap();
        assert_eq!(creds.access_key, "env-ak");
        std::env::remove_var("MIRACLE_ACCESS_KEY");
        std::env::remove_var("MIRACLE_SECRET_KEY");
    }

    #[test]
    #[serial]
    fn missing_credentials_name_the_variable() {
        std::env::remove_var("MIRACLE_ACCESS_KEY");
        std::env::remove_var("MIRACLE_SECRET_KEY");
        let err = Credentials::resolve(None, None).unwrap_err();
        assert!(err.to_string().contains("MIRACLE_ACCESS_KEY"));
        let err = Credentials::resolve(Some("ak".into()), None).unwrap_err();
        assert!(err.to_string().contains("MIRACLE_SECRET_KEY"));
    }

    #[test]
    fn debug_redacts_keys() {
        let creds = Credentials {
            access_key: "AKIA".into(),
            secret_key: "deadbeef".into(),
        };
        let s = format!("{creds:?}");
        assert!(!s.contains("AKIA"));
        assert!(!s.contains("deadbeef"));
    }
}
