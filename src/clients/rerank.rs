//! Optional semantic reranker for search hits.
//!
//! The service scores each candidate text against the query; the gateway
//! falls back to the upstream ordering when the call fails or no endpoint
//! is configured.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::error::GatewayError;
use crate::infra::config::ToolConfig;
use crate::infra::http::headers::add_standard_headers;
use crate::infra::runtime::limits::{make_http_client, make_http_client_with};

#[derive(Clone)]
pub struct RerankClient {
    base: String,
    http: Client,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedItem {
    pub index: usize,
    pub score: f64,
}

impl RerankClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            http: make_http_client(),
        }
    }

    pub fn from_config(cfg: &ToolConfig) -> Option<Self> {
        let base = cfg.base_url.clone()?;
        Some(Self {
            base,
            http: make_http_client_with(cfg),
        })
    }

    /// Score `texts` against `query`, best first, truncated to `top_n`.
    pub async fn rerank(
        &self,
        query: &str,
        texts: &[String],
        top_n: usize,
    ) -> Result<Vec<RankedItem>, GatewayError> {
        let (builder, _rid) = add_standard_headers(self.http.post(self.base.clone()), None);
        let resp = builder
            .json(&RerankRequest { query, texts })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GatewayError::Upstream(format!(
                "rerank service returned {}",
                resp.status()
            )));
        }
        let mut ranked: Vec<RankedItem> = resp.json().await?;
        ranked.retain(|item| item.index < texts.len());
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_n);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn reranks_best_first_and_truncates() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).json_body_partial(r#"{ "query": "rna-seq" }"#);
            then.status(200).json_body(json!([
                { "index": 0, "score": 0.2 },
                { "index": 1, "score": 0.9 },
                { "index": 2, "score": 0.5 }
            ]));
        });

        let cli = RerankClient::new(server.base_url());
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let out = cli.rerank("rna-seq", &texts, 2).await.unwrap();
        m.assert();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].index, 1);
        assert_eq!(out[1].index, 2);
    }

    #[tokio::test]
    async fn out_of_range_indices_are_dropped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!([
                { "index": 9, "score": 1.0 },
                { "index": 0, "score": 0.1 }
            ]));
        });
        let cli = RerankClient::new(server.base_url());
        let out = cli.rerank("q", &["only".to_string()], 5).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, 0);
    }

    #[tokio::test]
    async fn failure_is_an_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(500).body("boom");
        });
        let cli = RerankClient::new(server.base_url());
        let err = cli.rerank("q", &["t".to_string()], 1).await.unwrap_err();
        assert!(err.to_string().contains("rerank service"));
    }
}
