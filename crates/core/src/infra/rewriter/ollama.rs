use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{RewriteError, Rewriter};

/// モデル一覧取得（接続確認を兼ねる）のタイムアウト
const LIST_MODELS_TIMEOUT: Duration = Duration::from_secs(5);

/// Ollama 互換のローカルモデルサーバーを使うリライター
///
/// 生成リクエストには明示的なタイムアウトを設定しない（クライアント既定に従う）。
pub struct OllamaRewriter {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Option<Vec<ModelInfo>>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaRewriter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_models(&self) -> Result<Vec<String>, RewriteError> {
        let response = self
            .client
            .get(self.endpoint("api/tags"))
            .timeout(LIST_MODELS_TIMEOUT)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(RewriteError::Failed(format!(
                "Ollama tags error: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Failed(format!("Response parse error: {e}")))?;

        Ok(tags
            .models
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.name)
            .collect())
    }
}

fn map_transport_error(e: reqwest::Error) -> RewriteError {
    if e.is_timeout() {
        RewriteError::Timeout
    } else if e.is_connect() {
        RewriteError::NotAvailable(format!("model server unreachable: {e}"))
    } else {
        RewriteError::Failed(format!("HTTP request failed: {e}"))
    }
}

#[async_trait]
impl Rewriter for OllamaRewriter {
    async fn generate(&self, prompt: &str) -> Result<String, RewriteError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        log::debug!("Ollama generate: model={} ({} chars)", self.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint("api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RewriteError::Failed(format!(
                "Ollama API error: {status} - {body}"
            )));
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RewriteError::Failed(format!("Response parse error: {e}")))?;

        let text = gen_response.response.trim();
        if text.is_empty() {
            return Err(RewriteError::Failed("Empty response from model server".to_string()));
        }

        Ok(text.to_string())
    }

    async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => models,
            Err(e) => {
                log::warn!("モデル一覧の取得に失敗: {e}");
                vec![]
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
