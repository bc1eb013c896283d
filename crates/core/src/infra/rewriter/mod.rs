pub mod ollama;
mod noop;
pub mod prompts;

pub use noop::NoopRewriter;
pub use ollama::OllamaRewriter;

use async_trait::async_trait;

use crate::domain::error::AppError;

/// リライトエラー
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("Rewriter not available: {0}")]
    NotAvailable(String),
    #[error("Rewrite failed: {0}")]
    Failed(String),
    #[error("Rewrite timeout")]
    Timeout,
}

impl From<RewriteError> for AppError {
    fn from(e: RewriteError) -> Self {
        AppError::rewrite(e.to_string())
    }
}

/// モデルサーバーへのクライアント trait
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// 組み立て済みプロンプトを送り、生成テキストを返す
    async fn generate(&self, prompt: &str) -> Result<String, RewriteError>;

    /// 利用可能なモデル名一覧（失敗時は空）
    async fn list_models(&self) -> Vec<String>;

    fn name(&self) -> &str;
}
