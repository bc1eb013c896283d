use async_trait::async_trait;

use super::prompts::RESPONSE_RULES;
use super::{RewriteError, Rewriter};

/// NoopRewriter: プロンプト末尾の入力テキストをそのまま返すオフライン実装
pub struct NoopRewriter;

#[async_trait]
impl Rewriter for NoopRewriter {
    async fn generate(&self, prompt: &str) -> Result<String, RewriteError> {
        // 入力テキストは固定の出力ルール + 空行の直後に埋め込まれている
        let marker = format!("{RESPONSE_RULES}\n\n");
        let text = prompt
            .split_once(&marker)
            .map(|(_, text)| text)
            .unwrap_or(prompt);
        Ok(text.to_string())
    }

    async fn list_models(&self) -> Vec<String> {
        vec![]
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rewrite_mode::RewriteMode;
    use crate::infra::rewriter::prompts;

    #[tokio::test]
    async fn test_noop_returns_input_text() {
        let prompt = prompts::build(&RewriteMode::fix_grammar(), "she dont like it\n\nat all");
        let result = NoopRewriter.generate(&prompt).await.unwrap();
        assert_eq!(result, "she dont like it\n\nat all");
    }

    #[tokio::test]
    async fn test_noop_has_no_models() {
        assert!(NoopRewriter.list_models().await.is_empty());
    }

    #[test]
    fn test_noop_name() {
        assert_eq!(NoopRewriter.name(), "noop");
    }
}
