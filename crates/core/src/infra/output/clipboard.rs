use crate::domain::error::AppError;
use super::OutputTarget;

/// クリップボード出力（arboard）
pub struct ClipboardOutput;

impl ClipboardOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClipboardOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTarget for ClipboardOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        let mut ctx = arboard::Clipboard::new()
            .map_err(|e| AppError::internal(format!("クリップボード初期化失敗: {e}")))?;
        ctx.set_text(text)
            .map_err(|e| AppError::internal(format!("クリップボード書き込み失敗: {e}")))?;
        log::info!("クリップボードに出力: {} 文字", text.len());
        Ok(())
    }

    fn name(&self) -> &str {
        "clipboard"
    }
}
