use std::sync::Arc;

use crate::domain::error::AppError;
use crate::infra::os_integration::AccessibilityBridge;
use super::OutputTarget;

/// 元アプリの選択範囲を置き換える出力
pub struct SourceAppOutput {
    bridge: Arc<dyn AccessibilityBridge>,
}

impl SourceAppOutput {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self { bridge }
    }
}

impl OutputTarget for SourceAppOutput {
    fn deliver(&self, text: &str) -> Result<(), AppError> {
        self.bridge.replace_text(text)
    }

    fn name(&self) -> &str {
        "source_app"
    }
}
