mod clipboard;
mod source_app;

pub use clipboard::ClipboardOutput;
pub use source_app::SourceAppOutput;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::error::AppError;
use crate::infra::os_integration::AccessibilityBridge;

/// 出力先 trait
pub trait OutputTarget: Send + Sync {
    fn deliver(&self, text: &str) -> Result<(), AppError>;
    fn name(&self) -> &str;
}

/// 結果の配信先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverTarget {
    Clipboard,
    SourceApp,
}

/// 出力ルーター: DeliverTarget に基づいてテキストを配信
pub struct OutputRouter {
    clipboard: Box<dyn OutputTarget>,
    source_app: Box<dyn OutputTarget>,
}

impl OutputRouter {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self {
            clipboard: Box::new(ClipboardOutput::new()),
            source_app: Box::new(SourceAppOutput::new(bridge)),
        }
    }

    /// 出力先を差し替えて構築（テスト用）
    pub fn with_targets(clipboard: Box<dyn OutputTarget>, source_app: Box<dyn OutputTarget>) -> Self {
        Self {
            clipboard,
            source_app,
        }
    }

    pub fn deliver(&self, target: DeliverTarget, text: &str) -> Result<(), AppError> {
        let output = match target {
            DeliverTarget::Clipboard => &self.clipboard,
            DeliverTarget::SourceApp => &self.source_app,
        };
        log::debug!("出力: {} ({} 文字)", output.name(), text.len());
        output.deliver(text)
    }
}
