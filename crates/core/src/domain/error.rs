use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_PERMISSION")]
    Permission,
    #[serde(rename = "E_NO_SELECTION")]
    NoSelection,
    #[serde(rename = "E_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "E_INTERNAL")]
    Internal,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_REWRITE")]
    Rewrite,
}

/// アプリケーションエラー
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    /// アクセシビリティ権限が未許可
    pub fn permission(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Permission,
            message: msg.into(),
            recoverable: true,
        }
    }

    /// 選択テキストなし（無音で中断する）
    pub fn no_selection() -> Self {
        Self {
            code: ErrorCode::NoSelection,
            message: "選択テキストがありません".to_string(),
            recoverable: true,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidState,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.into(),
            recoverable: false,
        }
    }

    /// モデルサーバーへのリクエスト失敗（自動リトライはしない）
    pub fn rewrite(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Rewrite,
            message: msg.into(),
            recoverable: true,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
