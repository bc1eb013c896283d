use serde::Serialize;

use crate::domain::error::AppError;

/// OS権限の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    Unavailable,
}

impl PermissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unavailable => "unavailable",
        }
    }
}

/// 選択範囲の画面座標（ポップアップの配置に使う）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 選択テキストの取得と書き戻しを行う OS ブリッジ
pub trait AccessibilityBridge: Send + Sync {
    fn is_trusted(&self) -> bool;
    fn request_permission(&self);
    fn selected_text(&self) -> Option<String>;
    fn selection_rect(&self) -> Rect;
    fn replace_text(&self, text: &str) -> Result<(), AppError>;
}

/// OS権限チェッカー
pub struct OsIntegration;

impl OsIntegration {
    /// アクセシビリティ権限をチェック（macOS）
    #[cfg(target_os = "macos")]
    pub fn check_accessibility_permission() -> PermissionState {
        #[link(name = "ApplicationServices", kind = "framework")]
        extern "C" {
            fn AXIsProcessTrusted() -> bool;
        }

        if unsafe { AXIsProcessTrusted() } {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn check_accessibility_permission() -> PermissionState {
        PermissionState::Unavailable
    }

    /// システム設定のアクセシビリティ画面を開く（macOS）
    #[cfg(target_os = "macos")]
    pub fn open_accessibility_settings() {
        let url = "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";
        if let Err(e) = std::process::Command::new("open").arg(url).spawn() {
            log::error!("システム設定を開けませんでした: {e}");
        }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn open_accessibility_settings() {
        log::info!("アクセシビリティ設定はこのOSでは不要です");
    }

    /// 警告音（ターミナルベル）
    pub fn beep() {
        use std::io::Write;
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

/// クリップボード経由のブリッジ（どの OS でも動くフォールバック）
///
/// 「選択テキスト」はクリップボードの内容、「置換」はクリップボードへの書き込み。
#[derive(Debug, Default)]
pub struct ClipboardBridge;

impl ClipboardBridge {
    pub fn new() -> Self {
        Self
    }
}

impl AccessibilityBridge for ClipboardBridge {
    fn is_trusted(&self) -> bool {
        true
    }

    fn request_permission(&self) {
        OsIntegration::open_accessibility_settings();
    }

    fn selected_text(&self) -> Option<String> {
        arboard::Clipboard::new()
            .and_then(|mut ctx| ctx.get_text())
            .map_err(|e| log::warn!("クリップボード読み込み失敗: {e}"))
            .ok()
    }

    fn selection_rect(&self) -> Rect {
        Rect::default()
    }

    fn replace_text(&self, text: &str) -> Result<(), AppError> {
        let mut ctx = arboard::Clipboard::new()
            .map_err(|e| AppError::internal(format!("クリップボード初期化失敗: {e}")))?;
        ctx.set_text(text)
            .map_err(|e| AppError::internal(format!("クリップボード書き込み失敗: {e}")))?;
        log::info!("置換テキストをクリップボードに書き戻し: {} 文字", text.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_accessibility_permission() {
        let state = OsIntegration::check_accessibility_permission();
        if cfg!(target_os = "macos") {
            assert_ne!(state, PermissionState::Unavailable);
        } else {
            assert_eq!(state, PermissionState::Unavailable);
        }
        assert!(!state.as_str().is_empty());
    }

    #[test]
    fn test_clipboard_bridge_is_always_trusted() {
        let bridge = ClipboardBridge::new();
        assert!(bridge.is_trusted());
        assert_eq!(bridge.selection_rect(), Rect::default());
    }

    #[test]
    fn test_rect_serialization() {
        let rect = Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        };
        let json = serde_json::to_string(&rect).unwrap();
        assert!(json.contains("\"width\":3.0"));
    }
}
