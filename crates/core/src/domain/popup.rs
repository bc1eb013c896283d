use serde::Serialize;
use uuid::Uuid;

use super::rewrite_mode::RewriteMode;

/// 結果ポップアップの表示フェーズ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "text", rename_all = "snake_case")]
pub enum PopupPhase {
    Loading,
    Result(String),
    Error(String),
}

/// 送出済みリクエストの紐付け先
///
/// `popup_id` はポップアップを開くたびに、`generation` はモードを選び直すたびに進む。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestToken {
    pub popup_id: u64,
    pub generation: u64,
}

/// 結果ポップアップの状態
#[derive(Debug, Clone)]
pub struct PopupState {
    id: u64,
    generation: u64,
    phase: PopupPhase,
    selected_mode_id: Option<Uuid>,
    modes: Vec<RewriteMode>,
    source_text: String,
}

impl PopupState {
    pub fn new(id: u64, modes: Vec<RewriteMode>, source_text: String) -> Self {
        Self {
            id,
            generation: 0,
            phase: PopupPhase::Loading,
            selected_mode_id: None,
            modes,
            source_text,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> &PopupPhase {
        &self.phase
    }

    pub fn selected_mode_id(&self) -> Option<Uuid> {
        self.selected_mode_id
    }

    pub fn modes(&self) -> &[RewriteMode] {
        &self.modes
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn selected_mode(&self) -> Option<&RewriteMode> {
        let id = self.selected_mode_id?;
        self.modes.iter().find(|m| m.id == id)
    }

    pub fn find_mode(&self, id: Uuid) -> Option<&RewriteMode> {
        self.modes.iter().find(|m| m.id == id)
    }

    /// モードを選択して Loading に戻す。以前のトークンは無効になる
    pub fn begin_request(&mut self, mode_id: Uuid) -> RequestToken {
        self.generation += 1;
        self.selected_mode_id = Some(mode_id);
        self.phase = PopupPhase::Loading;
        self.current_token()
    }

    pub fn current_token(&self) -> RequestToken {
        RequestToken {
            popup_id: self.id,
            generation: self.generation,
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current_token() == token
    }

    /// 現行トークンの結果だけを反映する。古いものは false を返して無視
    pub fn apply(&mut self, token: RequestToken, outcome: Result<String, String>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.phase = match outcome {
            Ok(text) => PopupPhase::Result(text),
            Err(message) => PopupPhase::Error(message),
        };
        true
    }

    pub fn result_text(&self) -> Option<&str> {
        match &self.phase {
            PopupPhase::Result(text) => Some(text),
            _ => None,
        }
    }
}
