use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 予約モード「Fix Grammar」の固定ID（ロード時に必ず存在する）
pub const FIX_GRAMMAR_MODE_ID: Uuid = Uuid::from_u128(0x5f1e_c0de_0000_4000_8000_0000_0000_0001);

pub const FIX_GRAMMAR_NAME: &str = "Fix Grammar";

pub const FIX_GRAMMAR_PROMPT: &str = "Fix any grammar, spelling, and punctuation errors in the following text. \
Never use em dashes or semicolons. Use commas or periods instead. \
Preserve the original meaning, tone, and formatting.";

/// 名前一致で特別扱いされるトーンモード
pub const MY_TONE_NAME: &str = "My Tone";

pub const DEFAULT_TONE_DESCRIPTION: &str = "casual and friendly, like texting a close colleague";

const MY_TONE_MODE_ID: Uuid = Uuid::from_u128(0x5f1e_c0de_0000_4000_8000_0000_0000_0002);
const PROFESSIONAL_MODE_ID: Uuid = Uuid::from_u128(0x5f1e_c0de_0000_4000_8000_0000_0000_0003);
const CONCISE_MODE_ID: Uuid = Uuid::from_u128(0x5f1e_c0de_0000_4000_8000_0000_0000_0004);
const FRIENDLY_MODE_ID: Uuid = Uuid::from_u128(0x5f1e_c0de_0000_4000_8000_0000_0000_0005);

/// リライトモード（名前付きプロンプトテンプレート）
///
/// 等価性は id / name / prompt の構造比較。永続化は `{"id","name","prompt"}` の
/// フラットな JSON レコード。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteMode {
    pub id: Uuid,
    pub name: String,
    pub prompt: String,
}

impl RewriteMode {
    /// バリデーションなし（空文字も許容）
    pub fn new(id: Uuid, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            prompt: prompt.into(),
        }
    }

    /// ユーザー作成モード（ランダムID）
    pub fn new_custom(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), name, prompt)
    }

    pub fn fix_grammar() -> Self {
        Self::new(FIX_GRAMMAR_MODE_ID, FIX_GRAMMAR_NAME, FIX_GRAMMAR_PROMPT)
    }

    pub fn is_reserved(&self) -> bool {
        self.id == FIX_GRAMMAR_MODE_ID
    }
}

/// 組み込みデフォルトモード一覧（先頭は必ず Fix Grammar）
pub fn default_rewrite_modes() -> Vec<RewriteMode> {
    vec![
        RewriteMode::fix_grammar(),
        RewriteMode::new(MY_TONE_MODE_ID, MY_TONE_NAME, DEFAULT_TONE_DESCRIPTION),
        RewriteMode::new(
            PROFESSIONAL_MODE_ID,
            "Professional",
            "Rewrite the following text in a clear, professional tone suitable for work email. \
Fix any grammar, spelling, and punctuation errors.",
        ),
        RewriteMode::new(
            CONCISE_MODE_ID,
            "Concise",
            "Rewrite the following text to be shorter and more direct. \
Remove filler words and redundancy while keeping every key point.",
        ),
        RewriteMode::new(
            FRIENDLY_MODE_ID,
            "Friendly",
            "Rewrite the following text to sound warm and friendly. \
Fix any grammar, spelling, and punctuation errors.",
        ),
    ]
}
