//! リライトプロンプトの組み立て

use crate::domain::rewrite_mode::{RewriteMode, MY_TONE_NAME};

/// すべてのプロンプトの末尾に付く出力ルール
pub const RESPONSE_RULES: &str = "Never use em dashes or semicolons. Use commas or periods instead. \
Return ONLY the rewritten text. \
Do NOT wrap output in quotes or markdown formatting. \
Do NOT add any explanations or comments.";

/// モードに対応する指示文を返す
///
/// "My Tone" は ID ではなく表示名で判定する。同名に改名されたユーザーモードも対象になる。
pub fn instruction_for_mode(mode: &RewriteMode) -> String {
    if mode.name == MY_TONE_NAME {
        format!(
            "Rewrite the following text to match this tone: {}. \
Fix any grammar, spelling, and punctuation errors in the process. \
Preserve the original meaning and key information.",
            mode.prompt
        )
    } else {
        mode.prompt.clone()
    }
}

/// モードと入力テキストから送信用プロンプトを構築する（入力はエスケープしない）
pub fn build(mode: &RewriteMode, text: &str) -> String {
    let instruction = instruction_for_mode(mode);
    let mut prompt = String::with_capacity(instruction.len() + RESPONSE_RULES.len() + text.len() + 3);
    prompt.push_str(&instruction);
    prompt.push(' ');
    prompt.push_str(RESPONSE_RULES);
    prompt.push_str("\n\n");
    prompt.push_str(text);
    prompt
}
