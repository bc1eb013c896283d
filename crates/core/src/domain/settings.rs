use uuid::Uuid;

use super::error::AppError;
use super::rewrite_mode::{
    default_rewrite_modes, RewriteMode, DEFAULT_TONE_DESCRIPTION, FIX_GRAMMAR_MODE_ID, MY_TONE_NAME,
};
use super::shortcut::{HotkeyBindings, Shortcut};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL_NAME: &str = "gemma3";

/// 永続化キー（旧バージョンと互換）
pub mod keys {
    pub const SERVER_URL: &str = "ollamaURL";
    pub const MODEL_NAME: &str = "modelName";
    pub const TONE_DESCRIPTION: &str = "toneDescription";
    pub const REWRITE_MODES: &str = "rewriteModes";
    pub const DEFAULT_MODE_ID: &str = "defaultModeId";
    pub const GRAMMAR_KEY_CODE: &str = "grammarKeyCode";
    pub const GRAMMAR_MODIFIERS: &str = "grammarModifiers";
    pub const TONE_KEY_CODE: &str = "toneKeyCode";
    pub const TONE_MODIFIERS: &str = "toneModifiers";
}

/// フラットな key-value 永続化層
///
/// 耐久性はこの層の責務。`Settings` は書き込み失敗をリトライしない。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        (**self).remove(key)
    }
}

/// アプリケーション設定
///
/// プロセスにつき 1 インスタンス。起動時に `load` で構築し、参照で渡す。
/// 各 setter はメモリ上の値を更新した直後にそのフィールドだけを永続化する。
pub struct Settings<S: KeyValueStore> {
    store: S,
    server_url: String,
    model_name: String,
    tone_description: String,
    rewrite_modes: Vec<RewriteMode>,
    default_mode_id: Option<Uuid>,
    grammar_shortcut: Shortcut,
    tone_shortcut: Shortcut,
}

impl<S: KeyValueStore> Settings<S> {
    /// key-value 層から読み込む（欠損フィールドはデフォルト値）
    pub fn load(store: S) -> Self {
        let server_url =
            read_string(&store, keys::SERVER_URL).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let model_name =
            read_string(&store, keys::MODEL_NAME).unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
        let tone_description = read_string(&store, keys::TONE_DESCRIPTION)
            .unwrap_or_else(|| DEFAULT_TONE_DESCRIPTION.to_string());

        let rewrite_modes = load_rewrite_modes(&store, &tone_description);

        let default_mode_id = Some(
            read_string(&store, keys::DEFAULT_MODE_ID)
                .and_then(|s| match Uuid::parse_str(&s) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        log::warn!("defaultModeId のパースに失敗: {e}");
                        None
                    }
                })
                .unwrap_or(FIX_GRAMMAR_MODE_ID),
        );

        let grammar_default = Shortcut::default_grammar();
        let grammar_shortcut = Shortcut::new(
            read_u32(&store, keys::GRAMMAR_KEY_CODE).unwrap_or(grammar_default.key_code),
            read_u32(&store, keys::GRAMMAR_MODIFIERS).unwrap_or(grammar_default.modifiers),
        );

        let tone_default = Shortcut::default_tone();
        let tone_shortcut = Shortcut::new(
            read_u32(&store, keys::TONE_KEY_CODE).unwrap_or(tone_default.key_code),
            read_u32(&store, keys::TONE_MODIFIERS).unwrap_or(tone_default.modifiers),
        );

        Self {
            store,
            server_url,
            model_name,
            tone_description,
            rewrite_modes,
            default_mode_id,
            grammar_shortcut,
            tone_shortcut,
        }
    }

    // ==================== Getters ====================

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn tone_description(&self) -> &str {
        &self.tone_description
    }

    pub fn rewrite_modes(&self) -> &[RewriteMode] {
        &self.rewrite_modes
    }

    pub fn default_mode_id(&self) -> Option<Uuid> {
        self.default_mode_id
    }

    pub fn grammar_shortcut(&self) -> Shortcut {
        self.grammar_shortcut
    }

    pub fn tone_shortcut(&self) -> Shortcut {
        self.tone_shortcut
    }

    pub fn hotkey_bindings(&self) -> HotkeyBindings {
        HotkeyBindings {
            grammar: self.grammar_shortcut,
            tone: self.tone_shortcut,
        }
    }

    // ==================== Setters ====================

    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.server_url = url.into();
        self.persist(keys::SERVER_URL, &self.server_url);
    }

    pub fn set_model_name(&mut self, name: impl Into<String>) {
        self.model_name = name.into();
        self.persist(keys::MODEL_NAME, &self.model_name);
    }

    /// "My Tone" モードのプロンプトも同じ値に書き換える
    pub fn set_tone_description(&mut self, tone: impl Into<String>) {
        self.tone_description = tone.into();
        self.persist(keys::TONE_DESCRIPTION, &self.tone_description);

        if apply_tone(&mut self.rewrite_modes, &self.tone_description) {
            self.persist_modes();
        }
    }

    /// None を設定するとキーごと削除（次回ロードで Fix Grammar に戻る）
    pub fn set_default_mode_id(&mut self, id: Option<Uuid>) {
        self.default_mode_id = id;
        match id {
            Some(id) => self.persist(keys::DEFAULT_MODE_ID, &id.to_string()),
            None => {
                if let Err(e) = self.store.remove(keys::DEFAULT_MODE_ID) {
                    log::warn!("設定削除失敗 [{}]: {e}", keys::DEFAULT_MODE_ID);
                }
            }
        }
    }

    pub fn set_rewrite_modes(&mut self, modes: Vec<RewriteMode>) {
        self.rewrite_modes = modes;
        self.persist_modes();
    }

    pub fn set_grammar_shortcut(&mut self, shortcut: Shortcut) {
        self.grammar_shortcut = shortcut;
        self.persist(keys::GRAMMAR_KEY_CODE, &shortcut.key_code.to_string());
        self.persist(keys::GRAMMAR_MODIFIERS, &shortcut.modifiers.to_string());
    }

    pub fn set_tone_shortcut(&mut self, shortcut: Shortcut) {
        self.tone_shortcut = shortcut;
        self.persist(keys::TONE_KEY_CODE, &shortcut.key_code.to_string());
        self.persist(keys::TONE_MODIFIERS, &shortcut.modifiers.to_string());
    }

    // ==================== Rewrite modes ====================

    pub fn add_mode(&mut self, mode: RewriteMode) {
        self.rewrite_modes.push(mode);
        self.persist_modes();
    }

    /// name / prompt をその場で置き換える。未知の ID なら false
    pub fn update_mode(&mut self, id: Uuid, name: impl Into<String>, prompt: impl Into<String>) -> bool {
        let Some(mode) = self.rewrite_modes.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        mode.name = name.into();
        mode.prompt = prompt.into();
        self.persist_modes();
        true
    }

    /// 予約モードも削除できる（次回ロード時のマイグレーションで復元される）
    pub fn remove_mode(&mut self, id: Uuid) -> Option<RewriteMode> {
        let index = self.rewrite_modes.iter().position(|m| m.id == id)?;
        let removed = self.rewrite_modes.remove(index);
        self.persist_modes();
        Some(removed)
    }

    pub fn find_mode(&self, id: Uuid) -> Option<&RewriteMode> {
        self.rewrite_modes.iter().find(|m| m.id == id)
    }

    pub fn find_mode_by_name(&self, name: &str) -> Option<&RewriteMode> {
        self.rewrite_modes.iter().find(|m| m.name == name)
    }

    /// defaultModeId を解決する。存在しなければ先頭のモードにフォールバック
    pub fn resolve_default_mode(&self) -> Option<&RewriteMode> {
        self.default_mode_id
            .and_then(|id| self.find_mode(id))
            .or_else(|| self.rewrite_modes.first())
    }

    // ==================== Persistence ====================

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("設定保存失敗 [{key}]: {e}");
        }
    }

    fn persist_modes(&self) {
        match serde_json::to_string(&self.rewrite_modes) {
            Ok(json) => self.persist(keys::REWRITE_MODES, &json),
            Err(e) => log::warn!("rewriteModes のシリアライズに失敗: {e}"),
        }
    }
}

/// 永続化済みリストを読み込み、予約モードが無ければ先頭に追加する
///
/// リストが無い（または壊れている）場合は組み込みモードに保存済みのトーンを反映する。
fn load_rewrite_modes<S: KeyValueStore>(store: &S, tone: &str) -> Vec<RewriteMode> {
    let defaults = || {
        let mut modes = default_rewrite_modes();
        apply_tone(&mut modes, tone);
        modes
    };

    let Some(json) = read_string(store, keys::REWRITE_MODES) else {
        return defaults();
    };

    let mut modes = match serde_json::from_str::<Vec<RewriteMode>>(&json) {
        Ok(modes) => modes,
        Err(e) => {
            log::warn!("rewriteModes のパースに失敗、デフォルトを使用: {e}");
            return defaults();
        }
    };

    migrate_fix_grammar(&mut modes);
    modes
}

/// Fix Grammar が無いリストを修復する（冪等）
pub fn migrate_fix_grammar(modes: &mut Vec<RewriteMode>) -> bool {
    if modes.iter().any(|m| m.id == FIX_GRAMMAR_MODE_ID) {
        return false;
    }
    log::info!("Fix Grammar モードを先頭に追加");
    modes.insert(0, RewriteMode::fix_grammar());
    true
}

/// 表示名が "My Tone" のモードにトーンを設定する。変更があれば true
fn apply_tone(modes: &mut [RewriteMode], tone: &str) -> bool {
    let mut changed = false;
    for mode in modes.iter_mut().filter(|m| m.name == MY_TONE_NAME) {
        if mode.prompt != tone {
            mode.prompt = tone.to_string();
            changed = true;
        }
    }
    changed
}

fn read_string<S: KeyValueStore>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("設定読み込み失敗 [{key}]: {e}");
            None
        }
    }
}

fn read_u32<S: KeyValueStore>(store: &S, key: &str) -> Option<u32> {
    let raw = read_string(store, key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("設定値のパースに失敗 [{key}={raw}]: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rewrite_mode::FIX_GRAMMAR_NAME;
    use crate::domain::shortcut::{CMD_KEY, KEY_CODE_T};
    use crate::infra::storage::Storage;

    fn storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    // --- Default values ---

    #[test]
    fn test_defaults_when_empty() {
        let storage = storage();
        let settings = Settings::load(&storage);
        assert_eq!(settings.server_url(), "http://localhost:11434");
        assert_eq!(settings.model_name(), "gemma3");
        assert_eq!(settings.tone_description(), DEFAULT_TONE_DESCRIPTION);
        assert_eq!(settings.default_mode_id(), Some(FIX_GRAMMAR_MODE_ID));
        assert_eq!(settings.rewrite_modes().len(), default_rewrite_modes().len());
        assert_eq!(settings.grammar_shortcut(), Shortcut::default_grammar());
        assert_eq!(settings.tone_shortcut(), Shortcut::default_tone());
    }

    // --- Persistence round trips ---

    #[test]
    fn test_server_url_persistence() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        settings.set_server_url("http://example.com:5000");

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.server_url(), "http://example.com:5000");
    }

    #[test]
    fn test_model_name_persistence() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        settings.set_model_name("llama3");

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.model_name(), "llama3");
    }

    #[test]
    fn test_default_mode_id_persistence() {
        let storage = storage();
        let id = Uuid::new_v4();
        let mut settings = Settings::load(&storage);
        settings.set_default_mode_id(Some(id));

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.default_mode_id(), Some(id));
    }

    #[test]
    fn test_default_mode_id_clear_falls_back_to_fix_grammar() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        settings.set_default_mode_id(Some(Uuid::new_v4()));
        settings.set_default_mode_id(None);
        assert_eq!(settings.default_mode_id(), None);

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.default_mode_id(), Some(FIX_GRAMMAR_MODE_ID));
    }

    #[test]
    fn test_shortcut_persistence() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        let shortcut = Shortcut::new(KEY_CODE_T, CMD_KEY);
        settings.set_tone_shortcut(shortcut);

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.tone_shortcut(), shortcut);
        assert_eq!(reloaded.grammar_shortcut(), Shortcut::default_grammar());
    }

    #[test]
    fn test_tone_description_reaches_my_tone_prompt() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        settings.set_tone_description("formal and stiff, like a legal memo");

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.tone_description(), "formal and stiff, like a legal memo");
        let my_tone = reloaded.find_mode_by_name(MY_TONE_NAME).unwrap();
        let prompt = crate::infra::rewriter::prompts::build(my_tone, "hi");
        assert!(prompt.contains("match this tone: formal and stiff, like a legal memo."));

        // 他のモードは変わらない
        assert_eq!(
            reloaded.find_mode(FIX_GRAMMAR_MODE_ID).unwrap(),
            &RewriteMode::fix_grammar()
        );
    }

    #[test]
    fn test_stored_tone_applies_to_default_modes() {
        let storage = storage();
        storage.set(keys::TONE_DESCRIPTION, "dry and witty").unwrap();

        let settings = Settings::load(&storage);
        assert_eq!(settings.find_mode_by_name(MY_TONE_NAME).unwrap().prompt, "dry and witty");
    }

    // --- Pre-populated values ---

    #[test]
    fn test_pre_populated_values() {
        let storage = storage();
        storage.set(keys::SERVER_URL, "http://custom:9999").unwrap();
        storage.set(keys::MODEL_NAME, "custom-model").unwrap();
        storage.set(keys::GRAMMAR_KEY_CODE, "3").unwrap();

        let settings = Settings::load(&storage);
        assert_eq!(settings.server_url(), "http://custom:9999");
        assert_eq!(settings.model_name(), "custom-model");
        assert_eq!(settings.grammar_shortcut().key_code, 3);
        assert_eq!(
            settings.grammar_shortcut().modifiers,
            Shortcut::default_grammar().modifiers
        );
    }

    #[test]
    fn test_garbage_values_fall_back_to_defaults() {
        let storage = storage();
        storage.set(keys::DEFAULT_MODE_ID, "not-a-uuid").unwrap();
        storage.set(keys::TONE_MODIFIERS, "lots").unwrap();
        storage.set(keys::REWRITE_MODES, "{broken").unwrap();

        let settings = Settings::load(&storage);
        assert_eq!(settings.default_mode_id(), Some(FIX_GRAMMAR_MODE_ID));
        assert_eq!(settings.tone_shortcut(), Shortcut::default_tone());
        assert_eq!(settings.rewrite_modes(), default_rewrite_modes().as_slice());
    }

    // --- Migration ---

    #[test]
    fn test_migration_prepends_fix_grammar() {
        let storage = storage();
        let custom = RewriteMode::new_custom("Custom", "Custom prompt");
        storage
            .set(
                keys::REWRITE_MODES,
                &serde_json::to_string(&vec![custom.clone()]).unwrap(),
            )
            .unwrap();

        let settings = Settings::load(&storage);
        let modes = settings.rewrite_modes();
        assert_eq!(modes.len(), 2);
        assert_eq!(modes[0].id, FIX_GRAMMAR_MODE_ID);
        assert_eq!(modes[0].name, FIX_GRAMMAR_NAME);
        assert_eq!(modes[1], custom);
    }

    #[test]
    fn test_migration_does_not_replace_same_name() {
        let storage = storage();
        let impostor = RewriteMode::new_custom(FIX_GRAMMAR_NAME, "my own grammar prompt");
        storage
            .set(
                keys::REWRITE_MODES,
                &serde_json::to_string(&vec![impostor.clone()]).unwrap(),
            )
            .unwrap();

        let settings = Settings::load(&storage);
        assert_eq!(settings.rewrite_modes().len(), 2);
        assert!(settings.rewrite_modes()[0].is_reserved());
        assert_eq!(settings.rewrite_modes()[1], impostor);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let storage = storage();
        let modes = vec![
            RewriteMode::new_custom("Mode1", "Prompt1"),
            RewriteMode::fix_grammar(),
            RewriteMode::new_custom("Mode2", "Prompt2"),
        ];
        let mut settings = Settings::load(&storage);
        settings.set_rewrite_modes(modes.clone());

        let first = Settings::load(&storage);
        assert_eq!(first.rewrite_modes(), modes.as_slice());
        let second = Settings::load(&storage);
        assert_eq!(second.rewrite_modes(), modes.as_slice());
    }

    #[test]
    fn test_rewrite_modes_persistence_with_migration() {
        let storage = storage();
        let modes = vec![
            RewriteMode::new_custom("Mode1", "Prompt1"),
            RewriteMode::new_custom("Mode2", "Prompt2"),
        ];
        let mut settings = Settings::load(&storage);
        settings.set_rewrite_modes(modes.clone());

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.rewrite_modes().len(), 3);
        assert_eq!(reloaded.rewrite_modes()[0].id, FIX_GRAMMAR_MODE_ID);
        assert_eq!(reloaded.rewrite_modes()[1], modes[0]);
        assert_eq!(reloaded.rewrite_modes()[2], modes[1]);
    }

    #[test]
    fn test_empty_persisted_list_gets_fix_grammar() {
        let storage = storage();
        storage.set(keys::REWRITE_MODES, "[]").unwrap();

        let settings = Settings::load(&storage);
        assert_eq!(settings.rewrite_modes(), &[RewriteMode::fix_grammar()]);
    }

    #[test]
    fn test_migrate_fix_grammar_reports_change() {
        let mut modes = vec![];
        assert!(migrate_fix_grammar(&mut modes));
        assert!(!migrate_fix_grammar(&mut modes));
        assert_eq!(modes.len(), 1);
    }

    // --- Mode management ---

    #[test]
    fn test_add_update_remove_mode() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        let mode = RewriteMode::new_custom("", "");
        let id = mode.id;
        settings.add_mode(mode);

        assert!(settings.update_mode(id, "Pirate", "Talk like a pirate"));
        assert!(!settings.update_mode(Uuid::new_v4(), "x", "y"));

        let reloaded = Settings::load(&storage);
        let found = reloaded.find_mode(id).unwrap();
        assert_eq!(found.name, "Pirate");
        assert_eq!(reloaded.rewrite_modes().last().unwrap().id, id);

        assert!(settings.remove_mode(id).is_some());
        assert!(settings.remove_mode(id).is_none());
        assert!(Settings::load(&storage).find_mode(id).is_none());
    }

    #[test]
    fn test_removed_fix_grammar_restored_on_load() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        settings.remove_mode(FIX_GRAMMAR_MODE_ID);
        assert!(settings.find_mode(FIX_GRAMMAR_MODE_ID).is_none());

        let reloaded = Settings::load(&storage);
        assert_eq!(reloaded.rewrite_modes()[0].id, FIX_GRAMMAR_MODE_ID);
        assert_eq!(reloaded.rewrite_modes().len(), default_rewrite_modes().len());
    }

    #[test]
    fn test_resolve_default_mode_fallback() {
        let storage = storage();
        let mut settings = Settings::load(&storage);
        assert_eq!(settings.resolve_default_mode().unwrap().id, FIX_GRAMMAR_MODE_ID);

        let concise = settings.find_mode_by_name("Concise").unwrap().id;
        settings.set_default_mode_id(Some(concise));
        assert_eq!(settings.resolve_default_mode().unwrap().id, concise);

        settings.remove_mode(concise);
        assert_eq!(settings.default_mode_id(), Some(concise));
        assert_eq!(
            settings.resolve_default_mode().unwrap().id,
            settings.rewrite_modes()[0].id
        );
    }
}
