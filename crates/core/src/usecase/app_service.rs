use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::error::{AppError, ErrorCode};
use crate::domain::popup::{PopupState, RequestToken};
use crate::domain::rewrite_mode::RewriteMode;
use crate::domain::settings::{KeyValueStore, Settings};
use crate::domain::shortcut::{HotkeyAction, HotkeyBindings, Shortcut};
use crate::infra::hotkey::HotkeyRegistrar;
use crate::infra::os_integration::{AccessibilityBridge, OsIntegration};
use crate::infra::output::{DeliverTarget, OutputRouter};
use crate::infra::rewriter::{prompts, OllamaRewriter, Rewriter};
use crate::usecase::request_queue::{Completion, CompletionTarget, RequestQueue};

/// (server_url, model_name) からリライターを作る
pub type RewriterFactory = Box<dyn Fn(&str, &str) -> Arc<dyn Rewriter> + Send>;

/// Ollama クライアントを作るデフォルトファクトリ
pub fn ollama_factory() -> RewriterFactory {
    Box::new(|url: &str, model: &str| -> Arc<dyn Rewriter> {
        Arc::new(OllamaRewriter::new(url, model))
    })
}

/// 完了通知の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// 元アプリへ書き戻した
    Replaced,
    /// ポップアップに反映した
    PopupUpdated(RequestToken),
    /// 古い（差し替え済み・閉じた）ポップアップ向けなので捨てた
    Stale,
    /// 生成失敗（警告音のみ）
    Failed(String),
}

/// アプリケーションサービス
///
/// 設定とポップアップ状態を単独で所有する。呼び出しはすべてメインループから行い、
/// モデルサーバーの完了通知もチャネル経由でメインループに戻してから `on_completion` で適用する。
pub struct AppService<S: KeyValueStore> {
    settings: Settings<S>,
    bridge: Arc<dyn AccessibilityBridge>,
    output: OutputRouter,
    requests: RequestQueue,
    rewriter_factory: RewriterFactory,
    hotkeys: Box<dyn HotkeyRegistrar>,
    popup: Option<PopupState>,
    next_popup_id: u64,
}

impl<S: KeyValueStore> AppService<S> {
    pub fn new(
        settings: Settings<S>,
        bridge: Arc<dyn AccessibilityBridge>,
        output: OutputRouter,
        hotkeys: Box<dyn HotkeyRegistrar>,
        rewriter_factory: RewriterFactory,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        let rewriter = rewriter_factory(settings.server_url(), settings.model_name());
        Self {
            settings,
            bridge,
            output,
            requests: RequestQueue::new(rewriter, completions),
            rewriter_factory,
            hotkeys,
            popup: None,
            next_popup_id: 0,
        }
    }

    // ==================== Startup ====================

    /// ホットキー登録と権限確認（起動時に一度）
    pub fn start(&mut self, events: mpsc::UnboundedSender<HotkeyAction>) -> Result<(), AppError> {
        self.hotkeys
            .register(self.settings.hotkey_bindings(), events)?;

        if !self.bridge.is_trusted() {
            self.bridge.request_permission();
        }
        log::info!(
            "起動: server={} model={} hotkeys={}",
            self.settings.server_url(),
            self.settings.model_name(),
            self.hotkeys.name()
        );
        Ok(())
    }

    // ==================== Hotkeys ====================

    /// ホットキーイベントを処理する。失敗は権限要求・警告音・ログに変換し、呼び出し側には返さない
    pub fn handle_hotkey(&mut self, action: HotkeyAction) {
        let result = match action {
            HotkeyAction::Grammar => self.handle_grammar_hotkey().map(|_| ()),
            HotkeyAction::Tone => self.handle_tone_hotkey().map(|_| ()),
        };

        if let Err(e) = result {
            if report_hotkey_error(action, &e) {
                OsIntegration::beep();
            }
        }
    }

    /// 選択テキストをデフォルトモードで書き換え、完了後に元アプリへ置換する
    pub fn handle_grammar_hotkey(&mut self) -> Result<u64, AppError> {
        let text = self.capture_selection()?;
        let mode = self
            .settings
            .resolve_default_mode()
            .ok_or_else(|| AppError::invalid_state("リライトモードがありません"))?;

        log::info!("グラマー修正: mode={} ({} 文字)", mode.name, text.len());
        let prompt = prompts::build(mode, &text);
        Ok(self.requests.dispatch(CompletionTarget::SourceApp, prompt))
    }

    /// 結果ポップアップを開き、初期モードで生成を開始する
    pub fn handle_tone_hotkey(&mut self) -> Result<RequestToken, AppError> {
        let text = self.capture_selection()?;
        let rect = self.bridge.selection_rect();

        let modes = self.settings.rewrite_modes().to_vec();
        let initial = self
            .settings
            .resolve_default_mode()
            .map(|m| m.id)
            .ok_or_else(|| AppError::invalid_state("リライトモードがありません"))?;

        self.close_popup();

        self.next_popup_id += 1;
        let popup_id = self.next_popup_id;
        log::debug!("ポップアップ {popup_id} を表示: {rect:?}");
        self.popup = Some(PopupState::new(popup_id, modes, text));

        self.run_popup_mode(initial)
    }

    /// ポップアップ内でモードを選び直す
    pub fn select_mode(&mut self, mode_id: Uuid) -> Result<RequestToken, AppError> {
        self.run_popup_mode(mode_id)
    }

    fn run_popup_mode(&mut self, mode_id: Uuid) -> Result<RequestToken, AppError> {
        let popup = self
            .popup
            .as_mut()
            .ok_or_else(|| AppError::invalid_state("ポップアップが開いていません"))?;
        let mode = popup
            .find_mode(mode_id)
            .cloned()
            .ok_or_else(|| AppError::invalid_state(format!("未知のモード: {mode_id}")))?;

        let token = popup.begin_request(mode.id);
        let prompt = prompts::build(&mode, popup.source_text());
        log::info!("リライト: mode={} popup={}", mode.name, token.popup_id);
        self.requests.dispatch(CompletionTarget::Popup(token), prompt);
        Ok(token)
    }

    fn capture_selection(&self) -> Result<String, AppError> {
        if !self.bridge.is_trusted() {
            self.bridge.request_permission();
            return Err(AppError::permission(
                "アクセシビリティ権限がありません。許可後に再実行してください",
            ));
        }

        match self.bridge.selected_text() {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(AppError::no_selection()),
        }
    }

    // ==================== Completions ====================

    /// メインループで受け取った完了通知を適用する
    pub fn on_completion(&mut self, completion: Completion) -> CompletionOutcome {
        self.requests.finish(completion.request_id);

        match completion.target {
            CompletionTarget::SourceApp => match completion.result {
                Ok(text) => match self.output.deliver(DeliverTarget::SourceApp, &text) {
                    Ok(()) => CompletionOutcome::Replaced,
                    Err(e) => {
                        log::error!("置換に失敗: {e}");
                        OsIntegration::beep();
                        CompletionOutcome::Failed(e.message)
                    }
                },
                Err(e) => {
                    log::warn!("グラマー修正に失敗: {e}");
                    OsIntegration::beep();
                    CompletionOutcome::Failed(e.to_string())
                }
            },
            CompletionTarget::Popup(token) => {
                let Some(popup) = self.popup.as_mut() else {
                    log::debug!("閉じたポップアップへの完了通知を破棄: {token:?}");
                    return CompletionOutcome::Stale;
                };
                let outcome = completion.result.map_err(|e| e.to_string());
                if popup.apply(token, outcome) {
                    CompletionOutcome::PopupUpdated(token)
                } else {
                    log::debug!("古い完了通知を破棄: {token:?}");
                    CompletionOutcome::Stale
                }
            }
        }
    }

    // ==================== Popup actions ====================

    pub fn popup(&self) -> Option<&PopupState> {
        self.popup.as_ref()
    }

    /// 結果で元アプリの選択範囲を置換してポップアップを閉じる
    pub fn replace_result(&mut self) -> Result<(), AppError> {
        self.deliver_popup_result(DeliverTarget::SourceApp)
    }

    /// 結果をクリップボードへコピーしてポップアップを閉じる
    pub fn copy_result(&mut self) -> Result<(), AppError> {
        self.deliver_popup_result(DeliverTarget::Clipboard)
    }

    pub fn cancel_popup(&mut self) {
        self.close_popup();
    }

    fn deliver_popup_result(&mut self, target: DeliverTarget) -> Result<(), AppError> {
        let text = self
            .popup
            .as_ref()
            .ok_or_else(|| AppError::invalid_state("ポップアップが開いていません"))?
            .result_text()
            .ok_or_else(|| AppError::invalid_state("結果がまだありません"))?
            .to_string();

        self.close_popup();
        self.output.deliver(target, &text)
    }

    fn close_popup(&mut self) {
        if let Some(popup) = self.popup.take() {
            self.requests.cancel_popup(popup.id());
        }
    }

    // ==================== Settings ====================

    pub fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    #[cfg(test)]
    fn settings_mut(&mut self) -> &mut Settings<S> {
        &mut self.settings
    }

    pub fn set_server_url(&mut self, url: impl Into<String>) {
        self.settings.set_server_url(url);
        self.rebuild_rewriter();
    }

    pub fn set_model_name(&mut self, name: impl Into<String>) {
        self.settings.set_model_name(name);
        self.rebuild_rewriter();
    }

    fn rebuild_rewriter(&mut self) {
        let rewriter = (self.rewriter_factory)(self.settings.server_url(), self.settings.model_name());
        self.requests.set_rewriter(rewriter);
    }

    /// 再登録に成功したときだけショートカットを保存する
    pub fn update_shortcuts(&mut self, grammar: Shortcut, tone: Shortcut) -> Result<(), AppError> {
        if grammar == tone {
            return Err(AppError::invalid_state("2 つのホットキーが同じです"));
        }
        self.hotkeys.update_shortcuts(HotkeyBindings { grammar, tone })?;
        self.settings.set_grammar_shortcut(grammar);
        self.settings.set_tone_shortcut(tone);
        Ok(())
    }

    // ==================== Model server ====================

    /// 利用可能なモデル一覧（接続確認を兼ねる。失敗時は空）
    pub async fn list_models(&self) -> Vec<String> {
        self.requests.rewriter().list_models().await
    }

    /// 指定モード（None ならデフォルト）で一度だけ書き換えて結果を返す
    pub async fn rewrite_once(&self, mode_id: Option<Uuid>, text: &str) -> Result<String, AppError> {
        let mode = self.mode_or_default(mode_id)?;
        let prompt = prompts::build(&mode, text);
        self.requests
            .rewriter()
            .generate(&prompt)
            .await
            .map_err(AppError::from)
    }

    /// 送信されるプロンプトを確認用に組み立てる
    pub fn preview_prompt(&self, mode_id: Option<Uuid>, text: &str) -> Result<String, AppError> {
        let mode = self.mode_or_default(mode_id)?;
        Ok(prompts::build(&mode, text))
    }

    fn mode_or_default(&self, mode_id: Option<Uuid>) -> Result<RewriteMode, AppError> {
        let mode = match mode_id {
            Some(id) => self.settings.find_mode(id),
            None => self.settings.resolve_default_mode(),
        };
        mode.cloned()
            .ok_or_else(|| AppError::invalid_state("リライトモードが見つかりません"))
    }

    pub fn in_flight_requests(&self) -> usize {
        self.requests.in_flight()
    }
}

/// ホットキー処理の失敗をログに残し、警告音を鳴らすべきなら true を返す
///
/// 選択なしで鳴らすのはグラマー修正だけ。トーンは何もせず終わる。
fn report_hotkey_error(action: HotkeyAction, e: &AppError) -> bool {
    match e.code {
        ErrorCode::Permission => {
            log::warn!("{}", e.message);
            false
        }
        ErrorCode::NoSelection => {
            log::debug!("{} [{action:?}]", e.message);
            action == HotkeyAction::Grammar
        }
        _ => {
            log::error!("ホットキー処理失敗 [{action:?}]: {e}");
            false
        }
    }
}
