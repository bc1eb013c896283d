use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::popup::RequestToken;
use crate::infra::rewriter::{RewriteError, Rewriter};

/// 生成結果の適用先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionTarget {
    /// グラマーホットキー: 元アプリの選択範囲を置換
    SourceApp,
    /// 結果ポップアップ（トークンが現行のときだけ反映）
    Popup(RequestToken),
}

/// 生成完了通知（メインループへ送られる）
#[derive(Debug)]
pub struct Completion {
    pub request_id: u64,
    pub target: CompletionTarget,
    pub result: Result<String, RewriteError>,
}

struct RequestEntry {
    target: CompletionTarget,
    handle: JoinHandle<()>,
}

/// モデルサーバーへのリクエストを Tokio タスクとして発行・追跡・中断する
///
/// 完了は必ずチャネル経由で所有者（メインループ）に戻し、状態の更新はそちらで行う。
pub struct RequestQueue {
    rewriter: Arc<dyn Rewriter>,
    completions: mpsc::UnboundedSender<Completion>,
    in_flight: HashMap<u64, RequestEntry>,
    next_id: u64,
}

impl RequestQueue {
    pub fn new(rewriter: Arc<dyn Rewriter>, completions: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            rewriter,
            completions,
            in_flight: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn rewriter(&self) -> Arc<dyn Rewriter> {
        self.rewriter.clone()
    }

    /// 以後のリクエストに使うリライターを差し替える（送出済みのものはそのまま）
    pub fn set_rewriter(&mut self, rewriter: Arc<dyn Rewriter>) {
        self.rewriter = rewriter;
    }

    /// リクエストを発行し、リクエストIDを返す
    pub fn dispatch(&mut self, target: CompletionTarget, prompt: String) -> u64 {
        self.next_id += 1;
        let request_id = self.next_id;

        let rewriter = self.rewriter.clone();
        let completions = self.completions.clone();
        let handle = tokio::spawn(async move {
            let result = rewriter.generate(&prompt).await;
            // 受信側が閉じていれば結果は捨てる
            let _ = completions.send(Completion {
                request_id,
                target,
                result,
            });
        });

        self.in_flight
            .insert(request_id, RequestEntry { target, handle });
        log::debug!("リクエスト発行: #{request_id} {target:?}");
        request_id
    }

    /// 完了通知を受け取ったリクエストを追跡対象から外す
    pub fn finish(&mut self, request_id: u64) -> bool {
        self.in_flight.remove(&request_id).is_some()
    }

    /// 指定ポップアップに紐付く未完了リクエストをすべて中断
    pub fn cancel_popup(&mut self, popup_id: u64) -> Vec<u64> {
        let canceled: Vec<u64> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| {
                matches!(entry.target, CompletionTarget::Popup(token) if token.popup_id == popup_id)
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &canceled {
            if let Some(entry) = self.in_flight.remove(id) {
                entry.handle.abort();
            }
        }

        if !canceled.is_empty() {
            log::debug!("ポップアップ {popup_id} のリクエストを中断: {canceled:?}");
        }
        canceled
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
