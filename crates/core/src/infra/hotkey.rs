//! グローバルホットキー登録
//!
//! 登録先はホットキーが押されると `HotkeyAction` をチャネルへ送る。
//! 受信側（メインループ）が AppService を呼び出す。

use tokio::sync::mpsc;

use crate::domain::error::AppError;
use crate::domain::shortcut::{
    HotkeyAction, HotkeyBindings, Shortcut, CMD_KEY, CONTROL_KEY, OPTION_KEY, SHIFT_KEY,
};

/// ホットキー登録 trait
pub trait HotkeyRegistrar: Send {
    /// 初回登録。以後のイベントは `events` に送られる
    fn register(
        &mut self,
        bindings: HotkeyBindings,
        events: mpsc::UnboundedSender<HotkeyAction>,
    ) -> Result<(), AppError>;

    /// 割り当て変更（登録済みでなければ InvalidState）
    fn update_shortcuts(&mut self, bindings: HotkeyBindings) -> Result<(), AppError>;

    fn name(&self) -> &str;
}

/// NoopHotkeyRegistrar: 割り当てを保持するだけでキー入力は監視しない
///
/// ホットキー監視が使えない環境向け。イベントは呼び出し側が直接チャネルへ送る。
#[derive(Default)]
pub struct NoopHotkeyRegistrar {
    bindings: Option<HotkeyBindings>,
}

impl NoopHotkeyRegistrar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeyRegistrar for NoopHotkeyRegistrar {
    fn register(
        &mut self,
        bindings: HotkeyBindings,
        _events: mpsc::UnboundedSender<HotkeyAction>,
    ) -> Result<(), AppError> {
        log::info!(
            "ホットキー登録（監視なし）: grammar={} tone={}",
            bindings.grammar,
            bindings.tone
        );
        self.bindings = Some(bindings);
        Ok(())
    }

    fn update_shortcuts(&mut self, bindings: HotkeyBindings) -> Result<(), AppError> {
        if self.bindings.is_none() {
            return Err(AppError::invalid_state("ホットキーが未登録です"));
        }
        self.bindings = Some(bindings);
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// 押下中の修飾キー（左右を区別して追跡）
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifierState {
    control: [bool; 2],
    option: [bool; 2],
    shift: [bool; 2],
    command: [bool; 2],
}

/// 修飾キーの種類と左右
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Control(Side),
    Option(Side),
    Shift(Side),
    Command(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl ModifierState {
    pub fn set(&mut self, key: ModifierKey, pressed: bool) {
        match key {
            ModifierKey::Control(side) => self.control[side as usize] = pressed,
            ModifierKey::Option(side) => self.option[side as usize] = pressed,
            ModifierKey::Shift(side) => self.shift[side as usize] = pressed,
            ModifierKey::Command(side) => self.command[side as usize] = pressed,
        }
    }

    /// Carbon 修飾キービットマスク
    pub fn carbon_flags(&self) -> u32 {
        let mut flags = 0;
        if self.control.iter().any(|&p| p) {
            flags |= CONTROL_KEY;
        }
        if self.option.iter().any(|&p| p) {
            flags |= OPTION_KEY;
        }
        if self.shift.iter().any(|&p| p) {
            flags |= SHIFT_KEY;
        }
        if self.command.iter().any(|&p| p) {
            flags |= CMD_KEY;
        }
        flags
    }

    /// キー押下時のショートカット判定（修飾キーは完全一致）
    pub fn shortcut_for(&self, key_code: u32) -> Shortcut {
        Shortcut::new(key_code, self.carbon_flags())
    }
}

#[cfg(feature = "global-hotkeys")]
pub use rdev_registrar::RdevHotkeyRegistrar;

#[cfg(feature = "global-hotkeys")]
mod rdev_registrar {
    use std::sync::{Arc, Mutex};

    use rdev::{listen, Event, EventType, Key};
    use tokio::sync::mpsc;

    use super::{HotkeyRegistrar, ModifierKey, ModifierState, Side};
    use crate::domain::error::AppError;
    use crate::domain::shortcut::{HotkeyAction, HotkeyBindings};

    /// rdev ベースのグローバルホットキー監視
    ///
    /// macOS ではアクセシビリティ権限が必要。listen() は別スレッドでブロックし続ける。
    pub struct RdevHotkeyRegistrar {
        bindings: Arc<Mutex<Option<HotkeyBindings>>>,
        thread_handle: Option<std::thread::JoinHandle<()>>,
    }

    impl RdevHotkeyRegistrar {
        pub fn new() -> Self {
            Self {
                bindings: Arc::new(Mutex::new(None)),
                thread_handle: None,
            }
        }
    }

    impl Default for RdevHotkeyRegistrar {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HotkeyRegistrar for RdevHotkeyRegistrar {
        fn register(
            &mut self,
            bindings: HotkeyBindings,
            events: mpsc::UnboundedSender<HotkeyAction>,
        ) -> Result<(), AppError> {
            if self.thread_handle.is_some() {
                return Err(AppError::invalid_state("ホットキーは登録済みです"));
            }

            *self
                .bindings
                .lock()
                .map_err(|_| AppError::internal("ホットキー状態のロックに失敗"))? = Some(bindings);

            let shared = self.bindings.clone();
            let handle = std::thread::spawn(move || {
                let mut modifiers = ModifierState::default();

                let callback = move |event: Event| match event.event_type {
                    EventType::KeyPress(key) => {
                        if let Some(m) = modifier_key(key) {
                            modifiers.set(m, true);
                            return;
                        }
                        let Some(code) = carbon_key_code(key) else {
                            return;
                        };
                        let current = shared.lock().ok().and_then(|g| *g);
                        let action = current.and_then(|b| b.action_for(modifiers.shortcut_for(code)));
                        if let Some(action) = action {
                            log::debug!("ホットキー検出: {action:?}");
                            let _ = events.send(action);
                        }
                    }
                    EventType::KeyRelease(key) => {
                        if let Some(m) = modifier_key(key) {
                            modifiers.set(m, false);
                        }
                    }
                    _ => {}
                };

                // プロセス終了までブロック
                if let Err(e) = listen(callback) {
                    log::error!("rdev listen error: {e:?}");
                    log::warn!(
                        "グローバルホットキーを取得できません。アクセシビリティ権限を確認してください"
                    );
                }
            });

            self.thread_handle = Some(handle);
            log::info!(
                "グローバルホットキー登録: grammar={} tone={}",
                bindings.grammar,
                bindings.tone
            );
            Ok(())
        }

        fn update_shortcuts(&mut self, bindings: HotkeyBindings) -> Result<(), AppError> {
            let mut guard = self
                .bindings
                .lock()
                .map_err(|_| AppError::internal("ホットキー状態のロックに失敗"))?;
            if guard.is_none() {
                return Err(AppError::invalid_state("ホットキーが未登録です"));
            }
            *guard = Some(bindings);
            log::info!(
                "ホットキー更新: grammar={} tone={}",
                bindings.grammar,
                bindings.tone
            );
            Ok(())
        }

        fn name(&self) -> &str {
            "rdev"
        }
    }

    fn modifier_key(key: Key) -> Option<ModifierKey> {
        match key {
            Key::ControlLeft => Some(ModifierKey::Control(Side::Left)),
            Key::ControlRight => Some(ModifierKey::Control(Side::Right)),
            Key::Alt => Some(ModifierKey::Option(Side::Left)),
            Key::AltGr => Some(ModifierKey::Option(Side::Right)),
            Key::ShiftLeft => Some(ModifierKey::Shift(Side::Left)),
            Key::ShiftRight => Some(ModifierKey::Shift(Side::Right)),
            Key::MetaLeft => Some(ModifierKey::Command(Side::Left)),
            Key::MetaRight => Some(ModifierKey::Command(Side::Right)),
            _ => None,
        }
    }

    /// rdev Key → Carbon 仮想キーコード（kVK_*）
    pub(super) fn carbon_key_code(key: Key) -> Option<u32> {
        let code = match key {
            Key::KeyA => 0x00,
            Key::KeyS => 0x01,
            Key::KeyD => 0x02,
            Key::KeyF => 0x03,
            Key::KeyH => 0x04,
            Key::KeyG => 0x05,
            Key::KeyZ => 0x06,
            Key::KeyX => 0x07,
            Key::KeyC => 0x08,
            Key::KeyV => 0x09,
            Key::KeyB => 0x0B,
            Key::KeyQ => 0x0C,
            Key::KeyW => 0x0D,
            Key::KeyE => 0x0E,
            Key::KeyR => 0x0F,
            Key::KeyY => 0x10,
            Key::KeyT => 0x11,
            Key::Num1 => 0x12,
            Key::Num2 => 0x13,
            Key::Num3 => 0x14,
            Key::Num4 => 0x15,
            Key::Num6 => 0x16,
            Key::Num5 => 0x17,
            Key::Equal => 0x18,
            Key::Num9 => 0x19,
            Key::Num7 => 0x1A,
            Key::Minus => 0x1B,
            Key::Num8 => 0x1C,
            Key::Num0 => 0x1D,
            Key::RightBracket => 0x1E,
            Key::KeyO => 0x1F,
            Key::KeyU => 0x20,
            Key::LeftBracket => 0x21,
            Key::KeyI => 0x22,
            Key::KeyP => 0x23,
            Key::Return => 0x24,
            Key::KeyL => 0x25,
            Key::KeyJ => 0x26,
            Key::Quote => 0x27,
            Key::KeyK => 0x28,
            Key::SemiColon => 0x29,
            Key::BackSlash => 0x2A,
            Key::Comma => 0x2B,
            Key::Slash => 0x2C,
            Key::KeyN => 0x2D,
            Key::KeyM => 0x2E,
            Key::Dot => 0x2F,
            Key::Tab => 0x30,
            Key::Space => 0x31,
            Key::Escape => 0x35,
            Key::F5 => 0x60,
            Key::F6 => 0x61,
            Key::F7 => 0x62,
            Key::F3 => 0x63,
            Key::F8 => 0x64,
            Key::F9 => 0x65,
            Key::F11 => 0x67,
            Key::F10 => 0x6D,
            Key::F12 => 0x6F,
            Key::F4 => 0x76,
            Key::F2 => 0x78,
            Key::F1 => 0x7A,
            _ => return None,
        };
        Some(code)
    }

}
