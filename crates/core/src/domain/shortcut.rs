use serde::{Deserialize, Serialize};

// Carbon 修飾キーフラグ（Events.h）
pub const CMD_KEY: u32 = 0x0100;
pub const SHIFT_KEY: u32 = 0x0200;
pub const OPTION_KEY: u32 = 0x0800;
pub const CONTROL_KEY: u32 = 0x1000;

// 仮想キーコード（kVK_ANSI_*）
pub const KEY_CODE_G: u32 = 0x05;
pub const KEY_CODE_T: u32 = 0x11;

/// ホットキー割り当て（キーコード + Carbon 修飾キービットマスク）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shortcut {
    pub key_code: u32,
    pub modifiers: u32,
}

impl Shortcut {
    pub const fn new(key_code: u32, modifiers: u32) -> Self {
        Self {
            key_code,
            modifiers,
        }
    }

    /// デフォルト: Ctrl+Shift+G
    pub const fn default_grammar() -> Self {
        Self::new(KEY_CODE_G, CONTROL_KEY | SHIFT_KEY)
    }

    /// デフォルト: Ctrl+Shift+T
    pub const fn default_tone() -> Self {
        Self::new(KEY_CODE_T, CONTROL_KEY | SHIFT_KEY)
    }

    /// メニュー表示用（例: ⌃⇧G）
    pub fn display_string(&self) -> String {
        let mut s = String::new();
        if self.modifiers & CONTROL_KEY != 0 {
            s.push('\u{2303}');
        }
        if self.modifiers & OPTION_KEY != 0 {
            s.push('\u{2325}');
        }
        if self.modifiers & SHIFT_KEY != 0 {
            s.push('\u{21E7}');
        }
        if self.modifiers & CMD_KEY != 0 {
            s.push('\u{2318}');
        }
        s.push_str(key_code_to_str(self.key_code));
        s
    }
}

impl std::fmt::Display for Shortcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// グローバルホットキーの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyAction {
    /// 選択テキストをデフォルトモードで置換
    Grammar,
    /// 結果ポップアップを開いてモードを選ぶ
    Tone,
}

/// 2 つのホットキー割り当て
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBindings {
    pub grammar: Shortcut,
    pub tone: Shortcut,
}

impl HotkeyBindings {
    pub fn action_for(&self, shortcut: Shortcut) -> Option<HotkeyAction> {
        if shortcut == self.grammar {
            Some(HotkeyAction::Grammar)
        } else if shortcut == self.tone {
            Some(HotkeyAction::Tone)
        } else {
            None
        }
    }
}

/// 仮想キーコード → 表示文字列（未知は "?"）
pub fn key_code_to_str(key_code: u32) -> &'static str {
    match key_code {
        0x00 => "A",
        0x0B => "B",
        0x08 => "C",
        0x02 => "D",
        0x0E => "E",
        0x03 => "F",
        0x05 => "G",
        0x04 => "H",
        0x22 => "I",
        0x26 => "J",
        0x28 => "K",
        0x25 => "L",
        0x2E => "M",
        0x2D => "N",
        0x1F => "O",
        0x23 => "P",
        0x0C => "Q",
        0x0F => "R",
        0x01 => "S",
        0x11 => "T",
        0x20 => "U",
        0x09 => "V",
        0x0D => "W",
        0x07 => "X",
        0x10 => "Y",
        0x06 => "Z",
        0x1D => "0",
        0x12 => "1",
        0x13 => "2",
        0x14 => "3",
        0x15 => "4",
        0x17 => "5",
        0x16 => "6",
        0x1A => "7",
        0x1C => "8",
        0x19 => "9",
        0x7A => "F1",
        0x78 => "F2",
        0x63 => "F3",
        0x76 => "F4",
        0x60 => "F5",
        0x61 => "F6",
        0x62 => "F7",
        0x64 => "F8",
        0x65 => "F9",
        0x6D => "F10",
        0x67 => "F11",
        0x6F => "F12",
        0x31 => "Space",
        0x24 => "Return",
        0x30 => "Tab",
        0x35 => "Esc",
        0x1B => "-",
        0x18 => "=",
        0x21 => "[",
        0x1E => "]",
        0x29 => ";",
        0x27 => "'",
        0x2B => ",",
        0x2F => ".",
        0x2C => "/",
        0x2A => "\\",
        _ => "?",
    }
}

/// 表示文字列 → 仮想キーコード（大文字小文字は無視）
pub fn key_code_from_str(name: &str) -> Option<u32> {
    let upper = name.to_uppercase();
    (0u32..0x80).find(|&code| {
        let s = key_code_to_str(code);
        s != "?" && s.to_uppercase() == upper
    })
}

/// "ctrl+shift+g" 形式の文字列をパースする
pub fn parse_shortcut(input: &str) -> Option<Shortcut> {
    let mut modifiers = 0;
    let mut key_code = None;

    for part in input.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        match part.to_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= CONTROL_KEY,
            "opt" | "option" | "alt" => modifiers |= OPTION_KEY,
            "shift" => modifiers |= SHIFT_KEY,
            "cmd" | "command" | "meta" => modifiers |= CMD_KEY,
            key => {
                if key_code.is_some() {
                    return None;
                }
                key_code = Some(key_code_from_str(key)?);
            }
        }
    }

    key_code.map(|code| Shortcut::new(code, modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display_strings() {
        assert_eq!(Shortcut::default_grammar().display_string(), "⌃⇧G");
        assert_eq!(Shortcut::default_tone().display_string(), "⌃⇧T");
    }

    #[test]
    fn test_modifier_order() {
        let s = Shortcut::new(0x31, CMD_KEY | OPTION_KEY | SHIFT_KEY | CONTROL_KEY);
        assert_eq!(s.to_string(), "⌃⌥⇧⌘Space");
    }

    #[test]
    fn test_unknown_key_code() {
        assert_eq!(Shortcut::new(0xFF, 0).display_string(), "?");
    }

    #[test]
    fn test_parse_shortcut() {
        assert_eq!(parse_shortcut("ctrl+shift+g"), Some(Shortcut::default_grammar()));
        assert_eq!(
            parse_shortcut("Cmd+Opt+F5"),
            Some(Shortcut::new(0x60, CMD_KEY | OPTION_KEY))
        );
        assert_eq!(parse_shortcut("ctrl+shift"), None);
        assert_eq!(parse_shortcut("ctrl+g+t"), None);
        assert_eq!(parse_shortcut("ctrl+nope"), None);
    }

    #[test]
    fn test_action_for() {
        let bindings = HotkeyBindings {
            grammar: Shortcut::default_grammar(),
            tone: Shortcut::default_tone(),
        };
        assert_eq!(
            bindings.action_for(Shortcut::default_tone()),
            Some(HotkeyAction::Tone)
        );
        assert_eq!(bindings.action_for(Shortcut::new(KEY_CODE_G, 0)), None);
    }
}
