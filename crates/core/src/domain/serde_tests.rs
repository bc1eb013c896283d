#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::error::{AppError, ErrorCode};
    use crate::domain::popup::PopupPhase;
    use crate::domain::rewrite_mode::{default_rewrite_modes, RewriteMode, FIX_GRAMMAR_MODE_ID};
    use crate::domain::shortcut::{HotkeyAction, Shortcut};

    #[test]
    fn test_rewrite_mode_roundtrip() {
        let mode = RewriteMode::new(Uuid::new_v4(), "Test", "Test prompt");
        let json = serde_json::to_string(&mode).unwrap();
        let roundtrip: RewriteMode = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, mode);
    }

    #[test]
    fn test_rewrite_mode_roundtrip_empty_fields() {
        let mode = RewriteMode::new(Uuid::nil(), "", "");
        let json = serde_json::to_string(&mode).unwrap();
        let roundtrip: RewriteMode = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, mode);
    }

    #[test]
    fn test_rewrite_mode_record_shape() {
        let mode = RewriteMode::fix_grammar();
        let value = serde_json::to_value(&mode).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["id"], FIX_GRAMMAR_MODE_ID.to_string());
        assert_eq!(obj["name"], "Fix Grammar");
        assert!(obj["prompt"].as_str().unwrap().contains("em dashes"));
    }

    #[test]
    fn test_rewrite_mode_list_roundtrip() {
        let modes = default_rewrite_modes();
        let json = serde_json::to_string(&modes).unwrap();
        let roundtrip: Vec<RewriteMode> = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, modes);
    }

    #[test]
    fn test_rewrite_mode_accepts_uppercase_uuid() {
        let json = r#"{"id":"0F1E2D3C-4B5A-6978-8796-A5B4C3D2E1F0","name":"N","prompt":"P"}"#;
        let mode: RewriteMode = serde_json::from_str(json).unwrap();
        assert_eq!(
            mode.id,
            Uuid::parse_str("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0").unwrap()
        );
    }

    #[test]
    fn test_popup_phase_serialization() {
        assert_eq!(
            serde_json::to_string(&PopupPhase::Loading).unwrap(),
            r#"{"phase":"loading"}"#
        );
        let json = serde_json::to_string(&PopupPhase::Error("down".to_string())).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("down"));
    }

    #[test]
    fn test_hotkey_action_serialization() {
        assert_eq!(
            serde_json::to_string(&HotkeyAction::Grammar).unwrap(),
            "\"grammar\""
        );
        assert_eq!(
            serde_json::from_str::<HotkeyAction>("\"tone\"").unwrap(),
            HotkeyAction::Tone
        );
    }

    #[test]
    fn test_shortcut_serialization() {
        let json = serde_json::to_string(&Shortcut::default_grammar()).unwrap();
        assert!(json.contains("key_code"));
        assert!(json.contains("modifiers"));
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::Permission).unwrap(),
            "\"E_PERMISSION\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::NoSelection).unwrap(),
            "\"E_NO_SELECTION\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::Rewrite).unwrap(),
            "\"E_REWRITE\""
        );
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::rewrite("connection refused");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("E_REWRITE"));
        assert!(json.contains("recoverable"));
        assert!(json.contains("connection refused"));
    }
}
