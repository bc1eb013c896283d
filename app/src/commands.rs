//! One-shot subcommands: rewrite, prompt preview, model listing, settings and mode management

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use uuid::Uuid;

use rw_core::domain::rewrite_mode::RewriteMode;
use rw_core::domain::settings::{KeyValueStore, Settings};
use rw_core::domain::shortcut::parse_shortcut;
use rw_core::infra::os_integration::OsIntegration;
use rw_core::infra::output::{ClipboardOutput, OutputTarget};
use rw_core::usecase::app_service::AppService;

use crate::cli::{ConfigAction, ConfigSetting, ModesAction};

/// モード名または UUID からモード ID を引く（名前は完全一致、なければ大小無視）
pub fn resolve_mode<S: KeyValueStore>(settings: &Settings<S>, name_or_id: &str) -> anyhow::Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(name_or_id) {
        if let Some(mode) = settings.find_mode(id) {
            return Ok(mode.id);
        }
    }
    if let Some(mode) = settings.find_mode_by_name(name_or_id) {
        return Ok(mode.id);
    }
    settings
        .rewrite_modes()
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name_or_id))
        .map(|m| m.id)
        .with_context(|| format!("Unknown mode: {name_or_id} (see `rewrite modes list`)"))
}

fn read_text(text: Option<String>) -> anyhow::Result<String> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if text.is_empty() {
        bail!("No text to rewrite");
    }
    Ok(text)
}

pub async fn rewrite<S: KeyValueStore>(
    service: &AppService<S>,
    mode: Option<&str>,
    text: Option<String>,
    copy: bool,
) -> anyhow::Result<()> {
    let mode_id = mode
        .map(|m| resolve_mode(service.settings(), m))
        .transpose()?;
    let text = read_text(text)?;

    let result = service.rewrite_once(mode_id, &text).await?;
    println!("{result}");

    if copy {
        ClipboardOutput::new().deliver(&result)?;
        tracing::info!("Copied to clipboard");
    }
    Ok(())
}

pub fn prompt<S: KeyValueStore>(
    service: &AppService<S>,
    mode: Option<&str>,
    text: Option<String>,
) -> anyhow::Result<()> {
    let mode_id = mode
        .map(|m| resolve_mode(service.settings(), m))
        .transpose()?;
    let text = read_text(text)?;
    println!("{}", service.preview_prompt(mode_id, &text)?);
    Ok(())
}

pub async fn models<S: KeyValueStore>(service: &AppService<S>) {
    let models = service.list_models().await;
    if models.is_empty() {
        eprintln!(
            "No models found. Is the model server running at {}?",
            service.settings().server_url()
        );
        return;
    }

    let current = service.settings().model_name();
    for model in models {
        let marker = if model == current || model.split(':').next() == Some(current) {
            "*"
        } else {
            " "
        };
        println!("{marker} {model}");
    }
}

pub fn config<S: KeyValueStore>(
    settings: &mut Settings<S>,
    action: Option<ConfigAction>,
    db_path: &Path,
) -> anyhow::Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let default_mode = settings
                .resolve_default_mode()
                .map(|m| m.name.clone())
                .unwrap_or_else(|| "(none)".to_string());

            println!("Rewrite Configuration");
            println!("=====================\n");
            println!("Database:       {}", db_path.display());
            println!("Server URL:     {}", settings.server_url());
            println!("Model:          {}", settings.model_name());
            println!("Tone:           {}", settings.tone_description());
            println!("Default mode:   {default_mode}");
            println!("Grammar hotkey: {}", settings.grammar_shortcut());
            println!("Tone hotkey:    {}", settings.tone_shortcut());
            println!("Modes:          {}", settings.rewrite_modes().len());
            println!(
                "Accessibility:  {}",
                OsIntegration::check_accessibility_permission().as_str()
            );
        }

        ConfigAction::Set { setting } => match setting {
            ConfigSetting::ServerUrl { url } => settings.set_server_url(url),
            ConfigSetting::Model { name } => settings.set_model_name(name),
            ConfigSetting::Tone { description } => settings.set_tone_description(description),
            ConfigSetting::GrammarHotkey { shortcut } => {
                let parsed = parse_shortcut(&shortcut)
                    .with_context(|| format!("Invalid shortcut: {shortcut}"))?;
                if parsed == settings.tone_shortcut() {
                    bail!("{parsed} is already the tone hotkey");
                }
                settings.set_grammar_shortcut(parsed);
            }
            ConfigSetting::ToneHotkey { shortcut } => {
                let parsed = parse_shortcut(&shortcut)
                    .with_context(|| format!("Invalid shortcut: {shortcut}"))?;
                if parsed == settings.grammar_shortcut() {
                    bail!("{parsed} is already the grammar hotkey");
                }
                settings.set_tone_shortcut(parsed);
            }
        },
    }
    Ok(())
}

pub fn modes<S: KeyValueStore>(
    settings: &mut Settings<S>,
    action: Option<ModesAction>,
) -> anyhow::Result<()> {
    match action.unwrap_or(ModesAction::List { json: false }) {
        ModesAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(settings.rewrite_modes())?);
                return Ok(());
            }
            let default_id = settings.resolve_default_mode().map(|m| m.id);
            for mode in settings.rewrite_modes() {
                let marker = if Some(mode.id) == default_id { "*" } else { " " };
                println!("{marker} {}  {}", mode.id, mode.name);
            }
        }

        ModesAction::Add { name, prompt } => {
            let mode = RewriteMode::new_custom(name, prompt);
            println!("Added {} ({})", mode.name, mode.id);
            settings.add_mode(mode);
        }

        ModesAction::Edit { mode, name, prompt } => {
            let id = resolve_mode(settings, &mode)?;
            let current = settings
                .find_mode(id)
                .cloned()
                .with_context(|| format!("Unknown mode: {mode}"))?;
            settings.update_mode(
                id,
                name.unwrap_or(current.name),
                prompt.unwrap_or(current.prompt),
            );
        }

        ModesAction::Remove { mode } => {
            let id = resolve_mode(settings, &mode)?;
            if let Some(removed) = settings.remove_mode(id) {
                println!("Removed {}", removed.name);
                if removed.is_reserved() {
                    println!("Note: \"{}\" is restored on next start", removed.name);
                }
            }
        }

        ModesAction::SetDefault { mode } => {
            let id = resolve_mode(settings, &mode)?;
            settings.set_default_mode_id(Some(id));
        }

        ModesAction::ClearDefault => settings.set_default_mode_id(None),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_core::domain::rewrite_mode::FIX_GRAMMAR_MODE_ID;
    use rw_core::infra::storage::Storage;

    #[test]
    fn test_resolve_mode_by_id_and_name() {
        let storage = Storage::open_in_memory().unwrap();
        let settings = Settings::load(&storage);

        assert_eq!(
            resolve_mode(&settings, &FIX_GRAMMAR_MODE_ID.to_string()).unwrap(),
            FIX_GRAMMAR_MODE_ID
        );
        assert_eq!(resolve_mode(&settings, "Fix Grammar").unwrap(), FIX_GRAMMAR_MODE_ID);
        assert_eq!(resolve_mode(&settings, "fix grammar").unwrap(), FIX_GRAMMAR_MODE_ID);
        assert!(resolve_mode(&settings, "Pirate").is_err());
        assert!(resolve_mode(&settings, &Uuid::new_v4().to_string()).is_err());
    }

    #[test]
    fn test_modes_add_edit_remove() {
        let storage = Storage::open_in_memory().unwrap();
        let mut settings = Settings::load(&storage);
        let before = settings.rewrite_modes().len();

        modes(
            &mut settings,
            Some(ModesAction::Add {
                name: "Pirate".to_string(),
                prompt: "Talk like a pirate.".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(settings.rewrite_modes().len(), before + 1);

        modes(
            &mut settings,
            Some(ModesAction::Edit {
                mode: "Pirate".to_string(),
                name: None,
                prompt: Some("Arr.".to_string()),
            }),
        )
        .unwrap();
        assert_eq!(settings.find_mode_by_name("Pirate").unwrap().prompt, "Arr.");

        modes(
            &mut settings,
            Some(ModesAction::SetDefault {
                mode: "pirate".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(settings.resolve_default_mode().unwrap().name, "Pirate");

        modes(
            &mut settings,
            Some(ModesAction::Remove {
                mode: "Pirate".to_string(),
            }),
        )
        .unwrap();
        assert!(settings.find_mode_by_name("Pirate").is_none());
        assert_eq!(settings.rewrite_modes().len(), before);
    }

    #[test]
    fn test_config_set_rejects_duplicate_hotkey() {
        let storage = Storage::open_in_memory().unwrap();
        let mut settings = Settings::load(&storage);
        let path = Path::new(":memory:");

        let result = config(
            &mut settings,
            Some(ConfigAction::Set {
                setting: ConfigSetting::GrammarHotkey {
                    shortcut: "ctrl+shift+t".to_string(),
                },
            }),
            path,
        );
        assert!(result.is_err());

        config(
            &mut settings,
            Some(ConfigAction::Set {
                setting: ConfigSetting::Model {
                    name: "llama3".to_string(),
                },
            }),
            path,
        )
        .unwrap();
        assert_eq!(Settings::load(&storage).model_name(), "llama3");
    }
}
