//! Daemon loop: the single owner of settings and the result view
//!
//! Hotkey events, model server completions and terminal commands are all
//! drained here, so the service is only ever touched from this task.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use rw_core::domain::popup::{PopupPhase, PopupState};
use rw_core::domain::settings::KeyValueStore;
use rw_core::domain::shortcut::HotkeyAction;
use rw_core::usecase::app_service::{AppService, CompletionOutcome};
use rw_core::usecase::request_queue::Completion;

/// 端末から入力される操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopoverCommand {
    Trigger(HotkeyAction),
    /// 1 始まりのモード番号
    SelectIndex(usize),
    SelectName(String),
    Replace,
    Copy,
    Cancel,
    Show,
    Help,
    Quit,
}

impl PopoverCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if let Ok(index) = line.parse::<usize>() {
            return Ok(Self::SelectIndex(index));
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_lowercase().as_str() {
            "g" | "grammar" => Ok(Self::Trigger(HotkeyAction::Grammar)),
            "t" | "tone" => Ok(Self::Trigger(HotkeyAction::Tone)),
            "m" | "mode" if !rest.is_empty() => Ok(Self::SelectName(rest.to_string())),
            "r" | "replace" => Ok(Self::Replace),
            "c" | "copy" => Ok(Self::Copy),
            "x" | "cancel" | "esc" => Ok(Self::Cancel),
            "s" | "show" | "" => Ok(Self::Show),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            _ => Err(format!("Unknown command: {line} (type `help`)")),
        }
    }
}

pub async fn run<S: KeyValueStore>(
    mut service: AppService<S>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
) -> anyhow::Result<()> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    service.start(events_tx.clone())?;

    let settings = service.settings();
    tracing::info!(
        "Listening: grammar={} tone={} (server {}, model {})",
        settings.grammar_shortcut(),
        settings.tone_shortcut(),
        settings.server_url(),
        settings.model_name()
    );
    print_help();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(action) = events.recv() => {
                tracing::debug!("Hotkey: {:?}", action);
                service.handle_hotkey(action);
                if action == HotkeyAction::Tone && service.popup().is_some() {
                    render(service.popup());
                }
            }

            Some(completion) = completions.recv() => {
                match service.on_completion(completion) {
                    CompletionOutcome::Replaced => println!("Replaced selection"),
                    CompletionOutcome::PopupUpdated(_) => render(service.popup()),
                    CompletionOutcome::Failed(message) => eprintln!("Rewrite failed: {message}"),
                    CompletionOutcome::Stale => {}
                }
            }

            line = stdin.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("stdin closed, exiting");
                    break;
                };
                match PopoverCommand::parse(&line) {
                    Ok(PopoverCommand::Quit) => break,
                    Ok(command) => handle_command(&mut service, &events_tx, command),
                    Err(message) => eprintln!("{message}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, exiting");
                break;
            }
        }
    }

    service.cancel_popup();
    Ok(())
}

fn handle_command<S: KeyValueStore>(
    service: &mut AppService<S>,
    events: &mpsc::UnboundedSender<HotkeyAction>,
    command: PopoverCommand,
) {
    let result = match command {
        PopoverCommand::Trigger(action) => {
            // ホットキーと同じ経路で処理する
            let _ = events.send(action);
            Ok(())
        }
        PopoverCommand::SelectIndex(index) => match popup_mode_at(service.popup(), index) {
            Some(id) => service.select_mode(id).map(|_| render(service.popup())),
            None => {
                eprintln!("No mode #{index}");
                Ok(())
            }
        },
        PopoverCommand::SelectName(name) => match crate::commands::resolve_mode(service.settings(), &name) {
            Ok(id) => service.select_mode(id).map(|_| render(service.popup())),
            Err(e) => {
                eprintln!("{e}");
                Ok(())
            }
        },
        PopoverCommand::Replace => service.replace_result().map(|_| println!("Replaced selection")),
        PopoverCommand::Copy => service.copy_result().map(|_| println!("Copied to clipboard")),
        PopoverCommand::Cancel => {
            service.cancel_popup();
            Ok(())
        }
        PopoverCommand::Show => {
            render(service.popup());
            Ok(())
        }
        PopoverCommand::Help => {
            print_help();
            Ok(())
        }
        PopoverCommand::Quit => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("{}", e.message);
    }
}

fn popup_mode_at(popup: Option<&PopupState>, index: usize) -> Option<uuid::Uuid> {
    let popup = popup?;
    index
        .checked_sub(1)
        .and_then(|i| popup.modes().get(i))
        .map(|m| m.id)
}

fn render(popup: Option<&PopupState>) {
    let Some(popup) = popup else {
        println!("(no result view open)");
        return;
    };

    println!();
    for (i, mode) in popup.modes().iter().enumerate() {
        let marker = if Some(mode.id) == popup.selected_mode_id() {
            ">"
        } else {
            " "
        };
        println!("{marker} {}. {}", i + 1, mode.name);
    }
    println!("---");
    match popup.phase() {
        PopupPhase::Loading => match popup.selected_mode() {
            Some(mode) => println!("Rewriting with {}...", mode.name),
            None => println!("Rewriting..."),
        },
        PopupPhase::Result(text) => println!("{text}\n---\n[r]eplace  [c]opy  [x] cancel"),
        PopupPhase::Error(message) => println!("Error: {message}"),
    }
}

fn print_help() {
    println!(
        "Commands:
  g, grammar      fix grammar of the selection in place
  t, tone         open the result view for the selection
  <n>             switch the result view to mode number n
  mode <name>     switch the result view to a mode by name
  r, replace      replace the selection with the result
  c, copy         copy the result to the clipboard
  x, cancel       close the result view
  s, show         show the result view
  q, quit         exit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            PopoverCommand::parse("g").unwrap(),
            PopoverCommand::Trigger(HotkeyAction::Grammar)
        );
        assert_eq!(
            PopoverCommand::parse(" Tone ").unwrap(),
            PopoverCommand::Trigger(HotkeyAction::Tone)
        );
        assert_eq!(PopoverCommand::parse("3").unwrap(), PopoverCommand::SelectIndex(3));
        assert_eq!(
            PopoverCommand::parse("mode My Tone").unwrap(),
            PopoverCommand::SelectName("My Tone".to_string())
        );
        assert_eq!(PopoverCommand::parse("").unwrap(), PopoverCommand::Show);
        assert_eq!(PopoverCommand::parse("q").unwrap(), PopoverCommand::Quit);
        assert!(PopoverCommand::parse("mode").is_err());
        assert!(PopoverCommand::parse("dance").is_err());
    }

    #[test]
    fn test_popup_mode_at_is_one_based() {
        let modes = rw_core::domain::rewrite_mode::default_rewrite_modes();
        let popup = PopupState::new(1, modes.clone(), "text".to_string());

        assert_eq!(popup_mode_at(Some(&popup), 1), Some(modes[0].id));
        assert_eq!(popup_mode_at(Some(&popup), 0), None);
        assert_eq!(popup_mode_at(Some(&popup), modes.len() + 1), None);
        assert_eq!(popup_mode_at(None, 1), None);
    }
}
