// Command-line interface definitions for rewrite

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rewrite")]
#[command(author, version, about = "Fix grammar or rewrite tone of selected text with a local model")]
#[command(long_about = "
Rewrite sends selected text to a local Ollama-compatible model server and
either replaces the selection in place or shows the rewritten result.

SETUP:
  1. Install and start Ollama: ollama serve
  2. Pull a model: ollama pull gemma3
  3. Run: rewrite models (to check the server connection)
  4. Run: rewrite run (to start listening for hotkeys)

USAGE:
  Ctrl+Shift+G fixes grammar of the selection in place.
  Ctrl+Shift+T opens the result view with all rewrite modes.
")]
pub struct Cli {
    /// Path to the settings database
    #[arg(long, value_name = "FILE", env = "REWRITE_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Listen for hotkeys and handle the result view on the terminal (default)
    Run,

    /// Fix grammar of TEXT (or stdin) with the default mode and print the result
    Fix {
        /// Text to fix (reads stdin when omitted)
        text: Option<String>,

        /// Also copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Rewrite TEXT (or stdin) with the given mode and print the result
    Rewrite {
        /// Mode name or id
        #[arg(short, long, value_name = "MODE")]
        mode: String,

        /// Text to rewrite (reads stdin when omitted)
        text: Option<String>,

        /// Also copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Print the prompt that would be sent to the model server
    Prompt {
        /// Mode name or id (default mode when omitted)
        #[arg(short, long, value_name = "MODE")]
        mode: Option<String>,

        /// Input text (reads stdin when omitted)
        text: Option<String>,
    },

    /// List models available on the model server
    Models,

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Manage rewrite modes
    Modes {
        #[command(subcommand)]
        action: Option<ModesAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current settings
    Show,

    /// Change a setting
    Set {
        #[command(subcommand)]
        setting: ConfigSetting,
    },
}

#[derive(Subcommand)]
pub enum ConfigSetting {
    /// Model server base URL (e.g., http://localhost:11434)
    ServerUrl { url: String },

    /// Model name (e.g., gemma3)
    Model { name: String },

    /// Tone description used by the "My Tone" mode
    Tone { description: String },

    /// Grammar hotkey (e.g., ctrl+shift+g)
    GrammarHotkey { shortcut: String },

    /// Tone hotkey (e.g., ctrl+shift+t)
    ToneHotkey { shortcut: String },
}

#[derive(Subcommand)]
pub enum ModesAction {
    /// List rewrite modes
    List {
        /// Print the stored JSON array
        #[arg(long)]
        json: bool,
    },

    /// Add a custom mode
    Add { name: String, prompt: String },

    /// Edit a mode's name and/or prompt
    Edit {
        /// Mode name or id
        mode: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        prompt: Option<String>,
    },

    /// Remove a mode
    Remove {
        /// Mode name or id
        mode: String,
    },

    /// Make a mode the default for the grammar hotkey and the result view
    SetDefault {
        /// Mode name or id
        mode: String,
    },

    /// Forget the default mode (the first mode is used)
    ClearDefault,
}
