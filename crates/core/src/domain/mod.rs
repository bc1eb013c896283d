pub mod error;
pub mod popup;
pub mod rewrite_mode;
pub mod settings;
pub mod shortcut;

#[cfg(test)]
mod serde_tests;
