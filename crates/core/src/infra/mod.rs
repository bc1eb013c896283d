pub mod hotkey;
pub mod os_integration;
pub mod output;
pub mod rewriter;
pub mod storage;
