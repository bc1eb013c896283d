use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::error::AppError;
use crate::domain::settings::KeyValueStore;

/// SQLiteストレージ（settings テーブルのみのフラットな key-value）
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// 新規接続（ファイルパス指定）
    pub fn open(path: &str) -> Result<Self, AppError> {
        let conn = Connection::open(path)
            .map_err(|e| AppError::storage(format!("DB接続に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// in-memory DB（テスト用）
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::storage(format!("in-memory DB作成に失敗: {e}")))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    /// スキーママイグレーション
    fn migrate(&self) -> Result<(), AppError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| AppError::storage(format!("マイグレーション失敗: {e}")))?;
        Ok(())
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| AppError::storage(format!("設定読み込み失敗: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| AppError::storage(format!("設定保存失敗: {e}")))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .map_err(|e| AppError::storage(format!("設定削除失敗: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.get("nope").unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set("modelName", "llama3").unwrap();
        assert_eq!(storage.get("modelName").unwrap().as_deref(), Some("llama3"));
    }

    #[test]
    fn test_set_overwrites() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_remove() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        // 存在しないキーの削除はエラーにしない
        storage.remove("k").unwrap();
    }

    #[test]
    fn test_empty_string_value() {
        let storage = Storage::open_in_memory().unwrap();
        storage.set("toneDescription", "").unwrap();
        assert_eq!(storage.get("toneDescription").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_reopen_file_keeps_values() {
        let path = std::env::temp_dir().join(format!("rw-core-{}.db", uuid::Uuid::new_v4()));
        let path_str = path.to_string_lossy().to_string();
        {
            let storage = Storage::open(&path_str).unwrap();
            storage.set("ollamaURL", "http://box:11434").unwrap();
        }
        let storage = Storage::open(&path_str).unwrap();
        assert_eq!(
            storage.get("ollamaURL").unwrap().as_deref(),
            Some("http://box:11434")
        );
        drop(storage);
        std::fs::remove_file(&path).ok();
    }
}
