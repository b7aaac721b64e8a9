//! 解析履歴ログ
//!
//! 過去のバッチ実行をJSON配列1つに追記していく。書き手は常に1つだけの前提。

use crate::error::Result;
use expression_ai_common::{load_history, render_history, BatchRun, NO_HISTORY};
use std::path::{Path, PathBuf};

/// 履歴のタイムスタンプ書式
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 表示する件数の既定値
pub const DEFAULT_RECENT_ENTRIES: usize = 5;

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ファイルが無ければ空配列で作成
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            self.write(&[])?;
        }
        Ok(())
    }

    /// 全件読み込み（読めない・壊れている場合は空扱い）
    pub fn load(&self) -> Vec<BatchRun> {
        match load_history(&self.path) {
            Ok(runs) => runs,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "履歴を読めないため空として扱う");
                Vec::new()
            }
        }
    }

    /// 1バッチ分を追記して、追加したエントリを返す
    pub fn append(&self, files_processed: Vec<String>, results: Vec<String>) -> Result<BatchRun> {
        let mut runs = self.load();

        let run = BatchRun {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            files_processed,
            results,
        };
        runs.push(run.clone());

        self.write(&runs)?;
        Ok(run)
    }

    /// 直近 `max_entries` 件を新しい順に整形
    pub fn format_recent(&self, max_entries: usize) -> String {
        match load_history(&self.path) {
            Ok(runs) => render_history(&runs, max_entries),
            Err(_) => NO_HISTORY.to_string(),
        }
    }

    /// 履歴を空にする
    pub fn clear(&self) -> Result<()> {
        self.write(&[])
    }

    fn write(&self, runs: &[BatchRun]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(runs)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
