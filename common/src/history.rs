//! 履歴ドキュメントの読み込みと表示用整形

use crate::error::Result;
use crate::types::BatchRun;
use std::path::Path;

/// 履歴が無いとき、または読めないときの表示
pub const NO_HISTORY: &str = "履歴なし";

/// 履歴JSON（BatchRunの配列）を読み込む
pub fn load_history(path: &Path) -> Result<Vec<BatchRun>> {
    let content = std::fs::read_to_string(path)?;
    let runs: Vec<BatchRun> = serde_json::from_str(&content)?;
    Ok(runs)
}

/// 直近 `max_entries` 件を新しい順に整形
///
/// ```text
/// 解析実行: 2025-01-18 10:00:00
///   - a.jpg: 結果
/// ```
pub fn render_history(runs: &[BatchRun], max_entries: usize) -> String {
    if runs.is_empty() || max_entries == 0 {
        return NO_HISTORY.to_string();
    }

    let start = runs.len().saturating_sub(max_entries);
    let mut text = String::new();

    for run in runs[start..].iter().rev() {
        text.push_str(&format!("解析実行: {}\n", run.timestamp));
        for (file, result) in run.pairs() {
            text.push_str(&format!("  - {}: {}\n", file, result));
        }
        text.push('\n');
    }

    text.trim().to_string()
}
