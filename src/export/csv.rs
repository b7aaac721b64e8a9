//! 結果CSV出力
//!
//! カンマ区切り・全フィールド引用符付き。フィールド内のタブは空白1個に置き換える。

use crate::error::Result;
use ::csv::{QuoteStyle, WriterBuilder};
use expression_ai_common::{AnalysisResult, RESULT_COLUMNS};
use std::path::{Path, PathBuf};

/// タブを空白に置き換える
pub fn sanitize_field(value: &str) -> String {
    value.replace('\t', " ")
}

/// 出力ファイル名（`result_{epoch秒}.csv`）
///
/// 同じ秒に既存ファイルがあれば連番を付ける。
pub fn result_csv_path(output_dir: &Path, epoch_seconds: i64) -> PathBuf {
    let path = output_dir.join(format!("result_{}.csv", epoch_seconds));
    if !path.exists() {
        return path;
    }

    (1..)
        .map(|n| output_dir.join(format!("result_{}_{}.csv", epoch_seconds, n)))
        .find(|p| !p.exists())
        .unwrap_or(path)
}

/// 結果を1行ずつ入力順にCSVへ書き出す
pub fn write_result_csv(results: &[AnalysisResult], path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote_style(QuoteStyle::Always)
        .from_path(path)?;

    writer.write_record(RESULT_COLUMNS)?;
    for result in results {
        writer.write_record(result.csv_record().iter().map(|v| sanitize_field(v)))?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = results.len(), "CSVを書き出しました");
    Ok(())
}
