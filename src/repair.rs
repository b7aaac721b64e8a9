//! 既存CSVの修復
//!
//! 生レスポンス列（結果）を持つタブ区切りCSVを読み、表情の名前とセリフを
//! 抽出し直して、固定4列のタブ区切りCSVを書き出す。

use crate::error::Result;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use expression_ai_common::types::{COLUMN_FILE_NAME, COLUMN_FILE_PATH, COLUMN_RAW_RESULT};
use expression_ai_common::{extract_expression, RESULT_COLUMNS};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// 書き出した行数
    pub rows: usize,
    /// どちらかのフィールドが取れなかった行数
    pub misses: usize,
    /// 両方とも取れなかった行数（missesの内数）
    pub unparsed: usize,
}

/// 列名から位置を引く（BOM付きヘッダーにも対応）
fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
}

pub fn repair_csv(input: &Path, output: &Path) -> Result<RepairSummary> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(input)?;

    let headers = reader.headers()?.clone();
    let name_idx = column_index(&headers, COLUMN_FILE_NAME);
    let path_idx = column_index(&headers, COLUMN_FILE_PATH);
    let raw_idx = column_index(&headers, COLUMN_RAW_RESULT);
    if raw_idx.is_none() {
        tracing::warn!(input = %input.display(), "「{}」列がありません", COLUMN_RAW_RESULT);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .from_path(output)?;
    writer.write_record(RESULT_COLUMNS)?;

    let field = |record: &StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
    };

    let mut summary = RepairSummary::default();
    for record in reader.records() {
        let record = record?;
        tracing::debug!(row = ?record, "行を処理");

        let raw = field(&record, raw_idx);
        let extracted = extract_expression(&raw);
        if extracted.is_partial_miss() {
            summary.misses += 1;
        }
        if extracted.is_empty() {
            summary.unparsed += 1;
        }

        writer.write_record([
            field(&record, name_idx),
            field(&record, path_idx),
            extracted.expression_name,
            extracted.spoken_line,
        ])?;
        summary.rows += 1;
    }
    writer.flush()?;

    Ok(summary)
}
