//! 解析データの型定義
//!
//! CLIとパイプラインで共有される型:
//! - AnalysisRequest: 1枚の入力画像
//! - AnalysisResult: 1枚分の解析結果（成功/失敗）
//! - BatchRun: 履歴ログの1エントリ

use serde::{Deserialize, Serialize};
use std::path::Path;

/// CSV列名: ファイル名
pub const COLUMN_FILE_NAME: &str = "ファイル名";
/// CSV列名: ファイルパス
pub const COLUMN_FILE_PATH: &str = "ファイルパス";
/// CSV列名: 表情の名前
pub const COLUMN_EXPRESSION_NAME: &str = "表情の名前";
/// CSV列名: 言いそうなセリフ
pub const COLUMN_SPOKEN_LINE: &str = "言いそうなセリフ";
/// 修復ツール入力の生レスポンス列
pub const COLUMN_RAW_RESULT: &str = "結果";

/// 結果CSVのヘッダー（固定4列）
pub const RESULT_COLUMNS: [&str; 4] = [
    COLUMN_FILE_NAME,
    COLUMN_FILE_PATH,
    COLUMN_EXPRESSION_NAME,
    COLUMN_SPOKEN_LINE,
];

/// 解析対象の画像1枚
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    file_path: String,
    file_name: String,
}

impl AnalysisRequest {
    /// パスからリクエストを作成（ファイル名はパスのbasename）
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            file_path: path.display().to_string(),
            file_name,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// 1枚分の解析結果
///
/// `succeeded == false` のとき `expression_name` と `spoken_line` は空文字で、
/// `raw_text` にはエラーメッセージが入る。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_name: String,

    #[serde(default)]
    pub file_path: String,

    /// モデルの生レスポンス、またはエラーメッセージ
    #[serde(default)]
    pub raw_text: String,

    #[serde(default)]
    pub expression_name: String,  // 表情の名前

    #[serde(default)]
    pub spoken_line: String,      // 言いそうなセリフ

    #[serde(default)]
    pub succeeded: bool,
}

impl AnalysisResult {
    /// 解析成功の結果を作成
    pub fn success(
        request: &AnalysisRequest,
        raw_text: impl Into<String>,
        expression_name: impl Into<String>,
        spoken_line: impl Into<String>,
    ) -> Self {
        Self {
            file_name: request.file_name().to_string(),
            file_path: request.file_path().to_string(),
            raw_text: raw_text.into(),
            expression_name: expression_name.into(),
            spoken_line: spoken_line.into(),
            succeeded: true,
        }
    }

    /// 解析失敗の結果を作成（抽出フィールドは常に空）
    pub fn failure(request: &AnalysisRequest, message: impl Into<String>) -> Self {
        Self {
            file_name: request.file_name().to_string(),
            file_path: request.file_path().to_string(),
            raw_text: message.into(),
            expression_name: String::new(),
            spoken_line: String::new(),
            succeeded: false,
        }
    }

    /// CSV行（ファイル名, ファイルパス, 表情の名前, 言いそうなセリフ）
    pub fn csv_record(&self) -> [&str; 4] {
        [
            self.file_name.as_str(),
            self.file_path.as_str(),
            self.expression_name.as_str(),
            self.spoken_line.as_str(),
        ]
    }
}

/// 履歴ログの1エントリ（1バッチ分）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRun {
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub files_processed: Vec<String>,
    pub results: Vec<String>,
}

impl BatchRun {
    /// ファイルと結果をインデックス順に組にして返す
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files_processed
            .iter()
            .zip(self.results.iter())
            .map(|(f, r)| (f.as_str(), r.as_str()))
    }
}
