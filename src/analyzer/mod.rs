//! 外部解析サービス
//!
//! アップロードしてから解析する2段階の契約を `AnalysisClient` で表す。
//! 実装は Gemini API（`gemini`）。

pub mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// アップロード済みファイルのハンドル
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileHandle {
    /// サービス側のリソース名（例: files/abc123）
    pub name: String,
    pub display_name: String,
    pub uri: String,
    pub mime_type: String,
}

/// 解析サービスのクライアント
pub trait AnalysisClient: Send + Sync {
    /// 画像をアップロードする
    ///
    /// ファイルが無ければ `FileNotFound`、通信・認証・サービスの失敗は `Remote`。
    fn upload(&self, path: &Path, mime_type: &str) -> Result<FileHandle>;

    /// アップロード済み画像の表情を解析し、モデルの返答テキストを返す
    ///
    /// 返答が正しいJSONである保証はない。
    fn analyze(&self, handle: &FileHandle) -> Result<String>;
}

/// 拡張子からMIMEタイプを決める（不明ならJPEG）
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
