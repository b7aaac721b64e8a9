use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpressionAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。環境変数 GOOGLE_API_KEY を設定してください")]
    MissingApiKey,

    #[error("SSL証明書が見つかりません: {0}")]
    CertificateNotFound(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("API呼び出しエラー: {0}")]
    Remote(String),

    #[error("バッチ処理スレッドエラー: {0}")]
    Worker(String),

    #[error("画像が見つかりません: {0}")]
    NoImagesFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] expression_ai_common::Error),
}

pub type Result<T> = std::result::Result<T, ExpressionAiError>;
