use crate::error::{ExpressionAiError, Result};
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_CERT_FILE: &str = "SSL_CERT_FILE";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_HISTORY_FILE: &str = "HISTORY_FILE";
pub const ENV_MODEL: &str = "GEMINI_MODEL";

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OUTPUT_SUBDIR: &str = "output";
const DEFAULT_HISTORY_FILE: &str = "history.json";

/// 生成パラメータ（プロセス中は固定）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

/// 起動時に一度だけ組み立てる設定
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    /// 追加で信頼する証明書バンドル（PEM）。Noneならシステム既定
    pub cert_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub history_file: PathBuf,
    pub model: String,
    pub timeout_seconds: u64,
    pub generation: GenerationSettings,
}

impl Config {
    /// `.env` と環境変数から読み込む
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), ".envを読み込みました");
        }
        let cwd = std::env::current_dir()?;
        Self::from_lookup(|key| std::env::var(key).ok(), &cwd)
    }

    /// 任意のキー参照関数から組み立てる
    pub fn from_lookup<F>(lookup: F, cwd: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(ENV_API_KEY).ok_or(ExpressionAiError::MissingApiKey)?;

        let cert_path = match non_empty(ENV_CERT_FILE) {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.is_file() {
                    return Err(ExpressionAiError::CertificateNotFound(
                        path.display().to_string(),
                    ));
                }
                tracing::debug!(path = %path.display(), "指定の証明書を使用");
                Some(path)
            }
            None => {
                tracing::debug!("システム既定の証明書を使用");
                None
            }
        };

        let output_dir = non_empty(ENV_OUTPUT_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join(DEFAULT_OUTPUT_SUBDIR));

        let history_file = non_empty(ENV_HISTORY_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.join(DEFAULT_HISTORY_FILE));

        let model = non_empty(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            cert_path,
            output_dir,
            history_file,
            model,
            timeout_seconds: 120,
            generation: GenerationSettings::default(),
        })
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.output_dir = dir;
        }
        self
    }

    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.history_file = path;
        }
        self
    }

    /// 出力フォルダを用意して返す
    pub fn ensure_output_dir(&self) -> Result<&Path> {
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir)?;
            tracing::debug!(dir = %self.output_dir.display(), "出力フォルダを作成");
        }
        Ok(&self.output_dir)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"***")
            .field("cert_path", &self.cert_path)
            .field("output_dir", &self.output_dir)
            .field("history_file", &self.history_file)
            .field("model", &self.model)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("generation", &self.generation)
            .finish()
    }
}

/// 履歴ファイルのパスだけを環境から決める（APIキー不要のコマンド用）
pub fn history_file_from_env(cwd: &Path) -> PathBuf {
    let _ = dotenvy::dotenv();
    std::env::var(ENV_HISTORY_FILE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| cwd.join(DEFAULT_HISTORY_FILE))
}
