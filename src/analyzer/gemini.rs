//! Gemini API連携
//!
//! - upload: File API の resumable アップロード（start → upload, finalize）
//! - analyze: generateContent にファイルURIとシステム指示を渡す

use super::{AnalysisClient, FileHandle};
use crate::config::{Config, GenerationSettings};
use crate::error::{ExpressionAiError, Result};
use expression_ai_common::prompts::response_keys;
use expression_ai_common::{SYSTEM_INSTRUCTION, USER_MESSAGE};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// APIキーはURLに載せずヘッダーで送る（エラー文字列にURLが含まれるため）
const API_KEY_HEADER: &str = "x-goog-api-key";

/// generateContent リクエスト
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
    response_schema: serde_json::Value,
}

impl GenerationConfig {
    fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            max_output_tokens: settings.max_output_tokens,
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        }
    }
}

/// 2つの文字列フィールドだけを持つオブジェクトのスキーマ
fn response_schema() -> serde_json::Value {
    let keys = response_keys();
    let properties: serde_json::Map<String, serde_json::Value> = keys
        .iter()
        .map(|k| (k.to_string(), serde_json::json!({ "type": "STRING" })))
        .collect();

    serde_json::json!({
        "type": "OBJECT",
        "properties": properties,
        "required": keys,
    })
}

/// generateContent レスポンス
#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.iter().find_map(|p| p.text.as_deref()))
    }
}

/// File API アップロードのレスポンス
#[derive(Deserialize)]
struct UploadResponse {
    file: FileHandle,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationSettings,
}

impl GeminiClient {
    /// 設定からクライアントを作成（証明書バンドルがあれば信頼ルートに追加）
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if let Some(cert_path) = &config.cert_path {
            let pem = std::fs::read(cert_path)?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                ExpressionAiError::Config(format!(
                    "証明書を読み込めません ({}): {}",
                    cert_path.display(),
                    e
                ))
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        let http = builder
            .build()
            .map_err(|e| ExpressionAiError::Config(format!("HTTPクライアント作成失敗: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
            generation: config.generation,
        })
    }

    /// 接続先を差し替える（検証用サーバーなど）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn build_request(&self, handle: &FileHandle) -> GenerateRequest {
        GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::FileData {
                        file_data: FileData {
                            mime_type: handle.mime_type.clone(),
                            file_uri: handle.uri.clone(),
                        },
                    },
                    Part::Text {
                        text: USER_MESSAGE.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig::from_settings(&self.generation),
        }
    }
}

impl AnalysisClient for GeminiClient {
    fn upload(&self, path: &Path, mime_type: &str) -> Result<FileHandle> {
        tracing::debug!(path = %path.display(), mime_type, "アップロード開始");

        if !path.is_file() {
            return Err(ExpressionAiError::FileNotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // 1. アップロードセッション開始
        let start = self
            .http
            .post(self.upload_url())
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .map_err(|e| remote_error("アップロード開始", e))?;
        let start = ensure_success(start, "アップロード開始")?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ExpressionAiError::Remote("アップロードURLがレスポンスにありません".into())
            })?
            .to_string();

        // 2. 本体送信と確定
        let finish = self
            .http
            .post(&session_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .map_err(|e| remote_error("アップロード", e))?;
        let finish = ensure_success(finish, "アップロード")?;

        let uploaded: UploadResponse = finish
            .json()
            .map_err(|e| remote_error("アップロード応答の解析", e))?;

        let mut handle = uploaded.file;
        if handle.mime_type.is_empty() {
            handle.mime_type = mime_type.to_string();
        }

        tracing::debug!(display_name = %handle.display_name, uri = %handle.uri, "アップロード完了");
        Ok(handle)
    }

    fn analyze(&self, handle: &FileHandle) -> Result<String> {
        tracing::debug!(display_name = %handle.display_name, model = %self.model, "解析開始");

        let request = self.build_request(handle);
        let response = self
            .http
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| remote_error("解析", e))?;
        let response = ensure_success(response, "解析")?;

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| remote_error("解析応答の解析", e))?;

        let text = parsed
            .first_text()
            .ok_or_else(|| ExpressionAiError::Remote("レスポンスにテキストがありません".into()))?
            .to_string();

        tracing::debug!(chars = text.chars().count(), "解析応答を受信");
        Ok(text)
    }
}

/// reqwestのエラーをRemoteに変換（URLは落とす）
fn remote_error(step: &str, e: reqwest::Error) -> ExpressionAiError {
    let e = e.without_url();
    if e.is_timeout() {
        ExpressionAiError::Remote(format!("{}がタイムアウトしました", step))
    } else if e.is_connect() {
        ExpressionAiError::Remote(format!("{}: 接続できません ({})", step, e))
    } else {
        ExpressionAiError::Remote(format!("{}: {}", step, e))
    }
}

fn ensure_success(response: Response, step: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ExpressionAiError::Remote(format!(
        "{}失敗 (HTTP {}): {}",
        step,
        status.as_u16(),
        body.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            api_key: "test-key".to_string(),
            cert_path: None,
            output_dir: PathBuf::from("output"),
            history_file: PathBuf::from("history.json"),
            model: "gemini-2.0-flash".to_string(),
            timeout_seconds: 5,
            generation: GenerationSettings::default(),
        }
    }

    fn test_handle() -> FileHandle {
        FileHandle {
            name: "files/abc".to_string(),
            display_name: "face.jpg".to_string(),
            uri: "https://example.invalid/v1beta/files/abc".to_string(),
            mime_type: "image/jpeg".to_string(),
        }
    }

    #[test]
    fn test_generate_request_serialize() {
        let client = GeminiClient::new(&test_config()).expect("クライアント作成失敗");
        let request = client.build_request(&test_handle());

        let json = serde_json::to_value(&request).expect("シリアライズ失敗");
        let config = &json["generationConfig"];
        assert_eq!(config["temperature"], 1.0);
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 8192);
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "OBJECT");
        assert_eq!(
            config["responseSchema"]["required"],
            serde_json::json!(["表情の名前", "言いそうなセリフ"])
        );
        assert_eq!(
            config["responseSchema"]["properties"]["表情の名前"]["type"],
            "STRING"
        );

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["fileData"]["fileUri"], "https://example.invalid/v1beta/files/abc");
        assert_eq!(parts[0]["fileData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["text"], "解析せよ");
        assert_eq!(json["contents"][0]["role"], "user");

        let instruction = json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .expect("システム指示がない");
        assert!(instruction.contains("感情の強弱"));
    }

    #[test]
    fn test_generate_response_first_text() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"表情の名前\": \"少し困惑\", \"言いそうなセリフ\": \"え、どうしよう\"}"
                    }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;

        let response: GenerateResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        let text = response.first_text().expect("テキストがない");
        assert!(text.contains("少し困惑"));
    }

    #[test]
    fn test_generate_response_without_candidates() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        let response: GenerateResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert!(response.first_text().is_none());
    }

    #[test]
    fn test_upload_response_deserialize() {
        let json = r#"{"file": {"name": "files/x1", "displayName": "a.jpg", "mimeType": "image/jpeg", "uri": "https://host/files/x1"}}"#;

        let response: UploadResponse = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(response.file.display_name, "a.jpg");
        assert_eq!(response.file.uri, "https://host/files/x1");
    }

    #[test]
    fn test_upload_missing_file() {
        let client = GeminiClient::new(&test_config()).expect("クライアント作成失敗");

        let result = client.upload(Path::new("/nonexistent/face.jpg"), "image/jpeg");
        match result {
            Err(ExpressionAiError::FileNotFound(path)) => assert!(path.contains("face.jpg")),
            other => panic!("FileNotFoundを期待: {:?}", other.map(|h| h.name)),
        }
    }

    #[test]
    fn test_urls_never_carry_key() {
        let client = GeminiClient::new(&test_config())
            .expect("クライアント作成失敗")
            .with_base_url("http://localhost:9999/");

        assert_eq!(
            client.generate_url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.upload_url(), "http://localhost:9999/upload/v1beta/files");
    }

    /// 接続失敗のエラー文にAPIキーが出ない
    #[test]
    fn test_connect_error_hides_key() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let image = dir.path().join("face.jpg");
        std::fs::write(&image, b"dummy").unwrap();

        let mut config = test_config();
        config.api_key = "SECRET-KEY-123".to_string();
        let client = GeminiClient::new(&config)
            .expect("クライアント作成失敗")
            .with_base_url("http://127.0.0.1:1");

        let upload_err = client
            .upload(&image, "image/jpeg")
            .expect_err("接続できないはず")
            .to_string();
        assert!(!upload_err.contains("SECRET-KEY-123"), "キーが漏れている: {}", upload_err);
        assert!(!upload_err.contains("127.0.0.1:1/"), "URLが残っている: {}", upload_err);

        let analyze_err = client
            .analyze(&test_handle())
            .expect_err("接続できないはず")
            .to_string();
        assert!(!analyze_err.contains("SECRET-KEY-123"), "キーが漏れている: {}", analyze_err);
    }
}
