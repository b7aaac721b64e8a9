//! バッチ解析パイプライン
//!
//! 入力順に1枚ずつ アップロード → 解析 → 抽出 を行い、最後にCSVを1つ書く。
//! 1枚の失敗はその行だけに閉じ込め、バッチは必ず最後まで進む。
//!
//! 呼び出し側への通知は `BatchEvent` を1本のチャネルで順に送る:
//! 進捗（0回以上）→ 1枚ごとの結果（ちょうどN回、入力順）→ 完了（1回）。

use crate::analyzer::{mime_for_path, AnalysisClient};
use crate::error::{ExpressionAiError, Result};
use crate::export::{result_csv_path, write_result_csv};
use expression_ai_common::{extract_expression, strip_code_fence, AnalysisRequest, AnalysisResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// ワーカーから呼び出し側への通知
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// 処理中のファイル（表示用）
    Progress(String),
    /// 1枚分の結果
    ItemResult(AnalysisResult),
    /// バッチ完了
    Finished(BatchSummary),
}

/// バッチ全体の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 書き出したCSV（書き出しに失敗した場合はNone）
    pub csv_path: Option<PathBuf>,
}

/// 1枚を処理する（失敗は結果に変換し、エラーとしては返さない）
pub fn process_item<C>(client: &C, request: &AnalysisRequest) -> AnalysisResult
where
    C: AnalysisClient + ?Sized,
{
    match upload_and_analyze(client, request) {
        Ok(raw) => {
            let text = strip_code_fence(&raw);
            let extracted = extract_expression(&text);
            AnalysisResult::success(request, text, extracted.expression_name, extracted.spoken_line)
        }
        Err(e) => {
            let message = format!("Error processing {}: {}", request.file_name(), e);
            tracing::warn!(file = request.file_name(), error = %e, "解析失敗");
            AnalysisResult::failure(request, message)
        }
    }
}

fn upload_and_analyze<C>(client: &C, request: &AnalysisRequest) -> Result<String>
where
    C: AnalysisClient + ?Sized,
{
    let path = Path::new(request.file_path());
    let handle = client.upload(path, mime_for_path(path))?;
    tracing::debug!(file = request.file_name(), uri = %handle.uri, "アップロード済み");
    client.analyze(&handle)
}

/// バッチを同期的に最後まで実行する
///
/// 返すエラーはCSV書き出しの失敗のみ。その場合も完了通知は送る。
pub fn run_batch<C>(
    client: &C,
    requests: &[AnalysisRequest],
    output_dir: &Path,
    events: &Sender<BatchEvent>,
) -> Result<BatchSummary>
where
    C: AnalysisClient + ?Sized,
{
    let mut results = Vec::with_capacity(requests.len());

    for request in requests {
        let _ = events.send(BatchEvent::Progress(format!("Processing {} ...", request.file_name())));
        tracing::debug!(path = request.file_path(), "処理開始");

        let result = process_item(client, request);
        let _ = events.send(BatchEvent::ItemResult(result.clone()));
        results.push(result);
    }

    let succeeded = results.iter().filter(|r| r.succeeded).count();
    let mut summary = BatchSummary {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        csv_path: None,
    };

    let written = write_csv(&results, output_dir);
    match &written {
        Ok(path) => summary.csv_path = Some(path.clone()),
        Err(e) => tracing::error!(error = %e, "CSVの書き出しに失敗"),
    }

    let _ = events.send(BatchEvent::Finished(summary.clone()));
    written.map(|_| summary)
}

fn write_csv(results: &[AnalysisResult], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = result_csv_path(output_dir, chrono::Utc::now().timestamp());
    write_result_csv(results, &path)?;
    Ok(path)
}

/// 別スレッドで実行中のバッチ
pub struct BatchHandle {
    pub events: Receiver<BatchEvent>,
    join: JoinHandle<Result<BatchSummary>>,
}

impl BatchHandle {
    /// ワーカーの終了を待つ
    pub fn join(self) -> Result<BatchSummary> {
        self.join
            .join()
            .map_err(|_| ExpressionAiError::Worker("バッチスレッドが異常終了しました".into()))?
    }
}

/// 専用スレッドを1本立ててバッチを実行する
pub fn spawn_batch(
    client: Arc<dyn AnalysisClient>,
    requests: Vec<AnalysisRequest>,
    output_dir: PathBuf,
) -> Result<BatchHandle> {
    let (tx, rx) = mpsc::channel();

    let join = std::thread::Builder::new()
        .name("batch-worker".into())
        .spawn(move || run_batch(client.as_ref(), &requests, &output_dir, &tx))?;

    Ok(BatchHandle { events: rx, join })
}

/// 呼び出し側で通知を受けて結果をためる
#[derive(Debug, Default)]
pub struct BatchCollector {
    results: Vec<AnalysisResult>,
    summary: Option<BatchSummary>,
}

impl BatchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Progress(_) => {}
            BatchEvent::ItemResult(result) => self.results.push(result.clone()),
            BatchEvent::Finished(summary) => self.summary = Some(summary.clone()),
        }
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn summary(&self) -> Option<&BatchSummary> {
        self.summary.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.summary.is_some()
    }

    /// 履歴用の（ファイルパス一覧, 生結果一覧）。インデックスが対応する
    pub fn history_entry(&self) -> (Vec<String>, Vec<String>) {
        self.results
            .iter()
            .map(|r| (r.file_path.clone(), r.raw_text.clone()))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::FileHandle;

    /// アップロードは常に成功し、決まった返答を返す
    struct FixedClient {
        reply: String,
    }

    impl AnalysisClient for FixedClient {
        fn upload(&self, path: &Path, mime_type: &str) -> Result<FileHandle> {
            Ok(FileHandle {
                name: "files/fixed".into(),
                display_name: path.display().to_string(),
                uri: format!("mock://{}", path.display()),
                mime_type: mime_type.into(),
            })
        }

        fn analyze(&self, _handle: &FileHandle) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    /// 解析は常に失敗する
    struct FailingClient;

    impl AnalysisClient for FailingClient {
        fn upload(&self, _path: &Path, _mime_type: &str) -> Result<FileHandle> {
            Ok(FileHandle::default())
        }

        fn analyze(&self, _handle: &FileHandle) -> Result<String> {
            Err(ExpressionAiError::Remote("HTTP 500".into()))
        }
    }

    #[test]
    fn test_process_item_strips_fence_and_extracts() {
        let client = FixedClient {
            reply: "```json\n{\"表情の名前\": \"強い喜び\", \"言いそうなセリフ\": \"やったー！\"}\n```".into(),
        };

        let result = process_item(&client, &AnalysisRequest::new("happy.jpg"));
        assert!(result.succeeded);
        assert_eq!(result.expression_name, "強い喜び");
        assert_eq!(result.spoken_line, "やったー！");
        assert!(!result.raw_text.contains("```"));
    }

    #[test]
    fn test_process_item_parse_miss_is_success() {
        let client = FixedClient {
            reply: "すみません、解析できませんでした".into(),
        };

        let result = process_item(&client, &AnalysisRequest::new("blur.jpg"));
        assert!(result.succeeded);
        assert_eq!(result.expression_name, "");
        assert_eq!(result.spoken_line, "");
        assert_eq!(result.raw_text, "すみません、解析できませんでした");
    }

    #[test]
    fn test_process_item_remote_failure() {
        let result = process_item(&FailingClient, &AnalysisRequest::new("x/face.jpg"));

        assert!(!result.succeeded);
        assert_eq!(result.expression_name, "");
        assert_eq!(result.spoken_line, "");
        assert!(result.raw_text.starts_with("Error processing face.jpg:"));
        assert!(result.raw_text.contains("HTTP 500"));
    }

    #[test]
    fn test_run_batch_event_order() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let client = FixedClient {
            reply: r#"{"表情の名前": "無表情", "言いそうなセリフ": "……"}"#.into(),
        };
        let requests = vec![AnalysisRequest::new("1.jpg"), AnalysisRequest::new("2.jpg")];
        let (tx, rx) = mpsc::channel();

        let summary = run_batch(&client, &requests, dir.path(), &tx).expect("バッチ失敗");
        drop(tx);
        let events: Vec<BatchEvent> = rx.iter().collect();

        assert_eq!(events.len(), 5);
        assert!(matches!(&events[0], BatchEvent::Progress(m) if m.contains("1.jpg")));
        assert!(matches!(&events[1], BatchEvent::ItemResult(r) if r.file_name == "1.jpg"));
        assert!(matches!(&events[2], BatchEvent::Progress(m) if m.contains("2.jpg")));
        assert!(matches!(&events[3], BatchEvent::ItemResult(r) if r.file_name == "2.jpg"));
        assert!(matches!(&events[4], BatchEvent::Finished(s) if s == &summary));

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert!(summary.csv_path.as_ref().map(|p| p.exists()).unwrap_or(false));
    }

    #[test]
    fn test_run_batch_empty_still_writes_csv() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let (tx, rx) = mpsc::channel();

        let summary = run_batch(&FailingClient, &[], dir.path(), &tx).expect("バッチ失敗");
        drop(tx);

        assert_eq!(summary.total, 0);
        let csv_path = summary.csv_path.expect("CSVパスがない");
        let content = std::fs::read_to_string(csv_path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(matches!(rx.iter().last(), Some(BatchEvent::Finished(_))));
    }

    #[test]
    fn test_collector_history_entry() {
        let mut collector = BatchCollector::new();
        let ok = AnalysisResult::success(&AnalysisRequest::new("/a/1.jpg"), "raw1", "n", "l");
        let ng = AnalysisResult::failure(&AnalysisRequest::new("/a/2.jpg"), "Error processing 2.jpg: x");

        collector.observe(&BatchEvent::Progress("Processing 1.jpg ...".into()));
        collector.observe(&BatchEvent::ItemResult(ok));
        collector.observe(&BatchEvent::ItemResult(ng));
        assert!(!collector.is_finished());
        collector.observe(&BatchEvent::Finished(BatchSummary::default()));
        assert!(collector.is_finished());

        let (files, results) = collector.history_entry();
        assert_eq!(files, vec!["/a/1.jpg", "/a/2.jpg"]);
        assert_eq!(results, vec!["raw1", "Error processing 2.jpg: x"]);
    }
}
