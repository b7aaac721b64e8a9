use anyhow::Context;
use clap::Parser;
use expression_ai_common::{AnalysisRequest, AnalysisResult};
use expression_ai_rust::{cli, config, error, history, pipeline, repair, scanner};
use expression_ai_rust::analyzer::{AnalysisClient, GeminiClient};
use cli::{Cli, Commands};
use config::Config;
use history::{HistoryLog, DEFAULT_RECENT_ENTRIES};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{BatchCollector, BatchEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn format_result(result: &AnalysisResult) -> String {
    if result.succeeded {
        format!(
            "ファイル: {}\n表情の名前: {}\n言いそうなセリフ: {}\n",
            result.file_name, result.expression_name, result.spoken_line
        )
    } else {
        format!("ファイル: {}\n結果: {}\n", result.file_name, result.raw_text)
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

fn run_analyze(
    paths: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    history_file: Option<PathBuf>,
    no_history: bool,
) -> anyhow::Result<()> {
    println!("😊 expression-ai - 表情解析\n");

    let config = Config::load()?
        .with_output_dir(output_dir)
        .with_history_file(history_file);

    // 1. 入力確認
    println!("[1/3] 画像を確認中...");
    let images = scanner::collect_images(&paths);
    if images.is_empty() {
        return Err(error::ExpressionAiError::NoImagesFound(
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )
        .into());
    }
    println!("✔ {}枚の画像を検出\n", images.len());

    // 2. 解析
    println!("[2/3] AI解析中...");
    let output_dir = config.ensure_output_dir()?.to_path_buf();
    let client: Arc<dyn AnalysisClient> = Arc::new(GeminiClient::new(&config)?);
    let requests: Vec<AnalysisRequest> = images.iter().map(AnalysisRequest::new).collect();

    let bar = progress_bar(requests.len());
    let handle = pipeline::spawn_batch(client, requests, output_dir)?;
    let mut collector = BatchCollector::new();

    for event in handle.events.iter() {
        match &event {
            BatchEvent::Progress(message) => bar.set_message(message.clone()),
            BatchEvent::ItemResult(result) => {
                bar.inc(1);
                bar.println(format_result(result));
            }
            BatchEvent::Finished(_) => bar.finish_and_clear(),
        }
        collector.observe(&event);
    }
    let outcome = handle.join();

    if let Some(summary) = collector.summary() {
        println!(
            "✔ 解析完了（成功 {}件 / 失敗 {}件）",
            summary.succeeded, summary.failed
        );
        if let Some(csv_path) = &summary.csv_path {
            println!("✔ 結果を保存: {}\n", csv_path.display());
        }
    }

    // 3. 履歴
    if !no_history && collector.is_finished() {
        println!("[3/3] 履歴を保存中...");
        let log = HistoryLog::new(&config.history_file);
        log.ensure_exists()?;
        let (files, results) = collector.history_entry();
        log.append(files, results)
            .with_context(|| format!("履歴の保存に失敗: {}", log.path().display()))?;
        println!("{}\n", log.format_recent(DEFAULT_RECENT_ENTRIES));
    }

    outcome.context("結果CSVの書き出しに失敗")?;

    println!("✅ 完了");
    Ok(())
}

fn history_log(history_file: Option<PathBuf>) -> anyhow::Result<HistoryLog> {
    let path = match history_file {
        Some(path) => path,
        None => config::history_file_from_env(&std::env::current_dir()?),
    };
    Ok(HistoryLog::new(path))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze { paths, output_dir, history_file, no_history } => {
            run_analyze(paths, output_dir, history_file, no_history)?;
        }

        Commands::History { max, clear, history_file } => {
            let log = history_log(history_file)?;

            if clear {
                log.clear()?;
                println!("✔ 履歴を削除しました: {}", log.path().display());
            } else {
                log.ensure_exists()?;
                println!("{}", log.format_recent(max));
            }
        }

        Commands::Repair { input, output } => {
            println!("🔧 expression-ai - CSV修復\n");
            let summary = repair::repair_csv(&input, &output)
                .with_context(|| format!("CSV修復に失敗: {}", input.display()))?;
            println!(
                "✔ {}行を処理（抽出できなかった行: {}、うち両方とも空: {}）",
                summary.rows, summary.misses, summary.unparsed
            );
            println!("✔ 出力: {}", output.display());
        }

        Commands::Config => {
            let config = Config::load()?;
            println!("設定:");
            println!("  モデル: {}", config.model);
            println!("  出力フォルダ: {}", config.output_dir.display());
            println!("  履歴ファイル: {}", config.history_file.display());
            println!(
                "  証明書: {}",
                config
                    .cert_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "システム既定".to_string())
            );
            println!("  APIキー: 設定済み");
        }
    }

    Ok(())
}
