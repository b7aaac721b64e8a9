use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::history::DEFAULT_RECENT_ENTRIES;

#[derive(Parser)]
#[command(name = "expression-ai")]
#[command(about = "表情画像AI解析・セリフ生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を解析して結果CSVを出力
    Analyze {
        /// 画像ファイルまたはフォルダ（jpg/jpeg）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// CSV出力フォルダ（デフォルト: 環境変数 OUTPUT_DIR または ./output）
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 履歴ファイル（デフォルト: 環境変数 HISTORY_FILE または ./history.json）
        #[arg(long)]
        history_file: Option<PathBuf>,

        /// 履歴に記録しない
        #[arg(long)]
        no_history: bool,
    },

    /// 解析履歴を表示/削除
    History {
        /// 表示する件数
        #[arg(short, long, default_value_t = DEFAULT_RECENT_ENTRIES)]
        max: usize,

        /// 履歴を削除
        #[arg(long)]
        clear: bool,

        /// 履歴ファイル
        #[arg(long)]
        history_file: Option<PathBuf>,
    },

    /// タブ区切りCSVの「結果」列から表情の名前とセリフを抽出し直す
    Repair {
        /// 入力CSV（タブ区切り）
        #[arg(required = true)]
        input: PathBuf,

        /// 出力CSV（タブ区切り）
        #[arg(required = true)]
        output: PathBuf,
    },

    /// 設定を表示
    Config,
}
