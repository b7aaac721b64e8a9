//! Expression AI Common Library
//!
//! CLIとパイプラインで共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod history;
pub mod parser;
pub mod prompts;

pub use types::{AnalysisRequest, AnalysisResult, BatchRun, RESULT_COLUMNS};
pub use error::{Error, Result};
pub use history::{load_history, render_history, NO_HISTORY};
pub use parser::{extract_expression, strip_code_fence, Extracted};
pub use prompts::{KEY_EXPRESSION_NAME, KEY_SPOKEN_LINE, SYSTEM_INSTRUCTION, USER_MESSAGE};
