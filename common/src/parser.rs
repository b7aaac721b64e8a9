//! APIレスポンスパーサー
//!
//! モデルの返答はJSONに近いが、正しいJSONである保証はない。
//! serde_jsonでは読まず、2つのキーを正規表現で拾い出す。
//!
//! 値は「次の `"` まで」を取るため、エスケープされた引用符を含む値は
//! そこで切れる。過去データとの互換のためこの挙動は変えない。

use crate::prompts::{KEY_EXPRESSION_NAME, KEY_SPOKEN_LINE};
use regex::Regex;

lazy_static::lazy_static! {
    // キーの引用符は任意、`:` 前後の空白は任意、値は1個以上の引用符で囲む
    static ref NAME_RE: Regex = Regex::new(r#""*表情の名前"*\s*:\s*"+([^"]+)"+"#).unwrap();
    static ref LINE_RE: Regex = Regex::new(r#""*言いそうなセリフ"*\s*:\s*"+([^"]+)"+"#).unwrap();
}

/// 抽出結果（表情の名前, 言いそうなセリフ）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub expression_name: String,
    pub spoken_line: String,
}

impl Extracted {
    /// 両方とも取れなかった
    pub fn is_empty(&self) -> bool {
        self.expression_name.is_empty() && self.spoken_line.is_empty()
    }

    /// どちらかが取れなかった
    pub fn is_partial_miss(&self) -> bool {
        self.expression_name.is_empty() || self.spoken_line.is_empty()
    }
}

/// レスポンスから表情の名前とセリフを抽出
///
/// マッチしないフィールドは空文字になる。どんな入力でも失敗しない。
///
/// # Examples
/// ```
/// use expression_ai_common::extract_expression;
///
/// let text = r#"{"表情の名前": "少し困惑", "言いそうなセリフ": "え、どうしよう"}"#;
/// let extracted = extract_expression(text);
/// assert_eq!(extracted.expression_name, "少し困惑");
/// assert_eq!(extracted.spoken_line, "え、どうしよう");
/// ```
pub fn extract_expression(text: &str) -> Extracted {
    let expression_name = capture(&NAME_RE, text, KEY_EXPRESSION_NAME);
    let spoken_line = capture(&LINE_RE, text, KEY_SPOKEN_LINE);

    Extracted {
        expression_name,
        spoken_line,
    }
}

fn capture(re: &Regex, text: &str, key: &str) -> String {
    match re.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => {
            tracing::debug!(key, raw = text, "キーの抽出に失敗");
            String::new()
        }
    }
}

/// ```json ... ``` などのコードフェンス記号を取り除く
///
/// フェンスの位置は問わず、記号だけを消して前後の空白を落とす。
pub fn strip_code_fence(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}
