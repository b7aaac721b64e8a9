//! プロンプト定義
//!
//! 表情解析で送る固定のシステム指示と、構造化出力スキーマのキー名

/// スキーマのキー: 表情の名前
pub const KEY_EXPRESSION_NAME: &str = "表情の名前";

/// スキーマのキー: 言いそうなセリフ
pub const KEY_SPOKEN_LINE: &str = "言いそうなセリフ";

/// 画像と一緒に送るユーザーメッセージ
pub const USER_MESSAGE: &str = "解析せよ";

/// システム指示（感情の強弱に必ず触れさせる）
pub const SYSTEM_INSTRUCTION: &str = concat!(
    "このキャラクタがどのような感情でいるのかを、表情解析して複雑なニュアンスについてよく考えてください。",
    "その後、この表情を表す名前(感情の強弱について必ず言及すること)と、この表情で言いそうなセリフを生成してください。",
    "（例：照れて少しムスっとする/\"うっるせえっ\" ",
    "小さい悲しげな驚き/\"え…そうなの？\" ",
    "強い怒りをうちに秘めている/\"(なんだと…！)\" ",
    "弱々しく苦笑い/\"そうかもね・・・\"）",
);

/// 構造化出力で要求するキー（順序固定）
pub fn response_keys() -> [&'static str; 2] {
    [KEY_EXPRESSION_NAME, KEY_SPOKEN_LINE]
}
