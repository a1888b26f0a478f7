use std::fmt;

/// アプリケーションエラーの統合型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// プラットフォームIMEサービスのエラー
    #[error(transparent)]
    Ime(#[from] ImeError),

    /// 描画エラー
    #[error(transparent)]
    Render(#[from] RenderError),

    /// 設定ファイルエラー
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// イベントスクリプトエラー
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ImeError {
    /// IMEが利用できない環境
    #[error("IME not available")]
    NotAvailable,

    /// 入力コンテキスト操作の失敗
    #[error("input context failed: {0}")]
    ContextFailed(String),

    /// イベントの受信側が既に破棄されている
    #[error("event queue disconnected")]
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("create failed: {0}")]
    CreateFailed(String),

    #[error("draw failed: {0}")]
    DrawFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// スクリプト解析エラー（行番号は1始まり）
#[derive(Debug)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}
