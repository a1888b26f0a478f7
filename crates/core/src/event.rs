use std::time::Instant;

/// プラットフォームから届くIMEイベント
#[derive(Debug, Clone)]
pub struct ImeEvent {
    pub kind: ImeEventKind,
    pub timestamp: Instant,
}

impl ImeEvent {
    pub fn now(kind: ImeEventKind) -> Self {
        Self {
            kind,
            timestamp: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImeEventKind {
    /// 確定文字（UTF-16コードユニット単位、サロゲートは2回に分かれて届く）
    TextInput { unit: u16 },
    /// 変換中文字列と候補リストの更新
    Composition(CompositionUpdate),
    /// 変換終了
    CompositionEnd,
    /// タッチ操作等によるON/OFF切替要求
    ToggleRequested,
    /// プロデューサ側の終了通知
    Quit,
}

/// 変換中文字列の更新内容。受け取る度に前回の状態を丸ごと置き換える。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionUpdate {
    pub text: String,
    /// `text` 内のカーソル位置（文字単位）
    pub cursor: Option<usize>,
    pub candidates: Vec<String>,
    pub page_start: usize,
    pub page_size: usize,
    /// `candidates` の絶対インデックス（ページ内ではない）
    pub selected: Option<usize>,
}

impl CompositionUpdate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_candidates<I, S>(mut self, items: I, page_start: usize, page_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = items.into_iter().map(Into::into).collect();
        self.page_start = page_start;
        self.page_size = page_size;
        self
    }

    pub fn with_selected(mut self, selected: usize) -> Self {
        self.selected = Some(selected);
        self
    }

    /// 変換中文字列も候補も無い（= 変換終了と同等）
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.candidates.is_empty()
    }
}
