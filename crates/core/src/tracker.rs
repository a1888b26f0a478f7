//! 確定文字列・変換中文字列・候補ページの状態管理
//!
//! プラットフォームのIMEは確定文字を UTF-16 コードユニット単位で送ってくる。
//! BMP外の文字（絵文字等）はサロゲートペアとして2回に分かれて届くため、
//! 上位サロゲートを保留し、下位サロゲートが来た時点で1文字として確定する。
//! これにより確定文字列が孤立サロゲートを含むことはない。

use crate::candidate::CandidatePage;
use crate::config::CharPolicy;
use crate::event::CompositionUpdate;
use crate::service::CompositionEventSink;

const BACKSPACE: u16 = 8;
const ENTER: u16 = 13;
const ESCAPE: u16 = 27;

/// 変換中文字列とカーソル位置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionState {
    text: String,
    /// 文字単位。`text` の文字数以下に収まる。
    cursor: Option<usize>,
}

impl CompositionState {
    pub fn new(text: impl Into<String>, cursor: Option<usize>) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            cursor: cursor.map(|c| c.min(len)),
            text,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// カーソル位置に `marker` を挿入した表示用文字列
    pub fn display(&self, marker: &str) -> String {
        let Some(cursor) = self.cursor else {
            return self.text.clone();
        };
        let byte_pos = self
            .text
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());

        let mut out = String::with_capacity(self.text.len() + marker.len());
        out.push_str(&self.text[..byte_pos]);
        out.push_str(marker);
        out.push_str(&self.text[byte_pos..]);
        out
    }
}

/// 描画側に渡す読み取り専用のスナップショット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    committed: String,
    composition: CompositionState,
    candidates: CandidatePage,
    active: bool,
}

impl Snapshot {
    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn composition(&self) -> &CompositionState {
        &self.composition
    }

    pub fn candidates(&self) -> &CandidatePage {
        &self.candidates
    }

    /// IMEが有効か（トラッカー単体のスナップショットでは常に false）
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// 確定文字列と変換状態を保持し、編集ルールを適用する
#[derive(Debug, Clone, Default)]
pub struct CompositionInputTracker {
    committed: String,
    /// 下位サロゲート待ちの上位サロゲート
    pending_high: Option<u16>,
    composition: CompositionState,
    candidates: CandidatePage,
    char_policy: CharPolicy,
}

impl CompositionInputTracker {
    pub fn new(char_policy: CharPolicy) -> Self {
        Self {
            char_policy,
            ..Self::default()
        }
    }

    pub fn set_char_policy(&mut self, char_policy: CharPolicy) {
        self.char_policy = char_policy;
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    /// 確定文字列の UTF-16 コードユニット数
    pub fn committed_utf16_len(&self) -> usize {
        self.committed.encode_utf16().count()
    }

    pub fn composition(&self) -> &CompositionState {
        &self.composition
    }

    pub fn candidates(&self) -> &CandidatePage {
        &self.candidates
    }

    /// 確定文字1ユニット分の入力
    pub fn on_raw_character(&mut self, unit: u16) {
        match unit {
            BACKSPACE => {
                // 保留中の上位サロゲートがあればそれだけを取り消す
                if self.pending_high.take().is_none() {
                    self.committed.pop();
                }
            }
            ESCAPE | ENTER => {
                self.pending_high = None;
                self.committed.clear();
            }
            0xD800..=0xDBFF => {
                if self.pending_high.replace(unit).is_some() {
                    log::debug!("unpaired high surrogate dropped");
                }
            }
            0xDC00..=0xDFFF => match self.pending_high.take() {
                Some(high) => {
                    if let Some(Ok(ch)) = char::decode_utf16([high, unit]).next() {
                        self.push_char(ch);
                    }
                }
                None => log::debug!("unpaired low surrogate {:#06x} ignored", unit),
            },
            _ => {
                if self.pending_high.take().is_some() {
                    log::debug!("unpaired high surrogate dropped");
                }
                // サロゲート以外は必ず有効な char になる
                if let Some(ch) = char::from_u32(u32::from(unit)) {
                    if !ch.is_control() {
                        self.push_char(ch);
                    }
                }
            }
        }

        trim_in_place(&mut self.committed);
    }

    /// `char` 単位の入力。UTF-16 に分解して `on_raw_character` に流す。
    pub fn on_char(&mut self, ch: char) {
        let mut buf = [0u16; 2];
        for &unit in ch.encode_utf16(&mut buf).iter() {
            self.on_raw_character(unit);
        }
    }

    /// 変換状態を丸ごと置き換える（前回の内容とはマージしない）
    pub fn on_composition_update(&mut self, update: CompositionUpdate) {
        let CompositionUpdate {
            text,
            cursor,
            candidates,
            page_start,
            page_size,
            selected,
        } = update;

        self.composition = CompositionState::new(text, cursor);
        self.candidates = CandidatePage::new(candidates, page_start, page_size, selected);
    }

    pub fn end_composition(&mut self) {
        self.composition = CompositionState::default();
        self.candidates.clear();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            committed: self.committed.clone(),
            composition: self.composition.clone(),
            candidates: self.candidates.clone(),
            active: false,
        }
    }

    fn push_char(&mut self, ch: char) {
        self.committed.push(self.char_policy.apply(ch));
    }
}

impl CompositionEventSink for CompositionInputTracker {
    fn on_text_input(&mut self, unit: u16) {
        self.on_raw_character(unit);
    }

    fn on_composition(&mut self, update: CompositionUpdate) {
        if update.is_empty() {
            self.end_composition();
        } else {
            self.on_composition_update(update);
        }
    }

    fn on_composition_end(&mut self) {
        self.end_composition();
    }
}

fn trim_in_place(s: &mut String) {
    let end = s.trim_end().len();
    s.truncate(end);
    let start = s.len() - s.trim_start().len();
    if start > 0 {
        s.drain(..start);
    }
}
