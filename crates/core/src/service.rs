//! 外部サービスとの境界
//!
//! プラットフォームのIMEサービスとテキスト計測はアプリ外部の責務なので、
//! ここではトレイトだけを定義する。実装は `imecompose-input` /
//! `imecompose-render` 側にある。

use crate::error::ImeError;
use crate::event::CompositionUpdate;

/// 画面座標の矩形（ピクセル）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// 計測結果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// プラットフォームのIMEサービス
pub trait ImeService {
    fn start_text_input(&mut self) -> Result<(), ImeError>;
    fn stop_text_input(&mut self) -> Result<(), ImeError>;
    fn is_text_input_active(&self) -> bool;
    /// ネイティブ候補ウィンドウの表示位置ヒント
    fn set_text_input_rect(&mut self, rect: Rect) -> Result<(), ImeError>;
}

pub trait TextMeasurer {
    fn measure(&self, text: &str) -> Size;
}

/// プラットフォーム層から見たIMEイベントの受け口
pub trait CompositionEventSink {
    fn on_text_input(&mut self, unit: u16);
    fn on_composition(&mut self, update: CompositionUpdate);
    fn on_composition_end(&mut self);
}

impl<T: ImeService + ?Sized> ImeService for Box<T> {
    fn start_text_input(&mut self) -> Result<(), ImeError> {
        (**self).start_text_input()
    }

    fn stop_text_input(&mut self) -> Result<(), ImeError> {
        (**self).stop_text_input()
    }

    fn is_text_input_active(&self) -> bool {
        (**self).is_text_input_active()
    }

    fn set_text_input_rect(&mut self, rect: Rect) -> Result<(), ImeError> {
        (**self).set_text_input_rect(rect)
    }
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for Box<T> {
    fn measure(&self, text: &str) -> Size {
        (**self).measure(text)
    }
}
