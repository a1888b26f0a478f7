use unicode_width::UnicodeWidthStr;

use imecompose_core::{Size, TextMeasurer};

/// 等幅フォントを仮定した計測。全角（East Asian Wide）は2セル分。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    /// 半角1セルの幅（px）
    pub advance: f32,
    pub line_height: f32,
}

impl MonospaceMeasurer {
    pub fn new(advance: f32, line_height: f32) -> Self {
        Self {
            advance,
            line_height,
        }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::new(15.0, 32.0)
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> Size {
        if text.is_empty() {
            return Size::default();
        }
        Size {
            width: text.width() as f32 * self.advance,
            height: self.line_height,
        }
    }
}
