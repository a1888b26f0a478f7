/// キーコード。Win32 VK_*コードをベースにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const ENTER: Self = Self(0x0D);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);

    // --- ファンクションキー ---
    pub const F1: Self = Self(0x70);
    pub const F2: Self = Self(0x71);
    pub const F3: Self = Self(0x72);
    pub const F4: Self = Self(0x73);
    pub const F5: Self = Self(0x74);
    pub const F6: Self = Self(0x75);
    pub const F7: Self = Self(0x76);
    pub const F8: Self = Self(0x77);
    pub const F9: Self = Self(0x78);
    pub const F10: Self = Self(0x79);
    pub const F11: Self = Self(0x7A);
    pub const F12: Self = Self(0x7B);

    const LABELS: [(Self, &'static str); 17] = [
        (Self::BACKSPACE, "BS"),
        (Self::TAB, "Tab"),
        (Self::ENTER, "Enter"),
        (Self::ESCAPE, "Esc"),
        (Self::SPACE, "Space"),
        (Self::F1, "F1"),
        (Self::F2, "F2"),
        (Self::F3, "F3"),
        (Self::F4, "F4"),
        (Self::F5, "F5"),
        (Self::F6, "F6"),
        (Self::F7, "F7"),
        (Self::F8, "F8"),
        (Self::F9, "F9"),
        (Self::F10, "F10"),
        (Self::F11, "F11"),
        (Self::F12, "F12"),
    ];

    /// 表示用ラベルを返す
    pub fn label(&self) -> &'static str {
        Self::LABELS
            .iter()
            .find(|(code, _)| code == self)
            .map(|(_, label)| *label)
            .unwrap_or("?")
    }

    /// 設定ファイルのラベルから変換（大文字小文字は区別しない）
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("Escape") {
            return Some(Self::ESCAPE);
        }
        Self::LABELS
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(code, _)| *code)
    }
}

/// 押下の立ち上がりだけを検出する。押しっぱなしでは毎フレーム発火しない。
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    was_down: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 今フレームの押下状態を渡す。離上→押下の遷移時のみ true。
    pub fn update(&mut self, is_down: bool) -> bool {
        let pressed = is_down && !self.was_down;
        self.was_down = is_down;
        pressed
    }

    /// `update` と同じだが、フォーカスが無いフレームの押下は捨てる。
    ///
    /// 押下状態そのものは追跡し続けるので、他ウィンドウで押したキーを
    /// 押したままフォーカスを戻しても発火しない。
    pub fn update_focused(&mut self, is_down: bool, focused: bool) -> bool {
        self.update(is_down) && focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_is_case_insensitive() {
        assert_eq!(KeyCode::from_label("f1"), Some(KeyCode::F1));
        assert_eq!(KeyCode::from_label(" F12 "), Some(KeyCode::F12));
        assert_eq!(KeyCode::from_label("escape"), Some(KeyCode::ESCAPE));
        assert_eq!(KeyCode::from_label("Esc"), Some(KeyCode::ESCAPE));
        assert_eq!(KeyCode::from_label("F13"), None);
    }

    #[test]
    fn label_roundtrips_through_from_label() {
        for key in [KeyCode::F1, KeyCode::ENTER, KeyCode::SPACE] {
            assert_eq!(KeyCode::from_label(key.label()), Some(key));
        }
        assert_eq!(KeyCode(0xFFFF).label(), "?");
    }

    #[test]
    fn edge_detector_fires_once_per_press() {
        let mut edge = EdgeDetector::new();
        let frames = [false, true, true, true, false, true, false];
        let fired: Vec<bool> = frames.iter().map(|&down| edge.update(down)).collect();
        assert_eq!(fired, vec![false, true, false, false, false, true, false]);
    }

    #[test]
    fn unfocused_press_does_not_fire() {
        let mut edge = EdgeDetector::new();
        // 他ウィンドウで押下 → 押したままフォーカス取得 → 離して押し直す
        let frames = [(true, false), (true, true), (false, true), (true, true)];
        let fired: Vec<bool> = frames
            .iter()
            .map(|&(down, focused)| edge.update_focused(down, focused))
            .collect();
        assert_eq!(fired, vec![false, false, false, true]);
    }
}
