//! スナップショットから1フレーム分の描画コマンドを組み立てる
//!
//! ```text
//! Press F1 to Enable/Disable Text Composition      (title_y)
//! Text Composition enabled.                        (status_y)
//! 確定文字列 変換中|                                 (input_y)
//!           1.候補A                                (input_y + line_height)
//!           2.候補B
//!           page 1/3                               (複数ページの時のみ)
//! ```

use imecompose_core::{
    AppConfig, CandidateEntry, Color, PlatformKind, Rect, RenderError, Snapshot, StyleConfig,
    TextMeasurer,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Color,
    },
    Fill {
        rect: Rect,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    pub background: Color,
    pub commands: Vec<DrawCommand>,
}

impl DrawList {
    /// テキストだけを描画順に列挙
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            DrawCommand::Fill { .. } => None,
        })
    }
}

struct Palette {
    background: Color,
    text: Color,
    status: Color,
    composition: Color,
    highlight: Color,
}

impl Palette {
    fn from_style(style: &StyleConfig) -> Self {
        let defaults = StyleConfig::default();
        let pick = |value: &str, fallback: &str| {
            Color::parse(value)
                .or_else(|| Color::parse(fallback))
                .unwrap_or_default()
        };
        Self {
            background: pick(&style.background_color, &defaults.background_color),
            text: pick(&style.text_color, &defaults.text_color),
            status: pick(&style.status_color, &defaults.status_color),
            composition: pick(&style.composition_color, &defaults.composition_color),
            highlight: pick(&style.highlight_color, &defaults.highlight_color),
        }
    }
}

pub fn layout_scene<M: TextMeasurer + ?Sized>(
    snapshot: &Snapshot,
    config: &AppConfig,
    measurer: &M,
) -> DrawList {
    let layout = &config.layout;
    let behavior = &config.behavior;
    let palette = Palette::from_style(&config.style);
    let origin_x = layout.origin_x as f32;
    let input_y = layout.input_y as f32;
    let line_height = layout.line_height as f32;

    let mut commands = Vec::new();
    let mut text = |x: f32, y: f32, s: String, color: Color| {
        commands.push(DrawCommand::Text { x, y, text: s, color });
    };

    let title = match behavior.platform {
        PlatformKind::Desktop => {
            let key = config
                .toggle_key()
                .map_or(config.hotkey.toggle.as_str(), |key| key.label());
            format!("Press {} to Enable/Disable Text Composition", key)
        }
        PlatformKind::Touch => "Touch screen to Enable/Disable Text Composition".to_string(),
    };
    text(origin_x, layout.title_y as f32, title, palette.text);

    let status = if snapshot.is_active() {
        "Text Composition enabled."
    } else {
        "Text Composition disabled."
    };
    text(origin_x, layout.status_y as f32, status.to_string(), palette.status);

    // 確定文字列
    let committed = snapshot.committed();
    let committed_width = measurer.measure(committed).width;
    if !committed.is_empty() {
        text(origin_x, input_y, committed.to_string(), palette.text);
    }

    // 変換中文字列
    let composition = snapshot.composition();
    let comp_x = origin_x + committed_width + layout.composition_gap as f32;
    let display = composition.display(&behavior.cursor_marker);
    if !display.is_empty() {
        text(comp_x, input_y, display, palette.composition);
    }

    // マーカー無しの場合はカーソルを縦棒で描く
    let mut caret = None;
    if behavior.cursor_marker.is_empty() {
        if let Some(cursor) = composition.cursor() {
            let before: String = composition.text().chars().take(cursor).collect();
            let x = comp_x + measurer.measure(&before).width;
            caret = Some(Rect::new(x as i32, input_y as i32, 1, layout.line_height));
        }
    }

    // 候補リスト
    let list_x = origin_x + committed_width;
    let list_y = input_y + line_height;
    let policy = behavior.char_policy;
    let candidates = snapshot.candidates();
    candidates.render_each(|entry| {
        let shown = policy.apply_candidate(entry.text);
        let label = CandidateEntry {
            text: &shown,
            ..*entry
        }
        .label();
        if label.chars().any(char::is_control) {
            return Err(RenderError::DrawFailed("control character in candidate".into()));
        }
        let color = if entry.highlighted {
            palette.highlight
        } else {
            palette.text
        };
        let y = list_y + (entry.ordinal - 1) as f32 * line_height;
        text(list_x, y, label, color);
        Ok(())
    });

    if candidates.page_count() > 1 {
        let rows = candidates.visible().count();
        let page = format!(
            "page {}/{}",
            candidates.current_page() + 1,
            candidates.page_count()
        );
        text(list_x, list_y + rows as f32 * line_height, page, palette.status);
    }

    if let Some(rect) = caret {
        commands.push(DrawCommand::Fill {
            rect,
            color: palette.text,
        });
    }

    DrawList {
        background: palette.background,
        commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasurer;
    use imecompose_core::{
        Anchors, CharPolicy, CompositionEventSink, CompositionUpdate, ImeError, ImeService,
        TextInputSession,
    };

    struct NullIme;

    impl ImeService for NullIme {
        fn start_text_input(&mut self) -> Result<(), ImeError> {
            Ok(())
        }
        fn stop_text_input(&mut self) -> Result<(), ImeError> {
            Ok(())
        }
        fn is_text_input_active(&self) -> bool {
            true
        }
        fn set_text_input_rect(&mut self, _rect: Rect) -> Result<(), ImeError> {
            Ok(())
        }
    }

    fn snapshot_with(committed: &str, update: Option<CompositionUpdate>) -> Snapshot {
        let mut session = TextInputSession::new(
            NullIme,
            MonospaceMeasurer::new(10.0, 32.0),
            Anchors::default(),
            CharPolicy::PassThrough,
        )
        .unwrap();
        for unit in committed.encode_utf16() {
            session.on_text_input(unit);
        }
        if let Some(update) = update {
            session.on_composition(update);
        }
        session.snapshot()
    }

    fn find_text<'a>(list: &'a DrawList, needle: &str) -> Option<(f32, f32, Color)> {
        list.commands.iter().find_map(|cmd| match cmd {
            DrawCommand::Text { x, y, text, color } if text == needle => Some((*x, *y, *color)),
            _ => None,
        })
    }

    #[test]
    fn idle_scene_shows_prompt_and_status() {
        let cfg = AppConfig::default();
        let list = layout_scene(&snapshot_with("", None), &cfg, &MonospaceMeasurer::default());
        let texts: Vec<&str> = list.texts().collect();
        assert_eq!(
            texts,
            vec![
                "Press F1 to Enable/Disable Text Composition",
                "Text Composition enabled.",
            ]
        );
        assert_eq!(list.background, Color::rgb(0x64, 0x95, 0xED));
    }

    #[test]
    fn touch_platform_prompt() {
        let mut cfg = AppConfig::default();
        cfg.behavior.platform = PlatformKind::Touch;
        let list = layout_scene(&snapshot_with("", None), &cfg, &MonospaceMeasurer::default());
        assert_eq!(
            list.texts().next(),
            Some("Touch screen to Enable/Disable Text Composition")
        );
    }

    #[test]
    fn composition_follows_committed_text() {
        let cfg = AppConfig::default();
        let snap = snapshot_with("ab", Some(CompositionUpdate::new("ni").with_cursor(1)));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::new(10.0, 32.0));

        assert_eq!(find_text(&list, "ab").map(|t| (t.0, t.1)), Some((10.0, 90.0)));
        let (x, y, color) = find_text(&list, "n|i").unwrap();
        assert_eq!((x, y), (32.0, 90.0));
        assert_eq!(color, Color::rgb(0xFF, 0xA5, 0x00));
    }

    #[test]
    fn candidates_are_listed_with_page_ordinals() {
        let cfg = AppConfig::default();
        let update = CompositionUpdate::new("shi")
            .with_candidates(["是", "十", "时", "使", "事"], 2, 2)
            .with_selected(3);
        let snap = snapshot_with("a", Some(update));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::new(10.0, 32.0));

        let (x, y, color) = find_text(&list, "1.时").unwrap();
        assert_eq!((x, y), (20.0, 122.0));
        assert_eq!(color, Color::rgb(0xFF, 0xFF, 0xFF));

        let (_, y, color) = find_text(&list, "2.使").unwrap();
        assert_eq!(y, 154.0);
        assert_eq!(color, Color::rgb(0xFF, 0xFF, 0x00));

        assert!(find_text(&list, "3.事").is_none());
        assert!(find_text(&list, "1.是").is_none());

        let (x, y, color) = find_text(&list, "page 2/3").unwrap();
        assert_eq!((x, y), (20.0, 186.0));
        assert_eq!(color, Color::rgb(0xD3, 0xD3, 0xD3));
    }

    #[test]
    fn single_page_has_no_page_indicator() {
        let cfg = AppConfig::default();
        let update = CompositionUpdate::new("ka").with_candidates(["か", "カ"], 0, 9);
        let snap = snapshot_with("", Some(update));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::default());
        assert!(list.texts().all(|t| !t.starts_with("page ")));
    }

    #[test]
    fn prompt_uses_canonical_key_label() {
        let mut cfg = AppConfig::default();
        cfg.hotkey.toggle = "f2".into();
        let list = layout_scene(&snapshot_with("", None), &cfg, &MonospaceMeasurer::default());
        assert_eq!(
            list.texts().next(),
            Some("Press F2 to Enable/Disable Text Composition")
        );
    }

    #[test]
    fn malformed_candidate_is_skipped() {
        let cfg = AppConfig::default();
        let update =
            CompositionUpdate::new("x").with_candidates(["ok", "bad\u{7}", "fine"], 0, 3);
        let snap = snapshot_with("", Some(update));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::default());

        assert!(find_text(&list, "1.ok").is_some());
        assert!(find_text(&list, "3.fine").is_some());
        assert_eq!(list.texts().filter(|t| t.starts_with("2.")).count(), 0);
    }

    #[test]
    fn placeholder_policy_masks_candidates() {
        let mut cfg = AppConfig::default();
        cfg.behavior.char_policy = CharPolicy::CJK_PLACEHOLDER;
        let update = CompositionUpdate::new("x").with_candidates(["\u{1F600}", "中"], 0, 2);
        let snap = snapshot_with("", Some(update));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::default());

        assert!(find_text(&list, "1.\u{25A1}").is_some());
        assert!(find_text(&list, "2.中").is_some());
    }

    #[test]
    fn caret_bar_without_marker() {
        let mut cfg = AppConfig::default();
        cfg.behavior.cursor_marker = String::new();
        let snap = snapshot_with("", Some(CompositionUpdate::new("abc").with_cursor(2)));
        let list = layout_scene(&snap, &cfg, &MonospaceMeasurer::new(10.0, 32.0));

        assert!(find_text(&list, "abc").is_some());
        let caret = list.commands.iter().find_map(|cmd| match cmd {
            DrawCommand::Fill { rect, .. } => Some(*rect),
            _ => None,
        });
        // 10 + 0 + 2 + 20
        assert_eq!(caret, Some(Rect::new(32, 90, 1, 32)));
    }
}
