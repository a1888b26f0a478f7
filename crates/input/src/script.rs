//! イベントスクリプトによるプラットフォーム代替
//!
//! OSのIMEが無い環境（CI・ヘッドレス）向けに、テキストで書いた入力操作を
//! 別スレッドから `EventSender` に流す。1行1操作、`#` 以降はコメント。
//!
//! ```text
//! type abc
//! compose nihao cursor=5 candidates=你好,拟好 page=0:9 selected=0
//! end
//! char U+1F600
//! backspace
//! toggle
//! wait 30
//! quit
//! ```

use std::path::Path;
use std::thread::JoinHandle;
use std::time::Duration;

use imecompose_core::{
    AppError, CompositionUpdate, EventSender, ImeError, ImeEventKind, ScriptError,
};

const BACKSPACE: u16 = 8;
const ENTER: u16 = 13;
const ESCAPE: u16 = 27;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Event(ImeEventKind),
    /// 指定フレーム数だけ待つ
    Wait(u32),
}

pub fn parse_script(src: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw);
        if line.trim().is_empty() {
            continue;
        }

        let trimmed = line.trim_start();
        let (command, rest) = match trimmed.find(char::is_whitespace) {
            Some(pos) => {
                let rest = &trimmed[pos..];
                let rest = rest.strip_prefix(char::is_whitespace).unwrap_or(rest);
                (&trimmed[..pos], rest)
            }
            None => (trimmed, ""),
        };

        match command {
            // 引数は空白も含めてそのまま入力する
            "type" => steps.extend(
                rest.encode_utf16()
                    .map(|unit| ScriptStep::Event(ImeEventKind::TextInput { unit })),
            ),
            "char" => {
                let units =
                    parse_char_units(rest.trim()).map_err(|m| ScriptError::new(line_no, m))?;
                steps.extend(units.into_iter().map(unit_step));
            }
            "backspace" => steps.push(unit_step(BACKSPACE)),
            "enter" => steps.push(unit_step(ENTER)),
            "escape" => steps.push(unit_step(ESCAPE)),
            "compose" => {
                let update = parse_compose(rest).map_err(|m| ScriptError::new(line_no, m))?;
                steps.push(ScriptStep::Event(ImeEventKind::Composition(update)));
            }
            "end" => steps.push(ScriptStep::Event(ImeEventKind::CompositionEnd)),
            "toggle" => steps.push(ScriptStep::Event(ImeEventKind::ToggleRequested)),
            "quit" => steps.push(ScriptStep::Event(ImeEventKind::Quit)),
            "wait" => {
                let frames = rest.trim().parse::<u32>().map_err(|_| {
                    ScriptError::new(line_no, format!("invalid frame count '{}'", rest.trim()))
                })?;
                steps.push(ScriptStep::Wait(frames));
            }
            other => {
                return Err(ScriptError::new(line_no, format!("unknown command '{}'", other)));
            }
        }
    }

    Ok(steps)
}

/// 行頭または空白直後の `#` 以降を捨てる（`type C#` の `#` は文字として残す）
fn strip_comment(line: &str) -> &str {
    let mut prev_is_space = true;
    for (pos, ch) in line.char_indices() {
        if ch == '#' && prev_is_space {
            return &line[..pos];
        }
        prev_is_space = ch.is_whitespace();
    }
    line
}

fn unit_step(unit: u16) -> ScriptStep {
    ScriptStep::Event(ImeEventKind::TextInput { unit })
}

/// `U+1F600` / `0x41` / `65`。0xFFFF以下はそのまま1ユニット（孤立サロゲートも可）。
fn parse_char_units(arg: &str) -> Result<Vec<u16>, String> {
    let parsed = if let Some(hex) = arg.strip_prefix("U+").or_else(|| arg.strip_prefix("u+")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        arg.parse::<u32>()
    };
    let value = parsed.map_err(|_| format!("invalid character code '{}'", arg))?;

    if let Ok(unit) = u16::try_from(value) {
        return Ok(vec![unit]);
    }
    let ch = char::from_u32(value).ok_or_else(|| format!("not a unicode scalar: {:#x}", value))?;
    let mut buf = [0u16; 2];
    Ok(ch.encode_utf16(&mut buf).to_vec())
}

fn parse_compose(rest: &str) -> Result<CompositionUpdate, String> {
    let mut tokens = rest.split_whitespace();
    let text = match tokens.next() {
        Some("\"\"") | None => String::new(),
        Some(t) => t.to_string(),
    };

    let mut update = CompositionUpdate::new(text);
    let mut page: Option<(usize, usize)> = None;

    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", token))?;
        match key {
            "cursor" => update.cursor = Some(parse_usize(key, value)?),
            "selected" => update.selected = Some(parse_usize(key, value)?),
            "candidates" => {
                update.candidates = value
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "page" => {
                let (start, size) = value
                    .split_once(':')
                    .ok_or_else(|| format!("page must be <start>:<size>, got '{}'", value))?;
                page = Some((parse_usize("page start", start)?, parse_usize("page size", size)?));
            }
            other => return Err(format!("unknown compose option '{}'", other)),
        }
    }

    // ページ指定が無ければ全候補を1ページとする
    let (page_start, page_size) = page.unwrap_or((0, update.candidates.len()));
    update.page_start = page_start;
    update.page_size = page_size;
    Ok(update)
}

fn parse_usize(key: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("{} must be a non-negative integer, got '{}'", key, value))
}

/// スクリプトを再生するプロデューサ
#[derive(Debug, Clone)]
pub struct ScriptedPlatform {
    steps: Vec<ScriptStep>,
}

impl ScriptedPlatform {
    pub fn parse(src: &str) -> Result<Self, ScriptError> {
        Ok(Self {
            steps: parse_script(src)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let src = std::fs::read_to_string(path)?;
        Ok(Self::parse(&src)?)
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// 現在のスレッドで全ステップを送信する。最後に必ず `Quit` を送る。
    ///
    /// キューが満杯なら空くまで待つので、長い `type` 行も取りこぼさない。
    pub fn run(&self, sender: &EventSender, frame_interval: Duration) -> Result<(), ImeError> {
        for step in &self.steps {
            match step {
                ScriptStep::Event(ImeEventKind::Quit) => break,
                ScriptStep::Event(kind) => sender.send_blocking(kind.clone())?,
                ScriptStep::Wait(frames) => std::thread::sleep(frame_interval * *frames),
            }
        }
        sender.send_blocking(ImeEventKind::Quit)
    }

    /// 専用スレッドで再生する
    pub fn spawn(
        self,
        sender: EventSender,
        frame_interval: Duration,
    ) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("ime-script".into())
            .spawn(move || {
                if let Err(e) = self.run(&sender, frame_interval) {
                    log::warn!("script playback stopped: {}", e);
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imecompose_core::{event_queue, CompositionEventSink, CompositionInputTracker};

    fn events(src: &str) -> Vec<ImeEventKind> {
        parse_script(src)
            .unwrap()
            .into_iter()
            .filter_map(|s| match s {
                ScriptStep::Event(kind) => Some(kind),
                ScriptStep::Wait(_) => None,
            })
            .collect()
    }

    #[test]
    fn type_keeps_inner_spaces() {
        let kinds = events("type a b\n");
        let units: Vec<u16> = kinds
            .iter()
            .map(|k| match k {
                ImeEventKind::TextInput { unit } => *unit,
                _ => panic!("unexpected {:?}", k),
            })
            .collect();
        assert_eq!(units, "a b".encode_utf16().collect::<Vec<_>>());
    }

    #[test]
    fn char_accepts_supplementary_plane() {
        assert_eq!(events("char U+1F600").len(), 2);
        assert_eq!(
            events("char 0xD83D"),
            vec![ImeEventKind::TextInput { unit: 0xD83D }]
        );
        assert_eq!(events("char 65"), vec![ImeEventKind::TextInput { unit: 65 }]);
    }

    #[test]
    fn control_keys_and_comments() {
        let kinds = events("# header\nbackspace\n\nenter # clear\nescape\nend\ntoggle\n");
        assert_eq!(
            kinds,
            vec![
                ImeEventKind::TextInput { unit: 8 },
                ImeEventKind::TextInput { unit: 13 },
                ImeEventKind::TextInput { unit: 27 },
                ImeEventKind::CompositionEnd,
                ImeEventKind::ToggleRequested,
            ]
        );
    }

    #[test]
    fn hash_inside_text_is_not_a_comment() {
        let units: Vec<ImeEventKind> = "C#"
            .encode_utf16()
            .map(|unit| ImeEventKind::TextInput { unit })
            .collect();
        assert_eq!(events("type C#"), units);
        assert_eq!(events("type C# # trailing note"), {
            let mut with_space = units.clone();
            with_space.push(ImeEventKind::TextInput { unit: u16::from(b' ') });
            with_space
        });

        let kinds = events("compose x candidates=C#,F#");
        match &kinds[0] {
            ImeEventKind::Composition(update) => {
                assert_eq!(update.candidates, vec!["C#", "F#"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(events("  # indented comment\n").is_empty());
    }

    #[test]
    fn compose_parses_options() {
        let kinds = events("compose nihao cursor=5 candidates=你好,拟好,你 page=1:2 selected=2");
        let expected = CompositionUpdate::new("nihao")
            .with_cursor(5)
            .with_candidates(["你好", "拟好", "你"], 1, 2)
            .with_selected(2);
        assert_eq!(kinds, vec![ImeEventKind::Composition(expected)]);
    }

    #[test]
    fn compose_without_page_covers_all_candidates() {
        let kinds = events("compose ka candidates=か,カ,化");
        match &kinds[0] {
            ImeEventKind::Composition(update) => {
                assert_eq!(update.page_start, 0);
                assert_eq!(update.page_size, 3);
            }
            other => panic!("unexpected {:?}", other),
        }

        let kinds = events("compose \"\"");
        assert_eq!(kinds, vec![ImeEventKind::Composition(CompositionUpdate::default())]);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_script("type a\n\nfrobnicate\n").unwrap_err();
        assert_eq!(err.line, 3);

        let err = parse_script("compose x cursor=-1").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse_script("wait soon").unwrap_err();
        assert!(err.to_string().contains("script line 1"));
    }

    #[test]
    fn spawned_playback_ends_with_quit() {
        let script = "type ab\nbackspace\nwait 1\nchar U+1F600\n";
        let platform = ScriptedPlatform::parse(script).unwrap();
        let (tx, rx) = event_queue(64);
        platform
            .spawn(tx, Duration::from_millis(1))
            .unwrap()
            .join()
            .unwrap();

        let mut tracker = CompositionInputTracker::default();
        let drained = rx.drain_with(|event| {
            if let ImeEventKind::TextInput { unit } = event.kind {
                tracker.on_text_input(unit);
            }
        });
        assert!(drained.quit);
        assert_eq!(tracker.committed(), "a\u{1F600}");
    }
}
