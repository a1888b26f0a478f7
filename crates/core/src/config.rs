use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::key::KeyCode;

pub const SCHEMA_VERSION: u32 = 1;

/// Strict configuration schema for the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub schema_version: u32,
    #[serde(skip)]
    pub last_modified: Option<SystemTime>,
    pub layout: LayoutConfig,
    pub style: StyleConfig,
    pub behavior: BehaviorConfig,
    pub hotkey: HotkeyConfig,
    pub performance: PerformanceConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// 画面上の配置（ピクセル）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    pub origin_x: i32,
    /// 操作説明の行
    pub title_y: i32,
    /// ON/OFF状態の行
    pub status_y: i32,
    /// 確定文字列と変換中文字列の行
    pub input_y: i32,
    pub line_height: i32,
    /// 確定文字列と変換中文字列の間隔
    pub composition_gap: i32,
    /// IME候補ウィンドウのアンカーY
    pub candidate_y: i32,
    pub candidate_rect_height: i32,
}

/// 色は "#RRGGBB" or "#RRGGBBAA"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    pub background_color: String,
    pub text_color: String,
    pub status_color: String,
    pub composition_color: String,
    pub highlight_color: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorConfig {
    pub char_policy: CharPolicy,
    /// 変換中文字列のカーソル位置に挿入する記号
    pub cursor_marker: String,
    pub platform: PlatformKind,
    /// 起動時にIMEを有効化するか
    pub start_active: bool,
}

/// BMP外・範囲外文字の扱い
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CharPolicy {
    /// そのまま追加
    PassThrough,
    /// `max` を超える文字を `glyph` に置き換える
    Placeholder { max: u32, glyph: char },
}

impl CharPolicy {
    /// 簡体字の範囲 (U+4E00..=U+9FA5) 外を □ に置換
    pub const CJK_PLACEHOLDER: Self = Self::Placeholder {
        max: 0x9FA5,
        glyph: '\u{25A1}',
    };

    pub fn apply(&self, ch: char) -> char {
        match *self {
            Self::PassThrough => ch,
            Self::Placeholder { max, glyph } => {
                if u32::from(ch) > max {
                    glyph
                } else {
                    ch
                }
            }
        }
    }

    /// 候補文字列用。先頭文字が範囲外なら候補全体を置き換える。
    pub fn apply_candidate<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        match (self, text.chars().next()) {
            (Self::Placeholder { max, glyph }, Some(first)) if u32::from(first) > *max => {
                std::borrow::Cow::Owned(glyph.to_string())
            }
            _ => std::borrow::Cow::Borrowed(text),
        }
    }
}

impl Default for CharPolicy {
    fn default() -> Self {
        Self::PassThrough
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// キーボードのホットキーで切替
    Desktop,
    /// タッチ操作で切替
    Touch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotkeyConfig {
    pub toggle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceConfig {
    pub frame_interval_ms: u64,
    pub event_queue_capacity: usize,
    pub config_reload_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub level: DiagnosticsLevel,
    pub file_logging_enabled: bool,
    pub max_file_bytes: u64,
    pub max_files: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            last_modified: None,
            layout: LayoutConfig::default(),
            style: StyleConfig::default(),
            behavior: BehaviorConfig::default(),
            hotkey: HotkeyConfig::default(),
            performance: PerformanceConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 10,
            title_y: 10,
            status_y: 40,
            input_y: 90,
            line_height: 32,
            composition_gap: 2,
            candidate_y: 82,
            candidate_rect_height: 40,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background_color: "#6495ED".into(),
            text_color: "#FFFFFF".into(),
            status_color: "#D3D3D3".into(),
            composition_color: "#FFA500".into(),
            highlight_color: "#FFFF00".into(),
        }
    }
}

impl StyleConfig {
    fn colors(&self) -> [(&'static str, &str); 5] {
        [
            ("background_color", &self.background_color),
            ("text_color", &self.text_color),
            ("status_color", &self.status_color),
            ("composition_color", &self.composition_color),
            ("highlight_color", &self.highlight_color),
        ]
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            char_policy: CharPolicy::PassThrough,
            cursor_marker: "|".into(),
            platform: PlatformKind::Desktop,
            start_active: true,
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle: "F1".into(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            event_queue_capacity: 256,
            config_reload_interval_ms: 1000,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            level: DiagnosticsLevel::Info,
            file_logging_enabled: false,
            max_file_bytes: 1024 * 1024,
            max_files: 3,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ConfigError::ValidationError(format!(
                "schema_version must be {}",
                SCHEMA_VERSION
            )));
        }

        if self.layout.line_height <= 0 {
            return Err(ConfigError::ValidationError("layout.line_height must be > 0".into()));
        }
        if self.layout.candidate_rect_height < 0 {
            return Err(ConfigError::ValidationError(
                "layout.candidate_rect_height must be >= 0".into(),
            ));
        }

        for (name, value) in self.style.colors() {
            if Color::parse(value).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "style.{} must be #RRGGBB or #RRGGBBAA, got '{}'",
                    name, value
                )));
            }
        }

        if self.behavior.cursor_marker.chars().any(char::is_control) {
            return Err(ConfigError::ValidationError(
                "behavior.cursor_marker must not contain control characters".into(),
            ));
        }
        if let CharPolicy::Placeholder { glyph, .. } = self.behavior.char_policy {
            if glyph.is_control() {
                return Err(ConfigError::ValidationError(
                    "behavior.char_policy.glyph must be printable".into(),
                ));
            }
        }

        if KeyCode::from_label(&self.hotkey.toggle).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "hotkey.toggle: unknown key '{}'",
                self.hotkey.toggle
            )));
        }

        if self.performance.frame_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "performance.frame_interval_ms must be > 0".into(),
            ));
        }
        if self.performance.event_queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "performance.event_queue_capacity must be > 0".into(),
            ));
        }
        if self.performance.config_reload_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "performance.config_reload_interval_ms must be > 0".into(),
            ));
        }

        if self.diagnostics.max_file_bytes < 1024 {
            return Err(ConfigError::ValidationError(
                "diagnostics.max_file_bytes must be >= 1024".into(),
            ));
        }
        if self.diagnostics.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "diagnostics.max_files must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// 設定されたトグルキー（validate済みならSome）
    pub fn toggle_key(&self) -> Option<KeyCode> {
        KeyCode::from_label(&self.hotkey.toggle)
    }

    pub fn load_strict(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        config.last_modified = std::fs::metadata(config_path)?.modified().ok();
        Ok(config)
    }

    pub fn create_default(config_path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.save_atomic(config_path)?;
        config.last_modified = std::fs::metadata(config_path)?.modified().ok();
        Ok(config)
    }

    pub fn load_or_create(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            Self::load_strict(config_path)
        } else {
            Self::create_default(config_path)
        }
    }

    pub fn check_reload(&self, path: &Path) -> Result<Option<AppConfig>, ConfigError> {
        let modified = std::fs::metadata(path)?.modified()?;
        let should_reload = match self.last_modified {
            Some(last) => modified > last,
            None => true,
        };
        if should_reload {
            let mut config = Self::load_strict(path)?;
            config.last_modified = Some(modified);
            return Ok(Some(config));
        }
        Ok(None)
    }

    pub fn save_atomic(&self, config_path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp_path = temp_path_for(config_path);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        if config_path.exists() {
            if let Err(e) = replace_file(config_path, &tmp_path) {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        } else {
            std::fs::rename(&tmp_path, config_path)?;
        }

        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("config.json");
    path.with_file_name(format!("{}.{}.tmp", file_name, stamp))
}

#[cfg(windows)]
fn replace_file(target: &Path, replacement: &Path) -> Result<(), ConfigError> {
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Storage::FileSystem::{ReplaceFileW, REPLACEFILE_IGNORE_MERGE_ERRORS};

    unsafe {
        let target_w = HSTRING::from(target.to_string_lossy().to_string());
        let replacement_w = HSTRING::from(replacement.to_string_lossy().to_string());
        ReplaceFileW(
            &target_w,
            &replacement_w,
            PCWSTR::null(),
            REPLACEFILE_IGNORE_MERGE_ERRORS,
            None,
            None,
        )
        .map_err(|e| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("ReplaceFileW failed: {}", e),
            ))
        })
    }
}

#[cfg(not(windows))]
fn replace_file(target: &Path, replacement: &Path) -> Result<(), ConfigError> {
    // rename は同一ファイルシステム上なら既存ファイルをアトミックに置き換える
    std::fs::rename(replacement, target)?;
    Ok(())
}
