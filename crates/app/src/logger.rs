//! `log` クレートのバックエンド。stderr に出しつつ、設定に応じてローテーション付きでファイルにも書く。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{Level, LevelFilter, Log, Metadata, Record};

use imecompose_core::{DiagnosticsConfig, DiagnosticsLevel};

struct Sink {
    config: DiagnosticsConfig,
    log_path: PathBuf,
}

struct FileLogger {
    sink: Mutex<Sink>,
}

static LOGGER: OnceLock<FileLogger> = OnceLock::new();

/// ロガーを登録する。2回目以降は出力先と設定の更新のみ。
pub fn init(base_dir: &Path, config: &DiagnosticsConfig) {
    let log_path = base_dir.join("logs").join("imecompose.log");

    if let Some(logger) = LOGGER.get() {
        if let Ok(mut sink) = logger.sink.lock() {
            sink.log_path = log_path;
            sink.config = config.clone();
        }
        log::set_max_level(level_filter(config.level));
        return;
    }

    let logger = LOGGER.get_or_init(|| FileLogger {
        sink: Mutex::new(Sink {
            config: config.clone(),
            log_path,
        }),
    });
    if let Err(e) = log::set_logger(logger) {
        eprintln!("[WARN] logger already installed: {}", e);
    }
    log::set_max_level(level_filter(config.level));
}

/// ホットリロード時に呼ぶ
pub fn update_config(config: &DiagnosticsConfig) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut sink) = logger.sink.lock() {
            sink.config = config.clone();
        }
    }
    log::set_max_level(level_filter(config.level));
}

fn level_filter(level: DiagnosticsLevel) -> LevelFilter {
    match level {
        DiagnosticsLevel::Error => LevelFilter::Error,
        DiagnosticsLevel::Warn => LevelFilter::Warn,
        DiagnosticsLevel::Info => LevelFilter::Info,
        DiagnosticsLevel::Debug => LevelFilter::Debug,
    }
}

fn format_line(record: &Record<'_>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let level = match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        // trace は debug にまとめる
        Level::Debug | Level::Trace => "DEBUG",
    };
    format!("[{}][{}][{}] {}\n", now, level, record.target(), record.args())
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);

        // Keep stderr output for visibility in development.
        eprint!("{}", line);

        let Ok(sink) = self.sink.lock() else {
            return;
        };
        if sink.config.file_logging_enabled {
            if let Err(err) = append_with_rotation(
                &sink.log_path,
                sink.config.max_file_bytes,
                sink.config.max_files,
                &line,
            ) {
                eprintln!("[ERROR] logger write failed: {}", err);
            }
        }
    }

    fn flush(&self) {}
}

fn append_with_rotation(
    log_path: &Path,
    max_file_bytes: u64,
    max_files: u32,
    line: &str,
) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let current_len = fs::metadata(log_path).map(|m| m.len()).unwrap_or(0);
    if current_len > 0 && current_len.saturating_add(line.len() as u64) > max_file_bytes {
        rotate(log_path, max_files)?;
    }

    let mut f = OpenOptions::new().create(true).append(true).open(log_path)?;
    f.write_all(line.as_bytes())?;
    f.flush()
}

/// imecompose.log → .1 → .2 ... と送り、max_files を超えた分は消える
fn rotate(log_path: &Path, max_files: u32) -> std::io::Result<()> {
    if max_files <= 1 {
        if log_path.exists() {
            fs::remove_file(log_path)?;
        }
        return Ok(());
    }

    for idx in (1..max_files).rev() {
        let src = match idx {
            1 => log_path.to_path_buf(),
            _ => rotated_path(log_path, idx - 1),
        };
        if !src.exists() {
            continue;
        }
        let dst = rotated_path(log_path, idx);
        if dst.exists() {
            fs::remove_file(&dst)?;
        }
        fs::rename(&src, &dst)?;
    }
    Ok(())
}

fn rotated_path(log_path: &Path, idx: u32) -> PathBuf {
    PathBuf::from(format!("{}.{}", log_path.to_string_lossy(), idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("imecompose-{}-{}", name, stamp));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn rotation_keeps_max_files() {
        let dir = scratch_dir("rotate");
        let path = dir.join("logs").join("imecompose.log");

        for i in 0..5 {
            append_with_rotation(&path, 8, 3, &format!("line{}\n", i)).unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "line4\n");
        assert_eq!(fs::read_to_string(rotated_path(&path, 1)).unwrap(), "line3\n");
        assert_eq!(fs::read_to_string(rotated_path(&path, 2)).unwrap(), "line2\n");
        assert!(!rotated_path(&path, 3).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn single_file_mode_truncates() {
        let dir = scratch_dir("single");
        let path = dir.join("app.log");

        append_with_rotation(&path, 8, 1, "first!\n").unwrap();
        append_with_rotation(&path, 8, 1, "second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
        assert!(!rotated_path(&path, 1).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn level_mapping_is_ordered() {
        assert!(level_filter(DiagnosticsLevel::Error) < level_filter(DiagnosticsLevel::Warn));
        assert!(level_filter(DiagnosticsLevel::Info) < level_filter(DiagnosticsLevel::Debug));
    }
}
