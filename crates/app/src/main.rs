mod frame;
mod logger;
#[cfg(windows)]
mod win32;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use imecompose_core::{event_queue, AppConfig, AppError, Anchors, TextInputSession};
use imecompose_input::{RecordingImeService, ScriptedPlatform};
use imecompose_render::{ConsolePresenter, MonospaceMeasurer};

use frame::{LoopOptions, StopReason};

/// IME composition demo: committed text, in-progress composition and candidate list
#[derive(Parser, Debug)]
#[command(name = "imecompose", version)]
struct Args {
    /// Configuration file (default: config.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay an event script instead of the OS IME and print frames to stdout
    #[arg(long)]
    script: Option<PathBuf>,
    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join("config.json")))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn main() {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(default_config_path);

    let config = AppConfig::load_or_create(&config_path).unwrap_or_else(|e| {
        eprintln!("config load failed, using defaults: {}", e);
        AppConfig::default()
    });

    let log_dir = config_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    logger::init(&log_dir, &config.diagnostics);

    let result = match args.script.as_deref() {
        Some(script) => run_scripted(script, config, &config_path, args.frames),
        None => run_native(config, &config_path, args.frames),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// OSのIMEを使わずスクリプトを再生する（ヘッドレス）
fn run_scripted(
    script: &Path,
    mut config: AppConfig,
    config_path: &Path,
    max_frames: Option<u64>,
) -> Result<(), AppError> {
    let platform = ScriptedPlatform::from_file(script)?;
    log::info!("replaying {} steps from {}", platform.steps().len(), script.display());

    let (tx, queue) = event_queue(config.performance.event_queue_capacity);
    let mut session = TextInputSession::new(
        RecordingImeService::new(),
        MonospaceMeasurer::default(),
        Anchors::from_config(&config),
        config.behavior.char_policy,
    )?;
    if config.behavior.start_active {
        session.activate()?;
    }

    let frame_interval = Duration::from_millis(config.performance.frame_interval_ms);
    let player = platform.spawn(tx, frame_interval)?;

    let stdout = std::io::stdout();
    let mut presenter = ConsolePresenter::new(stdout.lock());
    let options = LoopOptions {
        config_path: Some(config_path),
        max_frames,
    };
    let (_, reason) = frame::run(
        &mut session,
        &queue,
        &mut presenter,
        &mut config,
        &options,
        |_| true,
    );

    // フレーム上限で止めた場合は再生スレッドを待たない
    if reason != StopReason::FrameLimit && player.join().is_err() {
        log::warn!("script thread panicked");
    }
    Ok(())
}

#[cfg(windows)]
fn run_native(
    mut config: AppConfig,
    config_path: &Path,
    max_frames: Option<u64>,
) -> Result<(), AppError> {
    use imecompose_core::{EdgeDetector, ImeEventKind, KeyCode, PlatformKind};
    use imecompose_input::{is_foreground, is_key_down, Win32ImeService};
    use imecompose_render::{GdiMeasurer, GdiPresenter, MainWindow};

    const WINDOW_WIDTH: i32 = 800;
    const WINDOW_HEIGHT: i32 = 480;

    let (tx, queue) = event_queue(config.performance.event_queue_capacity);
    win32::install(tx.clone(), config.behavior.platform == PlatformKind::Touch);

    let window = MainWindow::create(
        "Text Composition",
        WINDOW_WIDTH,
        WINDOW_HEIGHT,
        Some(win32::app_wnd_proc),
    )?;
    let mut presenter = GdiPresenter::new(window.hwnd(), window.width(), window.height())?;

    let mut session = TextInputSession::new(
        Win32ImeService::new(window.hwnd())?,
        GdiMeasurer::new()?,
        Anchors::from_config(&config),
        config.behavior.char_policy,
    )?;
    if config.behavior.start_active {
        session.activate()?;
    }

    let hwnd = window.hwnd();
    let mut toggle_edge = EdgeDetector::new();
    let options = LoopOptions {
        config_path: Some(config_path),
        max_frames,
    };
    frame::run(
        &mut session,
        &queue,
        &mut presenter,
        &mut config,
        &options,
        |config| {
            if !win32::pump_messages() {
                return false;
            }
            let touch = config.behavior.platform == PlatformKind::Touch;
            win32::set_tap_toggles(touch);

            let key = config.toggle_key().unwrap_or(KeyCode::F1);
            let pressed = toggle_edge.update_focused(is_key_down(key), is_foreground(hwnd));
            if pressed && !touch {
                if let Err(e) = tx.send(ImeEventKind::ToggleRequested) {
                    log::error!("toggle request dropped: {}", e);
                }
            }
            true
        },
    );
    Ok(())
}

#[cfg(not(windows))]
fn run_native(
    _config: AppConfig,
    _config_path: &Path,
    _max_frames: Option<u64>,
) -> Result<(), AppError> {
    log::error!("no OS IME backend on this platform, pass --script <file>");
    Err(imecompose_core::ImeError::NotAvailable.into())
}
