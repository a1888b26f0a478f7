//! 1フレーム = イベント適用 → IME状態の同期 → 設定リロード → レイアウト → 描画 → 待機

use std::path::Path;
use std::time::{Duration, Instant};

use imecompose_core::{AppConfig, EventQueue, ImeService, TextInputSession, TextMeasurer};
use imecompose_render::{layout_scene, present, Presenter};

use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Quit イベントを受け取った
    Quit,
    /// プロデューサが全て終了した
    Disconnected,
    /// プラットフォーム側（ウィンドウ）が閉じられた
    Closed,
    FrameLimit,
}

#[derive(Debug, Default)]
pub struct LoopOptions<'a> {
    /// ホットリロード対象の設定ファイル
    pub config_path: Option<&'a Path>,
    pub max_frames: Option<u64>,
}

/// フレームループを回す。`poll` はフレーム先頭で呼ばれ、false を返すと終了する。
///
/// 戻り値は (描画したフレーム数, 終了理由)。
pub fn run<S, M, P, F>(
    session: &mut TextInputSession<S, M>,
    queue: &EventQueue,
    presenter: &mut P,
    config: &mut AppConfig,
    options: &LoopOptions<'_>,
    mut poll: F,
) -> (u64, StopReason)
where
    S: ImeService,
    M: TextMeasurer,
    P: Presenter + ?Sized,
    F: FnMut(&AppConfig) -> bool,
{
    let mut frames = 0u64;
    let mut last_reload = Instant::now();

    let reason = loop {
        if !poll(config) {
            break StopReason::Closed;
        }

        let mut oldest = Duration::ZERO;
        let drained = queue.drain_with(|event| {
            oldest = oldest.max(event.timestamp.elapsed());
            if let Err(e) = session.apply(event) {
                log::error!("toggle text input failed: {}", e);
            }
        });
        if drained.applied > 0 {
            log::debug!("applied {} events, oldest waited {:?}", drained.applied, oldest);
        }

        session.sync_with_service();

        // 設定ホットリロード
        if let Some(path) = options.config_path {
            let interval = Duration::from_millis(config.performance.config_reload_interval_ms);
            if last_reload.elapsed() >= interval {
                reload(session, config, path);
                last_reload = Instant::now();
            }
        }

        let list = layout_scene(&session.snapshot(), config, session.measurer());
        if let Err(e) = present(presenter, &list) {
            log::warn!("frame {} not presented: {}", frames, e);
        }
        frames += 1;

        // 最後の状態を描画してから抜ける
        if drained.quit {
            break StopReason::Quit;
        }
        if drained.disconnected {
            break StopReason::Disconnected;
        }
        if options.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }

        std::thread::sleep(Duration::from_millis(config.performance.frame_interval_ms));
    };

    log::info!("frame loop stopped after {} frames ({:?})", frames, reason);
    session.shutdown();
    (frames, reason)
}

fn reload<S: ImeService, M: TextMeasurer>(
    session: &mut TextInputSession<S, M>,
    config: &mut AppConfig,
    path: &Path,
) {
    match config.check_reload(path) {
        Ok(Some(new_config)) => {
            log::info!("config reloaded from {}", path.display());
            session.update_config(&new_config);
            logger::update_config(&new_config.diagnostics);
            *config = new_config;
        }
        Ok(None) => {}
        Err(e) => log::warn!("config reload skipped: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imecompose_core::{event_queue, Anchors, ImeEventKind};
    use imecompose_input::{ImeCall, RecordingImeService, ScriptedPlatform};
    use imecompose_render::{ConsolePresenter, MonospaceMeasurer};

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.performance.frame_interval_ms = 1;
        config
    }

    fn session(config: &AppConfig) -> TextInputSession<RecordingImeService, MonospaceMeasurer> {
        let mut session = TextInputSession::new(
            RecordingImeService::new(),
            MonospaceMeasurer::new(10.0, 32.0),
            Anchors::from_config(config),
            config.behavior.char_policy,
        )
        .unwrap();
        session.activate().unwrap();
        session
    }

    #[test]
    fn scripted_session_renders_final_state() {
        let mut config = fast_config();
        let mut session = session(&config);
        let (tx, queue) = event_queue(config.performance.event_queue_capacity);
        let script = "type ab\ncompose ni cursor=1 candidates=你,尼 selected=1\n";
        let handle = ScriptedPlatform::parse(script)
            .unwrap()
            .spawn(tx, Duration::from_millis(1))
            .unwrap();

        let mut presenter = ConsolePresenter::new(Vec::new());
        let (frames, reason) = run(
            &mut session,
            &queue,
            &mut presenter,
            &mut config,
            &LoopOptions::default(),
            |_| true,
        );
        handle.join().unwrap();

        assert_eq!(reason, StopReason::Quit);
        assert!(frames >= 1);

        let out = String::from_utf8(presenter.into_inner()).unwrap();
        let last = out.rsplit("--- frame").next().unwrap();
        assert!(last.contains("(  10,  90) ab"));
        assert!(last.contains("(  32,  90) n|i"));
        assert!(last.contains("(  30, 122) 1.你"));
        assert!(last.contains("(  30, 154) 2.尼"));

        // 終了時にIMEを切り離している
        assert_eq!(session.service().calls().last(), Some(&ImeCall::Stop));
        assert_eq!(session.tracker().committed(), "ab");
    }

    #[test]
    fn long_type_line_survives_small_queue() {
        let mut config = fast_config();
        let mut session = session(&config);
        let (tx, queue) = event_queue(256);
        let script = format!("type {}\n", "x".repeat(400));
        let handle = ScriptedPlatform::parse(&script)
            .unwrap()
            .spawn(tx, Duration::ZERO)
            .unwrap();

        let mut presenter = ConsolePresenter::new(Vec::new());
        let (_, reason) = run(
            &mut session,
            &queue,
            &mut presenter,
            &mut config,
            &LoopOptions::default(),
            |_| true,
        );
        handle.join().unwrap();

        assert_eq!(reason, StopReason::Quit);
        assert_eq!(session.tracker().committed().len(), 400);
    }

    #[test]
    fn toggle_event_flips_status_line() {
        let mut config = fast_config();
        let mut session = session(&config);
        let (tx, queue) = event_queue(16);
        tx.send(ImeEventKind::ToggleRequested).unwrap();

        let mut presenter = ConsolePresenter::new(Vec::new());
        let (frames, reason) = run(
            &mut session,
            &queue,
            &mut presenter,
            &mut config,
            &LoopOptions {
                config_path: None,
                max_frames: Some(2),
            },
            |_| true,
        );

        assert_eq!((frames, reason), (2, StopReason::FrameLimit));
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(out.contains("Text Composition disabled."));
        assert!(!out.contains("Text Composition enabled."));
        drop(tx);
    }

    #[test]
    fn closed_platform_stops_before_drawing() {
        let mut config = fast_config();
        let mut session = session(&config);
        let (_tx, queue) = event_queue(4);

        let mut presenter = ConsolePresenter::new(Vec::new());
        let (frames, reason) = run(
            &mut session,
            &queue,
            &mut presenter,
            &mut config,
            &LoopOptions::default(),
            |_| false,
        );

        assert_eq!((frames, reason), (0, StopReason::Closed));
        assert!(!session.is_active());
    }

    #[test]
    fn config_file_change_is_picked_up() {
        let dir = std::env::temp_dir().join(format!(
            "imecompose-frame-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let path = dir.join("config.json");
        let mut config = AppConfig::load_or_create(&path).unwrap();
        config.performance.frame_interval_ms = 1;
        config.performance.config_reload_interval_ms = 0;
        // 次のチェックで必ず読み直す
        config.last_modified = None;

        let mut on_disk = AppConfig::default();
        on_disk.hotkey.toggle = "F2".into();
        on_disk.performance.frame_interval_ms = 1;
        on_disk.save_atomic(&path).unwrap();

        let mut session = session(&config);
        let (_tx, queue) = event_queue(4);
        let mut presenter = ConsolePresenter::new(Vec::new());
        run(
            &mut session,
            &queue,
            &mut presenter,
            &mut config,
            &LoopOptions {
                config_path: Some(&path),
                max_frames: Some(1),
            },
            |_| true,
        );

        assert_eq!(config.hotkey.toggle, "F2");
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert!(out.contains("Press F2 to Enable/Disable Text Composition"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
