use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::ValidateRect;
use windows::Win32::UI::WindowsAndMessaging::*;

use imecompose_core::{EventSender, ImeEventKind};
use imecompose_input::handle_ime_message;

/// wnd_proc からイベント送信用のグローバルチャネル
static EVENT_TX: OnceLock<EventSender> = OnceLock::new();

/// タッチ環境ではクリック（タップ）で ON/OFF を切り替える
static TAP_TOGGLES: AtomicBool = AtomicBool::new(false);

/// 変換中文字列・候補は自前で描くので OS の候補ウィンドウは出さない
const SHOW_OS_CANDIDATES: bool = false;

pub fn install(tx: EventSender, tap_toggles: bool) {
    if EVENT_TX.set(tx).is_err() {
        log::warn!("window event sender already installed");
    }
    TAP_TOGGLES.store(tap_toggles, Ordering::Relaxed);
}

pub fn set_tap_toggles(enabled: bool) {
    TAP_TOGGLES.store(enabled, Ordering::Relaxed);
}

fn send(kind: ImeEventKind) {
    if let Some(tx) = EVENT_TX.get() {
        if let Err(e) = tx.send(kind) {
            log::error!("window event dropped: {}", e);
        }
    }
}

pub unsafe extern "system" fn app_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if let Some(tx) = EVENT_TX.get() {
        let handled = handle_ime_message(hwnd, msg, wparam, lparam, tx, SHOW_OS_CANDIDATES);
        if let Some(result) = handled {
            return result;
        }
    }

    match msg {
        WM_LBUTTONUP if TAP_TOGGLES.load(Ordering::Relaxed) => {
            send(ImeEventKind::ToggleRequested);
            LRESULT(0)
        }
        // 毎フレーム描画しているので無効領域を消すだけ
        WM_PAINT => {
            let _ = ValidateRect(hwnd, None);
            LRESULT(0)
        }
        WM_DESTROY => {
            send(ImeEventKind::Quit);
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Win32 メッセージ処理。WM_QUIT を受けたら false。
pub fn pump_messages() -> bool {
    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return false;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    true
}
