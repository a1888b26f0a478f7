use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

use imecompose_core::KeyCode;

/// GetAsyncKeyState で現在の押下状態を取得
///
/// システム全体の状態なので、フォーカス判定は `is_foreground` と
/// `EdgeDetector::update_focused` で行う。
pub fn is_key_down(key: KeyCode) -> bool {
    unsafe { GetAsyncKeyState(key.0 as i32) < 0 }
}

/// `hwnd` が現在のフォアグラウンドウィンドウか
pub fn is_foreground(hwnd: HWND) -> bool {
    unsafe { GetForegroundWindow() == hwnd }
}
