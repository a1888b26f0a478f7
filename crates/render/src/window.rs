use std::mem;

use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

use imecompose_core::RenderError;

/// 通常のトップレベルウィンドウ（クライアント領域にフレームを描く）
pub struct MainWindow {
    hwnd: HWND,
    width: i32,
    height: i32,
}

impl MainWindow {
    /// `wnd_proc` はアプリ側で用意する（IMEメッセージを処理するため）
    pub fn create(
        title: &str,
        width: i32,
        height: i32,
        wnd_proc: WNDPROC,
    ) -> Result<Self, RenderError> {
        unsafe {
            let instance = GetModuleHandleW(None)
                .map_err(|e| RenderError::CreateFailed(e.to_string()))?;

            let class_name = w!("ImeComposeWindow");
            let wc = WNDCLASSEXW {
                cbSize: mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: wnd_proc,
                hInstance: HINSTANCE(instance.0),
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                lpszClassName: class_name,
                ..Default::default()
            };
            RegisterClassExW(&wc);

            // クライアント領域が width x height になるよう枠を足す
            let style = WS_OVERLAPPEDWINDOW & !WS_THICKFRAME & !WS_MAXIMIZEBOX;
            let mut frame = RECT {
                left: 0,
                top: 0,
                right: width,
                bottom: height,
            };
            let _ = AdjustWindowRectEx(&mut frame, style, false, WINDOW_EX_STYLE::default());

            let title_wide = to_wide(title);
            let hwnd = CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                PCWSTR(title_wide.as_ptr()),
                style,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                frame.right - frame.left,
                frame.bottom - frame.top,
                None,
                None,
                HINSTANCE(instance.0),
                None,
            )
            .map_err(|e| RenderError::CreateFailed(e.to_string()))?;

            let _ = ShowWindow(hwnd, SW_SHOW);
            let _ = UpdateWindow(hwnd);

            Ok(Self {
                hwnd,
                width,
                height,
            })
        }
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}

impl Drop for MainWindow {
    fn drop(&mut self) {
        unsafe {
            // WM_DESTROY 済みなら何もしない
            if IsWindow(self.hwnd).as_bool() {
                let _ = DestroyWindow(self.hwnd);
            }
        }
    }
}

/// &strをnull終端UTF-16に変換
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
