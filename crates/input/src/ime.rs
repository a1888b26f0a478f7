//! Win32 IMM バックエンド
//!
//! ウィンドウプロシージャから `handle_ime_message` を呼び、WM_CHAR / WM_IME_* を
//! `ImeEventKind` に変換してキューへ積む。変換中文字列・候補リストは
//! 独自描画するため、OS標準の候補ウィンドウは WM_IME_SETCONTEXT で抑止できる。

use std::ffi::c_void;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Globalization::HIMC;
use windows::Win32::UI::Input::Ime::{
    ImmAssociateContextEx, ImmGetCandidateListW, ImmGetCompositionStringW, ImmGetContext,
    ImmReleaseContext, ImmSetCandidateWindow, ImmSetCompositionWindow, CANDIDATEFORM,
    CANDIDATELIST, COMPOSITIONFORM, GCS_COMPSTR, GCS_CURSORPOS, GCS_RESULTSTR,
    IME_COMPOSITION_STRING,
};
use windows::Win32::UI::WindowsAndMessaging::{
    DefWindowProcW, WM_CHAR, WM_IME_COMPOSITION, WM_IME_ENDCOMPOSITION, WM_IME_NOTIFY,
    WM_IME_SETCONTEXT, WM_IME_STARTCOMPOSITION,
};

use imecompose_core::{CompositionUpdate, EventSender, ImeError, ImeEventKind, ImeService, Rect};

// imm.h
const IACE_DEFAULT: u32 = 0x0010;
const CFS_POINT: u32 = 0x0002;
const CFS_EXCLUDE: u32 = 0x0080;
const IMN_CLOSECANDIDATE: usize = 0x0004;
const IMN_OPENCANDIDATE: usize = 0x0005;
const IMN_CHANGECANDIDATE: usize = 0x0003;
const ISC_SHOWUIALLCANDIDATEWINDOW: isize = 0x0000_000F;
const ISC_SHOWUICOMPOSITIONWINDOW: isize = 0x8000_0000u32 as i32 as isize;

/// ImmGetContext / ImmReleaseContext の対
struct InputContext {
    hwnd: HWND,
    himc: HIMC,
}

impl InputContext {
    fn open(hwnd: HWND) -> Option<Self> {
        let himc = unsafe { ImmGetContext(hwnd) };
        if himc.is_invalid() {
            return None;
        }
        Some(Self { hwnd, himc })
    }

    /// GCS_COMPSTR / GCS_RESULTSTR をUTF-16のまま取得
    fn string(&self, kind: IME_COMPOSITION_STRING) -> Vec<u16> {
        unsafe {
            let byte_len = ImmGetCompositionStringW(self.himc, kind, None, 0);
            if byte_len <= 0 {
                return Vec::new();
            }

            let mut buf: Vec<u16> = vec![0u16; byte_len as usize / 2];
            let copied = ImmGetCompositionStringW(
                self.himc,
                kind,
                Some(buf.as_mut_ptr() as *mut c_void),
                byte_len as u32,
            );
            if copied <= 0 {
                return Vec::new();
            }
            buf.truncate(copied as usize / 2);
            buf
        }
    }

    /// UTF-16 単位のカーソル位置
    fn cursor(&self) -> Option<usize> {
        let pos = unsafe { ImmGetCompositionStringW(self.himc, GCS_CURSORPOS, None, 0) };
        usize::try_from(pos).ok()
    }

    fn candidates(&self) -> Option<CandidateData> {
        unsafe {
            let size = ImmGetCandidateListW(self.himc, 0, None, 0) as usize;
            if size < std::mem::size_of::<CANDIDATELIST>() {
                return None;
            }

            // CANDIDATELIST は u32 境界に置く
            let mut buf: Vec<u32> = vec![0u32; size.div_ceil(4)];
            let copied = ImmGetCandidateListW(
                self.himc,
                0,
                Some(buf.as_mut_ptr() as *mut CANDIDATELIST),
                size as u32,
            ) as usize;
            if copied == 0 {
                return None;
            }

            let list = &*(buf.as_ptr() as *const CANDIDATELIST);
            let base = buf.as_ptr() as *const u8;
            let offsets =
                std::slice::from_raw_parts(list.dwOffset.as_ptr(), list.dwCount as usize);

            let mut items = Vec::with_capacity(offsets.len());
            for &offset in offsets {
                let offset = offset as usize;
                if offset >= copied {
                    items.push(String::new());
                    continue;
                }
                let ptr = base.add(offset) as *const u16;
                let max_len = (copied - offset) / 2;
                let mut len = 0;
                while len < max_len && *ptr.add(len) != 0 {
                    len += 1;
                }
                items.push(String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len)));
            }

            Some(CandidateData {
                items,
                page_start: list.dwPageStart as usize,
                page_size: list.dwPageSize as usize,
                selected: list.dwSelection as usize,
            })
        }
    }

    fn composition_update(&self, with_candidates: bool) -> CompositionUpdate {
        let units = self.string(GCS_COMPSTR);
        let cursor = self
            .cursor()
            .map(|pos| char::decode_utf16(units[..pos.min(units.len())].iter().copied()).count());

        let mut update = CompositionUpdate::new(String::from_utf16_lossy(&units));
        update.cursor = cursor;

        if with_candidates {
            if let Some(data) = self.candidates() {
                update = update
                    .with_candidates(data.items, data.page_start, data.page_size)
                    .with_selected(data.selected);
            }
        }
        update
    }
}

impl Drop for InputContext {
    fn drop(&mut self) {
        unsafe {
            let _ = ImmReleaseContext(self.hwnd, self.himc);
        }
    }
}

struct CandidateData {
    items: Vec<String>,
    page_start: usize,
    page_size: usize,
    selected: usize,
}

/// ウィンドウに関連付けた入力コンテキストを ON/OFF する ImeService
pub struct Win32ImeService {
    hwnd: HWND,
}

impl Win32ImeService {
    /// 生成時はIMEを切り離した状態にする
    pub fn new(hwnd: HWND) -> Result<Self, ImeError> {
        let mut service = Self { hwnd };
        service.stop_text_input()?;
        Ok(service)
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }
}

fn context_failed(what: &str, e: windows::core::Error) -> ImeError {
    ImeError::ContextFailed(format!("{}: {}", what, e))
}

impl ImeService for Win32ImeService {
    fn start_text_input(&mut self) -> Result<(), ImeError> {
        unsafe { ImmAssociateContextEx(self.hwnd, HIMC::default(), IACE_DEFAULT) }
            .ok()
            .map_err(|e| context_failed("ImmAssociateContextEx", e))
    }

    fn stop_text_input(&mut self) -> Result<(), ImeError> {
        // NULLコンテキストを関連付けるとIMEが無効になる
        unsafe { ImmAssociateContextEx(self.hwnd, HIMC::default(), 0) }
            .ok()
            .map_err(|e| context_failed("ImmAssociateContextEx", e))
    }

    /// 入力コンテキストが関連付いているかをその都度問い合わせる
    fn is_text_input_active(&self) -> bool {
        InputContext::open(self.hwnd).is_some()
    }

    fn set_text_input_rect(&mut self, rect: Rect) -> Result<(), ImeError> {
        // 無効中は関連付くコンテキストが無いので何もしない
        let Some(ctx) = InputContext::open(self.hwnd) else {
            return Ok(());
        };

        let pos = POINT {
            x: rect.x,
            y: rect.y,
        };
        let area = RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        };

        let candidate = CANDIDATEFORM {
            dwIndex: 0,
            dwStyle: CFS_EXCLUDE,
            ptCurrentPos: pos,
            rcArea: area,
        };
        let composition = COMPOSITIONFORM {
            dwStyle: CFS_POINT,
            ptCurrentPos: pos,
            rcArea: area,
        };

        unsafe {
            check(ImmSetCandidateWindow(ctx.himc, &candidate), "ImmSetCandidateWindow")?;
            check(ImmSetCompositionWindow(ctx.himc, &composition), "ImmSetCompositionWindow")?;
        }
        Ok(())
    }
}

fn check(result: BOOL, what: &str) -> Result<(), ImeError> {
    result.ok().map_err(|e| context_failed(what, e))
}

/// IME関連メッセージを処理する
///
/// 処理した場合は `Some`、`DefWindowProcW` に任せる場合は `None` を返す。
/// `show_os_candidates` が false なら OS の候補ウィンドウを表示させない。
pub fn handle_ime_message(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    tx: &EventSender,
    show_os_candidates: bool,
) -> Option<LRESULT> {
    match msg {
        WM_CHAR => {
            send(tx, ImeEventKind::TextInput {
                unit: wparam.0 as u16,
            });
            Some(LRESULT(0))
        }
        WM_IME_SETCONTEXT => {
            let mut flags = lparam.0;
            if !show_os_candidates {
                flags &= !(ISC_SHOWUIALLCANDIDATEWINDOW | ISC_SHOWUICOMPOSITIONWINDOW);
            }
            Some(unsafe { DefWindowProcW(hwnd, msg, wparam, LPARAM(flags)) })
        }
        // 変換中文字列は自前で描画する
        WM_IME_STARTCOMPOSITION => Some(LRESULT(0)),
        WM_IME_COMPOSITION => {
            let ctx = InputContext::open(hwnd)?;
            let flags = lparam.0 as u32;

            if flags & GCS_RESULTSTR.0 != 0 {
                for unit in ctx.string(GCS_RESULTSTR) {
                    send(tx, ImeEventKind::TextInput { unit });
                }
            }
            if flags & GCS_COMPSTR.0 != 0 || flags & GCS_RESULTSTR.0 != 0 {
                send(tx, ImeEventKind::Composition(ctx.composition_update(true)));
            }
            Some(LRESULT(0))
        }
        WM_IME_NOTIFY => {
            match wparam.0 {
                IMN_OPENCANDIDATE | IMN_CHANGECANDIDATE => {
                    if let Some(ctx) = InputContext::open(hwnd) {
                        send(tx, ImeEventKind::Composition(ctx.composition_update(true)));
                    }
                }
                IMN_CLOSECANDIDATE => {
                    if let Some(ctx) = InputContext::open(hwnd) {
                        send(tx, ImeEventKind::Composition(ctx.composition_update(false)));
                    }
                }
                _ => {}
            }
            None
        }
        WM_IME_ENDCOMPOSITION => {
            send(tx, ImeEventKind::CompositionEnd);
            None
        }
        _ => None,
    }
}

fn send(tx: &EventSender, kind: ImeEventKind) {
    if let Err(e) = tx.send(kind) {
        log::error!("ime event dropped: {}", e);
    }
}
