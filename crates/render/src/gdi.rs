use std::mem;

use windows::Win32::Foundation::*;
use windows::Win32::Graphics::Gdi::*;

use imecompose_core::{Color, Rect, RenderError, Size, TextMeasurer};

use crate::console::Presenter;
use crate::layout::DrawCommand;

fn colorref(color: Color) -> COLORREF {
    COLORREF(color.r as u32 | (color.g as u32) << 8 | (color.b as u32) << 16)
}

fn to_rect(rect: &Rect) -> RECT {
    RECT {
        left: rect.x,
        top: rect.y,
        right: rect.x + rect.width,
        bottom: rect.y + rect.height,
    }
}

unsafe fn fill(hdc: HDC, rect: &RECT, color: Color) -> Result<(), RenderError> {
    let brush = CreateSolidBrush(colorref(color));
    if brush.is_invalid() {
        return Err(RenderError::DrawFailed("CreateSolidBrush".into()));
    }
    let filled = FillRect(hdc, rect, brush);
    let _ = DeleteObject(brush);
    if filled == 0 {
        return Err(RenderError::DrawFailed("FillRect".into()));
    }
    Ok(())
}

/// メモリDC（DIBセクション）に描いて end() でウィンドウへ転送する
pub struct GdiPresenter {
    hwnd: HWND,
    width: i32,
    height: i32,
    mem_dc: HDC,
    dib_bitmap: HBITMAP,
    old_bitmap: HGDIOBJ,
    old_font: HGDIOBJ,
}

impl GdiPresenter {
    pub fn new(hwnd: HWND, width: i32, height: i32) -> Result<Self, RenderError> {
        unsafe {
            let (mem_dc, dib_bitmap, old_bitmap) = create_dib(width, height)?;
            let old_font = SelectObject(mem_dc, GetStockObject(DEFAULT_GUI_FONT));
            SetBkMode(mem_dc, TRANSPARENT);

            Ok(Self {
                hwnd,
                width,
                height,
                mem_dc,
                dib_bitmap,
                old_bitmap,
                old_font,
            })
        }
    }
}

impl Presenter for GdiPresenter {
    fn begin(&mut self, background: Color) -> Result<(), RenderError> {
        let area = RECT {
            left: 0,
            top: 0,
            right: self.width,
            bottom: self.height,
        };
        unsafe { fill(self.mem_dc, &area, background) }
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        unsafe {
            match command {
                DrawCommand::Text { x, y, text, color } => {
                    let wide: Vec<u16> = text.encode_utf16().collect();
                    SetTextColor(self.mem_dc, colorref(*color));
                    TextOutW(self.mem_dc, *x as i32, *y as i32, &wide)
                        .ok()
                        .map_err(|e| RenderError::DrawFailed(format!("TextOutW: {}", e)))
                }
                DrawCommand::Fill { rect, color } => fill(self.mem_dc, &to_rect(rect), *color),
            }
        }
    }

    fn end(&mut self) -> Result<(), RenderError> {
        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_invalid() {
                return Err(RenderError::DrawFailed("GetDC".into()));
            }
            let result = BitBlt(hdc, 0, 0, self.width, self.height, self.mem_dc, 0, 0, SRCCOPY)
                .map_err(|e| RenderError::DrawFailed(format!("BitBlt: {}", e)));
            ReleaseDC(self.hwnd, hdc);
            result
        }
    }
}

impl Drop for GdiPresenter {
    fn drop(&mut self) {
        unsafe {
            // フォント・旧ビットマップ復元 → DIBセクション削除 → DC削除
            SelectObject(self.mem_dc, self.old_font);
            SelectObject(self.mem_dc, self.old_bitmap);
            let _ = DeleteObject(self.dib_bitmap);
            let _ = DeleteDC(self.mem_dc);
        }
    }
}

/// 32bit top-down DIBセクションとメモリDCを作成
unsafe fn create_dib(width: i32, height: i32) -> Result<(HDC, HBITMAP, HGDIOBJ), RenderError> {
    let mem_dc = CreateCompatibleDC(HDC::default());
    if mem_dc.is_invalid() {
        return Err(RenderError::CreateFailed("CreateCompatibleDC".into()));
    }

    let bmi = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut bits: *mut std::ffi::c_void = std::ptr::null_mut();
    let created = CreateDIBSection(HDC::default(), &bmi, DIB_RGB_COLORS, &mut bits, None, 0);
    let dib_bitmap = match created {
        Ok(bitmap) => bitmap,
        Err(e) => {
            let _ = DeleteDC(mem_dc);
            return Err(RenderError::CreateFailed(format!("CreateDIBSection: {}", e)));
        }
    };

    let old_bitmap = SelectObject(mem_dc, HGDIOBJ(dib_bitmap.0));
    Ok((mem_dc, dib_bitmap, old_bitmap))
}

/// GDI の既定UIフォントで文字列幅を測る
pub struct GdiMeasurer {
    hdc: HDC,
    old_font: HGDIOBJ,
}

impl GdiMeasurer {
    pub fn new() -> Result<Self, RenderError> {
        unsafe {
            let hdc = CreateCompatibleDC(HDC::default());
            if hdc.is_invalid() {
                return Err(RenderError::CreateFailed("CreateCompatibleDC".into()));
            }
            let old_font = SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
            Ok(Self { hdc, old_font })
        }
    }
}

impl TextMeasurer for GdiMeasurer {
    fn measure(&self, text: &str) -> Size {
        if text.is_empty() {
            return Size::default();
        }
        let wide: Vec<u16> = text.encode_utf16().collect();
        let mut size = SIZE::default();
        let ok = unsafe { GetTextExtentPoint32W(self.hdc, &wide, &mut size) }.as_bool();
        if !ok {
            log::warn!("GetTextExtentPoint32W failed for {:?}", text);
            return Size::default();
        }
        Size {
            width: size.cx as f32,
            height: size.cy as f32,
        }
    }
}

impl Drop for GdiMeasurer {
    fn drop(&mut self) {
        unsafe {
            SelectObject(self.hdc, self.old_font);
            let _ = DeleteDC(self.hdc);
        }
    }
}
