use imecompose_core::{ImeError, ImeService, Rect};

/// `RecordingImeService` に対して行われた呼び出し
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImeCall {
    Start,
    Stop,
    SetRect(Rect),
}

/// OSのIMEを持たない環境用のサービス。呼び出しを記録するだけ。
#[derive(Debug, Default)]
pub struct RecordingImeService {
    active: bool,
    calls: Vec<ImeCall>,
}

impl RecordingImeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[ImeCall] {
        &self.calls
    }

    /// 最後に通知された候補ウィンドウ位置
    pub fn last_rect(&self) -> Option<Rect> {
        self.calls.iter().rev().find_map(|call| match call {
            ImeCall::SetRect(rect) => Some(*rect),
            _ => None,
        })
    }
}

impl ImeService for RecordingImeService {
    fn start_text_input(&mut self) -> Result<(), ImeError> {
        self.active = true;
        self.calls.push(ImeCall::Start);
        log::debug!("ime start");
        Ok(())
    }

    fn stop_text_input(&mut self) -> Result<(), ImeError> {
        self.active = false;
        self.calls.push(ImeCall::Stop);
        log::debug!("ime stop");
        Ok(())
    }

    fn is_text_input_active(&self) -> bool {
        self.active
    }

    fn set_text_input_rect(&mut self, rect: Rect) -> Result<(), ImeError> {
        self.calls.push(ImeCall::SetRect(rect));
        Ok(())
    }
}
