use crate::config::{AppConfig, CharPolicy};
use crate::error::ImeError;
use crate::event::{CompositionUpdate, ImeEvent, ImeEventKind};
use crate::service::{CompositionEventSink, ImeService, Rect, TextMeasurer};
use crate::tracker::{CompositionInputTracker, Snapshot};

/// IMEセッションのON/OFF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

/// 候補ウィンドウ位置の計算に使う配置情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchors {
    pub origin_x: i32,
    pub candidate_y: i32,
    pub candidate_rect_height: i32,
    pub cursor_marker: String,
}

impl Anchors {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            origin_x: config.layout.origin_x,
            candidate_y: config.layout.candidate_y,
            candidate_rect_height: config.layout.candidate_rect_height,
            cursor_marker: config.behavior.cursor_marker.clone(),
        }
    }
}

impl Default for Anchors {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// トラッカー・IMEサービス・テキスト計測をまとめたテキスト入力セッション
///
/// プラットフォーム層には `CompositionEventSink` として登録する。
/// 変換更新を受けるたびに候補ウィンドウの位置を計算し直してIMEに通知する。
pub struct TextInputSession<S, M> {
    tracker: CompositionInputTracker,
    service: S,
    measurer: M,
    anchors: Anchors,
    state: ActivationState,
}

impl<S: ImeService, M: TextMeasurer> TextInputSession<S, M> {
    pub fn new(
        mut service: S,
        measurer: M,
        anchors: Anchors,
        char_policy: CharPolicy,
    ) -> Result<Self, ImeError> {
        service.set_text_input_rect(Rect::new(anchors.origin_x, anchors.candidate_y, 0, 0))?;
        let state = if service.is_text_input_active() {
            ActivationState::Active
        } else {
            ActivationState::Inactive
        };
        log::debug!("text input session created ({:?})", state);

        Ok(Self {
            tracker: CompositionInputTracker::new(char_policy),
            service,
            measurer,
            anchors,
            state,
        })
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    pub fn tracker(&self) -> &CompositionInputTracker {
        &self.tracker
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tracker.snapshot().with_active(self.is_active())
    }

    /// Inactive ⇄ Active を切り替える。失敗時は状態を変えない。
    pub fn toggle_active(&mut self) -> Result<ActivationState, ImeError> {
        match self.state {
            ActivationState::Inactive => self.activate()?,
            ActivationState::Active => self.deactivate()?,
        }
        Ok(self.state)
    }

    pub fn activate(&mut self) -> Result<(), ImeError> {
        if self.state == ActivationState::Active {
            return Ok(());
        }
        self.service.start_text_input()?;
        self.state = ActivationState::Active;
        log::info!("text composition enabled");
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), ImeError> {
        if self.state == ActivationState::Inactive {
            return Ok(());
        }
        self.service.stop_text_input()?;
        self.state = ActivationState::Inactive;
        self.tracker.end_composition();
        log::info!("text composition disabled");
        Ok(())
    }

    /// IME側の現在状態を読み直して合わせる。変わった場合は true。
    ///
    /// セッションを経由せずにOSやユーザ操作でIMEが切り替わることがあるため、毎フレーム呼ぶ。
    pub fn sync_with_service(&mut self) -> bool {
        let state = if self.service.is_text_input_active() {
            ActivationState::Active
        } else {
            ActivationState::Inactive
        };
        if state == self.state {
            return false;
        }
        log::info!("text input state changed externally: {:?} -> {:?}", self.state, state);
        self.state = state;
        if state == ActivationState::Inactive {
            self.tracker.end_composition();
        }
        true
    }

    /// 終了時の後片付け（ベストエフォート）
    pub fn shutdown(&mut self) {
        if let Err(e) = self.deactivate() {
            log::warn!("stop text input on shutdown failed: {}", e);
        }
    }

    /// 設定を更新（ホットリロード用）
    pub fn update_config(&mut self, config: &AppConfig) {
        self.anchors = Anchors::from_config(config);
        self.tracker.set_char_policy(config.behavior.char_policy);
    }

    /// 現在の確定文字列＋変換中文字列の末尾にIME候補ウィンドウを合わせる
    pub fn candidate_rect(&self) -> Rect {
        let composition = self.tracker.composition().display(&self.anchors.cursor_marker);
        let mut text = String::with_capacity(self.tracker.committed().len() + composition.len());
        text.push_str(self.tracker.committed());
        text.push_str(&composition);

        let width = self.measurer.measure(&text).width;
        Rect::new(
            self.anchors.origin_x + width as i32,
            self.anchors.candidate_y,
            0,
            self.anchors.candidate_rect_height,
        )
    }

    /// キューから取り出したイベントを1件適用する
    pub fn apply(&mut self, event: ImeEvent) -> Result<(), ImeError> {
        match event.kind {
            ImeEventKind::TextInput { unit } => self.on_text_input(unit),
            ImeEventKind::Composition(update) => self.on_composition(update),
            ImeEventKind::CompositionEnd => self.on_composition_end(),
            ImeEventKind::ToggleRequested => {
                self.toggle_active()?;
            }
            ImeEventKind::Quit => {}
        }
        Ok(())
    }
}

impl<S: ImeService, M: TextMeasurer> CompositionEventSink for TextInputSession<S, M> {
    fn on_text_input(&mut self, unit: u16) {
        self.tracker.on_text_input(unit);
    }

    fn on_composition(&mut self, update: CompositionUpdate) {
        self.tracker.on_composition(update);

        let rect = self.candidate_rect();
        if let Err(e) = self.service.set_text_input_rect(rect) {
            log::error!("set text input rect failed: {}", e);
        }
    }

    fn on_composition_end(&mut self) {
        self.tracker.on_composition_end();
    }
}
