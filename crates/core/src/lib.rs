pub mod candidate;
pub mod config;
pub mod error;
pub mod event;
pub mod key;
pub mod queue;
pub mod service;
pub mod session;
pub mod tracker;

pub use candidate::{CandidateEntry, CandidatePage};
pub use config::{
    AppConfig, BehaviorConfig, CharPolicy, Color, DiagnosticsConfig, DiagnosticsLevel,
    LayoutConfig, PlatformKind, StyleConfig,
};
pub use error::{AppError, ConfigError, ImeError, RenderError, ScriptError};
pub use event::{CompositionUpdate, ImeEvent, ImeEventKind};
pub use key::{EdgeDetector, KeyCode};
pub use queue::{event_queue, Drained, EventQueue, EventSender};
pub use service::{CompositionEventSink, ImeService, Rect, Size, TextMeasurer};
pub use session::{ActivationState, Anchors, TextInputSession};
pub use tracker::{CompositionInputTracker, CompositionState, Snapshot};
