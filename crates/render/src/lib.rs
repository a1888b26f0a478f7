pub mod console;
#[cfg(windows)]
pub mod gdi;
pub mod layout;
pub mod measure;
#[cfg(windows)]
pub mod window;

pub use console::{present, ConsolePresenter, Presenter};
#[cfg(windows)]
pub use gdi::{GdiMeasurer, GdiPresenter};
pub use layout::{layout_scene, DrawCommand, DrawList};
pub use measure::MonospaceMeasurer;
#[cfg(windows)]
pub use window::MainWindow;
