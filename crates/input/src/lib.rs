#[cfg(windows)]
pub mod ime;
#[cfg(windows)]
pub mod keyboard;
pub mod recording;
pub mod script;

#[cfg(windows)]
pub use ime::{handle_ime_message, Win32ImeService};
#[cfg(windows)]
pub use keyboard::{is_foreground, is_key_down};
pub use recording::{ImeCall, RecordingImeService};
pub use script::{parse_script, ScriptStep, ScriptedPlatform};
