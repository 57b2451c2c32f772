mod frame;
pub mod graphics;
mod text;

pub use frame::{Color, Frame, ScreenRect, DEBUG_RED, DEBUG_TEXT};
pub use text::TextFont;
