//! Shared terminal UI pieces: color palettes, the error screen and the
//! recording library browser.

pub mod error;
pub mod library;
pub mod theme;

pub use error::ErrorScreen;
pub use library::{LibraryAction, LibraryViewer};
pub use theme::Palette;
