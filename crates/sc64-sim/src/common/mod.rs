//! Common infrastructure shared across the board, link and script layers

mod error;
mod span;

pub use error::{DiagnosticReporter, SimError, SimResult};
pub use span::Span;
