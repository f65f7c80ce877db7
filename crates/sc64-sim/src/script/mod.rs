//! Session scripts
//!
//! A script is a list of steps, one per line, that drive the board from the
//! host side of the USB link and the console side of the joybus:
//!
//! ```text
//! # bring up a 4 Kbit EEPROM and check a page
//! save eeprom4k
//! eeprom-write 0 0xDE 0xAD 0xBE 0xEF 0 0 0 0
//! eeprom-read 0 expect 0xDE 0xAD 0xBE 0xEF 0 0 0 0
//! read 0x1000 4 expect "SC64"
//! ```
//!
//! Pipeline: [`Lexer`] -> [`Parser`] -> [`Script`] -> [`Runner`]

pub mod ast;
mod lexer;
mod parser;
mod runner;
mod token;

pub use ast::{Expected, SaveKind, Script, Step, StepKind};
pub use lexer::Lexer;
pub use parser::Parser;
pub use runner::{RunSummary, Runner};
pub use token::{Token, TokenKind};
