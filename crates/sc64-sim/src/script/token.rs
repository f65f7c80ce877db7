//! Token definitions for session scripts

use crate::common::Span;
use logos::Logos;

/// Token with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// All token kinds in a session script.
///
/// Steps are line oriented, so newlines are tokens rather than whitespace.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum TokenKind {
    // === USB commands ===
    #[token("version")]
    Version,
    #[token("config")]
    Config,
    #[token("query")]
    Query,
    #[token("write")]
    Write,
    #[token("read")]
    Read,
    #[token("stream")]
    Stream,
    #[token("reset")]
    Reset,

    // === Save / joybus ===
    #[token("save")]
    Save,
    #[token("none")]
    None,
    #[token("eeprom4k")]
    Eeprom4k,
    #[token("eeprom16k")]
    Eeprom16k,
    #[token("eeprom-status")]
    EepromStatus,
    #[token("eeprom-write")]
    EepromWrite,
    #[token("eeprom-read")]
    EepromRead,
    #[token("rtc-status")]
    RtcStatus,
    #[token("rtc-write")]
    RtcWrite,
    #[token("rtc-read")]
    RtcRead,

    // === Debug channels ===
    #[token("debug-write")]
    DebugWrite,
    #[token("debug-tx")]
    DebugTx,
    #[token("debug-internal")]
    DebugInternal,

    // === Misc ===
    #[token("tick")]
    Tick,
    #[token("expect")]
    Expect,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| lex.slice().to_string())]
    HexLiteral(String),

    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().to_string())]
    IntLiteral(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    StringLiteral(String),

    #[token("\n")]
    Newline,

    // Special
    Eof,
}

impl TokenKind {
    /// Check if this token ends a step
    pub fn is_terminator(&self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Eof)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::HexLiteral(s) => write!(f, "hex '{}'", s),
            TokenKind::IntLiteral(s) => write!(f, "integer '{}'", s),
            TokenKind::StringLiteral(s) => write!(f, "string {}", s),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Version => write!(f, "'version'"),
            TokenKind::Config => write!(f, "'config'"),
            TokenKind::Query => write!(f, "'query'"),
            TokenKind::Write => write!(f, "'write'"),
            TokenKind::Read => write!(f, "'read'"),
            TokenKind::Stream => write!(f, "'stream'"),
            TokenKind::Reset => write!(f, "'reset'"),
            TokenKind::Save => write!(f, "'save'"),
            TokenKind::None => write!(f, "'none'"),
            TokenKind::Eeprom4k => write!(f, "'eeprom4k'"),
            TokenKind::Eeprom16k => write!(f, "'eeprom16k'"),
            TokenKind::EepromStatus => write!(f, "'eeprom-status'"),
            TokenKind::EepromWrite => write!(f, "'eeprom-write'"),
            TokenKind::EepromRead => write!(f, "'eeprom-read'"),
            TokenKind::RtcStatus => write!(f, "'rtc-status'"),
            TokenKind::RtcWrite => write!(f, "'rtc-write'"),
            TokenKind::RtcRead => write!(f, "'rtc-read'"),
            TokenKind::DebugWrite => write!(f, "'debug-write'"),
            TokenKind::DebugTx => write!(f, "'debug-tx'"),
            TokenKind::DebugInternal => write!(f, "'debug-internal'"),
            TokenKind::Tick => write!(f, "'tick'"),
            TokenKind::Expect => write!(f, "'expect'"),
        }
    }
}
