//! Recursive descent parser for session scripts

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::common::{SimError, SimResult, Span};

/// EEPROM page size accepted by `eeprom-write`
const EEPROM_PAGE_BYTES: usize = 8;
/// Largest RTC block payload
const RTC_BLOCK_BYTES: usize = 8;

/// Recursive descent parser for session scripts
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Span,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source
    pub fn new(source: &'a str) -> SimResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, previous: Span::default() })
    }

    /// Parse a complete script
    pub fn parse(&mut self) -> SimResult<Script> {
        let mut steps = Vec::new();

        loop {
            while self.match_token(&TokenKind::Newline)? {}
            if self.at_end() {
                break;
            }
            steps.push(self.parse_step()?);
            if !self.current.kind.is_terminator() {
                return Err(SimError::parser(
                    format!("expected end of line, found {}", self.current.kind),
                    self.current.span,
                ));
            }
        }

        Ok(Script::new(steps))
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> SimResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        self.previous = prev.span;
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> SimResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn parse_step(&mut self) -> SimResult<Step> {
        let start = self.current.span;
        let keyword = self.advance()?;

        let kind = match keyword.kind {
            TokenKind::Version => StepKind::Version { expect: self.parse_expect_word()? },
            TokenKind::Config => StepKind::Config {
                id: self.parse_u32("config id")?,
                value: self.parse_u32("config value")?,
            },
            TokenKind::Query => StepKind::Query {
                id: self.parse_u32("config id")?,
                expect: self.parse_expect_word()?,
            },
            TokenKind::Write => StepKind::Write {
                address: self.parse_u32("address")?,
                data: self.parse_data("write data")?,
            },
            TokenKind::Read => StepKind::Read {
                address: self.parse_u32("address")?,
                length: self.parse_u32("length")?,
                expect: self.parse_expect_data()?,
            },
            TokenKind::Stream => StepKind::Stream {
                address: self.parse_u32("address")?,
                data: self.parse_data("stream data")?,
            },
            TokenKind::Save => StepKind::Save(self.parse_save_kind()?),
            TokenKind::EepromStatus => StepKind::EepromStatus { expect: self.parse_expect_data()? },
            TokenKind::EepromWrite => {
                let page = self.parse_u8("page")?;
                let data_span = self.current.span;
                let data = self.parse_data("page data")?;
                if data.len() != EEPROM_PAGE_BYTES {
                    return Err(SimError::parser(
                        format!("an EEPROM page is {EEPROM_PAGE_BYTES} bytes, found {}", data.len()),
                        data_span.merge(self.previous),
                    ));
                }
                StepKind::EepromWrite { page, data }
            }
            TokenKind::EepromRead => StepKind::EepromRead {
                page: self.parse_u8("page")?,
                expect: self.parse_expect_data()?,
            },
            TokenKind::RtcStatus => StepKind::RtcStatus { expect: self.parse_expect_data()? },
            TokenKind::RtcWrite => {
                let block = self.parse_u8("block")?;
                let data_span = self.current.span;
                let data = self.parse_data("block data")?;
                if data.len() > RTC_BLOCK_BYTES {
                    return Err(SimError::parser(
                        format!("an RTC block is at most {RTC_BLOCK_BYTES} bytes, found {}", data.len()),
                        data_span.merge(self.previous),
                    ));
                }
                StepKind::RtcWrite { block, data }
            }
            TokenKind::RtcRead => StepKind::RtcRead {
                block: self.parse_u8("block")?,
                expect: self.parse_expect_data()?,
            },
            TokenKind::DebugWrite => StepKind::DebugWrite {
                datatype: self.parse_u32("datatype")?,
                data: self.parse_data("debug data")?,
            },
            TokenKind::DebugTx => StepKind::DebugTx {
                address: self.parse_u32("address")?,
                data: self.parse_data("debug data")?,
            },
            TokenKind::DebugInternal => {
                let id = self.parse_u8("stream id")?;
                let address = self.parse_u32("address")?;
                let data_span = self.current.span;
                let data = self.parse_data("debug data")?;
                if data.len() > usize::from(u16::MAX) {
                    return Err(SimError::parser(
                        "internal debug packets carry at most 65535 bytes",
                        data_span.merge(self.previous),
                    ));
                }
                StepKind::DebugInternal { id, address, data }
            }
            TokenKind::Reset => StepKind::Reset,
            TokenKind::Tick => StepKind::Tick(self.parse_int("tick count")?.0),
            other => {
                return Err(SimError::parser(format!("expected a step, found {}", other), keyword.span));
            }
        };

        Ok(Step::new(kind, start.merge(self.previous)))
    }

    fn parse_save_kind(&mut self) -> SimResult<SaveKind> {
        let kind = match self.current.kind {
            TokenKind::None => SaveKind::None,
            TokenKind::Eeprom4k => SaveKind::Eeprom4k,
            TokenKind::Eeprom16k => SaveKind::Eeprom16k,
            ref other => {
                return Err(SimError::parser(
                    format!("expected 'none', 'eeprom4k' or 'eeprom16k', found {}", other),
                    self.current.span,
                ));
            }
        };
        self.advance()?;
        Ok(kind)
    }

    // =========================================================================
    // Operands
    // =========================================================================

    fn parse_int(&mut self, what: &str) -> SimResult<(u64, Span)> {
        let (digits, radix) = match &self.current.kind {
            TokenKind::HexLiteral(s) => (s[2..].replace('_', ""), 16),
            TokenKind::IntLiteral(s) => (s.replace('_', ""), 10),
            other => {
                return Err(SimError::parser(
                    format!("expected {}, found {}", what, other),
                    self.current.span,
                ));
            }
        };
        let span = self.current.span;
        let value = u64::from_str_radix(&digits, radix)
            .map_err(|_| SimError::parser(format!("{} out of range", what), span))?;
        self.advance()?;
        Ok((value, span))
    }

    fn parse_u32(&mut self, what: &str) -> SimResult<u32> {
        let (value, span) = self.parse_int(what)?;
        u32::try_from(value).map_err(|_| SimError::parser(format!("{} does not fit in 32 bits", what), span))
    }

    fn parse_u8(&mut self, what: &str) -> SimResult<u8> {
        let (value, span) = self.parse_int(what)?;
        u8::try_from(value).map_err(|_| SimError::parser(format!("{} does not fit in a byte", what), span))
    }

    /// A string literal, or a run of byte values up to the end of the step
    /// or an `expect` clause.
    fn parse_data(&mut self, what: &str) -> SimResult<Vec<u8>> {
        if let TokenKind::StringLiteral(literal) = &self.current.kind {
            let bytes = unescape(literal, self.current.span)?;
            self.advance()?;
            return Ok(bytes);
        }

        let mut bytes = Vec::new();
        while !self.current.kind.is_terminator() && !self.check(&TokenKind::Expect) {
            bytes.push(self.parse_u8("byte value")?);
        }
        if bytes.is_empty() {
            return Err(SimError::parser(
                format!("expected {}, found {}", what, self.current.kind),
                self.current.span,
            ));
        }
        Ok(bytes)
    }

    fn parse_expect_data(&mut self) -> SimResult<Option<Expected<Vec<u8>>>> {
        let start = self.current.span;
        if !self.match_token(&TokenKind::Expect)? {
            return Ok(None);
        }
        let value = self.parse_data("expected data")?;
        Ok(Some(Expected { value, span: start.merge(self.previous) }))
    }

    fn parse_expect_word(&mut self) -> SimResult<Option<Expected<u32>>> {
        let start = self.current.span;
        if !self.match_token(&TokenKind::Expect)? {
            return Ok(None);
        }
        let value = self.parse_u32("expected value")?;
        Ok(Some(Expected { value, span: start.merge(self.previous) }))
    }
}

/// Decode a quoted string literal into bytes.
fn unescape(literal: &str, span: Span) -> SimResult<Vec<u8>> {
    let body = &literal[1..literal.len() - 1];
    let mut bytes = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            bytes.extend(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let byte = match chars.next() {
            Some('n') => b'\n',
            Some('r') => b'\r',
            Some('t') => b'\t',
            Some('0') => 0,
            Some('\\') => b'\\',
            Some('"') => b'"',
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                u8::from_str_radix(&hex, 16)
                    .map_err(|_| SimError::lexer(format!("invalid escape '\\x{}'", hex), span))?
            }
            other => {
                return Err(SimError::lexer(
                    format!("invalid escape '\\{}'", other.map(String::from).unwrap_or_default()),
                    span,
                ));
            }
        };
        bytes.push(byte);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SimResult<Script> {
        Parser::new(source)?.parse()
    }

    fn kinds(source: &str) -> Vec<StepKind> {
        parse(source).unwrap().steps.into_iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_usb_steps() {
        let source = "version\nconfig 6 1\nquery 0x06 expect 1\nwrite 0x1000 \"ab\"\nread 0x1000 2 expect 0x61 0x62\n";
        let steps = kinds(source);

        assert_eq!(steps[0], StepKind::Version { expect: None });
        assert_eq!(steps[1], StepKind::Config { id: 6, value: 1 });
        assert!(matches!(
            &steps[2],
            StepKind::Query { id: 6, expect: Some(Expected { value: 1, .. }) }
        ));
        assert_eq!(steps[3], StepKind::Write { address: 0x1000, data: b"ab".to_vec() });
        assert!(matches!(
            &steps[4],
            StepKind::Read { address: 0x1000, length: 2, expect: Some(e) } if e.value == vec![0x61, 0x62]
        ));
    }

    #[test]
    fn test_joybus_steps() {
        let source = "save eeprom4k\neeprom-write 3 1 2 3 4 5 6 7 8\neeprom-read 3\nrtc-write 0 0x00 0x00\nrtc-read 2\n";
        let steps = kinds(source);

        assert_eq!(steps[0], StepKind::Save(SaveKind::Eeprom4k));
        assert_eq!(steps[1], StepKind::EepromWrite { page: 3, data: vec![1, 2, 3, 4, 5, 6, 7, 8] });
        assert_eq!(steps[2], StepKind::EepromRead { page: 3, expect: None });
        assert_eq!(steps[3], StepKind::RtcWrite { block: 0, data: vec![0, 0] });
        assert_eq!(steps[4], StepKind::RtcRead { block: 2, expect: None });
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let steps = kinds("# header\n\n  reset  # again\ntick 1_000");
        assert_eq!(steps, vec![StepKind::Reset, StepKind::Tick(1000)]);
    }

    #[test]
    fn test_string_escapes() {
        let steps = kinds(r#"debug-tx 0 "a\tb\x41\"""#);
        assert_eq!(steps[0], StepKind::DebugTx { address: 0, data: b"a\tbA\"".to_vec() });
    }

    #[test]
    fn test_step_span_covers_line() {
        let script = parse("reset\nconfig 1 2\n").unwrap();
        assert_eq!(script.steps[1].span, Span::new(6, 16));
    }

    #[test]
    fn test_short_eeprom_page() {
        let err = parse("eeprom-write 0 1 2 3").unwrap_err();
        assert!(matches!(err, SimError::Parser { .. }));
        assert_eq!(err.span(), Span::new(15, 20));
    }

    #[test]
    fn test_byte_out_of_range() {
        let err = parse("write 0 0x100").unwrap_err();
        assert_eq!(err.span(), Span::new(8, 13));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse("reset 5").unwrap_err();
        assert!(matches!(err, SimError::Parser { .. }));
    }

    #[test]
    fn test_unknown_step() {
        let err = parse("flash 0").unwrap_err();
        assert_eq!(err.span(), Span::new(0, 5));
    }
}
