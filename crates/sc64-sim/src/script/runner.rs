//! Step execution against a simulated board

use super::ast::{Expected, SaveKind, Script, Step, StepKind};
use crate::board::{id, save_type};
use crate::common::{SimError, SimResult, Span};
use crate::link::{Command, Link, Response};
use sc64_fw::joybus::cmd as joybus_cmd;
use sc64_fw::usb::{cmd, InternalDebugId};

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub ticks: u64,
}

/// Executes script steps through a [`Link`], checking `expect` clauses.
pub struct Runner<'l, 'b> {
    link: &'l mut Link<'b>,
}

impl<'l, 'b> Runner<'l, 'b> {
    pub fn new(link: &'l mut Link<'b>) -> Self {
        Self { link }
    }

    pub fn run(&mut self, script: &Script) -> SimResult<RunSummary> {
        for step in &script.steps {
            self.step(step)?;
        }
        Ok(RunSummary {
            steps: script.steps.len(),
            ticks: self.link.board().ticks(),
        })
    }

    pub fn step(&mut self, step: &Step) -> SimResult<()> {
        let span = step.span;
        log::debug!("step '{}' at {}..{}", step.kind.name(), span.start, span.end);

        match &step.kind {
            StepKind::Version { expect } => {
                let response = self.command(Command::new(cmd::VERSION, [0, 0]), 4, span)?;
                let version = first_word(&response);
                log::info!("version: {:#010X}", version);
                check_word(expect, version)?;
            }

            StepKind::Config { id, value } => {
                self.command(Command::new(cmd::CONFIG_UPDATE, [*id, *value]), 0, span)?;
                log::info!("config {} = {:#X}", id, value);
            }

            StepKind::Query { id, expect } => {
                let response = self.command(Command::new(cmd::CONFIG_QUERY, [*id, 0]), 4, span)?;
                let value = first_word(&response);
                log::info!("config {} is {:#X}", id, value);
                check_word(expect, value)?;
            }

            StepKind::Write { address, data } => {
                let command = Command::with_data(cmd::MEMORY_WRITE, [*address, data.len() as u32], data.clone());
                self.command(command, 0, span)?;
                log::info!("wrote {} bytes at {:#010X}", data.len(), address);
            }

            StepKind::Read { address, length, expect } => {
                let command = Command::new(cmd::MEMORY_READ, [*address, *length]);
                let response = self.command(command, *length as usize, span)?;
                log::info!("read {:#010X}: {:02X?}", address, response.data);
                check_bytes(expect, &response.data)?;
            }

            StepKind::Stream { address, data } => {
                let command = Command::with_data(cmd::STREAM_WRITE, [*address, data.len() as u32], data.clone());
                self.link.execute_no_response(&command).map_err(|e| SimError::link(e, span))?;
                log::info!(
                    "streamed {} bytes at {:#010X}, block ready: {}",
                    data.len(),
                    address,
                    self.link.board().dd.block_ready
                );
            }

            StepKind::Save(kind) => {
                let value = match kind {
                    SaveKind::None => save_type::NONE,
                    SaveKind::Eeprom4k => save_type::EEPROM_4K,
                    SaveKind::Eeprom16k => save_type::EEPROM_16K,
                };
                self.command(Command::new(cmd::CONFIG_UPDATE, [id::SAVE_TYPE, value]), 0, span)?;
                log::info!("save type {:?}", kind);
            }

            StepKind::EepromStatus { expect } => {
                let reply = self.joybus(&[joybus_cmd::EEPROM_STATUS]);
                check_reply(expect, reply.as_deref())?;
            }

            StepKind::EepromWrite { page, data } => {
                let mut request = vec![joybus_cmd::EEPROM_WRITE, *page];
                request.extend(data);
                self.joybus(&request);
            }

            StepKind::EepromRead { page, expect } => {
                let reply = self.joybus(&[joybus_cmd::EEPROM_READ, *page]);
                check_reply(expect, reply.as_deref())?;
            }

            StepKind::RtcStatus { expect } => {
                let reply = self.joybus(&[joybus_cmd::RTC_STATUS]);
                check_reply(expect, reply.as_deref())?;
            }

            StepKind::RtcWrite { block, data } => {
                let mut request = vec![joybus_cmd::RTC_WRITE, *block];
                request.extend(data);
                self.joybus(&request);
            }

            StepKind::RtcRead { block, expect } => {
                let reply = self.joybus(&[joybus_cmd::RTC_READ, *block]);
                check_reply(expect, reply.as_deref())?;
            }

            StepKind::DebugWrite { datatype, data } => {
                let command = Command::with_data(cmd::DEBUG_WRITE, [*datatype, data.len() as u32], data.clone());
                self.link.execute_no_response(&command).map_err(|e| SimError::link(e, span))?;

                let received = self.link.board().debug_sink.take();
                log::info!("debug consumer got {} bytes of type {:#X}", received.len(), datatype);
                if received != *data {
                    return Err(SimError::device(
                        format!("debug consumer received {:02X?}, sent {:02X?}", received, data),
                        span,
                    ));
                }
            }

            StepKind::DebugTx { address, data } => {
                self.link
                    .board()
                    .debug_tx(*address, data)
                    .map_err(|e| SimError::device(e.to_string(), span))?;
                let received = self.link.receive_raw(data.len()).map_err(|e| SimError::link(e, span))?;
                log::info!("debug tx: {:02X?}", received);
                if received != *data {
                    return Err(SimError::expectation(
                        format!("host received {:02X?}, queued {:02X?}", received, data),
                        span,
                    ));
                }
            }

            StepKind::DebugInternal { id, address, data } => {
                self.link
                    .board()
                    .internal_debug_tx(InternalDebugId(*id), *address, data)
                    .map_err(|e| SimError::device(e.to_string(), span))?;
                let packet = self.link.receive_packet().map_err(|e| SimError::link(e, span))?;
                log::info!(
                    "debug packet id {:#04X}, alignment {}, {} bytes",
                    packet.id,
                    packet.start_alignment,
                    packet.length
                );
                if packet.id != *id || packet.payload != *data {
                    return Err(SimError::expectation(
                        format!("packet {:#04X} {:02X?}, queued {:#04X} {:02X?}", packet.id, packet.payload, id, data),
                        span,
                    ));
                }
            }

            StepKind::Reset => {
                self.link.reset().map_err(|e| SimError::link(e, span))?;
                log::info!("reset");
            }

            StepKind::Tick(count) => {
                self.link.board().run(*count);
            }
        }

        Ok(())
    }

    /// Execute a USB command and fail on an error token.
    fn command(&mut self, command: Command, data_length: usize, span: Span) -> SimResult<Response> {
        let id = command.id;
        let response = self
            .link
            .execute(&command, data_length)
            .map_err(|e| SimError::link(e, span))?;
        if response.error {
            return Err(SimError::device(format!("command '{}' answered ERR", char::from(id)), span));
        }
        Ok(response)
    }

    fn joybus(&mut self, request: &[u8]) -> Option<Vec<u8>> {
        let reply = self.link.board().joybus_request(request);
        match &reply {
            Some(bytes) => log::info!("joybus {:02X?} -> {:02X?}", request, bytes),
            None => log::info!("joybus {:02X?} -> no reply", request),
        }
        reply
    }
}

fn first_word(response: &Response) -> u32 {
    response.words().first().copied().unwrap_or(0)
}

fn check_word(expect: &Option<Expected<u32>>, actual: u32) -> SimResult<()> {
    match expect {
        Some(expected) if expected.value != actual => Err(SimError::expectation(
            format!("expected {:#X}, got {:#X}", expected.value, actual),
            expected.span,
        )),
        _ => Ok(()),
    }
}

fn check_bytes(expect: &Option<Expected<Vec<u8>>>, actual: &[u8]) -> SimResult<()> {
    match expect {
        Some(expected) if expected.value != actual => Err(SimError::expectation(
            format!("expected {:02X?}, got {:02X?}", expected.value, actual),
            expected.span,
        )),
        _ => Ok(()),
    }
}

fn check_reply(expect: &Option<Expected<Vec<u8>>>, reply: Option<&[u8]>) -> SimResult<()> {
    match (expect, reply) {
        (Some(expected), None) => Err(SimError::expectation(
            format!("expected {:02X?}, device did not reply", expected.value),
            expected.span,
        )),
        (_, Some(bytes)) => check_bytes(expect, bytes),
        (None, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::script::Parser;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> SimResult<(RunSummary, Board)> {
        let script = Parser::new(source)?.parse()?;
        let mut board = Board::default();
        let summary = {
            let mut link = Link::new(&mut board);
            Runner::new(&mut link).run(&script)?
        };
        Ok((summary, board))
    }

    #[test]
    fn test_memory_session() {
        let (summary, board) = run("write 0x100 \"SC64\"\nread 0x100 4 expect \"SC64\"\nquery 99 expect 0\n").unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(board.sdram.read(0x100, 4), b"SC64".to_vec());
    }

    #[test]
    fn test_eeprom_session() {
        let source = "\
save eeprom4k
eeprom-status expect 0x00 0x80 0x00
eeprom-write 2 1 2 3 4 5 6 7 8
eeprom-read 2 expect 1 2 3 4 5 6 7 8
";
        run(source).unwrap();
    }

    #[test]
    fn test_eeprom_absent_has_no_reply() {
        let err = run("eeprom-status expect 0 0x80 0").unwrap_err();
        assert!(matches!(err, SimError::Expectation { .. }));
        assert_eq!(err.span(), Span::new(14, 29));
    }

    #[test]
    fn test_rtc_session() {
        let source = "\
rtc-status expect 0x00 0x10 0x00
rtc-write 0 0x00 0x04
rtc-status expect 0x00 0x10 0x80
rtc-write 2 0x30 0x15 0x12 0x24 0x03 0x12 0x25
rtc-read 2 expect 0x30 0x15 0x92 0x24 0x03 0x12 0x25 0x01 0x80
";
        run(source).unwrap();
    }

    #[test]
    fn test_read_mismatch_points_at_expect() {
        let err = run("read 0 2 expect 1 2").unwrap_err();
        assert!(matches!(err, SimError::Expectation { .. }));
        assert_eq!(err.span(), Span::new(9, 19));
    }

    #[test]
    fn test_debug_channels() {
        let source = "\
debug-write 0x01 \"console\"
debug-tx 0x2000 \"log line\"
debug-internal 0x21 0x3003 \"dump\"
";
        let (summary, _) = run(source).unwrap();
        assert_eq!(summary.steps, 3);
    }

    #[test]
    fn test_stream_and_reset() {
        let (_, board) = run("stream 0x400 1 2 3 4\nreset\nversion\n").unwrap();
        assert!(board.dd.block_ready);
        assert_eq!(board.sdram.read(0x400, 4), vec![1, 2, 3, 4]);
    }
}
