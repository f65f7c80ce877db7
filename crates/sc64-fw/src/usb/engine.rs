//! USB command state machine

use crate::hal::{Config, DiskEmulation, Dma, DmaDir, DmaId, UsbPort};

use super::debug::{Descriptor, DescriptorBusy, InternalDebugId, InternalDescriptor, Transfer};
use super::framing::{TokenReceiver, WordReceiver, WordTransmitter};
use super::{cmd, CMD_TOKEN, CMP_TOKEN, ERR_TOKEN, ESCAPE_RESET};

/// Number of argument words following a command token
const ARG_COUNT: u8 = 2;

/// Engine state. Each variant carries only what that step needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a command token or a latched debug transmit
    Idle,
    /// Receiving argument words
    Args { cmd: u8, args: [u32; 2], received: u8 },
    /// Executing the command
    Data { cmd: u8, args: [u32; 2], queried: bool },
    /// Sending the status word
    Response { cmd: u8, error: bool },
    /// Draining the debug-tx descriptor
    DebugTx,
    /// Sending the internal debug header, `step` words done
    InternalDebugTxStart { step: u8 },
    /// Draining the internal debug descriptor
    InternalDebugTxData,
    /// Sending the internal debug trailer
    InternalDebugTxEnd,
}

/// Device side of the USB command channel.
#[derive(Debug, Clone)]
pub struct UsbEngine {
    state: State,
    rx_word: WordReceiver,
    tx_word: WordTransmitter,
    rx_token: TokenReceiver,
    debug_rx: Descriptor,
    debug_tx: Descriptor,
    internal_tx: InternalDescriptor,
    /// Set by every transfer this engine starts. Cleared only once a poll
    /// sees the DMA engine idle again, whatever state the engine is in.
    dma_in_progress: bool,
}

impl Default for UsbEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbEngine {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            rx_word: WordReceiver::new(),
            tx_word: WordTransmitter::new(),
            rx_token: TokenReceiver::new(),
            debug_rx: Descriptor::new(),
            debug_tx: Descriptor::new(),
            internal_tx: InternalDescriptor::new(),
            dma_in_progress: false,
        }
    }

    /// Reset the port and return every state, descriptor and assembler to idle.
    pub fn init<P: UsbPort>(&mut self, port: &mut P) {
        port.reset();
        *self = Self::new();
    }

    pub fn state(&self) -> State {
        self.state
    }

    // ========================================================================
    // Debug channel API
    // ========================================================================

    /// Datatype and remaining length of host debug data waiting for a
    /// consumer buffer, if a `'D'` command is in progress.
    pub fn debug_rx_ready(&self) -> Option<(u32, u32)> {
        match self.state {
            State::Data { cmd: cmd::DEBUG_WRITE, args, .. } if !self.debug_rx.is_busy() => {
                Some((args[0], args[1]))
            }
            _ => None,
        }
    }

    pub fn debug_rx_busy(&self) -> bool {
        self.debug_rx.is_busy()
    }

    /// Offer a buffer for the next chunk of host debug data.
    pub fn debug_rx_data(&mut self, address: u32, length: u32) -> Result<(), DescriptorBusy> {
        self.debug_rx.latch(address, length)
    }

    pub fn debug_tx_ready(&self) -> bool {
        !self.debug_tx.is_busy()
    }

    /// Queue `length` bytes at `address` for transmission to the host.
    pub fn debug_tx_data(&mut self, address: u32, length: u32) -> Result<(), DescriptorBusy> {
        self.debug_tx.latch(address, length)
    }

    pub fn internal_debug_tx_ready(&self) -> bool {
        !self.internal_tx.is_busy()
    }

    /// Queue a framed diagnostic packet of `length` bytes at `address`.
    pub fn internal_debug_tx_data(
        &mut self,
        id: InternalDebugId,
        address: u32,
        length: u32,
    ) -> Result<(), DescriptorBusy> {
        self.internal_tx.latch(id, address, length)
    }

    /// Abandon debug traffic in both directions and flush the FIFOs.
    pub fn debug_reset<P: UsbPort>(&mut self, port: &mut P) {
        if let State::Data { cmd: cmd::DEBUG_WRITE, ref mut args, .. } = self.state {
            for _ in 0..args[1] {
                if port.read_byte().is_none() {
                    break;
                }
            }
            args[1] = 0;
        }
        if let State::DebugTx = self.state {
            self.state = State::Idle;
        }
        self.debug_rx.release();
        self.debug_tx.release();
        port.reset();
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Advance the engine by at most one step.
    pub fn poll<P, D, C, B>(&mut self, port: &mut P, dma: &mut D, cfg: &mut C, dd: &mut B)
    where
        P: UsbPort,
        D: Dma,
        C: Config,
        B: DiskEmulation,
    {
        self.handle_escape(port, dma);

        let state = self.state;
        self.state = match state {
            State::Idle => self.idle(port, dma),
            State::Args { cmd, args, received } => self.receive_args(port, cmd, args, received),
            State::Data { cmd, args, queried } => self.execute(port, dma, cfg, dd, cmd, args, queried),
            State::Response { cmd, error } => {
                let token = if error { ERR_TOKEN } else { CMP_TOKEN };
                if self.tx_word.poll(port, token | u32::from(cmd)) {
                    log::debug!("usb '{}' done, error: {error}", char::from(cmd));
                    State::Idle
                } else {
                    State::Response { cmd, error }
                }
            }
            State::DebugTx => {
                if self.drain(dma, self.debug_tx.transfer()) {
                    self.debug_tx.release();
                    State::Idle
                } else {
                    State::DebugTx
                }
            }
            State::InternalDebugTxStart { step } => {
                let header = self.internal_tx.header();
                if !self.tx_word.poll(port, header[usize::from(step)]) {
                    State::InternalDebugTxStart { step }
                } else if step + 1 >= 3 {
                    State::InternalDebugTxData
                } else {
                    State::InternalDebugTxStart { step: step + 1 }
                }
            }
            State::InternalDebugTxData => {
                if self.drain(dma, self.internal_tx.transfer()) {
                    self.internal_tx.release();
                    State::InternalDebugTxEnd
                } else {
                    State::InternalDebugTxData
                }
            }
            State::InternalDebugTxEnd => {
                // Trailer is attempted once; a full FIFO drops it.
                let _ = self.tx_word.poll(port, CMP_TOKEN | u32::from(cmd::DEBUG_END));
                State::Idle
            }
        };
    }

    fn handle_escape<P: UsbPort, D: Dma>(&mut self, port: &mut P, dma: &mut D) {
        let Some(escape) = port.escape() else {
            return;
        };
        if escape == ESCAPE_RESET {
            log::debug!("usb reset escape in {:?}", self.state);
            if self.dma_in_progress {
                dma.stop();
                while dma.busy() {}
            }
            self.init(port);
        }
        port.ack_escape();
    }

    fn idle<P: UsbPort, D: Dma>(&mut self, port: &mut P, dma: &mut D) -> State {
        // A transfer abandoned by debug_reset must finish before anything new
        if self.dma_in_progress {
            if dma.busy() {
                return State::Idle;
            }
            self.dma_in_progress = false;
        }
        if let Some(token) = self.rx_token.poll(port) {
            let cmd = (token & 0xFF) as u8;
            // The token receiver only completes on a "CMD" prefix
            if token & 0xFFFF_FF00 != CMD_TOKEN {
                return State::Response { cmd: cmd::INVALID, error: true };
            }
            log::debug!("usb command '{}'", char::from(cmd));
            State::Args { cmd, args: [0; 2], received: 0 }
        } else if self.debug_tx.is_busy() {
            State::DebugTx
        } else if self.internal_tx.is_busy() {
            State::InternalDebugTxStart { step: 0 }
        } else {
            State::Idle
        }
    }

    fn receive_args<P: UsbPort>(&mut self, port: &mut P, cmd: u8, mut args: [u32; 2], received: u8) -> State {
        let Some(word) = self.rx_word.poll(port) else {
            return State::Args { cmd, args, received };
        };
        args[usize::from(received)] = word;
        let received = received + 1;
        if received == ARG_COUNT {
            State::Data { cmd, args, queried: false }
        } else {
            State::Args { cmd, args, received }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute<P, D, C, B>(
        &mut self,
        port: &mut P,
        dma: &mut D,
        cfg: &mut C,
        dd: &mut B,
        cmd: u8,
        mut args: [u32; 2],
        mut queried: bool,
    ) -> State
    where
        P: UsbPort,
        D: Dma,
        C: Config,
        B: DiskEmulation,
    {
        let done = State::Response { cmd, error: false };

        match cmd {
            cmd::VERSION => {
                if self.tx_word.poll(port, cfg.version()) {
                    return done;
                }
            }

            cmd::CONFIG_UPDATE => {
                cfg.update(&mut args);
                return done;
            }

            cmd::CONFIG_QUERY => {
                if !queried {
                    cfg.query(&mut args);
                    queried = true;
                }
                if self.tx_word.poll(port, args[1]) {
                    return done;
                }
            }

            cmd::MEMORY_READ | cmd::MEMORY_WRITE | cmd::STREAM_WRITE => {
                if !dma.busy() {
                    if !self.dma_in_progress {
                        let dir = if cmd == cmd::MEMORY_READ { DmaDir::FromSdram } else { DmaDir::ToSdram };
                        dma.start(args[0], args[1], DmaId::Usb, dir);
                        self.dma_in_progress = true;
                    } else if cmd == cmd::STREAM_WRITE {
                        self.dma_in_progress = false;
                        dd.set_block_ready(true);
                        return State::Idle;
                    } else {
                        self.dma_in_progress = false;
                        return done;
                    }
                }
            }

            cmd::DEBUG_WRITE => {
                if !dma.busy() && self.debug_rx.is_busy() && args[1] > 0 {
                    let transfer = self.debug_rx.transfer();
                    if !self.dma_in_progress {
                        dma.start(transfer.address, transfer.length, DmaId::Usb, DmaDir::ToSdram);
                        self.dma_in_progress = true;
                    } else {
                        args[1] -= transfer.length.min(args[1]);
                        self.dma_in_progress = false;
                        self.debug_rx.release();
                    }
                }
                if args[1] == 0 {
                    return State::Idle;
                }
            }

            _ => {
                log::debug!("usb unknown command {cmd:#04X}");
                return State::Response { cmd, error: true };
            }
        }

        State::Data { cmd, args, queried }
    }

    /// One DMA-out step for a debug descriptor. Returns true once the
    /// transfer has completed.
    fn drain<D: Dma>(&mut self, dma: &mut D, transfer: Transfer) -> bool {
        if dma.busy() {
            return false;
        }
        if self.dma_in_progress {
            self.dma_in_progress = false;
            return true;
        }
        dma.start(transfer.address, transfer.length, DmaId::Usb, DmaDir::FromSdram);
        self.dma_in_progress = true;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCfg, MockDd, MockDma, MockUsb};
    use std::vec::Vec;

    struct Bench {
        usb: UsbEngine,
        port: MockUsb,
        dma: MockDma,
        cfg: MockCfg,
        dd: MockDd,
    }

    impl Bench {
        fn new() -> Self {
            let mut port = MockUsb::new();
            let mut usb = UsbEngine::new();
            usb.init(&mut port);
            Self { usb, port, dma: MockDma::new(), cfg: MockCfg::new(), dd: MockDd::default() }
        }

        fn poll(&mut self) {
            self.usb.poll(&mut self.port, &mut self.dma, &mut self.cfg, &mut self.dd);
        }

        fn poll_n(&mut self, n: usize) {
            for _ in 0..n {
                self.poll();
            }
        }

        fn command(&mut self, cmd: u8, args: [u32; 2]) {
            self.port.push(b"CMD");
            self.port.push(&[cmd]);
            self.port.push(&args[0].to_be_bytes());
            self.port.push(&args[1].to_be_bytes());
        }

        fn tx_words(&mut self) -> Vec<u32> {
            self.port
                .take_tx()
                .chunks(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
    }

    #[test]
    fn test_version_command() {
        let mut bench = Bench::new();
        bench.command(cmd::VERSION, [0, 0]);

        bench.poll_n(8);
        assert_eq!(bench.usb.state(), State::Idle);
        assert_eq!(bench.tx_words(), [MockCfg::VERSION, CMP_TOKEN | u32::from(b'V')]);
    }

    #[test]
    fn test_args_arrive_across_polls() {
        let mut bench = Bench::new();
        bench.port.push(b"CMDC");
        bench.poll();
        assert!(matches!(bench.usb.state(), State::Args { received: 0, .. }));

        bench.port.push(&[0, 0, 0]);
        bench.poll();
        bench.port.push(&[7, 0, 0, 0]);
        bench.poll();
        assert!(matches!(bench.usb.state(), State::Args { received: 1, .. }));
        bench.port.push(&[9]);
        bench.poll();
        assert_eq!(
            bench.usb.state(),
            State::Data { cmd: b'C', args: [7, 9], queried: false }
        );

        bench.poll_n(4);
        assert_eq!(bench.cfg.updates, [[7, 9]]);
        assert_eq!(bench.tx_words(), [CMP_TOKEN | u32::from(b'C')]);
    }

    #[test]
    fn test_config_query_runs_once() {
        let mut bench = Bench::new();
        bench.command(cmd::CONFIG_QUERY, [3, 0]);
        bench.poll_n(3);

        // Only two bytes of space for the answer word
        bench.port.set_tx_space(2);
        bench.poll_n(3);
        bench.port.set_tx_space(64);
        bench.poll_n(4);

        assert_eq!(bench.cfg.queries, 1);
        assert_eq!(bench.tx_words(), [MockCfg::query_result(3), CMP_TOKEN | u32::from(b'Q')]);
    }

    #[test]
    fn test_unknown_command_reports_error() {
        let mut bench = Bench::new();
        bench.command(b'X', [0, 0]);
        bench.poll_n(6);

        assert_eq!(bench.tx_words(), [ERR_TOKEN | u32::from(b'X')]);
        assert_eq!(bench.usb.state(), State::Idle);
    }

    #[test]
    fn test_memory_read_response_after_dma() {
        let mut bench = Bench::new();
        bench.command(cmd::MEMORY_READ, [0x1000, 16]);
        bench.poll_n(4);

        assert_eq!(bench.dma.started, [(0x1000, 16, DmaDir::FromSdram)]);
        bench.dma.busy = true;
        bench.poll_n(3);
        assert!(bench.port.take_tx().is_empty());

        bench.dma.busy = false;
        bench.poll_n(2);
        assert_eq!(bench.tx_words(), [CMP_TOKEN | u32::from(b'R')]);
        assert_eq!(bench.dma.started.len(), 1);
    }

    #[test]
    fn test_stream_write_signals_block_without_response() {
        let mut bench = Bench::new();
        bench.command(cmd::STREAM_WRITE, [0x2000, 512]);
        bench.poll_n(6);

        assert_eq!(bench.dma.started, [(0x2000, 512, DmaDir::ToSdram)]);
        assert!(bench.dd.block_ready);
        assert_eq!(bench.usb.state(), State::Idle);
        assert!(bench.port.take_tx().is_empty());
    }

    #[test]
    fn test_debug_write_drains_in_chunks() {
        let mut bench = Bench::new();
        bench.command(cmd::DEBUG_WRITE, [0x55, 10]);
        bench.poll_n(3);
        assert_eq!(bench.usb.debug_rx_ready(), Some((0x55, 10)));

        // Nothing moves until a consumer offers a buffer
        bench.poll_n(3);
        assert!(bench.dma.started.is_empty());

        bench.usb.debug_rx_data(0x8000, 8).unwrap();
        assert_eq!(bench.usb.debug_rx_ready(), None);
        bench.poll_n(2);
        assert!(!bench.usb.debug_rx_busy());
        assert_eq!(bench.usb.debug_rx_ready(), Some((0x55, 2)));

        bench.usb.debug_rx_data(0x9000, 8).unwrap();
        bench.poll_n(2);
        assert_eq!(bench.usb.state(), State::Idle);
        assert_eq!(
            bench.dma.started,
            [(0x8000, 8, DmaDir::ToSdram), (0x9000, 8, DmaDir::ToSdram)]
        );
        assert!(bench.port.take_tx().is_empty());
    }

    #[test]
    fn test_debug_tx_from_idle() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        assert!(!bench.usb.debug_tx_ready());

        bench.poll();
        assert_eq!(bench.usb.state(), State::DebugTx);
        bench.poll_n(2);
        assert_eq!(bench.dma.started, [(0x4000, 64, DmaDir::FromSdram)]);
        assert_eq!(bench.usb.state(), State::Idle);
        assert!(bench.usb.debug_tx_ready());
    }

    #[test]
    fn test_busy_debug_tx_keeps_first_request() {
        let mut bench = Bench::new();
        assert_eq!(bench.usb.debug_tx_data(0x4000, 64), Ok(()));
        assert_eq!(bench.usb.debug_tx_data(0x5000, 32), Err(DescriptorBusy));

        bench.poll_n(3);
        assert_eq!(bench.dma.started, [(0x4000, 64, DmaDir::FromSdram)]);
    }

    #[test]
    fn test_command_token_wins_over_pending_debug_tx() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        bench.command(cmd::VERSION, [0, 0]);

        bench.poll();
        assert!(matches!(bench.usb.state(), State::Args { cmd: b'V', .. }));
        bench.poll_n(4);
        assert_eq!(bench.usb.state(), State::Idle);
        bench.poll_n(3);
        assert_eq!(bench.dma.started, [(0x4000, 64, DmaDir::FromSdram)]);
    }

    #[test]
    fn test_internal_debug_packet() {
        let mut bench = Bench::new();
        bench.usb.internal_debug_tx_data(InternalDebugId(2), 0x3002, 3).unwrap();

        bench.poll_n(4);
        assert_eq!(bench.usb.state(), State::InternalDebugTxData);
        bench.poll_n(2);
        assert_eq!(bench.dma.started, [(0x3000, 8, DmaDir::FromSdram)]);
        assert_eq!(bench.usb.state(), State::InternalDebugTxEnd);
        assert!(bench.usb.internal_debug_tx_ready());
        bench.poll();

        assert_eq!(bench.usb.state(), State::Idle);
        assert_eq!(
            bench.tx_words(),
            [0x444D_4140, 0xFE00_000C, 0x0202_0003, CMP_TOKEN | u32::from(b'H')]
        );
    }

    #[test]
    fn test_internal_debug_trailer_dropped_on_full_fifo() {
        let mut bench = Bench::new();
        bench.usb.internal_debug_tx_data(InternalDebugId(1), 0x3000, 4).unwrap();
        bench.poll_n(6);
        assert_eq!(bench.usb.state(), State::InternalDebugTxEnd);

        bench.port.set_tx_space(0);
        bench.poll();
        assert_eq!(bench.usb.state(), State::Idle);
        assert_eq!(bench.tx_words().len(), 3);
    }

    #[test]
    fn test_reset_escape_aborts_dma() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        bench.command(cmd::MEMORY_WRITE, [0x1000, 4096]);
        bench.poll_n(4);
        bench.dma.busy = true;

        bench.port.escape = Some(ESCAPE_RESET);
        bench.poll();
        assert_eq!(bench.dma.stops, 1);
        assert_eq!(bench.usb.state(), State::Idle);
        assert!(bench.usb.debug_tx_ready());
        assert!(bench.port.escape.is_none());
    }

    #[test]
    fn test_reset_escape_while_idle_matches_init() {
        let mut bench = Bench::new();
        bench.port.push(b"CM");
        bench.usb.debug_rx_data(0x100, 4).unwrap();
        bench.poll();
        assert_eq!(bench.usb.rx_token.pending(), 2);

        bench.port.escape = Some(ESCAPE_RESET);
        bench.poll();
        assert_eq!(bench.dma.stops, 0);
        assert_eq!(bench.usb.state(), State::Idle);
        assert!(!bench.usb.debug_rx_busy());
        assert!(bench.usb.debug_tx_ready());
        assert!(bench.usb.internal_debug_tx_ready());

        let fresh = UsbEngine::new();
        assert_eq!(bench.usb.rx_token, fresh.rx_token);
        assert_eq!(bench.usb.tx_word, fresh.tx_word);
        assert_eq!(bench.usb.debug_rx, fresh.debug_rx);
    }

    #[test]
    fn test_other_escape_only_acknowledged() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        bench.port.escape = Some(b'X');
        bench.poll();

        assert!(bench.port.escape.is_none());
        assert!(!bench.usb.debug_tx_ready());
    }

    #[test]
    fn test_reset_escape_after_debug_reset_stops_debug_tx_dma() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        bench.poll_n(2);
        assert_eq!(bench.dma.started, [(0x4000, 64, DmaDir::FromSdram)]);
        bench.dma.busy = true;

        bench.usb.debug_reset(&mut bench.port);
        assert_eq!(bench.usb.state(), State::Idle);

        bench.port.escape = Some(ESCAPE_RESET);
        bench.poll();
        assert_eq!(bench.dma.stops, 1);
        assert!(!bench.dma.busy);
    }

    #[test]
    fn test_reset_escape_after_debug_reset_stops_debug_rx_dma() {
        let mut bench = Bench::new();
        bench.command(cmd::DEBUG_WRITE, [0x55, 8]);
        bench.poll_n(3);
        bench.usb.debug_rx_data(0x8000, 8).unwrap();
        bench.poll();
        assert_eq!(bench.dma.started, [(0x8000, 8, DmaDir::ToSdram)]);
        bench.dma.busy = true;

        bench.usb.debug_reset(&mut bench.port);
        bench.poll();
        assert_eq!(bench.usb.state(), State::Idle);

        bench.port.escape = Some(ESCAPE_RESET);
        bench.poll();
        assert_eq!(bench.dma.stops, 1);
    }

    #[test]
    fn test_idle_waits_for_abandoned_dma() {
        let mut bench = Bench::new();
        bench.usb.debug_tx_data(0x4000, 64).unwrap();
        bench.poll_n(2);
        bench.dma.busy = true;
        bench.usb.debug_reset(&mut bench.port);

        bench.command(cmd::MEMORY_READ, [0x1000, 4]);
        bench.poll_n(4);
        assert_eq!(bench.usb.state(), State::Idle);
        assert_eq!(bench.port.rx_len(), 12);

        bench.dma.busy = false;
        bench.poll_n(4);
        assert_eq!(
            bench.dma.started,
            [(0x4000, 64, DmaDir::FromSdram), (0x1000, 4, DmaDir::FromSdram)]
        );
    }

    #[test]
    fn test_debug_reset_discards_pending_rx() {
        let mut bench = Bench::new();
        bench.command(cmd::DEBUG_WRITE, [0x55, 6]);
        bench.port.push(&[1, 2, 3, 4, 5, 6]);
        bench.poll_n(3);

        bench.usb.debug_reset(&mut bench.port);
        assert_eq!(bench.port.rx_len(), 0);
        assert_eq!(bench.port.resets, 2);
        assert_eq!(bench.usb.debug_rx_ready(), Some((0x55, 0)));
        bench.poll();
        assert_eq!(bench.usb.state(), State::Idle);
    }
}
