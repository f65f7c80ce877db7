//! Joybus request/response engine

use crate::hal::{Config, JoybusPort, Rtc, Sdram};

use super::frame::{Request, Response};
use super::rtc::{decode_time, encode_time};
use super::{
    cmd, EEPROM_ID_16K, EEPROM_ID_4K, EEPROM_PAGE_SIZE, RTC_ID, RTC_STATUS_RUNNING, RTC_STATUS_STOPPED,
    RTC_ST_MASK, RTC_WP_MASK,
};

/// RTC block holding write-protect and stop bits
const RTC_BLOCK_CONTROL: u8 = 0;
/// RTC block holding the date and time
const RTC_BLOCK_TIME: u8 = 2;

/// Emulated EEPROM variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EepromType {
    /// No EEPROM present, EEPROM commands are ignored
    #[default]
    None,
    /// 4 Kbit (64 pages)
    Eeprom4k,
    /// 16 Kbit (256 pages)
    Eeprom16k,
}

/// Device side of the joybus channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoybusEngine {
    eeprom: EepromType,
    rtc_running: bool,
    rtc_write_protect: u8,
}

impl Default for JoybusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JoybusEngine {
    pub const fn new() -> Self {
        Self {
            eeprom: EepromType::None,
            rtc_running: true,
            rtc_write_protect: RTC_WP_MASK,
        }
    }

    /// Reset the port, remove the EEPROM and restart the clock write-protected.
    pub fn init<P: JoybusPort>(&mut self, port: &mut P) {
        port.reset();
        *self = Self::new();
    }

    pub fn set_eeprom(&mut self, eeprom: EepromType) {
        self.eeprom = eeprom;
    }

    pub fn eeprom(&self) -> EepromType {
        self.eeprom
    }

    pub fn rtc_running(&self) -> bool {
        self.rtc_running
    }

    pub fn rtc_write_protect(&self) -> u8 {
        self.rtc_write_protect
    }

    /// Answer a pending request, if one has been fully received.
    pub fn poll<P, S, C, R>(&mut self, port: &mut P, sdram: &mut S, cfg: &C, rtc: &mut R)
    where
        P: JoybusPort,
        S: Sdram,
        C: Config,
        R: Rtc,
    {
        if !port.rx_ready() {
            return;
        }

        if port.rx_stop_bit() {
            let request = Request::receive(port);
            let mut response = Response::new();

            let length = self
                .eeprom_command(&request, &mut response, sdram, cfg)
                .or_else(|| self.rtc_command(&request, &mut response, rtc));

            match length {
                Some(length) => response.transmit(port, length),
                None => log::debug!("joybus ignored command {:#04X}", request.command()),
            }
        }

        port.reset_rx();
    }

    fn rtc_status(&self) -> u8 {
        if self.rtc_running { RTC_STATUS_RUNNING } else { RTC_STATUS_STOPPED }
    }

    /// Handle EEPROM commands. Returns the response length if one matched.
    fn eeprom_command<S: Sdram, C: Config>(
        &self,
        request: &Request,
        response: &mut Response,
        sdram: &mut S,
        cfg: &C,
    ) -> Option<usize> {
        let id = match self.eeprom {
            EepromType::None => return None,
            EepromType::Eeprom4k => EEPROM_ID_4K,
            EepromType::Eeprom16k => EEPROM_ID_16K,
        };
        let address = cfg
            .save_offset()
            .wrapping_add(u32::from(request.byte(1)) * EEPROM_PAGE_SIZE);

        match request.command() {
            cmd::EEPROM_STATUS => {
                response.set(1, id);
                Some(3)
            }
            cmd::EEPROM_READ => {
                log::debug!("joybus eeprom read page {}", request.byte(1));
                response.set_word(0, sdram.read_word(address));
                response.set_word(4, sdram.read_word(address.wrapping_add(4)));
                Some(8)
            }
            cmd::EEPROM_WRITE => {
                log::debug!("joybus eeprom write page {}", request.byte(1));
                sdram.write_word(address, request.word(2));
                sdram.write_word(address.wrapping_add(4), request.word(6));
                Some(1)
            }
            _ => None,
        }
    }

    /// Handle RTC commands. Returns the response length if one matched.
    fn rtc_command<R: Rtc>(&mut self, request: &Request, response: &mut Response, rtc: &mut R) -> Option<usize> {
        match request.command() {
            cmd::RTC_STATUS => {
                response.set(1, RTC_ID);
                response.set(2, self.rtc_status());
                Some(3)
            }
            cmd::RTC_READ => {
                match request.byte(1) {
                    RTC_BLOCK_CONTROL => {
                        response.set(0, self.rtc_write_protect);
                        if !self.rtc_running {
                            response.set(1, RTC_ST_MASK);
                        }
                    }
                    RTC_BLOCK_TIME => encode_time(&rtc.time(), response),
                    _ => {}
                }
                response.set(8, self.rtc_status());
                Some(9)
            }
            cmd::RTC_WRITE => {
                match request.byte(1) {
                    RTC_BLOCK_CONTROL => {
                        self.rtc_write_protect = request.byte(2) & RTC_WP_MASK;
                        self.rtc_running = request.byte(3) & RTC_ST_MASK == 0;
                        log::debug!(
                            "joybus rtc write-protect {:#04X}, running: {}",
                            self.rtc_write_protect,
                            self.rtc_running
                        );
                    }
                    RTC_BLOCK_TIME => {
                        let time = decode_time(request);
                        log::debug!("joybus rtc set {time:?}");
                        rtc.set_time(&time);
                    }
                    _ => {}
                }
                response.set(0, self.rtc_status());
                Some(1)
            }
            _ => None,
        }
    }
}
