//! RTC time block wire layout
//!
//! ```text
//! offset  read (device -> console)   write (console -> device, after cmd + block)
//! 0       seconds                    seconds
//! 1       minutes                    minutes
//! 2       hours | 0x80               hours (bit 7 ignored)
//! 3       day                        day
//! 4       weekday - 1                weekday - 1
//! 5       month                      month
//! 6       year                       year
//! 7       century (0x01)             -
//! ```

use crate::hal::RtcTime;

use super::frame::{Request, Response};
use super::RTC_CENTURY_20XX;

/// Hours flag set on every read and masked on write
const HOURS_FLAG: u8 = 0x80;

/// Fill response bytes 0..8 with `time`.
pub(super) fn encode_time(time: &RtcTime, response: &mut Response) {
    response.set(0, time.second);
    response.set(1, time.minute);
    response.set(2, time.hour | HOURS_FLAG);
    response.set(3, time.day);
    response.set(4, time.weekday.wrapping_sub(1));
    response.set(5, time.month);
    response.set(6, time.year);
    response.set(7, RTC_CENTURY_20XX);
}

/// Decode the time block carried in request bytes 2..9.
pub(super) fn decode_time(request: &Request) -> RtcTime {
    RtcTime {
        second: request.byte(2),
        minute: request.byte(3),
        hour: request.byte(4) & !HOURS_FLAG,
        day: request.byte(5),
        weekday: request.byte(6).wrapping_add(1),
        month: request.byte(7),
        year: request.byte(8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rebias_weekday() {
        let request = Request::from_bytes(&[0x08, 0x02, 0x59, 0x30, 0x92, 0x24, 0x03, 0x12, 0x25]);
        let time = decode_time(&request);

        assert_eq!(
            time,
            RtcTime { second: 0x59, minute: 0x30, hour: 0x12, day: 0x24, weekday: 4, month: 0x12, year: 0x25 }
        );
    }

    #[test]
    fn test_encode_layout() {
        let time = RtcTime { second: 0x01, minute: 0x02, hour: 0x03, weekday: 7, day: 0x31, month: 0x01, year: 0x99 };
        let mut response = Response::new();
        encode_time(&time, &mut response);

        assert_eq!(
            response.as_bytes()[..8],
            [0x01, 0x02, 0x83, 0x31, 0x06, 0x01, 0x99, 0x01]
        );
    }
}
