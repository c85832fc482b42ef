//! Clock helpers
//!
//! Parsing of the BLE Current Time Service payloads and the fixed-width
//! strings drawn by the watch face.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};

/// Length of a Current Time characteristic value (0x2A2B)
pub const CTS_LEN: usize = 10;
/// Length of a Local Time Information characteristic value (0x2A0F)
pub const LTI_LEN: usize = 2;

const QUARTER_HOUR_SECS: i32 = 15 * 60;
const DST_UNKNOWN: u8 = 255;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Payload shorter than the characteristic value
    TooShort,
    /// Fields do not form a valid date, time or offset
    OutOfRange,
}

/// Parse a Current Time characteristic value
///
/// Layout: year (u16 LE), month, day, hours, minutes, seconds, day of week,
/// fractions of 1/256 s, adjust reason. Day of week and adjust reason are
/// ignored.
pub fn parse_current_time(bytes: &[u8]) -> Result<NaiveDateTime, Error> {
    if bytes.len() < CTS_LEN {
        return Err(Error::TooShort);
    }
    let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
    let month = bytes[2] as u32;
    let day = bytes[3] as u32;
    let hour = bytes[4] as u32;
    let min = bytes[5] as u32;
    let sec = bytes[6] as u32;
    let milli = bytes[8] as u32 * 1000 / 256;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
        .ok_or(Error::OutOfRange)
}

/// Parse a Local Time Information characteristic value into a UTC offset
///
/// Byte 0 is the time zone in 15 minute steps (i8), byte 1 the DST offset
/// in 15 minute steps, 255 meaning unknown.
pub fn parse_local_time_info(bytes: &[u8]) -> Result<FixedOffset, Error> {
    if bytes.len() < LTI_LEN {
        return Err(Error::TooShort);
    }
    let zone = bytes[0] as i8 as i32;
    let dst = match bytes[1] {
        DST_UNKNOWN => 0,
        steps => steps as i32,
    };
    FixedOffset::east_opt((zone + dst) * QUARTER_HOUR_SECS).ok_or(Error::OutOfRange)
}

/// Convert a UTC time into wall-clock time for `zone`
pub fn local_time(utc: NaiveDateTime, zone: FixedOffset) -> NaiveDateTime {
    zone.from_utc_datetime(&utc).naive_local()
}

/// `H:MM:SS`, interactive time
pub fn format_time_seconds(buf: &mut [u8], time: NaiveDateTime) -> Result<&str, core::fmt::Error> {
    format_no_std::show(
        buf,
        format_args!("{}:{:02}:{:02}", time.hour(), time.minute(), time.second()),
    )
}

/// `H:MM`, ambient time
pub fn format_time(buf: &mut [u8], time: NaiveDateTime) -> Result<&str, core::fmt::Error> {
    format_no_std::show(buf, format_args!("{}:{:02}", time.hour(), time.minute()))
}

/// `Www, Mmm D YYYY`, interactive date
pub fn format_date(buf: &mut [u8], time: NaiveDateTime) -> Result<&str, core::fmt::Error> {
    format_no_std::show(
        buf,
        format_args!(
            "{}, {} {} {}",
            WEEKDAYS[time.weekday().num_days_from_sunday() as usize],
            MONTHS[time.month0() as usize],
            time.day(),
            time.year()
        ),
    )
}

/// `D.MM`, ambient date
pub fn format_date_short(buf: &mut [u8], time: NaiveDateTime) -> Result<&str, core::fmt::Error> {
    format_no_std::show(buf, format_args!("{}.{:02}", time.day(), time.month()))
}
