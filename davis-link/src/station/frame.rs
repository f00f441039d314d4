use crate::error::Rejection;

pub const ACK: u8 = 0x06;

// Offsets into the buffer as read from the wire, ACK byte included.
const BAR_TREND: usize = 4;
const BAROMETER: usize = 8;
const OUTSIDE_TEMPERATURE: usize = 13;
const WIND_SPEED: usize = 15;
const WIND_10MIN_AVERAGE: usize = 16;
const WIND_DIRECTION: usize = 17;
const OUTSIDE_HUMIDITY: usize = 34;
const UV_INDEX: usize = 44;
const SOLAR_RADIATION: usize = 45;
const CONSOLE_BATTERY: usize = 88;

/// Shortest buffer that still holds every decoded field.
pub const MIN_FRAME_LEN: usize = CONSOLE_BATTERY + 2;

/// Raw LOOP fields, before any unit conversion or filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    pub bar_trend: i8,
    pub barometer: u16,
    pub temperature_raw: u16,
    pub wind_speed: u8,
    pub wind_10min_average: u8,
    pub wind_direction: u16,
    pub humidity: u8,
    pub uv_index: u8,
    pub solar_radiation: u16,
    pub battery_raw: u16,
}

impl LoopFrame {
    /// Decode the concatenated reply to a `LOOP 1` command.
    pub fn decode(buf: &[u8]) -> Result<Self, Rejection> {
        if buf.first() != Some(&ACK) {
            return Err(Rejection::NoAck);
        }
        if buf.len() < MIN_FRAME_LEN {
            return Err(Rejection::Decode {
                needed: MIN_FRAME_LEN,
                got: buf.len(),
            });
        }

        Ok(Self {
            bar_trend: byte(buf, BAR_TREND)? as i8,
            barometer: u16_le(buf, BAROMETER)?,
            temperature_raw: u16_le(buf, OUTSIDE_TEMPERATURE)?,
            wind_speed: byte(buf, WIND_SPEED)?,
            wind_10min_average: byte(buf, WIND_10MIN_AVERAGE)?,
            wind_direction: u16_le(buf, WIND_DIRECTION)?,
            humidity: byte(buf, OUTSIDE_HUMIDITY)?,
            uv_index: byte(buf, UV_INDEX)?,
            solar_radiation: u16_le(buf, SOLAR_RADIATION)?,
            battery_raw: u16_le(buf, CONSOLE_BATTERY)?,
        })
    }

    /// Celsius rounded to one decimal.
    pub fn temperature_c(&self) -> f64 {
        round1((f64::from(self.temperature_raw) / 10.0 - 32.0) * 5.0 / 9.0)
    }

    /// Console battery voltage rounded to one decimal.
    pub fn console_battery(&self) -> f64 {
        round1(f64::from(self.battery_raw) * 300.0 / 512.0 / 100.0)
    }
}

fn byte(buf: &[u8], offset: usize) -> Result<u8, Rejection> {
    buf.get(offset).copied().ok_or(Rejection::Decode {
        needed: offset + 1,
        got: buf.len(),
    })
}

fn u16_le(buf: &[u8], offset: usize) -> Result<u16, Rejection> {
    buf.get(offset..offset + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(Rejection::Decode {
            needed: offset + 2,
            got: buf.len(),
        })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
