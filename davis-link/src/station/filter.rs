use chrono::{DateTime, Utc};

use crate::error::Rejection;
use crate::reading::Reading;

use super::frame::LoopFrame;

/// Value the console puts in a byte it has nothing to report for.
const DASHED: u8 = 255;
const DASHED_SOLAR: u16 = 32767;

const MAX_WIND_SPEED: u8 = 80;
const MAX_TEMPERATURE_C: f64 = 50.0;
const MAX_HUMIDITY: u8 = 100;
const MAX_WIND_DIRECTION: u16 = 360;

/// Run the sanity checks in order and build the reading if they all pass.
///
/// A dashed 10 minute average on an otherwise sane frame is accepted with the
/// instantaneous speed standing in for it, and the reading is marked degraded.
pub fn screen(frame: &LoopFrame, captured: DateTime<Utc>) -> Result<Reading, Rejection> {
    let temperature_c = frame.temperature_c();

    if frame.wind_speed == DASHED
        && (frame.wind_10min_average == DASHED || frame.humidity == DASHED)
    {
        return Err(Rejection::SetupMenu);
    }

    if frame.wind_speed > MAX_WIND_SPEED {
        return Err(Rejection::OutOfRange(format!(
            "wind speed {} mph",
            frame.wind_speed
        )));
    }
    if temperature_c > MAX_TEMPERATURE_C {
        return Err(Rejection::OutOfRange(format!("temperature {temperature_c}C")));
    }
    if frame.humidity > MAX_HUMIDITY {
        return Err(Rejection::OutOfRange(format!("humidity {}%", frame.humidity)));
    }
    if frame.wind_direction > MAX_WIND_DIRECTION {
        return Err(Rejection::OutOfRange(format!(
            "wind direction {} degrees",
            frame.wind_direction
        )));
    }

    if frame.wind_speed == 0 && frame.wind_direction == 0 {
        return Err(Rejection::NoSignal);
    }

    let degraded = frame.wind_10min_average == DASHED;
    let wind_10min_average = if degraded {
        frame.wind_speed
    } else {
        frame.wind_10min_average
    };

    Ok(Reading {
        temperature_raw: frame.temperature_raw,
        temperature_c,
        wind_speed: frame.wind_speed,
        wind_10min_average,
        wind_direction: frame.wind_direction,
        barometer: frame.barometer,
        humidity: frame.humidity,
        console_battery: frame.console_battery(),
        timestamp: captured,
        wind_10min_gust: None,
        bar_trend: frame.bar_trend,
        uv_index: (frame.uv_index != DASHED).then_some(frame.uv_index),
        solar_radiation: (frame.solar_radiation != DASHED_SOLAR).then_some(frame.solar_radiation),
        degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sane() -> LoopFrame {
        LoopFrame {
            bar_trend: 0,
            barometer: 30_012,
            temperature_raw: 612,
            wind_speed: 14,
            wind_10min_average: 11,
            wind_direction: 225,
            humidity: 71,
            uv_index: 255,
            solar_radiation: 32767,
            battery_raw: 790,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    #[test]
    fn sane_frame_is_accepted() {
        let reading = screen(&sane(), now()).unwrap();
        assert_eq!(reading.wind_speed, 14);
        assert_eq!(reading.wind_10min_average, 11);
        assert_eq!(reading.temperature_c, 16.2);
        assert_eq!(reading.uv_index, None);
        assert_eq!(reading.solar_radiation, None);
        assert!(!reading.degraded);
        assert_eq!(reading.timestamp, now());
    }

    #[test]
    fn setup_menu_wins_over_everything() {
        let frame = LoopFrame {
            wind_speed: 255,
            humidity: 255,
            wind_direction: 9999,
            temperature_raw: 32767,
            ..sane()
        };
        assert_eq!(screen(&frame, now()), Err(Rejection::SetupMenu));

        let frame = LoopFrame {
            wind_speed: 255,
            wind_10min_average: 255,
            ..sane()
        };
        assert_eq!(screen(&frame, now()), Err(Rejection::SetupMenu));
    }

    #[test]
    fn dashed_speed_alone_is_out_of_range() {
        let frame = LoopFrame {
            wind_speed: 255,
            ..sane()
        };
        assert!(matches!(
            screen(&frame, now()),
            Err(Rejection::OutOfRange(_))
        ));
    }

    #[test]
    fn sensor_fault_heuristics() {
        for frame in [
            LoopFrame {
                wind_speed: 81,
                ..sane()
            },
            LoopFrame {
                temperature_raw: 1300, // 54.4C
                ..sane()
            },
            LoopFrame {
                humidity: 101,
                ..sane()
            },
            LoopFrame {
                wind_direction: 361,
                ..sane()
            },
        ] {
            assert!(
                matches!(screen(&frame, now()), Err(Rejection::OutOfRange(_))),
                "{frame:?} should be out of range"
            );
        }

        let edge = LoopFrame {
            wind_speed: 80,
            humidity: 100,
            wind_direction: 360,
            ..sane()
        };
        assert!(screen(&edge, now()).is_ok());
    }

    #[test]
    fn calm_and_north_is_no_signal() {
        let frame = LoopFrame {
            wind_speed: 0,
            wind_direction: 0,
            ..sane()
        };
        assert_eq!(screen(&frame, now()), Err(Rejection::NoSignal));

        let calm = LoopFrame {
            wind_speed: 0,
            ..sane()
        };
        assert!(screen(&calm, now()).is_ok());
    }

    #[test]
    fn dashed_average_falls_back_to_instantaneous() {
        let frame = LoopFrame {
            wind_10min_average: 255,
            ..sane()
        };
        let reading = screen(&frame, now()).unwrap();
        assert_eq!(reading.wind_10min_average, 14);
        assert!(reading.degraded);
    }
}
