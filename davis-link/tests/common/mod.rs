use chrono::DateTime;
use davis_link::Reading;

pub fn sample_reading() -> Reading {
    Reading {
        temperature_raw: 583,
        temperature_c: 14.6,
        wind_speed: 17,
        wind_10min_average: 12,
        wind_direction: 248,
        barometer: 29_874,
        humidity: 82,
        console_battery: 4.6,
        timestamp: DateTime::from_timestamp(1_760_003_600, 0).unwrap(),
        wind_10min_gust: Some(23),
        bar_trend: -20,
        uv_index: Some(2),
        solar_radiation: None,
        degraded: false,
    }
}
