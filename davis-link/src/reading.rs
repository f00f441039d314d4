use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One accepted LOOP sample.
///
/// Field names on the wire are the camelCase keys the upload endpoint and
/// the pub/sub consumers already understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Tenths of a degree Fahrenheit.
    pub temperature_raw: u16,
    #[serde(rename = "temperatureC")]
    pub temperature_c: f64,
    pub wind_speed: u8,
    #[serde(rename = "wind10MinAverage")]
    pub wind_10min_average: u8,
    pub wind_direction: u16,
    /// Inches of mercury times 1000.
    pub barometer: u16,
    pub humidity: u8,
    /// Volts.
    pub console_battery: f64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(
        rename = "wind10MinGust",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub wind_10min_gust: Option<u8>,
    pub bar_trend: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar_radiation: Option<u16>,
    #[serde(skip)]
    pub degraded: bool,
}

impl Reading {
    /// `{"message":{"reading":{...}}}`, the envelope the live feed consumers expect.
    pub fn to_live_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            message: Message<'a>,
        }
        #[derive(Serialize)]
        struct Message<'a> {
            reading: &'a Reading,
        }
        serde_json::to_vec(&Envelope {
            message: Message { reading: self },
        })
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] - temperature: {}C, wind: {}mph from {} (10min avg {}",
            self.timestamp.to_rfc3339(),
            self.temperature_c,
            self.wind_speed,
            self.wind_direction,
            self.wind_10min_average,
        )?;
        if let Some(gust) = self.wind_10min_gust {
            write!(f, ", gust {gust}")?;
        }
        write!(
            f,
            "), humidity: {}%, barometer: {}, battery: {}V",
            self.humidity, self.barometer, self.console_battery
        )
    }
}
