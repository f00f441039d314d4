use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LinkError;

#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    pub path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub url: String,
    /// Minimum spacing between successful uploads.
    pub send_frequency: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    pub url: String,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    pub broker: String,
    pub topic: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub serial: SerialConfig,
    pub poll_interval: Duration,
    pub track_gusts: bool,
    pub error_budget: u32,
    pub upload: Option<UploadConfig>,
    pub heartbeat: Option<HeartbeatConfig>,
    pub mqtt: Option<MqttConfig>,
    pub dormant: bool,
}

impl Config {
    /// Read the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, LinkError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| dotenvy::var(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LinkError>
    where
        F: Fn(&str) -> Result<String, dotenvy::Error>,
    {
        let vars = Vars(lookup);

        let upload = match vars.optional("UPLOAD_URL")? {
            Some(url) => Some(UploadConfig {
                url,
                send_frequency: Duration::from_secs(vars.parsed("SERVER_SEND_FREQUENCY", 60)?),
            }),
            None => None,
        };
        let heartbeat = match vars.optional("HEARTBEAT_URL")? {
            Some(url) => Some(HeartbeatConfig {
                url,
                interval: Duration::from_secs(vars.parsed("HEARTBEAT_INTERVAL", 60)?),
            }),
            None => None,
        };
        let mqtt = match vars.optional("MQTT_BROKER")? {
            Some(broker) => Some(MqttConfig {
                broker,
                topic: vars.or("MQTT_TOPIC", "weather/live")?,
                client_id: vars.or("MQTT_CLIENT_ID", "davis-link")?,
            }),
            None => None,
        };

        Ok(Self {
            serial: SerialConfig {
                path: vars.or("SERIAL_PORT", "/dev/ttyUSB0")?,
                baud_rate: vars.parsed("BAUD_RATE", 19200)?,
                timeout: Duration::from_millis(vars.parsed("SERIAL_TIMEOUT_MS", 2000)?),
            },
            poll_interval: Duration::from_millis(vars.parsed("POLL_INTERVAL_MS", 2000)?),
            track_gusts: vars.flag("TRACK_GUSTS", true)?,
            error_budget: vars.parsed("ERROR_BUDGET", 5)?,
            upload,
            heartbeat,
            mqtt,
            dormant: vars.flag("DORMANT", false)?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Result<String, dotenvy::Error>,
{
    fn optional(&self, key: &str) -> Result<Option<String>, LinkError> {
        match (self.0)(key) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(dotenvy::Error::EnvVar(VarError::NotPresent)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn or(&self, key: &str, default: &str) -> Result<String, LinkError> {
        Ok(self.optional(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, LinkError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key)? {
            Some(value) => value
                .parse()
                .map_err(|e| LinkError::InvalidConfig(format!("{key}={value}: {e}"))),
            None => Ok(default),
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, LinkError> {
        match self.optional(key)? {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(LinkError::InvalidConfig(format!(
                    "{key}={value}: expected true or false"
                ))),
            },
            None => Ok(default),
        }
    }
}
