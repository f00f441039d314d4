/// Why a single LOOP request produced no usable reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Station did not answer with an ACK")]
    NoAck,
    #[error("Frame too short: need {needed} bytes, got {got}")]
    Decode { needed: usize, got: usize },
    #[error("Console is in its setup menu or the station is disconnected")]
    SetupMenu,
    #[error("Reading out of range: {0}")]
    OutOfRange(String),
    #[error("Station is reporting no wind speed and no wind direction")]
    NoSignal,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Cannot open serial port: {0}")]
    ConnectionUnavailable(#[from] serialport::Error),
    #[error("Station did not wake up after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },
    #[error("Reading rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("Serial I/O error: {0}")]
    Serial(std::io::Error),
    #[error("Forwarding rejected by remote: {0}")]
    Forward(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error processing packet: {0}")]
    Mqtt(#[from] mqttrs::Error),
    #[error("Error communicating with MQTT broker: {0}")]
    Network(#[from] std::io::Error),
    #[error("Processing timeout")]
    Timeout,
    #[error("Config parsing error: {0}")]
    Config(#[from] dotenvy::Error),
    #[error("Invalid config value: {0}")]
    InvalidConfig(String),
    #[error("Station was lost to a failed serial task")]
    StationLost,
    #[error("Threading error: {0}")]
    Threading(#[from] tokio::task::JoinError),
    #[error("Error budget exhausted after {errors} errors")]
    ErrorBudgetExhausted { errors: u32 },
}

impl LinkError {
    /// Errors that cost one cycle and are counted against the error budget,
    /// as opposed to errors that end the process.
    pub fn is_per_cycle(&self) -> bool {
        matches!(
            self,
            LinkError::Rejected(_)
                | LinkError::Serial(_)
                | LinkError::Forward(_)
                | LinkError::Http(_)
                | LinkError::Mqtt(_)
                | LinkError::Network(_)
                | LinkError::Timeout
        )
    }
}
