pub mod config;
pub mod error;
pub mod forward;
pub mod poller;
pub mod reading;
pub mod station;
pub mod telemetry;

pub use error::{LinkError, Rejection};
pub use reading::Reading;
