use davis_link::{
    config::Config,
    error::LinkError,
    forward::{Heartbeat, HttpUploader, MqttPublisher},
    poller::{self, Poller},
    station, telemetry,
};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), LinkError> {
    let _guard = telemetry::init("davis-link");

    let config = Config::from_env().inspect_err(|e| error!("{e}"))?;
    if config.dormant {
        poller::stay_dormant().await;
        return Ok(());
    }

    info!("Opening a connection to the weather station");
    let station = station::open(
        &config.serial.path,
        config.serial.baud_rate,
        config.serial.timeout,
    )
    .inspect_err(|e| error!("{e}"))?
    .with_gust_tracking(config.track_gusts);

    let mut poller: Poller<_, HttpUploader, MqttPublisher> =
        Poller::new(station, config.poll_interval, config.error_budget);
    if let Some(upload) = config.upload {
        poller = poller.with_upload(HttpUploader::new(upload.url)?, upload.send_frequency);
    }
    if let Some(mqtt) = config.mqtt {
        poller = poller.with_live(MqttPublisher::new(mqtt.broker, mqtt.topic, mqtt.client_id));
    }
    if let Some(heartbeat) = config.heartbeat {
        poller = poller.with_heartbeat(Heartbeat::new(heartbeat.url, heartbeat.interval)?);
    }

    poller.wake().await?;
    poller.run().await.inspect_err(|e| error!("Exiting: {e}"))
}
