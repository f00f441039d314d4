use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error::LinkError;
use crate::forward::{Forwarder, Heartbeat};
use crate::reading::Reading;
use crate::station::Station;

const DORMANT_NOTICE_EVERY: Duration = Duration::from_secs(12 * 60 * 60);

struct Upload<U> {
    sink: U,
    send_frequency: Duration,
    last_sent: Option<Instant>,
}

impl<U> Upload<U> {
    fn is_due(&self, now: Instant) -> bool {
        self.last_sent
            .is_none_or(|sent| now.duration_since(sent) >= self.send_frequency)
    }
}

/// The polling loop: request a reading, forward it, keep score.
///
/// `U` receives throttled uploads, `L` receives every accepted reading.
pub struct Poller<P, U, L> {
    // lent to the blocking pool for the duration of each serial call
    station: Option<Station<P>>,
    upload: Option<Upload<U>>,
    live: Option<L>,
    heartbeat: Option<Heartbeat>,
    poll_interval: Duration,
    error_budget: u32,
    errors: u32,
}

impl<P, U, L> Poller<P, U, L>
where
    P: Read + Write + Send + 'static,
    U: Forwarder,
    L: Forwarder,
{
    pub fn new(station: Station<P>, poll_interval: Duration, error_budget: u32) -> Self {
        Self {
            station: Some(station),
            upload: None,
            live: None,
            heartbeat: None,
            poll_interval,
            error_budget,
            errors: 0,
        }
    }

    pub fn with_upload(mut self, sink: U, send_frequency: Duration) -> Self {
        self.upload = Some(Upload {
            sink,
            send_frequency,
            last_sent: None,
        });
        self
    }

    pub fn with_live(mut self, sink: L) -> Self {
        self.live = Some(sink);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    /// Consecutive cycles that were not clean.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub async fn wake(&mut self) -> Result<(), LinkError> {
        self.on_station(Station::wake).await
    }

    /// Poll until the error budget runs out or something fatal happens.
    pub async fn run(mut self) -> Result<(), LinkError> {
        info!("Ready to start getting data");
        loop {
            self.poll_once().await?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One cycle. Per-cycle failures are counted, fatal ones returned.
    pub async fn poll_once(&mut self) -> Result<Option<Reading>, LinkError> {
        let (reading, clean) = match self.on_station(Station::request_reading).await {
            Ok(reading) => {
                let clean = self.forward(&reading).await && !reading.degraded;
                (Some(reading), clean)
            }
            Err(e) if e.is_per_cycle() => {
                if !matches!(e, LinkError::Rejected(_)) {
                    warn!("Cycle failed: {e}");
                }
                (None, false)
            }
            Err(e) => return Err(e),
        };
        self.send_heartbeat().await;

        if clean {
            self.errors = 0;
        } else {
            self.errors += 1;
            if self.errors > self.error_budget {
                error!(errors = self.errors, "Too many errors, giving up");
                return Err(LinkError::ErrorBudgetExhausted {
                    errors: self.errors,
                });
            }
        }
        Ok(reading)
    }

    /// Run a blocking serial call on the blocking pool. The station is moved
    /// into the task and handed back with the result.
    async fn on_station<T, F>(&mut self, call: F) -> Result<T, LinkError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Station<P>) -> Result<T, LinkError> + Send + 'static,
    {
        let mut station = self.station.take().ok_or(LinkError::StationLost)?;
        let (station, result) = tokio::task::spawn_blocking(move || {
            let result = call(&mut station);
            (station, result)
        })
        .await?;
        self.station = Some(station);
        result
    }

    /// Returns false if any sink that was tried failed.
    async fn forward(&mut self, reading: &Reading) -> bool {
        info!("Got reading: {reading}");
        let mut ok = true;

        if let Some(live) = self.live.as_mut() {
            if let Err(e) = live.forward(reading).await {
                error!("Couldn't publish reading: {e}");
                ok = false;
            }
        }

        if let Some(upload) = self.upload.as_mut() {
            let now = Instant::now();
            if upload.is_due(now) {
                match upload.sink.forward(reading).await {
                    Ok(_) => upload.last_sent = Some(now),
                    Err(e) => {
                        error!("Couldn't upload reading: {e}");
                        ok = false;
                    }
                }
            }
        }
        ok
    }

    async fn send_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.as_mut() {
            if heartbeat.is_due(Instant::now()) {
                if let Err(e) = heartbeat.beat().await {
                    error!("Error sending heartbeat: {e}");
                }
            }
        }
    }
}

/// Stay up without touching the station, saying so twice a day.
pub async fn stay_dormant() {
    loop {
        info!("Dormant: not polling the station");
        tokio::time::sleep(DORMANT_NOTICE_EVERY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ForwardAck;
    use crate::station::tests::{ScriptedPort, loop_frame};

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Reading>,
        fail: bool,
    }

    impl Forwarder for Recorder {
        async fn forward(&mut self, reading: &Reading) -> Result<ForwardAck, LinkError> {
            if self.fail {
                return Err(LinkError::Forward("sink down".to_string()));
            }
            self.sent.push(reading.clone());
            Ok(ForwardAck {
                sink: "recorder",
                message: None,
            })
        }
    }

    fn poller(replies: Vec<Vec<u8>>, budget: u32) -> Poller<ScriptedPort, Recorder, Recorder> {
        Poller::new(
            Station::new(ScriptedPort::with_replies(replies)),
            Duration::ZERO,
            budget,
        )
    }

    #[tokio::test]
    async fn budget_is_exhausted_after_consecutive_failures() {
        let mut poller = poller(vec![], 5);
        for expected in 1..=5 {
            assert!(poller.poll_once().await.unwrap().is_none());
            assert_eq!(poller.errors(), expected);
        }
        let err = poller.poll_once().await.unwrap_err();
        assert!(matches!(err, LinkError::ErrorBudgetExhausted { errors: 6 }));
    }

    #[tokio::test]
    async fn clean_reading_resets_the_count() {
        let mut poller = poller(vec![vec![], vec![], loop_frame(7, 200)], 5);
        poller.poll_once().await.unwrap();
        poller.poll_once().await.unwrap();
        assert_eq!(poller.errors(), 2);

        let reading = poller.poll_once().await.unwrap().unwrap();
        assert_eq!(reading.wind_speed, 7);
        assert_eq!(poller.errors(), 0);
    }

    #[tokio::test]
    async fn degraded_reading_is_forwarded_but_counted() {
        let mut frame = loop_frame(7, 200);
        frame[16] = 255;
        let mut poller = poller(vec![frame], 5).with_live(Recorder::default());

        let reading = poller.poll_once().await.unwrap().unwrap();
        assert!(reading.degraded);
        assert_eq!(reading.wind_10min_average, 7);
        assert_eq!(poller.errors(), 1);
        assert_eq!(poller.live.as_ref().unwrap().sent.len(), 1);
    }

    #[tokio::test]
    async fn failed_forward_drops_the_reading_and_counts() {
        let failing = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut poller = poller(vec![loop_frame(7, 200)], 5).with_live(failing);

        assert!(poller.poll_once().await.unwrap().is_some());
        assert_eq!(poller.errors(), 1);
    }

    #[tokio::test]
    async fn uploads_are_throttled() {
        let replies = vec![loop_frame(7, 200), loop_frame(8, 210), loop_frame(9, 220)];
        let mut poller = poller(replies, 5)
            .with_upload(Recorder::default(), Duration::from_secs(3600))
            .with_live(Recorder::default());

        for _ in 0..3 {
            poller.poll_once().await.unwrap();
        }
        let uploaded = &poller.upload.as_ref().unwrap().sink.sent;
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].wind_speed, 7);
        assert_eq!(poller.live.as_ref().unwrap().sent.len(), 3);
    }

    #[tokio::test]
    async fn handshake_failure_is_fatal() {
        let port = ScriptedPort::new(b"\n\n\n".to_vec());
        let mut poller: Poller<_, Recorder, Recorder> =
            Poller::new(Station::new(port), Duration::ZERO, 5);
        let err = poller.wake().await.unwrap_err();
        assert!(!err.is_per_cycle());
        assert!(matches!(err, LinkError::HandshakeTimeout { attempts: 3 }));
    }

    #[tokio::test]
    async fn station_is_handed_back_after_each_call() {
        let replies = vec![b"OK\n\r".to_vec(), loop_frame(7, 200)];
        let mut poller = poller(replies, 5);

        poller.wake().await.unwrap();
        assert!(poller.station.is_some());
        poller.poll_once().await.unwrap().unwrap();

        let port = poller.station.take().unwrap().into_inner();
        assert_eq!(port.written, b"\nLOOP 1\n");
    }

    #[tokio::test]
    async fn lost_station_is_fatal() {
        let mut poller = poller(vec![], 5);
        poller.station = None;
        let err = poller.poll_once().await.unwrap_err();
        assert!(matches!(err, LinkError::StationLost));
        assert_eq!(poller.errors(), 0);
    }
}
