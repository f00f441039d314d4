use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serialport::SerialPort;
use tracing::{debug, error, info, warn};

use crate::error::{LinkError, Rejection};
use crate::reading::Reading;

pub mod filter;
pub mod frame;
pub mod gust;

use frame::LoopFrame;
use gust::GustWindow;

const WAKE: &[u8] = b"\n";
const LOOP_ONCE: &[u8] = b"LOOP 1\n";

/// Lines read per LOOP reply. The binary frame may contain newline bytes,
/// so this is a read budget rather than framing.
const LOOP_REPLY_LINES: usize = 4;

pub const WAKE_ATTEMPTS: u32 = 3;

/// A Davis console on the other end of a byte stream.
pub struct Station<P> {
    port: BufReader<P>,
    gusts: Option<GustWindow>,
}

pub fn open(
    path: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Station<Box<dyn SerialPort>>, LinkError> {
    let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
    info!(path, baud_rate, "Serial port opened");
    Ok(Station::new(port))
}

impl<P> Station<P>
where
    P: Read + Write,
{
    pub fn new(port: P) -> Self {
        Self {
            port: BufReader::new(port),
            gusts: Some(GustWindow::new()),
        }
    }

    pub fn with_gust_tracking(mut self, enabled: bool) -> Self {
        self.gusts = enabled.then(GustWindow::new);
        self
    }

    /// Nudge the console awake. A bare newline echoed back means it is still
    /// booting; anything else means it is listening.
    pub fn wake(&mut self) -> Result<(), LinkError> {
        for attempt in 1..=WAKE_ATTEMPTS {
            self.send(WAKE)?;
            if self.read_line()? != WAKE {
                // trailing carriage return of the wake reply
                self.read_line()?;
                info!(attempt, "Station is awake");
                return Ok(());
            }
            warn!(attempt, "Station still booting");
        }
        error!("Station never woke up");
        Err(LinkError::HandshakeTimeout {
            attempts: WAKE_ATTEMPTS,
        })
    }

    pub fn request_reading(&mut self) -> Result<Reading, LinkError> {
        self.request_reading_at(Utc::now())
    }

    /// One LOOP round trip, captured at `now`. Never retries.
    pub fn request_reading_at(&mut self, now: DateTime<Utc>) -> Result<Reading, LinkError> {
        self.discard_buffered();
        self.send(LOOP_ONCE)?;

        let mut reply = Vec::new();
        for _ in 0..LOOP_REPLY_LINES {
            reply.extend(self.read_line()?);
        }
        debug!(len = reply.len(), "LOOP reply received");

        let captured = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let mut reading = LoopFrame::decode(&reply)
            .and_then(|frame| filter::screen(&frame, captured))
            .inspect_err(log_rejection)?;

        if let Some(gusts) = self.gusts.as_mut() {
            reading.wind_10min_gust = Some(gusts.record(captured.timestamp(), reading.wind_speed));
        }
        if reading.degraded {
            warn!("10 minute wind average unavailable, using instantaneous speed");
        }
        Ok(reading)
    }

    pub fn into_inner(self) -> P {
        self.port.into_inner()
    }

    /// Drop whatever is left of a previous reply, such as the tail of a LOOP
    /// frame that ran past the line budget. The wake handshake must not do this:
    /// the console's `"\r"` after an echoed newline belongs to the next attempt.
    fn discard_buffered(&mut self) {
        let stale = self.port.buffer().len();
        if stale > 0 {
            debug!(stale, "Discarding buffered input");
            self.port.consume(stale);
        }
    }

    fn send(&mut self, command: &[u8]) -> Result<(), LinkError> {
        let port = self.port.get_mut();
        port.write_all(command).map_err(LinkError::Serial)?;
        port.flush().map_err(LinkError::Serial)
    }

    /// Read up to and including the next newline. A read timeout ends the
    /// line early with whatever arrived.
    fn read_line(&mut self) -> Result<Vec<u8>, LinkError> {
        let mut line = Vec::new();
        match self.port.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(line),
            Err(e) => Err(LinkError::Serial(e)),
        }
    }
}

fn log_rejection(rejection: &Rejection) {
    match rejection {
        Rejection::SetupMenu => error!("{rejection}"),
        _ => warn!("Ignoring reading: {rejection}"),
    }
}
