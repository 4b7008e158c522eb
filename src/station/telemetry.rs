use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::protocol::TelemetryRecord;

/// Creates a connected sink/stream pair holding at most `capacity` records
pub fn channel(capacity: usize) -> (TelemetrySink, TelemetryStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        TelemetrySink { tx, dropped: 0 },
        TelemetryStream { rx, terminated: false },
    )
}

/// Engine side of the telemetry channel
#[derive(Debug)]
pub struct TelemetrySink {
    tx: mpsc::Sender<TelemetryRecord>,
    dropped: u64,
}

impl TelemetrySink {
    /// Offers a record to the consumer without waiting
    ///
    /// Returns false when the record was dropped because the consumer is
    /// behind or gone.
    pub fn push(&mut self, record: TelemetryRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(record)) => {
                self.dropped += 1;
                debug!(pong = record.pong, dropped = self.dropped, "telemetry consumer behind, dropping record");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Records dropped because the consumer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Telemetry records in arrival order
///
/// Yields one record per well-formed datagram for as long as the station runs.
/// Once the station stops the stream ends and stays ended.
#[derive(Debug)]
pub struct TelemetryStream {
    rx: mpsc::Receiver<TelemetryRecord>,
    terminated: bool,
}

impl TelemetryStream {
    /// Waits for the next record; `None` once the station has stopped
    pub async fn next_record(&mut self) -> Option<TelemetryRecord> {
        if self.terminated {
            return None;
        }

        let record = self.rx.recv().await;
        self.terminated = record.is_none();
        record
    }
}

impl Stream for TelemetryStream {
    type Item = TelemetryRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        let polled = this.rx.poll_recv(cx);
        if let Poll::Ready(None) = polled {
            this.terminated = true;
        }
        polled
    }
}

impl FusedStream for TelemetryStream {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}
