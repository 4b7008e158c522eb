use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::protocol::Timer;

/// The discovery and heartbeat timers
///
/// Each timer is either stopped (`None`) or running. A freshly started timer
/// fires immediately and then once per period.
#[derive(Debug)]
pub struct Timers {
    discovery_period: Duration,
    heartbeat_period: Duration,
    discovery: Option<Interval>,
    heartbeat: Option<Interval>,
}

impl Timers {
    /// Creates both timers stopped
    pub fn new(discovery_period: Duration, heartbeat_period: Duration) -> Self {
        Timers {
            discovery_period,
            heartbeat_period,
            discovery: None,
            heartbeat: None,
        }
    }

    /// Starts (or restarts) `timer`
    pub fn start(&mut self, timer: Timer) {
        match timer {
            Timer::Discovery => self.discovery = Some(periodic(self.discovery_period)),
            Timer::Heartbeat => self.heartbeat = Some(periodic(self.heartbeat_period)),
        }
    }

    /// Stops `timer`; stopping a stopped timer is a no-op
    pub fn stop(&mut self, timer: Timer) {
        match timer {
            Timer::Discovery => self.discovery = None,
            Timer::Heartbeat => self.heartbeat = None,
        }
    }

    /// Stops both timers
    pub fn stop_all(&mut self) {
        self.discovery = None;
        self.heartbeat = None;
    }

    /// Returns true while `timer` is running
    pub fn is_running(&self, timer: Timer) -> bool {
        match timer {
            Timer::Discovery => self.discovery.is_some(),
            Timer::Heartbeat => self.heartbeat.is_some(),
        }
    }

    /// Waits for the next tick of the running timer
    ///
    /// Pending forever while both timers are stopped. Cancel safe.
    pub async fn tick(&mut self) -> Timer {
        match (&mut self.discovery, &mut self.heartbeat) {
            (Some(discovery), _) => {
                discovery.tick().await;
                Timer::Discovery
            }
            (None, Some(heartbeat)) => {
                heartbeat.tick().await;
                Timer::Heartbeat
            }
            (None, None) => std::future::pending().await,
        }
    }
}

fn periodic(period: Duration) -> Interval {
    let mut timer = interval(period);
    // A stalled task must not replay a burst of heartbeats; each replayed tick
    // would count as a missed reply.
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use tokio_test::{assert_pending, task};

    const DISCOVERY: Duration = Duration::from_millis(1000);
    const HEARTBEAT: Duration = Duration::from_millis(20);

    #[tokio::test(start_paused = true)]
    async fn test_discovery_period() {
        let mut timers = Timers::new(DISCOVERY, HEARTBEAT);
        timers.start(Timer::Discovery);

        let start = Instant::now();
        assert_eq!(timers.tick().await, Timer::Discovery);
        assert_eq!(start.elapsed(), Duration::ZERO);

        assert_eq!(timers.tick().await, Timer::Discovery);
        assert_eq!(start.elapsed(), DISCOVERY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_swap_to_heartbeat() {
        let mut timers = Timers::new(DISCOVERY, HEARTBEAT);
        timers.start(Timer::Discovery);
        timers.tick().await;

        timers.stop(Timer::Discovery);
        timers.start(Timer::Heartbeat);
        assert!(!timers.is_running(Timer::Discovery));
        assert!(timers.is_running(Timer::Heartbeat));

        let start = Instant::now();
        for _ in 0..6 {
            assert_eq!(timers.tick().await, Timer::Heartbeat);
        }
        assert_eq!(start.elapsed(), HEARTBEAT * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timers_never_tick() {
        let mut timers = Timers::new(DISCOVERY, HEARTBEAT);
        timers.start(Timer::Heartbeat);
        timers.stop_all();

        let mut tick = task::spawn(timers.tick());
        assert_pending!(tick.poll());
        tokio::time::advance(DISCOVERY * 5).await;
        assert_pending!(tick.poll());
    }
}
