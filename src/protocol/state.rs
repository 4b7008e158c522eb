//! Robot presence detection
//!
//! [`LinkState`] is a pure state machine: it owns the connection state and the
//! missed-packet counter and answers every input with the list of [`Effect`]s the
//! engine must carry out, in order. It performs no I/O and keeps no clock, which
//! keeps the hysteresis rules testable without sockets or timers.

use std::fmt;

use crate::core::MISSED_PACKET_THRESHOLD;

/// Whether a robot is currently answering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No robot observed; transmitting at the discovery rate
    Searching,
    /// Robot replying; transmitting at the heartbeat rate
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Searching => f.write_str("searching"),
            ConnectionState::Connected => f.write_str("connected"),
        }
    }
}

/// The two periodic timers driving transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    Discovery,
    Heartbeat,
}

/// Lifecycle notifications published to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    Connected,
    Disconnected,
}

/// Action requested by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Encode and send one control packet
    Transmit,
    StopTimer(Timer),
    StartTimer(Timer),
    Emit(LinkEvent),
}

/// Liveness state machine with missed-packet hysteresis
#[derive(Debug, Clone)]
pub struct LinkState {
    state: ConnectionState,
    missed_packets: u32,
    threshold: u32,
}

impl Default for LinkState {
    fn default() -> Self {
        LinkState::new(MISSED_PACKET_THRESHOLD)
    }
}

impl LinkState {
    /// Creates a state machine in `Searching` that declares the link lost once
    /// more than `threshold` heartbeat ticks pass without a reply
    pub fn new(threshold: u32) -> Self {
        LinkState {
            state: ConnectionState::Searching,
            missed_packets: 0,
            threshold,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Heartbeat ticks since the last reply
    pub fn missed_packets(&self) -> u32 {
        self.missed_packets
    }

    /// The timer that must be running in the current state
    pub fn active_timer(&self) -> Timer {
        match self.state {
            ConnectionState::Searching => Timer::Discovery,
            ConnectionState::Connected => Timer::Heartbeat,
        }
    }

    /// Handles a well-formed datagram from the robot
    pub fn on_datagram(&mut self) -> Vec<Effect> {
        self.missed_packets = 0;

        match self.state {
            ConnectionState::Searching => {
                self.state = ConnectionState::Connected;
                vec![
                    Effect::StopTimer(Timer::Discovery),
                    Effect::StartTimer(Timer::Heartbeat),
                    Effect::Emit(LinkEvent::Connected),
                ]
            }
            ConnectionState::Connected => Vec::new(),
        }
    }

    /// Handles a tick of `timer`
    ///
    /// A tick from the timer that is not active for the current state is stale
    /// and produces no effects.
    pub fn on_tick(&mut self, timer: Timer) -> Vec<Effect> {
        if timer != self.active_timer() {
            return Vec::new();
        }

        match self.state {
            ConnectionState::Searching => vec![Effect::Transmit],
            ConnectionState::Connected => {
                self.missed_packets = self.missed_packets.saturating_add(1);

                if self.missed_packets > self.threshold {
                    self.state = ConnectionState::Searching;
                    vec![
                        Effect::Transmit,
                        Effect::StopTimer(Timer::Heartbeat),
                        Effect::StartTimer(Timer::Discovery),
                        Effect::Emit(LinkEvent::Disconnected),
                    ]
                } else {
                    vec![Effect::Transmit]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> LinkState {
        let mut link = LinkState::default();
        link.on_datagram();
        link
    }

    fn emitted(effects: &[Effect]) -> Vec<LinkEvent> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Emit(event) => Some(*event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let link = LinkState::default();
        assert_eq!(link.state(), ConnectionState::Searching);
        assert_eq!(link.active_timer(), Timer::Discovery);
        assert_eq!(link.missed_packets(), 0);
    }

    #[test]
    fn test_first_datagram_connects() {
        let mut link = LinkState::default();
        let effects = link.on_datagram();

        assert_eq!(
            effects,
            vec![
                Effect::StopTimer(Timer::Discovery),
                Effect::StartTimer(Timer::Heartbeat),
                Effect::Emit(LinkEvent::Connected),
            ]
        );
        assert_eq!(link.state(), ConnectionState::Connected);
        assert_eq!(link.active_timer(), Timer::Heartbeat);
    }

    #[test]
    fn test_repeated_datagrams_connect_once() {
        let mut link = LinkState::default();
        let events: Vec<LinkEvent> = (0..25).flat_map(|_| emitted(&link.on_datagram())).collect();

        assert_eq!(events, vec![LinkEvent::Connected]);
        assert_eq!(link.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_discovery_tick_transmits() {
        let mut link = LinkState::default();
        for _ in 0..5 {
            assert_eq!(link.on_tick(Timer::Discovery), vec![Effect::Transmit]);
        }
        assert_eq!(link.missed_packets(), 0);
        assert_eq!(link.state(), ConnectionState::Searching);
    }

    #[test]
    fn test_heartbeat_counts_missed_packets() {
        let mut link = connected();
        for expected in 1..=10 {
            assert_eq!(link.on_tick(Timer::Heartbeat), vec![Effect::Transmit]);
            assert_eq!(link.missed_packets(), expected);
        }
        assert_eq!(link.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_eleventh_silent_tick_disconnects() {
        let mut link = connected();
        let mut events = Vec::new();

        for tick in 1..=11 {
            let fired = emitted(&link.on_tick(Timer::Heartbeat));
            if tick < 11 {
                assert!(fired.is_empty(), "early event at tick {}", tick);
            }
            events.extend(fired);
        }

        assert_eq!(events, vec![LinkEvent::Disconnected]);
        assert_eq!(link.state(), ConnectionState::Searching);
        assert_eq!(link.active_timer(), Timer::Discovery);
    }

    #[test]
    fn test_disconnect_transmits_then_swaps_timers() {
        let mut link = connected();
        for _ in 0..10 {
            link.on_tick(Timer::Heartbeat);
        }

        assert_eq!(
            link.on_tick(Timer::Heartbeat),
            vec![
                Effect::Transmit,
                Effect::StopTimer(Timer::Heartbeat),
                Effect::StartTimer(Timer::Discovery),
                Effect::Emit(LinkEvent::Disconnected),
            ]
        );
    }

    #[test]
    fn test_datagram_resets_missed_packets() {
        let mut link = connected();
        for _ in 0..9 {
            link.on_tick(Timer::Heartbeat);
        }

        assert!(link.on_datagram().is_empty());
        assert_eq!(link.missed_packets(), 0);

        for _ in 0..10 {
            link.on_tick(Timer::Heartbeat);
        }
        assert_eq!(link.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_stale_ticks_ignored() {
        let mut link = LinkState::default();
        assert!(link.on_tick(Timer::Heartbeat).is_empty());

        let mut link = connected();
        assert!(link.on_tick(Timer::Discovery).is_empty());
        assert_eq!(link.missed_packets(), 0);
    }

    #[test]
    fn test_reconnect_after_loss() {
        let mut link = connected();
        for _ in 0..11 {
            link.on_tick(Timer::Heartbeat);
        }
        assert_eq!(link.state(), ConnectionState::Searching);

        assert_eq!(emitted(&link.on_datagram()), vec![LinkEvent::Connected]);
        assert_eq!(link.missed_packets(), 0);
    }

    #[test]
    fn test_custom_threshold() {
        let mut link = LinkState::new(2);
        link.on_datagram();
        assert!(emitted(&link.on_tick(Timer::Heartbeat)).is_empty());
        assert!(emitted(&link.on_tick(Timer::Heartbeat)).is_empty());
        assert_eq!(emitted(&link.on_tick(Timer::Heartbeat)), vec![LinkEvent::Disconnected]);
    }
}
