//! Driver station engine
//!
//! A [`Station`] ties the pieces together: it transmits control packets on the
//! timer the [`LinkState`] asks for, feeds every inbound datagram through the
//! telemetry decoder and the state machine, and publishes link events and
//! telemetry records. All of its state lives in one task; timer ticks,
//! datagrams and commands are handled one at a time by a single select loop.

mod telemetry;
mod timer;

pub use self::telemetry::{TelemetrySink, TelemetryStream};
pub use self::timer::Timers;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::core::{Config, Error, Result, MAX_DATAGRAM_SIZE};
use crate::network::{AddressResolver, TargetResolver, Transport};
use crate::protocol::{
    ConnectionState, ControlCodec, ControlPacket, Effect, LinkEvent, LinkState, Mode,
    RebootAction, TelemetryCodec, CONTROL_PACKET_LEN,
};

/// Capacity of the link event broadcast channel
const EVENT_CAPACITY: usize = 16;

/// Capacity of the command queue
const COMMAND_CAPACITY: usize = 16;

/// Requests applied by the engine task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode(Mode),
    SetRebootAction(RebootAction),
}

/// A driver station link to one robot
pub struct Station {
    config: Config,
    transport: Transport,
    resolver: TargetResolver,
    link: LinkState,
    control: ControlPacket,
    timers: Timers,
    sink: TelemetrySink,
    telemetry: Option<TelemetryStream>,
    events: broadcast::Sender<LinkEvent>,
    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    control_codec: ControlCodec,
    telemetry_codec: TelemetryCodec,
    send_buffer: BytesMut,
    recv_buffer: BytesMut,
}

impl Station {
    /// Validates `config` and binds the station's sockets
    pub async fn bind(config: Config) -> Result<Self> {
        let resolver = Arc::new(config.target.clone());
        Self::bind_with_resolver(config, resolver).await
    }

    /// Like [`Station::bind`], deriving the robot address with `resolver`
    pub async fn bind_with_resolver(config: Config, resolver: Arc<dyn AddressResolver>) -> Result<Self> {
        config.validate()?;
        let team = config.team()?;

        let transport = Transport::bind(config.bind_address, config.receive_port).await?;
        let resolver = TargetResolver::new(resolver, team, config.send_port, config.discovery_interval);

        info!(
            team,
            station = %config.station(),
            receive = %transport.local_addr()?,
            send = %transport.send_addr()?,
            robot = %resolver.host(),
            "driver station bound"
        );

        let (sink, telemetry) = telemetry::channel(config.telemetry_buffer);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);

        Ok(Station {
            link: LinkState::new(config.missed_packet_threshold),
            timers: Timers::new(config.discovery_interval, config.heartbeat_interval),
            control: ControlPacket::default(),
            config,
            transport,
            resolver,
            sink,
            telemetry: Some(telemetry),
            events,
            commands_tx,
            commands_rx,
            control_codec: ControlCodec,
            telemetry_codec: TelemetryCodec,
            send_buffer: BytesMut::with_capacity(CONTROL_PACKET_LEN),
            recv_buffer: BytesMut::with_capacity(MAX_DATAGRAM_SIZE),
        })
    }

    /// Address telemetry is received on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Configuration the station was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Subscribes to `Connected`/`Disconnected` events
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// Takes the telemetry stream; `None` if it was already taken
    pub fn telemetry(&mut self) -> Option<TelemetryStream> {
        self.telemetry.take()
    }

    /// Runs the engine on a new task
    pub fn spawn(self) -> StationHandle {
        let shutdown = CancellationToken::new();
        let commands = self.commands_tx.clone();
        let events = self.events.clone();
        let task = tokio::spawn(self.run(shutdown.clone()));

        StationHandle {
            shutdown,
            commands,
            events,
            task,
        }
    }

    /// Runs the engine until `shutdown` is cancelled
    ///
    /// Dropping the station on return closes both sockets and ends the
    /// telemetry stream.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(state = %self.link.state(), "driver station running");
        self.timers.start(self.link.active_timer());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                Some(command) = self.commands_rx.recv() => {
                    self.handle_command(command);
                }

                timer = self.timers.tick() => {
                    let effects = self.link.on_tick(timer);
                    self.apply(effects).await;
                }

                received = self.transport.recv_into(&mut self.recv_buffer) => match received {
                    Ok(from) => self.handle_datagram(from).await,
                    Err(e) => warn!(error = %e, "failed to receive datagram"),
                }
            }
        }

        self.timers.stop_all();
        info!(ping = self.control.ping, "driver station stopped");
        Ok(())
    }

    /// Decodes the datagram in the receive buffer and advances the link
    async fn handle_datagram(&mut self, from: SocketAddr) {
        let len = self.recv_buffer.len();
        let record = match self.telemetry_codec.decode(&mut self.recv_buffer) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(%from, "discarding empty datagram");
                return;
            }
            Err(e) => {
                debug!(%from, len, error = %e, "discarding datagram");
                return;
            }
        };

        let effects = self.link.on_datagram();
        self.apply(effects).await;

        trace!(%from, pong = record.pong, mode = record.mode, battery = %record.battery_voltage, "telemetry");
        self.sink.push(record);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetMode(mode) => {
                info!(%mode, "mode change requested");
                self.control.mode = mode;
            }
            Command::SetRebootAction(action) => {
                info!(?action, "reboot action requested");
                self.control.reboot = action;
            }
        }
    }

    /// Carries out state machine effects in order
    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Transmit => self.transmit().await,
                Effect::StopTimer(timer) => self.timers.stop(timer),
                Effect::StartTimer(timer) => self.timers.start(timer),
                Effect::Emit(event) => self.emit(event),
            }
        }
    }

    /// Sends the current control packet, then advances the ping counter
    ///
    /// Failures are logged only; the next tick sends again.
    async fn transmit(&mut self) {
        match self.resolver.resolve().await {
            Ok(target) => {
                if let Err(e) = self.send_control(target).await {
                    warn!(ping = self.control.ping, %target, error = %e, "failed to send control packet");
                }
            }
            Err(e) => debug!(ping = self.control.ping, error = %e, "robot address unresolved, skipping send"),
        }
        self.control.advance();
    }

    async fn send_control(&mut self, target: SocketAddr) -> Result<()> {
        self.send_buffer.clear();
        self.control_codec.encode(&self.control, &mut self.send_buffer)?;
        self.transport.send_to(&self.send_buffer, target).await?;
        trace!(ping = self.control.ping, mode = %self.control.mode, %target, "sent control packet");
        Ok(())
    }

    fn emit(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => info!(robot = ?self.resolver.cached(), "robot connected"),
            LinkEvent::Disconnected => {
                info!(missed = self.link.missed_packets(), "robot disconnected");
                self.resolver.invalidate();
            }
        }

        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Handle to a spawned [`Station`]
///
/// Dropping the handle leaves the engine running; call [`StationHandle::stop`]
/// to shut it down.
#[derive(Debug)]
pub struct StationHandle {
    shutdown: CancellationToken,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<LinkEvent>,
    task: JoinHandle<Result<()>>,
}

impl StationHandle {
    /// Requests a new operating mode for subsequent control packets
    pub async fn set_mode(&self, mode: Mode) -> Result<()> {
        self.send(Command::SetMode(mode)).await
    }

    /// Requests a reboot directive for subsequent control packets
    pub async fn set_reboot_action(&self, action: RebootAction) -> Result<()> {
        self.send(Command::SetRebootAction(action)).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::invalid_state("station has stopped"))
    }

    /// Subscribes to `Connected`/`Disconnected` events
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    /// Returns true once the engine task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the engine and waits for it to release its sockets
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.task
            .await
            .map_err(|e| Error::network(format!("Station task failed: {}", e)))?
    }
}
