use std::net::{IpAddr, SocketAddr};

use bytes::BytesMut;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::core::{Error, Result, MAX_DATAGRAM_SIZE};

/// The station's pair of UDP sockets
///
/// Control packets leave through an ephemeral send socket; telemetry arrives on
/// the well-known receive port.
#[derive(Debug)]
pub struct Transport {
    /// Socket control packets are sent from
    send_socket: UdpSocket,
    /// Socket telemetry is received on
    recv_socket: UdpSocket,
}

impl Transport {
    /// Binds both sockets on `bind_ip`
    pub async fn bind(bind_ip: IpAddr, receive_port: u16) -> Result<Self> {
        let recv_socket = bind_exclusive(SocketAddr::new(bind_ip, receive_port))
            .map_err(|e| Error::network(format!("Failed to bind receive socket: {}", e)))?;

        let send_socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0))
            .await
            .map_err(|e| Error::network(format!("Failed to bind send socket: {}", e)))?;

        Ok(Transport {
            send_socket,
            recv_socket,
        })
    }

    /// Sends one datagram
    pub async fn send_to(&self, datagram: &[u8], target: SocketAddr) -> Result<()> {
        self.send_socket.send_to(datagram, target).await?;
        Ok(())
    }

    /// Receives one datagram into `buffer`, replacing its contents
    ///
    /// Cancel safe: no data is lost if the future is dropped before completion.
    pub async fn recv_into(&self, buffer: &mut BytesMut) -> Result<SocketAddr> {
        buffer.clear();
        buffer.reserve(MAX_DATAGRAM_SIZE);
        let (_, from) = self.recv_socket.recv_buf_from(buffer).await?;
        Ok(from)
    }

    /// Returns the local address telemetry is received on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.recv_socket.local_addr()
            .map_err(|e| Error::network(format!("Failed to get local address: {}", e)))
    }

    /// Returns the local address control packets are sent from
    pub fn send_addr(&self) -> Result<SocketAddr> {
        self.send_socket.local_addr()
            .map_err(|e| Error::network(format!("Failed to get send address: {}", e)))
    }
}

/// Binds a non-blocking UDP socket that owns its port outright
///
/// Address reuse stays off: a second station on the same port must fail to
/// bind instead of silently splitting the robot's telemetry.
fn bind_exclusive(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(false)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    UdpSocket::from_std(socket.into())
}
