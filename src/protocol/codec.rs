use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::{Error, Result};
use super::message::{ControlPacket, TelemetryRecord};

/// Size of an encoded control packet
pub const CONTROL_PACKET_LEN: usize = 6;

/// Shortest datagram that carries a full telemetry record
pub const MIN_TELEMETRY_LEN: usize = 7;

/// Reserved byte at offset 2 of every control packet
const CONTROL_RESERVED_HEADER: u8 = 0x01;

/// Reserved byte at offset 5 of every control packet
const CONTROL_RESERVED_TRAILER: u8 = 0x00;

/// Encodes a control packet into its 6-byte wire form
pub fn encode_control(packet: &ControlPacket) -> [u8; CONTROL_PACKET_LEN] {
    let [ping_hi, ping_lo] = packet.ping.to_be_bytes();
    [
        ping_hi,
        ping_lo,
        CONTROL_RESERVED_HEADER,
        packet.mode.to_byte(),
        packet.reboot.to_byte(),
        CONTROL_RESERVED_TRAILER,
    ]
}

/// Decodes a telemetry datagram
pub fn decode_telemetry(mut buf: &[u8]) -> Result<TelemetryRecord> {
    if buf.len() < MIN_TELEMETRY_LEN {
        return Err(Error::malformed(buf.len(), MIN_TELEMETRY_LEN));
    }

    let pong = buf.get_u16();
    buf.advance(1);
    let mode = buf.get_u8();
    buf.advance(1);
    let battery_voltage = format!("{:02x}.{:02x}", buf.get_u8(), buf.get_u8());

    Ok(TelemetryRecord {
        pong,
        mode,
        battery_voltage,
    })
}

/// Encoder for outbound control packets
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlCodec;

impl<'a> Encoder<&'a ControlPacket> for ControlCodec {
    type Error = Error;

    fn encode(&mut self, item: &'a ControlPacket, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(CONTROL_PACKET_LEN);
        dst.put_slice(&encode_control(item));
        Ok(())
    }
}

/// Decoder for inbound telemetry datagrams
///
/// The source buffer is treated as exactly one datagram: it is always consumed
/// whole, and a short datagram is an error rather than a request for more data.
#[derive(Clone, Copy, Debug, Default)]
pub struct TelemetryCodec;

impl Decoder for TelemetryCodec {
    type Item = TelemetryRecord;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        decode_telemetry(&datagram).map(Some)
    }
}
