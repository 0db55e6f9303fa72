use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
};

use artnet_protocol::ArtCommand;
use tracing::{info, trace, warn};

use crate::{dispatcher::DmxFrame, error::BridgeError};

pub const ARTNET_PORT: u16 = 6454;
const MAX_DATAGRAM: usize = 1024;

/// Owned copy of a received frame, handed from the source to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    pub universe: u16,
    pub sequence: u8,
    pub data: Vec<u8>,
}

impl OwnedFrame {
    pub fn as_frame(&self) -> DmxFrame<'_> {
        DmxFrame { universe: self.universe, sequence: self.sequence, data: &self.data }
    }
}

/// Where control frames come from.
pub trait FrameSource: Send + 'static {
    /// Return at most one pending frame without blocking.
    fn poll(&mut self) -> Result<Option<OwnedFrame>, BridgeError>;

    /// Whether the source can deliver frames at all (link up, socket bound).
    fn is_ready(&self) -> bool {
        true
    }
}

/// Art-Net node listening for ArtDmx packets on a UDP socket.
pub struct ArtNetReceiver {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl ArtNetReceiver {
    pub fn bind(addr: SocketAddr) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        info!("art-net node listening on {}", socket.local_addr()?);
        Ok(Self { socket, buf: vec![0u8; MAX_DATAGRAM] })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BridgeError> {
        Ok(self.socket.local_addr()?)
    }
}

impl FrameSource for ArtNetReceiver {
    fn poll(&mut self) -> Result<Option<OwnedFrame>, BridgeError> {
        let (len, peer) = match self.socket.recv_from(&mut self.buf) {
            Ok(received) => received,
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let command = match ArtCommand::from_buffer(&self.buf[..len]) {
            Ok(command) => command,
            Err(e) => {
                warn!(%peer, "dropping unparsable art-net packet: {e:?}");
                return Ok(None);
            }
        };

        match command {
            ArtCommand::Output(output) => Ok(Some(OwnedFrame {
                universe: u16::from(output.port_address),
                sequence: output.sequence,
                data: output.data.as_ref().to_vec(),
            })),
            other => {
                trace!(%peer, "ignoring art-net packet {other:?}");
                Ok(None)
            }
        }
    }
}
