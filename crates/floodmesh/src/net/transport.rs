use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use log::debug;

use super::protocol::PACKET_SIZE;

/// Largest datagram read per poll; anything longer is truncated and then
/// rejected by the decoder as a wrong-length frame.
const RECV_BUFFER_SIZE: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("radio {0} is not attached to a medium")]
    Detached(u8),
    #[error("transmit fault on radio {0}")]
    TransmitFault(u8),
}

/// Raw frame boundary between the protocol core and the radio.
///
/// Both calls must return promptly; the control loop never blocks on them.
pub trait Transport {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;
    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send_frame(frame)
    }

    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        (**self).poll_frame()
    }
}

/// Shared-medium emulation over UDP: every frame goes to every peer.
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peers: Vec<SocketAddr>,
    recv_buffer: [u8; RECV_BUFFER_SIZE],
}

impl UdpTransport {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            peers: Vec::new(),
            recv_buffer: [0u8; RECV_BUFFER_SIZE],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn add_peer(&mut self, addr: SocketAddr) {
        if addr != self.local_addr && !self.peers.contains(&addr) {
            self.peers.push(addr);
        }
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }
}

impl Transport for UdpTransport {
    /// Fails if no peer accepted the frame; partial fan-out counts as sent.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let mut last_error = None;
        let mut delivered = self.peers.is_empty();

        for peer in &self.peers {
            match self.socket.send_to(frame, peer) {
                Ok(_) => delivered = true,
                Err(e) => {
                    debug!("send to {} failed: {}", peer, e);
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (false, Some(e)) => Err(TransportError::Io(e)),
            _ => Ok(()),
        }
    }

    fn poll_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((size, addr)) => {
                if size != PACKET_SIZE {
                    debug!("{} byte datagram from {}", size, addr);
                }
                Ok(Some(self.recv_buffer[..size].to_vec()))
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}
