//! UDP listener for remote control packets.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

use rover_core::control::MAX_PACKET_LEN;

use crate::controller::ControllerHandle;

pub struct UdpControl {
    socket: UdpSocket,
}

impl UdpControl {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(target: "udp", "listening for control packets on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Forwards datagrams to the controller until it stops.
    pub async fn run(self, controller: ControllerHandle) -> io::Result<()> {
        // One spare byte so oversized datagrams are detected, not truncated.
        let mut buf = [0u8; MAX_PACKET_LEN + 1];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            trace!(target: "udp", %peer, len, "datagram");
            if len > MAX_PACKET_LEN {
                warn!(target: "udp", %peer, "oversized control packet dropped");
                continue;
            }
            if controller.control_packet(buf[..len].to_vec()).await.is_err() {
                info!(target: "udp", "controller stopped, closing listener");
                return Ok(());
            }
        }
    }
}
