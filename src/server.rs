use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, trace};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout, Instant};

use crate::error::SourceQueryError;
use crate::info::ServerInfo;
use crate::packet::{
    PacketHeader, PacketType, RequestPacket, ResponsePacket, CHALLENGE_MARKER, MAX_PACKET_SIZE,
};
use crate::players::{parse_players, Player};
use crate::rules::{parse_rules, Rule};
use crate::split::{SplitAssembly, SplitHeader};

/// Where the challenge handshake is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    /// Nothing answered yet.
    Requested,
    /// Request resent with the server's challenge token.
    Challenged,
}

/// A query session bound to one game server.
///
/// Each method performs one complete request/response exchange before
/// returning; calls on the same session must not overlap. Dropping a pending
/// call abandons its receive, and dropping the session closes the socket.
#[derive(Debug)]
pub struct SourceServer {
    sock: UdpSocket,
    addr: SocketAddr,
    send_timeout: Duration,
    recv_timeout: Duration,
}

impl SourceServer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Resolve `host` (`address:port`) and open a session to the first address.
    ///
    /// If `timeout_dur` is `Some(Duration)`, it is used for resolving, connecting
    /// and every send and receive; otherwise 5 seconds.
    ///
    /// Example usage:
    /// ```no_run
    /// # async fn run() -> Result<(), sourcequery::error::SourceQueryError> {
    /// use sourcequery::server::SourceServer;
    ///
    /// let server = SourceServer::connect("nyc-1.us.uncletopia.com:27015", None).await?;
    /// let info = server.info().await?;
    /// println!("{} on {}", info.hostname, info.map);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(
        host: &str,
        timeout_dur: Option<Duration>,
    ) -> Result<Self, SourceQueryError> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(Self::DEFAULT_TIMEOUT);

        let addr: SocketAddr = timeout(timeout_dur, lookup_host(host))
            .await?
            .map_err(SourceQueryError::UnreachableHost)?
            .next()
            .ok_or_else(|| SourceQueryError::Resolve(host.to_owned()))?;

        Self::connect_addr(addr, Some(timeout_dur)).await
    }

    /// Open a session to an already resolved address.
    pub async fn connect_addr(
        addr: SocketAddr,
        timeout_dur: Option<Duration>,
    ) -> Result<Self, SourceQueryError> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(Self::DEFAULT_TIMEOUT);
        let sock: UdpSocket = bind_connected(addr, timeout_dur).await?;
        debug!("query session bound to {}", addr);

        Ok(SourceServer {
            sock,
            addr,
            send_timeout: timeout_dur,
            recv_timeout: timeout_dur,
        })
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_recv_timeout(mut self, recv_timeout: Duration) -> Self {
        self.recv_timeout = recv_timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Round-trip time of an A2S_INFO probe, measured up to the first datagram back.
    pub async fn ping(&self) -> Result<Duration, SourceQueryError> {
        let request: Vec<u8> = RequestPacket::info(None).pack();

        drain_stale(&self.sock);
        let start: Instant = Instant::now();
        send_all(&self.sock, &request, self.send_timeout).await?;
        let datagram: Vec<u8> = recv_datagram(&self.sock, self.recv_timeout).await?;
        let elapsed: Duration = start.elapsed();

        if datagram.is_empty() {
            return Err(SourceQueryError::ReceiveError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "empty datagram",
            )));
        }
        debug!("{} answered ping in {:?}", self.addr, elapsed);
        Ok(elapsed)
    }

    /// Query the server with A2S_INFO.
    pub async fn info(&self) -> Result<ServerInfo, SourceQueryError> {
        let request = RequestPacket::info(None);
        let packet: ResponsePacket = self.request(request, PacketType::Info).await?;
        ServerInfo::parse(&packet)
    }

    /// Query the server with A2S_RULES.
    pub async fn rules(&self) -> Result<Vec<Rule>, SourceQueryError> {
        let request = RequestPacket::rules(Some(CHALLENGE_MARKER));
        let packet: ResponsePacket = self.request(request, PacketType::Rules).await?;
        parse_rules(&packet)
    }

    /// Query the server with A2S_PLAYER.
    pub async fn players(&self) -> Result<Vec<Player>, SourceQueryError> {
        let request = RequestPacket::players(Some(CHALLENGE_MARKER));
        let packet: ResponsePacket = self.request(request, PacketType::Players).await?;
        parse_players(&packet)
    }

    /// Send `request` and return the response of type `expected`, answering at
    /// most one challenge on the way.
    async fn request(
        &self,
        request: RequestPacket,
        expected: PacketType,
    ) -> Result<ResponsePacket, SourceQueryError> {
        let mut state: Handshake = Handshake::Requested;
        let mut outgoing: RequestPacket = request;
        drain_stale(&self.sock);

        loop {
            debug!("sending {:?} to {} ({:?})", outgoing.packet_type(), self.addr, state);
            send_all(&self.sock, &outgoing.pack(), self.send_timeout).await?;
            let packet: ResponsePacket = self.receive_packet().await?;
            let got: PacketType = *packet.packet_type();

            match (state, got) {
                (_, got) if got == expected => return Ok(packet),
                (Handshake::Requested, PacketType::Challenge) => {
                    outgoing = outgoing.with_challenge(packet.challenge()?);
                    state = Handshake::Challenged;
                }
                (_, got) => {
                    return Err(SourceQueryError::UnexpectedPacketType {
                        expected: expected.to_byte(),
                        got: got.to_byte(),
                    })
                }
            }
        }
    }

    /// Receive one logical response, reassembling split packets.
    async fn receive_packet(&self) -> Result<ResponsePacket, SourceQueryError> {
        let datagram: Vec<u8> = recv_datagram(&self.sock, self.recv_timeout).await?;

        match PacketHeader::peek(&datagram)? {
            PacketHeader::Single => ResponsePacket::unpack(&datagram),
            PacketHeader::Split => {
                let (header, payload) = SplitHeader::parse(&datagram)?;
                debug!(
                    "split response {:#010X} from {}: {} fragments, compressed: {}",
                    header.id,
                    self.addr,
                    header.total,
                    header.is_compressed()
                );
                let mut assembly: SplitAssembly = SplitAssembly::new(&header);
                assembly.insert(&header, payload)?;

                while !assembly.is_complete() {
                    let datagram: Vec<u8> = recv_datagram(&self.sock, self.recv_timeout).await?;
                    let (header, payload) = SplitHeader::parse(&datagram)?;
                    assembly.insert(&header, payload)?;
                }

                ResponsePacket::unpack(&assembly.finish()?)
            }
        }
    }
}

/// Query `host` with A2S_INFO using a throwaway session.
///
/// Note that `timeout_dur` can elapse once per step: on resolve, on send, on
/// receive and twice more if challenged.
pub async fn query(
    host: &str,
    timeout_dur: Option<Duration>,
) -> Result<ServerInfo, SourceQueryError> {
    SourceServer::connect(host, timeout_dur).await?.info().await
}

/// Bind an ephemeral port of the same address family as `addr` and connect it.
pub(crate) async fn bind_connected(
    addr: SocketAddr,
    timeout_dur: Duration,
) -> Result<UdpSocket, SourceQueryError> {
    // just arbitrarily bind any port, doesn't matter really
    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let sock: UdpSocket = UdpSocket::bind(local)
        .await
        .map_err(SourceQueryError::FailedPortBind)?;

    timeout(timeout_dur, sock.connect(addr))
        .await?
        .map_err(SourceQueryError::UnreachableHost)?;

    Ok(sock)
}

/// Discard datagrams already queued on the socket, such as late fragments
/// of a previous exchange, so they are not taken as the next response.
pub(crate) fn drain_stale(sock: &UdpSocket) {
    let mut buf: Vec<u8> = vec![0u8; MAX_PACKET_SIZE];
    let mut dropped: usize = 0;
    while let Ok(len) = sock.try_recv(&mut buf) {
        trace!("dropping {} stale bytes", len);
        dropped += 1;
    }
    if dropped > 0 {
        debug!("dropped {} stale datagrams", dropped);
    }
}

pub(crate) async fn send_all(
    sock: &UdpSocket,
    packet: &[u8],
    timeout_dur: Duration,
) -> Result<(), SourceQueryError> {
    let sent: usize = timeout(timeout_dur, sock.send(packet))
        .await?
        .map_err(SourceQueryError::SendError)?;

    if sent != packet.len() {
        return Err(SourceQueryError::PartialSend {
            sent,
            len: packet.len(),
        });
    }
    trace!("sent {} bytes", sent);
    Ok(())
}

pub(crate) async fn recv_datagram(
    sock: &UdpSocket,
    timeout_dur: Duration,
) -> Result<Vec<u8>, SourceQueryError> {
    let mut resp_buf: Vec<u8> = vec![0u8; MAX_PACKET_SIZE];
    let len: usize = timeout(timeout_dur, sock.recv(&mut resp_buf))
        .await?
        .map_err(SourceQueryError::ReceiveError)?;

    resp_buf.truncate(len);
    trace!("received {} bytes", len);
    Ok(resp_buf)
}
