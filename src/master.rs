//! Client for the Steam master server query protocol.
//!
//! See <https://developer.valvesoftware.com/wiki/Master_Server_Query_Protocol>.
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use log::{debug, warn};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::error::SourceQueryError;
use crate::filter::{Filter, Region};
use crate::parse::{get_u16_be, put_string, take};
use crate::server::{bind_connected, recv_datagram, send_all};

pub const MASTER_HOST: &str = "hl2master.steampowered.com";
pub const MASTER_PORT: u16 = 27011;

/// A2M_GET_SERVERS_BATCH2 ('1').
const QUERY_BATCH: u8 = 0x31;
/// Single-packet header followed by M2A_SERVER_BATCH ('f') and a newline.
const RESPONSE_HEADER: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];
const RECORD_SIZE: usize = 6;

/// The cursor of the first request, and the record that ends the listing.
pub const SENTINEL: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);

/// One round of a server listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPage {
    /// Servers in this batch, without the terminating sentinel.
    pub servers: Vec<SocketAddrV4>,
    /// The batch ended with the sentinel, so no further rounds are needed.
    pub done: bool,
}

/// Serialize a batch request starting after `cursor`.
pub fn encode_request(region: Region, cursor: SocketAddrV4, filter: &str) -> Vec<u8> {
    let mut payload: Vec<u8> = Vec::with_capacity(2 + 22 + filter.len() + 1);
    payload.push(QUERY_BATCH);
    payload.push(region.to_byte());
    put_string(&mut payload, &cursor.to_string());
    put_string(&mut payload, filter);
    payload
}

/// Decode one batch response.
pub fn decode_page(datagram: &[u8]) -> Result<DirectoryPage, SourceQueryError> {
    if datagram.len() < RESPONSE_HEADER.len() {
        return Err(SourceQueryError::MalformedDirectoryResponse("response too short"));
    }
    if datagram[..RESPONSE_HEADER.len()] != RESPONSE_HEADER {
        return Err(SourceQueryError::MalformedDirectoryResponse("unexpected header"));
    }

    let mut offset: usize = RESPONSE_HEADER.len();
    let mut servers: Vec<SocketAddrV4> =
        Vec::with_capacity((datagram.len() - offset) / RECORD_SIZE);
    let mut done: bool = false;

    while datagram.len() - offset >= RECORD_SIZE {
        let octets: &[u8] = take(datagram, &mut offset, 4)?;
        let ip = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
        let port: u16 = get_u16_be(datagram, &mut offset)?;

        let server = SocketAddrV4::new(ip, port);
        if server == SENTINEL {
            done = true;
            break;
        }
        servers.push(server);
    }

    Ok(DirectoryPage { servers, done })
}

/// A session bound to one master server address.
#[derive(Debug)]
pub struct MasterServer {
    sock: UdpSocket,
    addr: SocketAddr,
    send_timeout: Duration,
    recv_timeout: Duration,
}

impl MasterServer {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Resolve [MASTER_HOST] and open one session per address it resolves to.
    pub async fn list(
        timeout_dur: Option<Duration>,
    ) -> Result<Vec<MasterServer>, SourceQueryError> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(Self::DEFAULT_TIMEOUT);

        let addrs: Vec<SocketAddr> = timeout(timeout_dur, lookup_host((MASTER_HOST, MASTER_PORT)))
            .await?
            .map_err(SourceQueryError::UnreachableHost)?
            .collect();
        if addrs.is_empty() {
            return Err(SourceQueryError::Resolve(MASTER_HOST.to_owned()));
        }
        debug!("{} resolved to {} addresses", MASTER_HOST, addrs.len());

        let mut masters: Vec<MasterServer> = Vec::with_capacity(addrs.len());
        for addr in addrs {
            masters.push(Self::connect_addr(addr, Some(timeout_dur)).await?);
        }
        Ok(masters)
    }

    /// Open a session to a specific master server address.
    pub async fn connect_addr(
        addr: SocketAddr,
        timeout_dur: Option<Duration>,
    ) -> Result<Self, SourceQueryError> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(Self::DEFAULT_TIMEOUT);
        let sock: UdpSocket = bind_connected(addr, timeout_dur).await?;

        Ok(MasterServer {
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

    /// Page through the servers matching `filter`, one round per call to
    /// [ServerList::next_page].
    pub fn pages(&self, region: Region, filter: &Filter) -> ServerList<'_> {
        ServerList {
            master: self,
            region,
            filter: filter.to_string(),
            cursor: SENTINEL,
            finished: false,
        }
    }

    /// Every server matching `filter`. Fails as a whole if any round fails.
    pub async fn get_server_list(
        &self,
        region: Region,
        filter: &Filter,
    ) -> Result<Vec<SocketAddrV4>, SourceQueryError> {
        let mut pages: ServerList<'_> = self.pages(region, filter);
        let mut servers: Vec<SocketAddrV4> = Vec::new();

        while let Some(page) = pages.next_page().await? {
            servers.extend(page.servers);
        }

        debug!("{} listed {} servers", self.addr, servers.len());
        Ok(servers)
    }
}

/// An in-progress listing; see [MasterServer::pages].
#[derive(Debug)]
pub struct ServerList<'a> {
    master: &'a MasterServer,
    region: Region,
    filter: String,
    cursor: SocketAddrV4,
    finished: bool,
}

impl ServerList<'_> {
    /// Fetch the next page, or `None` once the listing is exhausted.
    ///
    /// A failed round leaves the cursor untouched so the caller may retry it.
    pub async fn next_page(&mut self) -> Result<Option<DirectoryPage>, SourceQueryError> {
        if self.finished {
            return Ok(None);
        }

        let request: Vec<u8> = encode_request(self.region, self.cursor, &self.filter);
        send_all(&self.master.sock, &request, self.master.send_timeout).await?;
        let datagram: Vec<u8> = recv_datagram(&self.master.sock, self.master.recv_timeout).await?;
        let page: DirectoryPage = decode_page(&datagram)?;
        debug!(
            "page after {} from {}: {} servers, done: {}",
            self.cursor,
            self.master.addr,
            page.servers.len(),
            page.done
        );

        match page.servers.last() {
            _ if page.done => self.finished = true,
            Some(last) if *last == self.cursor => {
                warn!("{} repeated cursor {}, stopping", self.master.addr, self.cursor);
                self.finished = true;
            }
            Some(last) => self.cursor = *last,
            None => {
                warn!("{} sent an empty page without a terminator", self.master.addr);
                self.finished = true;
            }
        }

        Ok(Some(page))
    }

    pub fn cursor(&self) -> SocketAddrV4 {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
