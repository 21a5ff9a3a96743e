use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use sourcequery::error::SourceQueryError;
use sourcequery::filter::{Filter, Region};
use sourcequery::master::MasterServer;

const HEADER: [u8; 6] = [0xFF, 0xFF, 0xFF, 0xFF, 0x66, 0x0A];

fn page(servers: &[&str], sentinel: bool) -> Vec<u8> {
    let mut out = HEADER.to_vec();
    let mut records: Vec<SocketAddrV4> = servers.iter().map(|s| s.parse().unwrap()).collect();
    if sentinel {
        records.push("0.0.0.0:0".parse().unwrap());
    }
    for record in records {
        out.extend_from_slice(&record.ip().octets());
        out.extend_from_slice(&record.port().to_be_bytes());
    }
    out
}

fn request(region: u8, cursor: &str, filter: &str) -> Vec<u8> {
    let mut out = vec![0x31, region];
    out.extend_from_slice(cursor.as_bytes());
    out.push(0);
    out.extend_from_slice(filter.as_bytes());
    out.push(0);
    out
}

/// A fake master server answering each expected request with one datagram.
async fn fake_master(script: Vec<(Vec<u8>, Vec<u8>)>) -> (SocketAddr, JoinHandle<()>) {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = sock.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        for (expected, reply) in script {
            let (len, peer) = sock.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], expected.as_slice());
            sock.send_to(&reply, peer).await.unwrap();
        }
    });

    (addr, handle)
}

async fn client(addr: SocketAddr) -> MasterServer {
    MasterServer::connect_addr(addr, Some(Duration::from_secs(2))).await.unwrap()
}

#[tokio::test]
async fn test_single_page_listing() {
    let (addr, handle) = fake_master(vec![(
        request(0xFF, "0.0.0.0:0", r"\appid\440"),
        page(&["1.2.3.4:27015", "5.6.7.8:27016"], true),
    )])
    .await;
    let master = client(addr).await;

    let servers = master
        .get_server_list(Region::World, &Filter::new().app_id(440))
        .await
        .unwrap();
    assert_eq!(
        servers,
        vec![
            "1.2.3.4:27015".parse::<SocketAddrV4>().unwrap(),
            "5.6.7.8:27016".parse::<SocketAddrV4>().unwrap(),
        ]
    );
    handle.await.unwrap();
}

#[tokio::test]
async fn test_listing_continues_from_last_address() {
    let filter = Filter::new().dedicated_only().map("de_dust2");
    let (addr, handle) = fake_master(vec![
        (
            request(0x03, "0.0.0.0:0", r"\type\d\map\de_dust2"),
            page(&["1.2.3.4:27015", "5.6.7.8:27016"], false),
        ),
        (
            request(0x03, "5.6.7.8:27016", r"\type\d\map\de_dust2"),
            page(&["9.9.9.9:27017"], true),
        ),
    ])
    .await;
    let master = client(addr).await;

    let servers = master.get_server_list(Region::Europe, &filter).await.unwrap();
    assert_eq!(servers.len(), 3);
    assert_eq!(servers[2], "9.9.9.9:27017".parse::<SocketAddrV4>().unwrap());
    handle.await.unwrap();
}

#[tokio::test]
async fn test_pages_track_cursor() {
    let (addr, handle) = fake_master(vec![
        (request(0xFF, "0.0.0.0:0", ""), page(&["1.1.1.1:1"], false)),
        (request(0xFF, "1.1.1.1:1", ""), page(&[], true)),
    ])
    .await;
    let master = client(addr).await;
    let filter = Filter::new();
    let mut pages = master.pages(Region::World, &filter);

    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.servers.len(), 1);
    assert!(!first.done);
    assert_eq!(pages.cursor(), "1.1.1.1:1".parse::<SocketAddrV4>().unwrap());

    let second = pages.next_page().await.unwrap().unwrap();
    assert!(second.servers.is_empty());
    assert!(second.done);
    assert!(pages.is_finished());

    assert_eq!(pages.next_page().await.unwrap(), None);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_empty_page_without_sentinel_ends_listing() {
    let (addr, handle) =
        fake_master(vec![(request(0xFF, "0.0.0.0:0", ""), page(&[], false))]).await;
    let master = client(addr).await;

    let servers = master.get_server_list(Region::World, &Filter::new()).await.unwrap();
    assert!(servers.is_empty());
    handle.await.unwrap();
}

#[tokio::test]
async fn test_cursor_that_does_not_advance_ends_listing() {
    let (addr, handle) = fake_master(vec![
        (request(0xFF, "0.0.0.0:0", ""), page(&["1.1.1.1:1"], false)),
        (request(0xFF, "1.1.1.1:1", ""), page(&["2.2.2.2:2", "1.1.1.1:1"], false)),
    ])
    .await;
    let master = client(addr).await;

    let servers = master
        .get_server_list(Region::World, &Filter::new())
        .await
        .unwrap();
    assert_eq!(servers.len(), 3);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_malformed_response_fails_listing() {
    let (addr, handle) = fake_master(vec![(
        request(0xFF, "0.0.0.0:0", ""),
        b"\xFF\xFF\xFF\xFFI\x11garbage".to_vec(),
    )])
    .await;
    let master = client(addr).await;

    assert!(matches!(
        master.get_server_list(Region::World, &Filter::new()).await,
        Err(SourceQueryError::MalformedDirectoryResponse(_))
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn test_failure_in_later_round_fails_listing() {
    let (addr, handle) = fake_master(vec![(
        request(0xFF, "0.0.0.0:0", ""),
        page(&["1.1.1.1:1"], false),
    )])
    .await;
    let master = client(addr)
        .await
        .with_recv_timeout(Duration::from_millis(100));

    // the fake master has gone away, so the second round either times out or is refused
    assert!(master.get_server_list(Region::World, &Filter::new()).await.is_err());
    handle.await.unwrap();
}
