//! Integration tests for mpc-client.
//!
//! A `tokio::io::duplex` pipe stands in for the daemon socket; the test
//! plays the daemon's side line by line.

use std::time::Duration;

use mpc_client::{Client, Command, Event, MpcError};
use tokio::io::{
    duplex, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
};
use tokio::time::timeout;

const GREETING: &[u8] = b"OK MPD 0.23.5\n";

/// The daemon end of the pipe.
struct MockDaemon<S> {
    io: BufReader<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> MockDaemon<S> {
    async fn expect(&mut self, expected: &str) {
        let mut line = String::new();
        timeout(Duration::from_secs(5), self.io.read_line(&mut line))
            .await
            .expect("timed out waiting for a command")
            .unwrap();
        assert_eq!(line.trim_end_matches('\n'), expected);
    }

    async fn expect_batch(&mut self, commands: &[&str]) {
        self.expect("command_list_ok_begin").await;
        for command in commands {
            self.expect(command).await;
        }
        self.expect("command_list_end").await;
    }

    async fn send(&mut self, bytes: &[u8]) {
        self.io.get_mut().write_all(bytes).await.unwrap();
    }

    /// Answer the pending `idle` after a `noidle`.
    async fn leave_idle(&mut self) {
        self.expect("noidle").await;
        self.send(b"OK\n").await;
    }
}

async fn connect_with(greeting: &[u8]) -> (Client, MockDaemon<DuplexStream>) {
    let (client_io, daemon_io) = duplex(64 * 1024);
    let mut daemon = MockDaemon {
        io: BufReader::new(daemon_io),
    };
    daemon.send(greeting).await;

    let client = Client::connect(client_io).await.unwrap();
    daemon.expect("idle").await;
    (client, daemon)
}

async fn connect() -> (Client, MockDaemon<DuplexStream>) {
    connect_with(GREETING).await
}

async fn next_event(events: &mut mpc_client::EventStream) -> Event {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for an event")
        .unwrap()
}

/// Test that the greeting version is exposed, whatever the ident.
#[tokio::test]
async fn test_greeting_version() {
    let (client, _daemon) = connect_with(b"OK mympd 0.23.5\n").await;
    assert_eq!(client.version().as_triple(), [0, 23, 5]);
}

/// Test idle changes turn into events and idle is re-entered.
#[tokio::test]
async fn test_idle_change_events() {
    let (client, mut daemon) = connect().await;
    let mut events = client.subscribe();

    daemon.send(b"changed: player\nOK\n").await;

    assert_eq!(
        next_event(&mut events).await,
        Event::Changed {
            subsystems: vec!["player".into()]
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        Event::SubsystemChanged {
            subsystem: "player".into()
        }
    );
    daemon.expect("idle").await;
}

/// Test a lone command goes out bare, between noidle and idle.
#[tokio::test]
async fn test_single_command() {
    let (client, mut daemon) = connect().await;

    let handle = client.submit("status").unwrap();
    daemon.leave_idle().await;
    daemon.expect("status").await;
    daemon.send(b"volume: 50\nstate: play\nOK\n").await;

    let response = handle.await.unwrap();
    assert_eq!(response.lines, vec!["volume: 50", "state: play"]);
    assert_eq!(response.record().get_parsed::<u32>("volume"), Some(50));
    daemon.expect("idle").await;
}

/// Test commands submitted together share one command list and settle in
/// submission order.
#[tokio::test]
async fn test_batch_settles_in_order() {
    let (client, mut daemon) = connect().await;

    let handles: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|c| client.submit(*c).unwrap())
        .collect();

    daemon.leave_idle().await;
    daemon.expect_batch(&["a", "b", "c"]).await;
    daemon
        .send(b"n: 1\nlist_OK\nn: 2\nlist_OK\nn: 3\nlist_OK\nOK\n")
        .await;

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.await.unwrap();
        assert_eq!(response.lines, vec![format!("n: {}", i + 1)]);
    }
    daemon.expect("idle").await;
}

/// Test a failing list member settles with the ACK, and the members the
/// daemon skipped are sent again.
#[tokio::test]
async fn test_ack_requeues_rest_of_list() {
    let (client, mut daemon) = connect().await;

    let first = client.submit("first").unwrap();
    let second = client.submit("second").unwrap();
    let third = client.submit("third").unwrap();

    daemon.leave_idle().await;
    daemon.expect_batch(&["first", "second", "third"]).await;
    daemon
        .send(b"list_OK\nACK [50@1] {second} No such song\n")
        .await;

    assert!(first.await.unwrap().is_empty());

    let err = second.await.unwrap_err();
    assert!(!err.is_fatal());
    let ack = err.as_ack().unwrap();
    assert_eq!((ack.code, ack.index), (50, 1));
    assert_eq!(ack.command, "second");
    assert_eq!(ack.message, "No such song");

    daemon.expect("third").await;
    daemon.send(b"OK\n").await;
    assert!(third.await.is_ok());

    // the session is still usable
    daemon.expect("idle").await;
    assert!(client.is_connected());
}

/// Test a binary segment is attached to its response.
#[tokio::test]
async fn test_binary_response() {
    let (client, mut daemon) = connect().await;

    let handle = client
        .submit(Command::new("albumart").arg("a.flac").arg(0))
        .unwrap();
    daemon.leave_idle().await;
    daemon.expect("albumart a.flac 0").await;
    daemon.send(b"size: 5\nbinary: 5\nHEL").await;
    daemon.send(b"LO\nOK\n").await;

    let response = handle.await.unwrap();
    assert_eq!(response.lines, vec!["size: 5"]);
    assert_eq!(response.binary.as_deref(), Some(&b"HELLO"[..]));
}

/// Test arguments are quoted on the wire.
#[tokio::test]
async fn test_command_quoting_on_wire() {
    let (client, mut daemon) = connect().await;

    let handle = client
        .submit(Command::new("find").arg("Artist").arg("Miles \"The Man\" Davis"))
        .unwrap();
    daemon.leave_idle().await;
    daemon
        .expect(r#"find Artist "Miles \"The Man\" Davis""#)
        .await;
    daemon.send(b"OK\n").await;
    assert!(handle.await.is_ok());
}

/// Test a response delivered one byte at a time.
#[tokio::test]
async fn test_byte_by_byte_delivery() {
    let (client, mut daemon) = connect().await;

    let handle = client.submit("currentsong").unwrap();
    daemon.leave_idle().await;
    daemon.expect("currentsong").await;
    for byte in b"file: x.flac\nTitle: X\nOK\n" {
        daemon.send(&[*byte]).await;
    }

    let record = handle.await.unwrap().record();
    assert_eq!(record.get("file"), Some("x.flac"));
    assert_eq!(record.get("Title"), Some("X"));
}

/// Test disconnect settles queued and in-flight requests.
#[tokio::test]
async fn test_disconnect_settles_everything() {
    let (client, mut daemon) = connect().await;
    let mut events = client.subscribe();

    let in_flight = client.submit("status").unwrap();
    daemon.leave_idle().await;
    daemon.expect("status").await;
    let queued = client.submit("stats").unwrap();

    client.disconnect().await;

    assert!(matches!(in_flight.await, Err(MpcError::Disconnected(_))));
    assert!(matches!(queued.await, Err(MpcError::Disconnected(_))));
    assert!(matches!(
        next_event(&mut events).await,
        Event::Disconnected { .. }
    ));
    assert!(!client.is_connected());
}

/// Test the daemon closing the socket ends the session.
#[tokio::test]
async fn test_daemon_hangup() {
    let (client, daemon) = connect().await;
    let mut events = client.subscribe();
    let handle = client.submit("status").unwrap();

    drop(daemon);

    assert!(matches!(handle.await, Err(MpcError::Disconnected(_))));
    assert!(matches!(
        next_event(&mut events).await,
        Event::Disconnected { .. }
    ));
    timeout(Duration::from_secs(5), client.closed())
        .await
        .unwrap();
}

/// Test an oversized binary segment is fatal.
#[tokio::test]
async fn test_oversized_binary_is_fatal() {
    let (client_io, daemon_io) = duplex(4096);
    let mut daemon = MockDaemon {
        io: BufReader::new(daemon_io),
    };
    daemon.send(GREETING).await;

    let client = Client::builder()
        .max_binary_size(4)
        .connect(client_io)
        .await
        .unwrap();
    daemon.expect("idle").await;

    let handle = client.submit("readpicture a.flac 0").unwrap();
    daemon.leave_idle().await;
    daemon.expect("readpicture a.flac 0").await;
    daemon.send(b"binary: 5\nHELLO\nOK\n").await;

    assert!(matches!(handle.await, Err(MpcError::Disconnected(_))));
    timeout(Duration::from_secs(5), client.closed())
        .await
        .unwrap();
}

/// Test dropping a handle does not break correlation for later commands.
#[tokio::test]
async fn test_dropped_handle_keeps_order() {
    let (client, mut daemon) = connect().await;

    drop(client.submit("status").unwrap());
    let kept = client.submit("stats").unwrap();

    daemon.leave_idle().await;
    daemon.expect_batch(&["status", "stats"]).await;
    daemon.send(b"state: stop\nlist_OK\nsongs: 3\nlist_OK\nOK\n").await;

    assert_eq!(kept.await.unwrap().lines, vec!["songs: 3"]);
}

/// Test connecting to a TCP endpoint.
#[tokio::test]
async fn test_connect_tcp_endpoint() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut daemon = MockDaemon {
            io: BufReader::new(socket),
        };
        daemon.send(GREETING).await;
        daemon.expect("idle").await;
        daemon.leave_idle().await;
        daemon.expect("ping").await;
        daemon.send(b"OK\n").await;
        daemon.expect("idle").await;
    });

    let endpoint = mpc_client::Endpoint::tcp("127.0.0.1", port);
    let client = Client::builder().connect_endpoint(&endpoint).await.unwrap();
    client.ping().await.unwrap();

    server.await.unwrap();
}

/// Test a response completed just before a framing error settles the same
/// way whether both arrive in one read or in two.
#[tokio::test]
async fn test_framing_error_after_response_keeps_response() {
    let whole: &[&[u8]] = &[b"OK\nbinary: x\n"];
    let split: &[&[u8]] = &[b"OK\n", b"binary: x\n"];

    for chunks in [whole, split] {
        let (client, mut daemon) = connect().await;

        let handle = client.submit("ping").unwrap();
        daemon.leave_idle().await;
        daemon.expect("ping").await;
        for chunk in chunks {
            daemon.send(chunk).await;
            tokio::task::yield_now().await;
        }

        assert!(handle.await.unwrap().is_empty());
        timeout(Duration::from_secs(5), client.closed())
            .await
            .unwrap();
    }
}
