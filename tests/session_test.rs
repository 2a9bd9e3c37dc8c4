//! Session tests: envelopes over TCP and over UDP with a passthrough
//! reliability layer.

use parking_lot::Mutex;
use rtnet::base::{ConnectionState, ErrorCode, NetError};
use rtnet::buffer::BufferPool;
use rtnet::framing::PacketizerConfig;
use rtnet::session::{Envelope, Passthrough, ReliableSession, StreamSession};
use rtnet::socket::ConnectionConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

type Inbox = Arc<Mutex<Vec<(Envelope, Vec<u8>)>>>;

async fn echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

fn stream_session(inbox: &Inbox, framing: PacketizerConfig) -> StreamSession {
    let mut session =
        StreamSession::new(BufferPool::new(), ConnectionConfig::new(), framing).unwrap();
    let inbox = Arc::clone(inbox);
    session.on_message(move |envelope, payload| {
        inbox.lock().push((envelope, payload.readable().to_vec()));
    });
    session
}

async fn tick_until(session: &mut StreamSession, mut done: impl FnMut(&StreamSession) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done(&*session) {
        assert!(tokio::time::Instant::now() < deadline, "timed out in state {}", session.state());
        session.update();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_stream_session_echo() {
    let addr = echo_server().await;
    let inbox = Inbox::default();
    let mut session = stream_session(&inbox, PacketizerConfig::default());

    session.connect(addr).unwrap();
    tick_until(&mut session, |s| s.state() == ConnectionState::Running).await;

    let large: Vec<u8> = (0..200_000u32).map(|i| (i % 241) as u8).collect();
    session.post(1, b"posted").unwrap();
    session.send(77, 2, b"").unwrap();
    session.send(78, 3, &large).unwrap();

    let seen = Arc::clone(&inbox);
    tick_until(&mut session, |_| seen.lock().len() == 3).await;

    let inbox = inbox.lock();
    assert_eq!(inbox[0], (Envelope::new(1, 0), b"posted".to_vec()));
    assert_eq!(inbox[1], (Envelope::new(2, 77), Vec::new()));
    assert_eq!(inbox[2].0, Envelope::new(3, 78));
    assert_eq!(inbox[2].1, large);
}

#[tokio::test]
async fn test_stream_session_oversized_frame_aborts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _ = stream.write_all(&(1i32 << 20).to_be_bytes()).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let inbox = Inbox::default();
    let mut session = stream_session(&inbox, PacketizerConfig::new().max_frame_size(1024));
    session.connect(addr).unwrap();
    tick_until(&mut session, |s| s.state() == ConnectionState::Closed).await;

    assert_eq!(session.connection().last_error(), ErrorCode::FrameTooLarge);
    assert!(inbox.lock().is_empty());
}

#[tokio::test]
async fn test_connect_host_rejects_names() {
    let inbox = Inbox::default();
    let mut session = stream_session(&inbox, PacketizerConfig::default());
    assert!(matches!(session.connect_host("not an ip", 80), Err(NetError::Unreachable)));
    assert_eq!(session.state(), ConnectionState::Closed);
}

fn reliable_session(inbox: &Inbox) -> ReliableSession<Passthrough> {
    let local: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let mut session = ReliableSession::new(
        BufferPool::new(),
        ConnectionConfig::new(),
        PacketizerConfig::default(),
        local,
        Passthrough::new(),
    )
    .unwrap();
    let inbox = Arc::clone(inbox);
    session.on_message(move |envelope, payload| {
        inbox.lock().push((envelope, payload.readable().to_vec()));
    });
    session
}

#[tokio::test]
async fn test_reliable_sessions_exchange_messages() {
    let inbox_a = Inbox::default();
    let inbox_b = Inbox::default();
    let mut a = reliable_session(&inbox_a);
    let mut b = reliable_session(&inbox_b);

    let addr_a = a.connection().local_addr().unwrap();
    let addr_b = b.connection().local_addr().unwrap();
    a.connect(addr_b).unwrap();
    b.connect(addr_a).unwrap();

    let big: Vec<u8> = (0..5000u32).map(|i| (i % 199) as u8).collect();
    a.post(10, b"hello b").unwrap();
    a.send(5, 11, &big).unwrap();
    b.post(20, b"hello a").unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while inbox_a.lock().len() < 1 || inbox_b.lock().len() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "timed out");
        a.update();
        b.update();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(inbox_a.lock()[0], (Envelope::new(20, 0), b"hello a".to_vec()));
    let inbox_b = inbox_b.lock();
    assert_eq!(inbox_b[0], (Envelope::new(10, 0), b"hello b".to_vec()));
    assert_eq!(inbox_b[1], (Envelope::new(11, 5), big));
    assert_eq!(a.state(), ConnectionState::Running);
    assert_eq!(b.state(), ConnectionState::Running);
}
