use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{sleep, timeout};

use linechat::{Config, Server};

const PROMPT: &str = "SERVER: please set nickname with: NICK <name>";

fn local_config() -> Config {
    Config {
        listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        ..Config::default()
    }
}

async fn start_with(config: Config) -> SocketAddr {
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn start() -> SocketAddr {
    start_with(local_config()).await
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn raw(addr: SocketAddr) -> Self {
        Self::from_stream(TcpStream::connect(addr).await.unwrap())
    }

    fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::raw(addr).await;
        assert_eq!(client.recv().await, PROMPT);
        client
    }

    async fn register(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(&format!("NICK {name}\n")).await;
        assert_eq!(client.recv().await, format!("SERVER: welcome {name}"));
        client
    }

    async fn send(&mut self, data: &str) {
        self.writer.write_all(data.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed")
    }

    async fn assert_silent(&mut self) {
        let res = timeout(Duration::from_millis(200), self.lines.next_line()).await;
        assert!(res.is_err(), "unexpected input: {res:?}");
    }

    async fn assert_closed(&mut self) {
        let res = timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for close");
        assert!(matches!(res, Ok(None) | Err(_)), "still open: {res:?}");
    }
}

/// alice and bob, both registered, with the join notice consumed.
async fn pair(addr: SocketAddr) -> (Client, Client) {
    let mut alice = Client::register(addr, "alice").await;
    let bob = Client::register(addr, "bob").await;
    assert_eq!(alice.recv().await, "SERVER: bob has joined");
    (alice, bob)
}

#[tokio::test]
async fn unregistered_chat_is_answered_with_prompt() {
    let addr = start().await;
    let mut watcher = Client::register(addr, "watcher").await;
    let mut alice = Client::connect(addr).await;

    alice.send("hi there\n").await;
    assert_eq!(alice.recv().await, PROMPT);
    watcher.assert_silent().await;
}

#[tokio::test]
async fn chat_goes_to_everyone_but_the_sender() {
    let addr = start().await;
    let (mut alice, mut bob) = pair(addr).await;
    let mut lurker = Client::connect(addr).await;

    alice.send("hello all\r\n").await;
    assert_eq!(bob.recv().await, "[alice]: hello all");
    assert_eq!(lurker.recv().await, "[alice]: hello all");
    alice.assert_silent().await;
}

#[tokio::test]
async fn whisper_reaches_only_the_recipient() {
    let addr = start().await;
    let (mut alice, mut bob) = pair(addr).await;
    let mut carol = Client::register(addr, "carol").await;
    assert_eq!(alice.recv().await, "SERVER: carol has joined");
    assert_eq!(bob.recv().await, "SERVER: carol has joined");

    alice.send("/msg bob hello\n").await;
    assert_eq!(bob.recv().await, "[Private from alice]: hello");
    assert_eq!(alice.recv().await, "[Private to bob]: hello");
    carol.assert_silent().await;
    bob.assert_silent().await;
    alice.assert_silent().await;
}

#[tokio::test]
async fn whisper_errors_stay_with_the_sender() {
    let addr = start().await;
    let (mut alice, mut bob) = pair(addr).await;

    alice.send("/msg nobody hi\n/msg bob\n/msg \n/dance\n").await;
    assert_eq!(alice.recv().await, "SERVER: user not found");
    assert_eq!(alice.recv().await, "SERVER: empty message");
    assert_eq!(alice.recv().await, "SERVER: usage: /msg <user> <text>");
    assert_eq!(alice.recv().await, "SERVER: unknown command");
    bob.assert_silent().await;
}

#[tokio::test]
async fn list_shows_both_users() {
    let addr = start().await;
    let (mut alice, _bob) = pair(addr).await;

    alice.send("/list\n").await;
    assert_eq!(alice.recv().await, "SERVER: active users:");
    let mut names = vec![alice.recv().await, alice.recv().await];
    names.sort();
    assert_eq!(names, [" - alice", " - bob"]);
    alice.assert_silent().await;
}

#[tokio::test]
async fn duplicate_nickname_leaves_connection_open() {
    let addr = start().await;
    let mut alice = Client::register(addr, "alice").await;
    let mut second = Client::connect(addr).await;

    second.send("NICK alice\n").await;
    assert_eq!(second.recv().await, "SERVER: username taken, disconnecting");
    alice.assert_silent().await;

    second.send("NICK alice2\n").await;
    assert_eq!(second.recv().await, "SERVER: welcome alice2");
    assert_eq!(alice.recv().await, "SERVER: alice2 has joined");
}

#[tokio::test]
async fn invalid_nickname_is_rejected() {
    let addr = start().await;
    let mut client = Client::connect(addr).await;

    client.send("NICK \n").await;
    assert_eq!(client.recv().await, "SERVER: invalid nickname");
    client.send(&format!("NICK {}\n", "n".repeat(40))).await;
    assert_eq!(client.recv().await, "SERVER: invalid nickname");
}

#[tokio::test]
async fn fragmented_line_is_reassembled() {
    let addr = start().await;
    let mut client = Client::connect(addr).await;

    client.send("NICK ali").await;
    sleep(Duration::from_millis(50)).await;
    client.send("ce\n").await;
    assert_eq!(client.recv().await, "SERVER: welcome alice");
}

#[tokio::test]
async fn quit_announces_once_and_discards_the_rest() {
    let addr = start().await;
    let (mut alice, mut bob) = pair(addr).await;

    alice.send("/quit\nthis never arrives\n").await;
    assert_eq!(bob.recv().await, "SERVER: alice disconnected");
    alice.assert_closed().await;
    bob.assert_silent().await;

    // the name is free again
    let mut again = Client::register(addr, "alice").await;
    assert_eq!(bob.recv().await, "SERVER: alice has joined");
    again.assert_silent().await;
}

#[tokio::test]
async fn hang_up_announces_named_peers_only() {
    let addr = start().await;
    let (mut alice, bob) = pair(addr).await;
    let anon = Client::connect(addr).await;

    drop(anon);
    alice.assert_silent().await;

    drop(bob);
    assert_eq!(alice.recv().await, "SERVER: bob disconnected");
}

#[tokio::test]
async fn reset_peer_leaves_without_notice() {
    let addr = start().await;
    let mut alice = Client::register(addr, "alice").await;

    // kept whole: dropping a split write half would send FIN first
    let stream = TcpStream::connect(addr).await.unwrap();
    // closing with a zero linger sends RST, which the server sees as a read error
    stream.set_linger(Some(Duration::ZERO)).unwrap();
    let mut bob = BufReader::new(stream);
    let mut line = String::new();
    bob.read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), PROMPT);

    bob.get_mut().write_all(b"NICK bob\n").await.unwrap();
    line.clear();
    bob.read_line(&mut line).await.unwrap();
    assert_eq!(line, "SERVER: welcome bob\n");
    assert_eq!(alice.recv().await, "SERVER: bob has joined");

    drop(bob);
    alice.assert_silent().await;

    // bob is gone: the name is free and whispers to him fail
    alice.send("/msg bob hi\n").await;
    assert_eq!(alice.recv().await, "SERVER: user not found");
}

#[tokio::test]
async fn oversized_line_drops_the_connection() {
    let addr = start_with(Config {
        line_capacity: 16,
        ..local_config()
    })
    .await;
    let (mut alice, mut bob) = pair(addr).await;

    bob.send("this line never ends and keeps going").await;
    bob.assert_closed().await;
    assert_eq!(alice.recv().await, "SERVER: bob disconnected");
}

#[tokio::test]
async fn connections_over_the_limit_are_closed() {
    let addr = start_with(Config {
        max_connections: 1,
        ..local_config()
    })
    .await;
    let _first = Client::connect(addr).await;

    let mut second = Client::raw(addr).await;
    second.assert_closed().await;
}
