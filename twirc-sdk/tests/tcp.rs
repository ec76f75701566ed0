//! Integration tests: real `TcpTransport` against an in-process fake Twitch
//! chat server.

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use twirc_sdk::{Client, ConnectConfig, Error, EventKind, Status, Tick};

const TICK: Duration = Duration::from_millis(50);
const MAX_TICKS: usize = 200;

/// Helper: read lines from the client until one starts with `prefix`.
fn expect_line(reader: &mut BufReader<TcpStream>, seen: &mut Vec<String>, prefix: &str) {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).expect("read from client");
        assert!(n > 0, "client closed while waiting for {prefix}");
        let line = line.trim_end().to_string();
        let done = line.starts_with(prefix);
        seen.push(line);
        if done {
            return;
        }
    }
}

/// Helper: start a one-shot server that logs the client in, confirms its
/// join, sends one chat line and hangs up. Returns the port and a handle
/// yielding every line the client sent.
fn start_fake_twitch() -> (u16, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut seen = Vec::new();

        expect_line(&mut reader, &mut seen, "NICK ");
        writer
            .write_all(
                b":tmi.twitch.tv CAP * ACK :twitch.tv/tags twitch.tv/commands twitch.tv/membership\r\n\
                  :tmi.twitch.tv 001 bot :Welcome, GLHF!\r\n\
                  @badge-info=;color=#0000FF;display-name=Bot;user-id=99 :tmi.twitch.tv GLOBALUSERSTATE\r\n",
            )
            .unwrap();

        expect_line(&mut reader, &mut seen, "JOIN ");
        writer
            .write_all(
                b":bot!bot@bot.tmi.twitch.tv JOIN #foo\r\n\
                  @color=#FF0000;display-name=alice :alice!alice@alice.tmi.twitch.tv PRIVMSG #foo :hello\r\n",
            )
            .unwrap();

        expect_line(&mut reader, &mut seen, "PRIVMSG #foo :hi alice");
        seen
    });

    (port, handle)
}

// ── Test: full session over TCP ─────────────────────────────────────

#[test]
fn authenticated_session_over_tcp() {
    let (port, server) = start_fake_twitch();

    let mut client: Client<Vec<String>> = Client::new();
    client.set_context(Vec::new());
    client.on(EventKind::Connect, |c, _| c.context_mut().unwrap().push("connect".into()));
    client.on(EventKind::Welcome, |c, _| {
        c.context_mut().unwrap().push("welcome".into());
        c.join("#foo").unwrap();
    });
    client.on(EventKind::GlobalIdentity, |c, _| {
        let name = c.login().display_name().unwrap_or("?").to_string();
        c.context_mut().unwrap().push(format!("identity:{name}"));
    });
    client.on(EventKind::Join, |c, evt| {
        let own = c.login().nick().is_some_and(|n| evt.is_from(n));
        c.context_mut().unwrap().push(format!("join:{own}"));
    });
    client.on(EventKind::Privmsg, |c, evt| {
        let color = evt.tag("color").unwrap_or("none").to_string();
        c.context_mut().unwrap().push(format!("privmsg:{color}"));
        let reply = format!("hi {}", evt.origin.as_deref().unwrap_or("?"));
        c.privmsg("#foo", &reply).unwrap();
    });
    client.on(EventKind::Disconnect, |c, _| c.context_mut().unwrap().push("disconnect".into()));

    client
        .connect_with(&ConnectConfig {
            host: "127.0.0.1".to_string(),
            port,
            nick: Some("bot".to_string()),
            token: Some("secret".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(client.status(), Status::Authenticating);

    let mut ticks = 0;
    while client.tick(TICK).is_alive() {
        ticks += 1;
        assert!(ticks < MAX_TICKS, "server never hung up");
    }

    assert_eq!(
        client.context().unwrap(),
        &vec![
            "connect",
            "welcome",
            "identity:Bot",
            "join:true",
            "privmsg:#FF0000",
            "disconnect",
        ]
    );
    assert_eq!(client.status(), Status::Disconnected);
    assert_eq!(client.login().user_id(), Some("99"));
    assert_eq!(client.tick(TICK), Tick::ConnectionLost);

    let sent = server.join().unwrap();
    assert_eq!(
        sent,
        vec![
            "CAP REQ :twitch.tv/tags twitch.tv/commands twitch.tv/membership",
            "PASS oauth:secret",
            "NICK bot",
            "JOIN #foo",
            "PRIVMSG #foo :hi alice",
        ]
    );
}

// ── Test: idle ticks honor the timeout ──────────────────────────────

#[test]
fn idle_tick_returns_after_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut seen = Vec::new();
        expect_line(&mut reader, &mut seen, "NICK justinfan");
        // Keep the socket open until the client leaves.
        let mut rest = String::new();
        while reader.read_line(&mut rest).unwrap_or(0) > 0 {}
        seen
    });

    let disconnects = Rc::new(RefCell::new(0));
    let mut client: Client = Client::new();
    let counter = disconnects.clone();
    client.on(EventKind::Disconnect, move |_, _| *counter.borrow_mut() += 1);
    client.connect_anon("127.0.0.1", port).unwrap();
    assert!(client.login().is_anonymous());

    assert_eq!(client.tick(TICK), Tick::Continue);
    let start = std::time::Instant::now();
    assert_eq!(client.tick(TICK), Tick::Idle);
    assert!(start.elapsed() >= TICK / 2);

    client.disconnect().unwrap();
    assert_eq!(*disconnects.borrow(), 1);
    let sent = server.join().unwrap();
    assert!(!sent.iter().any(|l| l.starts_with("PASS")));
}

// ── Test: refused connection ────────────────────────────────────────

#[test]
fn refused_connection_is_reported() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client: Client = Client::new();
    client.on(EventKind::Disconnect, |_, _| panic!("nothing to disconnect"));
    let err = client.connect("127.0.0.1", port, "bot", "oauth:x").unwrap_err();

    assert!(matches!(err, Error::Connect { .. }), "unexpected error: {err}");
    assert_eq!(client.status(), Status::Disconnected);
    assert!(!client.is_connected());
    assert_eq!(client.tick(TICK), Tick::ConnectionLost);
}
