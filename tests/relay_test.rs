//! End-to-end tests: a relay on an ephemeral port, exercised over real TCP.

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::rc::Rc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::LocalSet;

use postbox::config::Config;
use postbox::net::{Relay, SessionRegistry};
use postbox::protocol::relay::*;
use postbox::store::{mailbox::DEAD_LETTER_DIR, Storage};

const DOMAIN: &str = "example.org";

async fn spawn_relay(data_dir: &Path) -> (SocketAddr, SessionRegistry) {
    let mut cfg = Config::default();
    cfg.server.bind_addr = "127.0.0.1:0".into();
    cfg.server.domain = DOMAIN.into();
    cfg.storage.data_dir = data_dir.to_string_lossy().into_owned();

    let storage = Storage::open(&cfg).unwrap();
    let relay = Relay::bind(Rc::new(cfg), storage).await.unwrap();
    let addr = relay.local_addr().unwrap();
    let sessions = relay.sessions();
    tokio::task::spawn_local(relay.run());
    (addr, sessions)
}

async fn send(stream: &mut TcpStream, frame: &[u8]) {
    stream.write_all(frame).await.unwrap();
    stream.flush().await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut lenbuf = [0u8; 4];
    stream.read_exact(&mut lenbuf).await?;
    let len = u32::from_be_bytes(lenbuf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn roundtrip(stream: &mut TcpStream, frame: &[u8]) -> Vec<u8> {
    send(stream, frame).await;
    read_frame(stream).await.unwrap()
}

fn take_u32(p: &mut &[u8]) -> u32 {
    let v = u32::from_le_bytes(p[0..4].try_into().unwrap());
    *p = &p[4..];
    v
}

fn take_u64(p: &mut &[u8]) -> u64 {
    let v = u64::from_le_bytes(p[0..8].try_into().unwrap());
    *p = &p[8..];
    v
}

fn take_str(p: &mut &[u8]) -> String {
    let len = take_u32(p) as usize;
    let s = std::str::from_utf8(&p[..len]).unwrap().to_string();
    *p = &p[len..];
    s
}

/// Assert a FAIL frame and return (code, message).
fn parse_fail(frame: &[u8]) -> (u32, String) {
    assert_eq!(frame[0], MSG_FAIL, "expected FAIL, got tag 0x{:02x}", frame[0]);
    let mut p = &frame[1..];
    let code = take_u32(&mut p);
    (code, take_str(&mut p))
}

/// Assert an INBOX_LIST_OK frame and return (index, sender, subject, date) rows.
fn parse_inbox_list(frame: &[u8]) -> Vec<(u32, String, String, String)> {
    assert_eq!(frame[0], MSG_INBOX_LIST_OK);
    let mut p = &frame[1..];
    let count = take_u32(&mut p) as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let index = take_u32(&mut p);
        let sender = take_str(&mut p);
        let subject = take_str(&mut p);
        let date = take_str(&mut p);
        out.push((index, sender, subject, date));
    }
    out
}

fn mail(sender: &str, dest: &str, subject: &str) -> Email {
    Email {
        sender: sender.into(),
        destination: dest.into(),
        subject: subject.into(),
        date: String::new(), // server stamps it
        body: format!("body of {}", subject),
    }
}

/// Register an account on a fresh connection and leave it logged in.
async fn register(addr: SocketAddr, username: &str, password: &str) -> TcpStream {
    let mut c = TcpStream::connect(addr).await.unwrap();
    let resp = roundtrip(&mut c, &encode_auth_register(username, password)).await;
    assert_eq!(resp[0], MSG_OK, "registration of {} failed", username);
    c
}

#[tokio::test]
async fn test_duplicate_register_is_refused_and_keeps_credential() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let _alice = register(addr, "alice", "first").await;

            // second registration, different password, fresh connection
            let mut c = TcpStream::connect(addr).await.unwrap();
            let resp = roundtrip(&mut c, &encode_auth_register("alice", "second")).await;
            let (code, _) = parse_fail(&resp);
            assert_eq!(code, ERR_AUTH);

            // the original credential still wins
            let resp = roundtrip(&mut c, &encode_auth_login("alice", "first")).await;
            assert_eq!(resp[0], MSG_OK);
        })
        .await;
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let _alice = register(addr, "alice", "pw").await;

            let mut c = TcpStream::connect(addr).await.unwrap();
            let wrong_pw = roundtrip(&mut c, &encode_auth_login("alice", "nope")).await;
            let unknown = roundtrip(&mut c, &encode_auth_login("nobody", "nope")).await;

            let (code_a, msg_a) = parse_fail(&wrong_pw);
            let (code_b, msg_b) = parse_fail(&unknown);
            assert_eq!(code_a, ERR_AUTH);
            assert_eq!(code_b, ERR_AUTH);
            assert_eq!(msg_a, msg_b, "error must not reveal which accounts exist");
        })
        .await;
}

#[tokio::test]
async fn test_session_required_while_anonymous() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut c = TcpStream::connect(addr).await.unwrap();

            let requests = [
                encode_inbox_list(),
                encode_inbox_read(1),
                encode_email_send(&mail("a@example.org", "b@example.org", "x")),
                encode_stats(),
            ];
            for req in &requests {
                let resp = roundtrip(&mut c, req).await;
                let (code, _) = parse_fail(&resp);
                assert_eq!(code, ERR_SESSION);
            }
        })
        .await;
}

#[tokio::test]
async fn test_fresh_account_has_empty_inbox() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;

            let resp = roundtrip(&mut alice, &encode_inbox_list()).await;
            assert!(parse_inbox_list(&resp).is_empty());
        })
        .await;
}

#[tokio::test]
async fn test_delivery_lists_newest_first() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;
            let mut bob = register(addr, "bob", "pw").await;

            for subject in ["first", "second", "third"] {
                let resp = roundtrip(
                    &mut alice,
                    &encode_email_send(&mail("alice@example.org", "bob@example.org", subject)),
                )
                .await;
                assert_eq!(resp[0], MSG_OK);
            }

            let rows = parse_inbox_list(&roundtrip(&mut bob, &encode_inbox_list()).await);
            let subjects: Vec<_> = rows.iter().map(|r| r.2.as_str()).collect();
            assert_eq!(subjects, ["third", "second", "first"]);
            let indexes: Vec<_> = rows.iter().map(|r| r.0).collect();
            assert_eq!(indexes, [1, 2, 3]);
            assert!(rows.iter().all(|r| r.1 == "alice@example.org"));
        })
        .await;
}

#[tokio::test]
async fn test_read_roundtrip_and_out_of_range() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;
            let mut bob = register(addr, "bob", "pw").await;

            let resp = roundtrip(
                &mut alice,
                &encode_email_send(&mail("alice@example.org", "bob@example.org", "hello")),
            )
            .await;
            assert_eq!(resp[0], MSG_OK);

            let resp = roundtrip(&mut bob, &encode_inbox_read(1)).await;
            assert_eq!(resp[0], MSG_INBOX_READ_OK);
            let mut p = &resp[1..];
            assert_eq!(take_str(&mut p), "alice@example.org");
            assert_eq!(take_str(&mut p), "bob@example.org");
            assert_eq!(take_str(&mut p), "hello");
            let date = take_str(&mut p);
            assert!(!date.is_empty(), "server must stamp a missing date");
            assert_eq!(take_str(&mut p), "body of hello");

            for bad in [0u32, 2, 99] {
                let resp = roundtrip(&mut bob, &encode_inbox_read(bad)).await;
                let (code, _) = parse_fail(&resp);
                assert_eq!(code, ERR_DELIVERY);
            }
        })
        .await;
}

#[tokio::test]
async fn test_unknown_recipient_is_dead_lettered() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;

            let resp = roundtrip(
                &mut alice,
                &encode_email_send(&mail("alice@example.org", "ghost@example.org", "boo")),
            )
            .await;
            let (code, _) = parse_fail(&resp);
            assert_eq!(code, ERR_DELIVERY);

            let dead: Vec<_> = std::fs::read_dir(tmp.path().join(DEAD_LETTER_DIR))
                .unwrap()
                .collect();
            assert_eq!(dead.len(), 1, "exactly one dead-letter record");
        })
        .await;
}

#[tokio::test]
async fn test_foreign_domain_is_rejected_without_record() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;
            let mut bob = register(addr, "bob", "pw").await;

            let resp = roundtrip(
                &mut alice,
                &encode_email_send(&mail("alice@example.org", "bob@elsewhere.net", "hi")),
            )
            .await;
            let (code, _) = parse_fail(&resp);
            assert_eq!(code, ERR_DELIVERY);

            assert_eq!(
                std::fs::read_dir(tmp.path().join(DEAD_LETTER_DIR))
                    .unwrap()
                    .count(),
                0
            );
            assert!(parse_inbox_list(&roundtrip(&mut bob, &encode_inbox_list()).await).is_empty());
        })
        .await;
}

#[tokio::test]
async fn test_logout_returns_to_anonymous_but_keeps_connection() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;

            let resp = roundtrip(&mut alice, &encode_auth_logout()).await;
            assert_eq!(resp[0], MSG_OK);

            // same connection, now anonymous
            let resp = roundtrip(&mut alice, &encode_inbox_list()).await;
            let (code, _) = parse_fail(&resp);
            assert_eq!(code, ERR_SESSION);

            // and it can log back in
            let resp = roundtrip(&mut alice, &encode_auth_login("alice", "pw")).await;
            assert_eq!(resp[0], MSG_OK);
            let resp = roundtrip(&mut alice, &encode_inbox_list()).await;
            assert_eq!(resp[0], MSG_INBOX_LIST_OK);
        })
        .await;
}

#[tokio::test]
async fn test_disconnect_clears_session() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, sessions) = spawn_relay(tmp.path()).await;
            let alice = register(addr, "alice", "pw").await;
            assert_eq!(sessions.active_count(), 1);

            drop(alice);

            // give the reactor a chance to observe the close
            for _ in 0..100 {
                if sessions.active_count() == 0 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
            assert_eq!(sessions.active_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_bye_closes_connection_and_session() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, sessions) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;

            send(&mut alice, &encode_bye("alice")).await;

            // no response; the server just closes
            let err = read_frame(&mut alice).await.unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

            for _ in 0..100 {
                if sessions.active_count() == 0 {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
            assert_eq!(sessions.active_count(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_stats_reports_count_and_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;
            let mut bob = register(addr, "bob", "pw").await;

            for subject in ["a", "b"] {
                let resp = roundtrip(
                    &mut alice,
                    &encode_email_send(&mail("alice@example.org", "bob@example.org", subject)),
                )
                .await;
                assert_eq!(resp[0], MSG_OK);
            }

            let resp = roundtrip(&mut bob, &encode_stats()).await;
            assert_eq!(resp[0], MSG_STATS_OK);
            let mut p = &resp[1..];
            assert_eq!(take_u32(&mut p), 2);
            assert!(take_u64(&mut p) > 0);

            // the sender's own mailbox is untouched
            let resp = roundtrip(&mut alice, &encode_stats()).await;
            let mut p = &resp[1..];
            assert_eq!(take_u32(&mut p), 0);
        })
        .await;
}

#[tokio::test]
async fn test_relogin_on_second_connection_sees_delivered_mail() {
    let tmp = tempfile::tempdir().unwrap();
    LocalSet::new()
        .run_until(async {
            let (addr, _) = spawn_relay(tmp.path()).await;
            let mut alice = register(addr, "alice", "pw").await;
            let bob = register(addr, "bob", "pw").await;
            drop(bob);

            let resp = roundtrip(
                &mut alice,
                &encode_email_send(&mail("alice@example.org", "bob@example.org", "later")),
            )
            .await;
            assert_eq!(resp[0], MSG_OK);

            // mail persisted across bob's sessions
            let mut bob = TcpStream::connect(addr).await.unwrap();
            let resp = roundtrip(&mut bob, &encode_auth_login("bob", "pw")).await;
            assert_eq!(resp[0], MSG_OK);
            let rows = parse_inbox_list(&roundtrip(&mut bob, &encode_inbox_list()).await);
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].2, "later");
        })
        .await;
}
