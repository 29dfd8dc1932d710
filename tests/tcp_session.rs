//! TCP session tests against a scripted debug monitor on localhost

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::net::SocketAddr;
use std::time::Duration;

use remote_memory_stream::config::ConnectionConfig;
use remote_memory_stream::core::command::Command;
use remote_memory_stream::memory::{AllowAll, MemoryStream, SeekOrigin};
use remote_memory_stream::transport::{CommandSession, TcpCommandSession};
use remote_memory_stream::MemoryError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const BASE: i64 = 0x10000;

/// How the fake monitor misbehaves
#[derive(Clone, Copy, PartialEq)]
enum Script {
    Normal,
    /// Acknowledge getmem2, send half the payload, hang up
    HangUpMidPayload,
    /// Banner, then silence
    Silent,
    /// Wrong greeting
    BadBanner,
}

fn param<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_whitespace()
        .find_map(|part| part.strip_prefix(key)?.strip_prefix('='))
}

fn parse_addr(text: &str) -> i64 {
    i64::from_str_radix(text.trim_start_matches("0x"), 16).unwrap()
}

async fn serve(stream: TcpStream, mut memory: Vec<u8>, script: Script) -> Vec<String> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut log = Vec::new();

    let banner: &[u8] = if script == Script::BadBanner {
        b"400- go away\r\n"
    } else {
        b"201- connected\r\n"
    };
    write_half.write_all(banner).await.unwrap();

    while let Ok(Some(line)) = lines.next_line().await {
        log.push(line.clone());
        if script == Script::Silent {
            continue;
        }

        let keyword = line.split_whitespace().next().unwrap_or_default();
        let reply: Vec<u8> = match keyword {
            "getmem2" => {
                let addr = parse_addr(param(&line, "addr").unwrap());
                let len: usize = param(&line, "length").unwrap().parse().unwrap();
                let start = (addr - BASE) as usize;
                match memory.get(start..start + len) {
                    Some(bytes) if script == Script::HangUpMidPayload => {
                        let mut reply = b"203- binary response follows\r\n".to_vec();
                        reply.extend_from_slice(&bytes[..len / 2]);
                        write_half.write_all(&reply).await.unwrap();
                        return log;
                    }
                    Some(bytes) => {
                        let mut reply = b"203- binary response follows\r\n".to_vec();
                        reply.extend_from_slice(bytes);
                        reply
                    }
                    None => b"404- memory not mapped\r\n".to_vec(),
                }
            }
            "setmem" => {
                let addr = parse_addr(param(&line, "addr").unwrap());
                let data = hex::decode(param(&line, "data").unwrap()).unwrap();
                let start = (addr - BASE) as usize;
                match memory.get_mut(start..start + data.len()) {
                    Some(dest) => {
                        dest.copy_from_slice(&data);
                        format!("200- set {} bytes\r\n", data.len()).into_bytes()
                    }
                    None => b"404- memory not mapped\r\n".to_vec(),
                }
            }
            "bye" => {
                write_half.write_all(b"200- bye\r\n").await.unwrap();
                return log;
            }
            _ => b"407- unknown command\r\n".to_vec(),
        };
        write_half.write_all(&reply).await.unwrap();
    }

    log
}

async fn spawn_monitor(script: Script) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve(stream, vec![0; 0x2000], script).await
    });
    (addr, handle)
}

fn config(addr: SocketAddr) -> ConnectionConfig {
    ConnectionConfig {
        address: addr.to_string(),
        receive_timeout: Duration::from_millis(300),
        send_timeout: Duration::from_millis(300),
        protected_mode: false,
        ..ConnectionConfig::default()
    }
}

#[tokio::test]
async fn test_stream_roundtrip_over_tcp() {
    let (addr, server) = spawn_monitor(Script::Normal).await;
    let session = TcpCommandSession::connect(&config(addr)).await.unwrap();
    let mut stream = MemoryStream::new(session, AllowAll);

    let payload: Vec<u8> = (0..3000u32).map(|i| (i % 253) as u8).collect();
    stream.seek(BASE + 0x10, SeekOrigin::Begin).unwrap();
    stream.write(&payload).await.unwrap();
    stream.seek(BASE + 0x10, SeekOrigin::Begin).unwrap();
    assert_eq!(stream.read(payload.len()).await.unwrap(), payload);

    let (mut session, _) = stream.into_parts();
    session.close().await.unwrap();
    assert!(!session.is_connected());

    let log = server.await.unwrap();
    let setmems = log.iter().filter(|l| l.starts_with("setmem")).count();
    let getmems: Vec<&String> = log.iter().filter(|l| l.starts_with("getmem2")).collect();
    assert_eq!(setmems, 13);
    assert_eq!(getmems.len(), 3);
    assert_eq!(getmems[0], "getmem2 addr=0x00010010 length=1024");
    assert_eq!(getmems[2], "getmem2 addr=0x00010810 length=952");
    assert_eq!(log.last().map(String::as_str), Some("bye"));
}

#[tokio::test]
async fn test_rejected_command_keeps_connection() {
    let (addr, _server) = spawn_monitor(Script::Normal).await;
    let mut session = TcpCommandSession::connect(&config(addr)).await.unwrap();

    let result = session
        .send_command_strict(&Command::get_mem(0x9000_0000, 4))
        .await;
    assert!(matches!(
        result,
        Err(MemoryError::ProtocolFailure { code: 404, .. })
    ));
    assert!(session.is_connected());

    session
        .send_command_strict(&Command::get_mem(BASE, 4))
        .await
        .unwrap();
    let mut buf = [0xFFu8; 4];
    session.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, [0, 0, 0, 0]);
}

#[tokio::test]
async fn test_silent_monitor_times_out_and_disconnects() {
    let (addr, _server) = spawn_monitor(Script::Silent).await;
    let session = TcpCommandSession::connect(&config(addr)).await.unwrap();
    let mut stream = MemoryStream::new(session, AllowAll);
    assert_eq!(stream.read_timeout(), Duration::from_millis(300));

    assert!(matches!(stream.read(16).await, Err(MemoryError::Timeout)));
    assert!(!stream.session().is_connected());
    assert_eq!(stream.read_timeout(), Duration::ZERO);
    assert!(matches!(
        stream.read(16).await,
        Err(MemoryError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_hang_up_mid_payload_is_connection_closed() {
    let (addr, _server) = spawn_monitor(Script::HangUpMidPayload).await;
    let session = TcpCommandSession::connect(&config(addr)).await.unwrap();
    let mut stream = MemoryStream::new(session, AllowAll);

    let err = stream.read(64).await.unwrap_err();
    assert!(matches!(err, MemoryError::ConnectionClosed), "{err:?}");
    assert_eq!(stream.position(), BASE);
}

#[tokio::test]
async fn test_bad_banner_is_rejected() {
    let (addr, _server) = spawn_monitor(Script::BadBanner).await;
    let result = TcpCommandSession::connect(&config(addr)).await;
    assert!(matches!(result, Err(MemoryError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_protected_mode_follows_connection_config() {
    let (addr, _server) = spawn_monitor(Script::Normal).await;
    let mut cfg = config(addr);
    cfg.protected_mode = true;
    let session = TcpCommandSession::connect(&cfg).await.unwrap();
    let stream = MemoryStream::new(session, AllowAll);
    assert!(stream.protected_mode());
}
