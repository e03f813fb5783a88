//! In-process RouterOS fake used by the integration tests
//!
//! Speaks the real wire protocol over a loopback listener: length-prefixed
//! words, sentence terminators, and `!re`/`!done`/`!trap`/`!fatal` blocks,
//! including both login variants.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use routeros_client::protocol::{read_sentence, write_sentence};
use routeros_client::ClientConfig;
use tokio::net::{TcpListener, TcpStream};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const CHALLENGE_HEX: &str = "00112233445566778899aabbccddeeff";

/// How the fake router treats logins
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterBehavior {
    /// Trap the plain login so clients must fall back to MD5
    pub require_md5: bool,
    /// Refuse every credentialed login
    pub reject_logins: bool,
}

/// Handle to a running fake router
pub struct FakeRouter {
    pub addr: SocketAddr,
    /// Successful logins across all sessions
    pub logins: Arc<AtomicUsize>,
    /// High-water mark of commands being served at once
    pub max_concurrent: Arc<AtomicUsize>,
}

impl FakeRouter {
    pub async fn spawn(behavior: RouterBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let logins = Arc::new(AtomicUsize::new(0));
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_concurrent = Arc::new(AtomicUsize::new(0));

        {
            let logins = logins.clone();
            let concurrent = concurrent.clone();
            let max_concurrent = max_concurrent.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    tokio::spawn(serve_session(
                        stream,
                        behavior,
                        logins.clone(),
                        concurrent.clone(),
                        max_concurrent.clone(),
                    ));
                }
            });
        }

        Self {
            addr,
            logins,
            max_concurrent,
        }
    }

    /// Client config pointing at this router
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new("127.0.0.1", USERNAME, PASSWORD);
        config.port = Some(self.addr.port());
        config.tls = Some(false);
        config
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_commands(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

fn expected_response() -> String {
    let salt = hex::decode(CHALLENGE_HEX).unwrap();
    let mut data = vec![0u8];
    data.extend_from_slice(PASSWORD.as_bytes());
    data.extend_from_slice(&salt);
    format!("00{}", hex::encode(md5::compute(&data).0))
}

async fn serve_session(
    mut stream: TcpStream,
    behavior: RouterBehavior,
    logins: Arc<AtomicUsize>,
    concurrent: Arc<AtomicUsize>,
    max_concurrent: Arc<AtomicUsize>,
) {
    loop {
        let Ok(sentence) = read_sentence(&mut stream).await else {
            return;
        };
        if sentence.is_empty() {
            continue;
        }

        match sentence[0].as_str() {
            "/login" => {
                if handle_login(&mut stream, &sentence, behavior, &logins)
                    .await
                    .is_err()
                {
                    return;
                }
            }
            "/slow" => {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                let _ = write_sentence(&mut stream, &["!re", "=done=yes"]).await;
                let _ = write_sentence(&mut stream, &["!done"]).await;
            }
            "/interface/print" => {
                let _ = write_sentence(
                    &mut stream,
                    &["!re", "=.id=*1", "=name=ether1", "=running=true"],
                )
                .await;
                let _ = write_sentence(
                    &mut stream,
                    &["!re", "=.id=*2", "=name=ether2", "=running=false"],
                )
                .await;
                let _ = write_sentence(&mut stream, &["!done"]).await;
            }
            "/trap" => {
                let _ = write_sentence(
                    &mut stream,
                    &["!trap", "=category=2", "=message=no such item"],
                )
                .await;
            }
            "/fatal" => {
                let _ = write_sentence(&mut stream, &["!fatal", "session terminated"]).await;
                return;
            }
            _ => {
                let _ = write_sentence(&mut stream, &["!done"]).await;
            }
        }
    }
}

async fn handle_login(
    stream: &mut TcpStream,
    sentence: &[String],
    behavior: RouterBehavior,
    logins: &AtomicUsize,
) -> Result<(), ()> {
    // Bare /login: hand out the MD5 challenge.
    if sentence.len() == 1 {
        let ret = format!("=ret={CHALLENGE_HEX}");
        write_sentence(stream, &["!done", ret.as_str()])
            .await
            .map_err(|_| ())?;
        return Ok(());
    }

    let plain = sentence.iter().any(|w| w.starts_with("=password="));
    let hashed = sentence
        .iter()
        .find_map(|w| w.strip_prefix("=response="));

    let accept = if behavior.reject_logins {
        false
    } else if plain {
        !behavior.require_md5
            && sentence
                .iter()
                .any(|w| w == &format!("=password={PASSWORD}"))
    } else if let Some(response) = hashed {
        response == expected_response()
    } else {
        false
    };

    if accept {
        logins.fetch_add(1, Ordering::SeqCst);
        write_sentence(stream, &["!done"]).await.map_err(|_| ())?;
    } else {
        write_sentence(
            stream,
            &["!trap", "=message=invalid user name or password (6)"],
        )
        .await
        .map_err(|_| ())?;
    }
    Ok(())
}
