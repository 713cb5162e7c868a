//! Scripted in-process FTP server for integration tests.
//!
//! Serves one control connection at a time from an in-memory file map and
//! records every command line it receives.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use rax_ftp_client::Session;
use rax_ftp_client::config::{RuntimeConfig, StartupConfig};
use rax_ftp_client::protocol::parse_host_port;

pub const USER: &str = "alice";
pub const PASS: &str = "secret";

#[derive(Debug, Default)]
pub struct ServerState {
    pub files: HashMap<String, Vec<u8>>,
    pub dirs: HashSet<String>,
    /// Every command line received, without CRLF
    pub log: Vec<String>,
    /// Answer SIZE with 502 regardless of the file
    pub size_unsupported: bool,
    /// Answer REST with 502
    pub reject_rest: bool,
    /// Answer this verb with 421 and drop the connection
    pub terminate_on: Option<String>,
    /// Peer addresses of accepted or opened data connections
    pub data_peers: Vec<SocketAddr>,
}

impl ServerState {
    pub fn commands(&self, verb: &str) -> Vec<String> {
        self.log
            .iter()
            .filter(|line| line.split(' ').next() == Some(verb))
            .cloned()
            .collect()
    }

    pub fn position(&self, line: &str) -> Option<usize> {
        self.log.iter().position(|l| l == line)
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<ServerState>>,
}

enum DataTarget {
    None,
    Passive(TcpListener),
    Active(SocketAddrV4),
}

impl MockServer {
    pub async fn start() -> Self {
        Self::with_state(ServerState::default()).await
    }

    pub async fn with_state(state: ServerState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(state));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                serve(stream, shared.clone()).await;
            }
        });

        Self { addr, state }
    }

    pub async fn put_file(&self, name: &str, content: &[u8]) {
        self.state
            .lock()
            .await
            .files
            .insert(name.to_string(), content.to_vec());
    }

    pub async fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(name).cloned()
    }

    pub fn startup_config(&self) -> StartupConfig {
        StartupConfig {
            control_port: self.addr.port(),
            ..StartupConfig::default()
        }
    }

    /// Connects and reads the greeting, without logging in.
    pub async fn connect(&self) -> Session {
        let (session, greeting) =
            Session::connect("127.0.0.1", &self.startup_config(), &RuntimeConfig::default())
                .await
                .unwrap();
        assert_eq!(greeting.code(), 220);
        session
    }

    /// Connects and logs in.
    pub async fn login(&self) -> Session {
        let mut session = self.connect().await;
        session.login(USER, PASS).await.unwrap();
        session
    }
}

/// Deterministic test content
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn reply(out: &mut OwnedWriteHalf, text: &str) {
    out.write_all(format!("{}\r\n", text).as_bytes())
        .await
        .unwrap();
}

async fn open_data(target: &mut DataTarget, state: &Arc<Mutex<ServerState>>) -> Option<TcpStream> {
    let stream = match std::mem::replace(target, DataTarget::None) {
        DataTarget::Passive(listener) => listener.accept().await.ok().map(|(s, _)| s),
        DataTarget::Active(addr) => {
            let stream = TcpStream::connect(addr).await.ok();
            // Active targets stay valid until replaced
            *target = DataTarget::Active(addr);
            stream
        }
        DataTarget::None => None,
    }?;
    if let Ok(peer) = stream.peer_addr() {
        state.lock().await.data_peers.push(peer);
    }
    Some(stream)
}

async fn serve(stream: TcpStream, state: Arc<Mutex<ServerState>>) {
    let (read_half, mut out) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    let mut target = DataTarget::None;
    let mut restart: u64 = 0;
    let mut rename_from: Option<String> = None;
    let mut cwd = String::from("/");
    let mut user = String::new();

    reply(&mut out, "220-Welcome to the mock server").await;
    reply(&mut out, "220 Ready").await;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let text = line.trim_end_matches(['\r', '\n']).to_string();
        let (verb, arg) = match text.split_once(' ') {
            Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.to_string()),
            None => (text.to_ascii_uppercase(), String::new()),
        };

        let terminate = {
            let mut st = state.lock().await;
            st.log.push(text.clone());
            st.terminate_on.as_deref() == Some(verb.as_str())
        };
        if terminate {
            reply(&mut out, "421 Service not available, closing control connection").await;
            return;
        }

        match verb.as_str() {
            "USER" => {
                user = arg;
                reply(&mut out, "331 Password required").await;
            }
            "PASS" => {
                if user == USER && arg == PASS {
                    reply(&mut out, "230 Logged in").await;
                } else {
                    reply(&mut out, "530 Login incorrect").await;
                }
            }
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                target = DataTarget::Passive(listener);
                reply(
                    &mut out,
                    &format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{}).",
                        port >> 8,
                        port & 0xff
                    ),
                )
                .await;
            }
            "PORT" => match parse_host_port(&arg) {
                Some(addr) => {
                    target = DataTarget::Active(addr);
                    reply(&mut out, "200 PORT command successful").await;
                }
                None => reply(&mut out, "501 Bad PORT argument").await,
            },
            "TYPE" => reply(&mut out, &format!("200 Type set to {}", arg)).await,
            "PWD" => reply(&mut out, &format!("257 \"{}\" is the current directory", cwd)).await,
            "CWD" => {
                let exists = arg == "." || arg == "/" || state.lock().await.dirs.contains(&arg);
                if exists {
                    if arg != "." {
                        cwd = arg;
                    }
                    reply(&mut out, "250 Directory changed").await;
                } else {
                    reply(&mut out, "550 No such directory").await;
                }
            }
            "MKD" => {
                state.lock().await.dirs.insert(arg.clone());
                reply(&mut out, &format!("257 \"{}\" created", arg)).await;
            }
            "RMD" => {
                if state.lock().await.dirs.remove(&arg) {
                    reply(&mut out, "250 Directory removed").await;
                } else {
                    reply(&mut out, "550 No such directory").await;
                }
            }
            "DELE" => {
                if state.lock().await.files.remove(&arg).is_some() {
                    reply(&mut out, "250 File deleted").await;
                } else {
                    reply(&mut out, "550 No such file").await;
                }
            }
            "RNFR" => {
                if state.lock().await.files.contains_key(&arg) {
                    rename_from = Some(arg);
                    reply(&mut out, "350 Ready for RNTO").await;
                } else {
                    reply(&mut out, "550 No such file").await;
                }
            }
            "RNTO" => match rename_from.take() {
                Some(from) => {
                    let mut st = state.lock().await;
                    if let Some(data) = st.files.remove(&from) {
                        st.files.insert(arg, data);
                    }
                    drop(st);
                    reply(&mut out, "250 Rename successful").await;
                }
                None => reply(&mut out, "503 RNFR required first").await,
            },
            "SIZE" => {
                let st = state.lock().await;
                let size = if st.size_unsupported {
                    None
                } else {
                    st.files.get(&arg).map(|f| f.len())
                };
                let unsupported = st.size_unsupported;
                drop(st);
                match size {
                    Some(size) => reply(&mut out, &format!("213 {}", size)).await,
                    None if unsupported => reply(&mut out, "502 SIZE not implemented").await,
                    None => reply(&mut out, "550 Could not get file size").await,
                }
            }
            "REST" => {
                if state.lock().await.reject_rest {
                    reply(&mut out, "502 REST not implemented").await;
                } else {
                    restart = arg.parse().unwrap_or(0);
                    reply(&mut out, &format!("350 Restarting at {}", restart)).await;
                }
            }
            "RETR" => {
                let data = state.lock().await.files.get(&arg).cloned();
                let Some(data) = data else {
                    reply(&mut out, "550 No such file").await;
                    continue;
                };
                reply(&mut out, "150 Opening data connection").await;
                let Some(mut stream) = open_data(&mut target, &state).await else {
                    reply(&mut out, "425 Cannot open data connection").await;
                    continue;
                };
                let start = (restart as usize).min(data.len());
                restart = 0;
                let _ = stream.write_all(&data[start..]).await;
                let _ = stream.shutdown().await;
                drop(stream);
                reply(&mut out, "226 Transfer complete").await;
            }
            "STOR" | "APPE" => {
                reply(&mut out, "150 Ok to send data").await;
                let Some(mut stream) = open_data(&mut target, &state).await else {
                    reply(&mut out, "425 Cannot open data connection").await;
                    continue;
                };
                let mut received = Vec::new();
                let _ = stream.read_to_end(&mut received).await;
                let mut st = state.lock().await;
                let file = st.files.entry(arg).or_default();
                if verb == "STOR" {
                    *file = received;
                } else {
                    file.extend_from_slice(&received);
                }
                drop(st);
                reply(&mut out, "226 Transfer complete").await;
            }
            "LIST" => {
                reply(&mut out, "150 Here comes the directory listing").await;
                let Some(mut stream) = open_data(&mut target, &state).await else {
                    reply(&mut out, "425 Cannot open data connection").await;
                    continue;
                };
                let mut names: Vec<String> = state.lock().await.files.keys().cloned().collect();
                names.sort();
                let listing: String = names.iter().map(|n| format!("{}\r\n", n)).collect();
                let _ = stream.write_all(listing.as_bytes()).await;
                let _ = stream.shutdown().await;
                drop(stream);
                reply(&mut out, "226 Directory send OK").await;
            }
            "QUIT" => {
                reply(&mut out, "221 Goodbye").await;
                return;
            }
            _ => reply(&mut out, "502 Command not implemented").await,
        }
    }
}
