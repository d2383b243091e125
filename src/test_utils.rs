//! Test utilities: a scriptable emostate server and an event recorder
//!
//! The fake server speaks the same newline-delimited JSON format as a real
//! server, so tests exercise the real TCP provider and worker thread.

#![cfg(test)]

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::codec;
use crate::types::{ClientEvent, EmostatePacket};
use crate::{ClientConfig, ClientModel};

/// Generous bound for anything that crosses threads in tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Local TCP server accepting one client at a time
pub struct FakeServer {
    addr: SocketAddr,
    current: Arc<Mutex<Option<TcpStream>>>,
    accepted: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
}

impl FakeServer {
    /// Bind an ephemeral port on the loopback interface and start accepting
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("fake server address");

        let current = Arc::new(Mutex::new(None));
        let accepted = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let (thread_current, thread_accepted, thread_stop) =
            (Arc::clone(&current), Arc::clone(&accepted), Arc::clone(&stop));
        thread::spawn(move || {
            while !thread_stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        stream.set_nonblocking(false).expect("blocking stream");
                        *thread_current.lock().unwrap() = Some(stream);
                        thread_accepted.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self { addr, current, accepted, stop }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Write one line to the current client
    pub fn send_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.send_raw(&bytes);
    }

    /// Write bytes as-is, with no newline added
    pub fn send_raw(&self, bytes: &[u8]) {
        assert!(
            wait_until(WAIT, || self.current.lock().unwrap().is_some()),
            "no client connected to fake server"
        );
        let mut current = self.current.lock().unwrap();
        let stream = current.as_mut().expect("client connection");
        stream.write_all(bytes).expect("write bytes");
        stream.flush().expect("flush");
    }

    pub fn send_packet(&self, packet: &EmostatePacket) {
        self.send_line(&codec::encode_packet(packet));
    }

    /// Close the current client connection from the server side
    pub fn drop_connection(&self) {
        if let Some(stream) = self.current.lock().unwrap().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Client configured for this server with short timeouts
    pub fn client(&self) -> ClientModel {
        ClientModel::new(self.config()).expect("valid test config")
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: self.port(),
            connect_timeout_ms: 2_000,
            stop_timeout_ms: 1_000,
            ..ClientConfig::default()
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.drop_connection();
    }
}

/// Listener that records every event it sees
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl EventRecorder {
    pub fn attach(client: &ClientModel) -> Self {
        let recorder = Self::default();
        let events = Arc::clone(&recorder.events);
        client.subscribe(move |event: &ClientEvent| events.lock().unwrap().push(event.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&ClientEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(*e)).count()
    }

    /// Wait until at least `n` events satisfy `matches`
    pub fn wait_for(&self, n: usize, matches: impl Fn(&ClientEvent) -> bool) -> bool {
        wait_until(WAIT, || self.count(&matches) >= n)
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Local port with nothing listening on it
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    listener.local_addr().expect("probe address").port()
}
