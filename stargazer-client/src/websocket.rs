use crate::channel::{ChannelEvent, Transport};
use crate::client_threads::do_terminate;
use crate::command::Telemetry;
use crate::constants::{CONNECT_TIMEOUT_MS, DEFAULT_WS_PORT, LINK_READ_TIMEOUT_MS};
use crate::error::ScannerError;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::handshake::HandshakeError;
use tungstenite::{Message, WebSocket};

/// [`Transport`] over a WebSocket.
///
/// Each `open` spawns a link thread that owns the socket for one connection.
/// The thread forwards inbound frames as [`ChannelEvent`]s, writes the frames
/// queued by `send`, and always reports `Closed` when it exits.
pub struct WebSocketTransport {
    url: String,
    events_tx: Sender<ChannelEvent>,
    link: Option<LinkThread>,
}

struct LinkThread {
    outbound_tx: Sender<String>,
    terminator_tx: Sender<bool>,
    thread: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, events_tx: Sender<ChannelEvent>) -> Self {
        WebSocketTransport {
            url: url.into(),
            events_tx,
            link: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, epoch: u64) {
        // joins the superseded link, which has already reported `Closed`
        self.link = None;

        let (outbound_tx, outbound_rx) = unbounded();
        let (terminator_tx, terminator_rx) = bounded(1);
        let url = self.url.clone();
        let events_tx = self.events_tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("stargazer-link-{epoch}"))
            .spawn(move || run_link(&url, epoch, outbound_rx, terminator_rx, events_tx));

        match spawned {
            Ok(thread) => {
                self.link = Some(LinkThread {
                    outbound_tx,
                    terminator_tx,
                    thread: Some(thread),
                })
            }
            Err(e) => {
                warn!(epoch, "Failed to spawn link thread: {e}");
                let _ = self.events_tx.send(ChannelEvent::Closed { epoch });
            }
        }
    }

    fn send(&mut self, frame: String) -> Result<(), ScannerError> {
        let link = self.link.as_ref().ok_or(ScannerError::LinkDown)?;
        link.outbound_tx
            .send(frame)
            .map_err(|_| ScannerError::LinkDown)
    }
}

impl Drop for LinkThread {
    fn drop(&mut self) {
        let _ = self.terminator_tx.send(true);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Link thread panicked");
            }
        }
    }
}

fn run_link(
    url: &str,
    epoch: u64,
    outbound_rx: Receiver<String>,
    terminator_rx: Receiver<bool>,
    events_tx: Sender<ChannelEvent>,
) {
    match open_socket(url) {
        Ok(mut socket) => {
            if events_tx.send(ChannelEvent::Opened { epoch }).is_ok() {
                if let Err(e) = pump(&mut socket, epoch, &outbound_rx, &terminator_rx, &events_tx) {
                    debug!(epoch, "Link lost: {e}");
                }
            }
        }
        Err(e) => warn!(epoch, "Failed to connect to {url}: {e}"),
    }
    let _ = events_tx.send(ChannelEvent::Closed { epoch });
}

pub(crate) fn open_socket(url: &str) -> Result<WebSocket<TcpStream>, ScannerError> {
    let request = url.into_client_request()?;
    let host = request
        .uri()
        .host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| ScannerError::Unresolved(url.to_string()))?;
    let port = request.uri().port_u16().unwrap_or(DEFAULT_WS_PORT);

    let timeout = Duration::from_millis(CONNECT_TIMEOUT_MS);
    let stream = connect_any(&host, port, timeout)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(timeout))?;

    let (socket, _) = tungstenite::client(request, stream).map_err(|e| match e {
        HandshakeError::Failure(e) => ScannerError::WebSocket(e),
        HandshakeError::Interrupted(_) => ScannerError::HandshakeTimeout(url.to_string()),
    })?;
    socket
        .get_ref()
        .set_read_timeout(Some(Duration::from_millis(LINK_READ_TIMEOUT_MS)))?;
    Ok(socket)
}

fn connect_any(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ScannerError> {
    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => Err(ScannerError::Unresolved(host.to_string())),
    }
}

fn pump(
    socket: &mut WebSocket<TcpStream>,
    epoch: u64,
    outbound_rx: &Receiver<String>,
    terminator_rx: &Receiver<bool>,
    events_tx: &Sender<ChannelEvent>,
) -> Result<(), ScannerError> {
    loop {
        if do_terminate(terminator_rx) {
            let _ = socket.close(None);
            let _ = socket.flush();
            return Ok(());
        }

        while let Ok(frame) = outbound_rx.try_recv() {
            socket.send(Message::Text(frame))?;
        }

        let telemetry = match socket.read() {
            Ok(Message::Text(text)) => Telemetry::new(text),
            Ok(Message::Binary(bytes)) => Telemetry::from_bytes(&bytes),
            Ok(Message::Close(_)) => return Ok(()),
            Ok(_) => continue,
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        };
        if events_tx
            .send(ChannelEvent::Message { epoch, telemetry })
            .is_err()
        {
            return Ok(());
        }
    }
}
