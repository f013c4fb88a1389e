use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{MediaBlob, RealtimeMessage, ServerMessage, SessionSetup, SetupMessage};
use super::LiveEvent;
use crate::error::VoiceError;

/// Outbound frames buffered while waiting for readiness or the network
/// (~16 seconds of audio at the default frame size). When the queue is
/// full the newest frame is dropped rather than stalling capture.
pub const SEND_QUEUE_DEPTH: usize = 64;

const EVENT_QUEUE_DEPTH: usize = 256;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// ============================================================================
// Send gate
// ============================================================================

/// Build the send gate: frames enter the queue the moment capture produces
/// them, but nothing reaches the wire until the latch opens on setup
/// confirmation. The queue is the only path to the socket, so frames queued
/// before readiness flush first and order is preserved end to end.
pub fn send_gate(depth: usize) -> (SendGate, ReadyLatch, GatedFrames) {
    let (tx, rx) = mpsc::channel(depth);
    let (ready_tx, ready_rx) = watch::channel(false);

    (
        SendGate { tx },
        ReadyLatch { ready_tx },
        GatedFrames { rx, ready_rx },
    )
}

/// Push side of the gate, held by the frame producer.
#[derive(Clone)]
pub struct SendGate {
    tx: mpsc::Sender<MediaBlob>,
}

impl SendGate {
    /// Queue one frame. Never blocks: when the queue is full the frame is
    /// dropped with a warning.
    pub fn push(&self, media: MediaBlob) -> Result<(), VoiceError> {
        match self.tx.try_send(media) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("outbound queue full, dropping frame");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(VoiceError::Transport(
                "live session writer is gone".to_string(),
            )),
        }
    }
}

/// Opens the gate once the server confirms setup.
pub struct ReadyLatch {
    ready_tx: watch::Sender<bool>,
}

impl ReadyLatch {
    pub fn open(&self) {
        let _ = self.ready_tx.send(true);
    }
}

/// Drain side of the gate: yields nothing until the latch opens, then the
/// queued frames in order.
pub struct GatedFrames {
    rx: mpsc::Receiver<MediaBlob>,
    ready_rx: watch::Receiver<bool>,
}

impl GatedFrames {
    pub async fn next(&mut self) -> Option<MediaBlob> {
        loop {
            if *self.ready_rx.borrow_and_update() {
                break;
            }
            if self.ready_rx.changed().await.is_err() {
                return None;
            }
        }
        self.rx.recv().await
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Bidirectional live-session transport seam.
///
/// `open` establishes the session and returns the inbound event stream; the
/// receiver doubles as the cancellation handle. Implementations must:
/// - fire `LiveEvent::Ready` exactly once, before any other event
/// - deliver inbound events in arrival order, never merged or reordered
/// - queue frames passed to `send` before readiness and flush them in order
///   once ready
/// - terminate the event stream on `close`, which is idempotent
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Open the session and return the inbound event stream.
    async fn open(
        &mut self,
        setup: SessionSetup,
    ) -> Result<mpsc::Receiver<LiveEvent>, VoiceError>;

    /// Fire-and-forget enqueue of one outbound frame.
    fn send(&self, media: MediaBlob) -> Result<(), VoiceError>;

    /// Terminate the connection. Idempotent; no event is delivered after it
    /// returns.
    async fn close(&mut self) -> Result<(), VoiceError>;

    /// Whether the session is currently open.
    fn is_open(&self) -> bool;

    /// Transport name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct LiveClientConfig {
    /// WebSocket endpoint of the live API.
    pub endpoint: String,
    /// API key appended to the connect URL.
    pub api_key: String,
}

/// WebSocket client for the Gemini Live bidirectional API.
pub struct GeminiLiveTransport {
    config: LiveClientConfig,
    gate: Option<SendGate>,
    close_tx: Option<oneshot::Sender<()>>,
    writer_task: Option<JoinHandle<()>>,
    reader_task: Option<JoinHandle<()>>,
    open: Arc<AtomicBool>,
}

impl GeminiLiveTransport {
    pub fn new(config: LiveClientConfig) -> Self {
        Self {
            config,
            gate: None,
            close_tx: None,
            writer_task: None,
            reader_task: None,
            open: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn open(
        &mut self,
        setup: SessionSetup,
    ) -> Result<mpsc::Receiver<LiveEvent>, VoiceError> {
        if self.writer_task.is_some() {
            return Err(VoiceError::TransportOpenFailed(
                "session already open".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.config.endpoint, self.config.api_key);
        info!("connecting to live endpoint");

        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| VoiceError::TransportOpenFailed(e.to_string()))?;
        let (mut ws_sink, ws_stream) = ws.split();

        let setup_json = serde_json::to_string(&SetupMessage { setup })
            .map_err(|e| VoiceError::TransportOpenFailed(e.to_string()))?;
        ws_sink
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| VoiceError::TransportOpenFailed(e.to_string()))?;

        let (gate, latch, frames) = send_gate(SEND_QUEUE_DEPTH);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (close_tx, close_rx) = oneshot::channel();

        self.open.store(true, Ordering::SeqCst);
        self.writer_task = Some(tokio::spawn(run_writer(ws_sink, frames, close_rx)));
        self.reader_task = Some(tokio::spawn(run_reader(
            ws_stream,
            event_tx,
            latch,
            Arc::clone(&self.open),
        )));
        self.gate = Some(gate);
        self.close_tx = Some(close_tx);

        info!("live session opened, awaiting setup confirmation");
        Ok(event_rx)
    }

    fn send(&self, media: MediaBlob) -> Result<(), VoiceError> {
        let Some(gate) = &self.gate else {
            return Err(VoiceError::Transport("session not open".to_string()));
        };
        if !self.open.load(Ordering::SeqCst) {
            return Err(VoiceError::RemoteClosed);
        }
        gate.push(media)
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        let was_open = self.writer_task.is_some();
        self.open.store(false, Ordering::SeqCst);

        // Drop the send path first, then take the tasks down; the reader is
        // aborted so no event can be delivered after close returns.
        self.gate = None;
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
        if let Some(writer) = self.writer_task.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader_task.take() {
            reader.abort();
            let _ = reader.await;
        }

        if was_open {
            info!("live session closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "gemini-live"
    }
}

async fn run_writer(
    mut ws_sink: WsSink,
    mut frames: GatedFrames,
    mut close_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut close_rx => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
            maybe = frames.next() => {
                let Some(media) = maybe else { break };
                let json = match serde_json::to_string(&RealtimeMessage { media }) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to serialize outbound frame: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(Message::Text(json)).await {
                    warn!("failed to send frame: {e}");
                    break;
                }
            }
        }
    }
    debug!("live writer task exiting");
}

async fn run_reader(
    mut ws_stream: WsStream,
    event_tx: mpsc::Sender<LiveEvent>,
    latch: ReadyLatch,
    open: Arc<AtomicBool>,
) {
    while let Some(message) = ws_stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if !forward_payload(text.as_bytes(), &event_tx, &latch).await {
                    break;
                }
            }
            Ok(Message::Binary(bytes)) => {
                if !forward_payload(&bytes, &event_tx, &latch).await {
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                let reason = frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty());
                let _ = event_tx.send(LiveEvent::Closed { reason }).await;
                break;
            }
            Ok(_) => {} // ping/pong handled by tungstenite
            Err(e) => {
                let _ = event_tx
                    .send(LiveEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    debug!("live reader task exiting");
}

/// Parse one wire payload and forward its events. Returns false once the
/// session side has gone away.
async fn forward_payload(
    payload: &[u8],
    event_tx: &mpsc::Sender<LiveEvent>,
    latch: &ReadyLatch,
) -> bool {
    let message: ServerMessage = match serde_json::from_slice(payload) {
        Ok(message) => message,
        Err(e) => {
            warn!("unparseable server message: {e}");
            return true;
        }
    };

    if message.setup_complete.is_some() {
        latch.open();
        if event_tx.send(LiveEvent::Ready).await.is_err() {
            return false;
        }
    }

    for event in message.into_events() {
        if event_tx.send(event).await.is_err() {
            return false;
        }
    }

    true
}
