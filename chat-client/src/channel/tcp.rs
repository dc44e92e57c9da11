//! TcpChannel - real push channel over a TCP stream.
//!
//! Frames are 4-byte big-endian length-prefixed MessagePack events. A
//! reader task decodes inbound frames and fans them out to the bound
//! handlers; the write half is shared behind a mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use chat_types::{ChannelEvent, UserId};

use super::{ChannelError, DisconnectHandler, EventHandler, HandlerScope, HandlerTable, PushChannel};

/// Maximum frame size. Inbound frames claiming more are treated as a
/// protocol violation and close the connection.
pub const MAX_FRAME_SIZE: usize = 256 * 1024;

/// Push channel over TCP with length-prefixed MessagePack frames.
pub struct TcpChannel {
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    handlers: Arc<HandlerTable>,
    connected: Arc<AtomicBool>,
    dropped: Arc<StdMutex<Option<DisconnectHandler>>>,
}

impl TcpChannel {
    /// Create a channel with no open connection.
    pub fn new() -> Self {
        Self {
            writer: Arc::new(Mutex::new(None)),
            reader: Mutex::new(None),
            handlers: Arc::new(HandlerTable::default()),
            connected: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(StdMutex::new(None)),
        }
    }

    /// How many handlers are currently bound (for tests and diagnostics).
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    async fn write_frame(writer: &mut OwnedWriteHalf, event: &ChannelEvent) -> Result<(), ChannelError> {
        let bytes = event.to_bytes().map_err(|e| ChannelError::Codec(e.to_string()))?;
        let len = (bytes.len() as u32).to_be_bytes();
        writer
            .write_all(&len)
            .await
            .map_err(|e| ChannelError::SendFailed(format!("failed to write length: {e}")))?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| ChannelError::SendFailed(format!("failed to write frame: {e}")))?;
        Ok(())
    }

    /// Reader loop: decode frames and dispatch until EOF or error.
    async fn read_loop(
        mut reader: OwnedReadHalf,
        handlers: Arc<HandlerTable>,
        connected: Arc<AtomicBool>,
        dropped: Arc<StdMutex<Option<DisconnectHandler>>>,
    ) {
        loop {
            let mut len_buf = [0u8; 4];
            if let Err(e) = reader.read_exact(&mut len_buf).await {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    tracing::debug!("push channel closed by server");
                } else {
                    tracing::warn!("push channel read failed: {e}");
                }
                break;
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            if len > MAX_FRAME_SIZE {
                tracing::warn!("push channel frame too large: {len} bytes");
                break;
            }
            let mut frame = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut frame).await {
                tracing::warn!("push channel read failed mid-frame: {e}");
                break;
            }
            match ChannelEvent::from_bytes(&frame) {
                Ok(event) => {
                    tracing::debug!(event = event.name(), "push event received");
                    handlers.dispatch(&event);
                }
                Err(e) => {
                    // A malformed frame is dropped; the connection survives.
                    tracing::warn!("undecodable push frame: {e}");
                }
            }
        }
        // Deliberate close() flips the flag first, so the callback only
        // fires for a connection we still believed was open.
        if connected.swap(false, Ordering::SeqCst) {
            if let Some(callback) = dropped.lock().unwrap().as_ref() {
                callback();
            }
        }
    }
}

impl Default for TcpChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushChannel for TcpChannel {
    async fn open(&self, address: &str, user: &UserId) -> Result<(), ChannelError> {
        // Close any previous connection first.
        self.close().await;

        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ChannelError::ConnectFailed(e.to_string()))?;
        let (read_half, mut write_half) = stream.into_split();

        // Identify ourselves so the server can scope presence.
        Self::write_frame(
            &mut write_half,
            &ChannelEvent::Hello {
                user_id: user.clone(),
            },
        )
        .await?;

        // Flag first: the reader must see an open connection, or an
        // immediate server drop would go unreported.
        self.connected.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(Self::read_loop(
            read_half,
            Arc::clone(&self.handlers),
            Arc::clone(&self.connected),
            Arc::clone(&self.dropped),
        ));

        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(handle);
        tracing::info!(%user, address, "push channel open");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, event: ChannelEvent) -> Result<(), ChannelError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChannelError::NotConnected)?;
        tracing::debug!(event = event.name(), "push event sent");
        Self::write_frame(writer, &event).await
    }

    fn bind(&self, scope: HandlerScope, handler: EventHandler) {
        self.handlers.bind(scope, handler);
    }

    fn unbind(&self, scope: HandlerScope) {
        self.handlers.unbind(scope);
    }

    fn on_disconnect(&self, callback: DisconnectHandler) {
        *self.dropped.lock().unwrap() = Some(callback);
    }

    async fn close(&self) {
        // Mark the close as deliberate before the reader can observe EOF.
        self.connected.store(false, Ordering::SeqCst);
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            // Best-effort goodbye; the shutdown below is what matters.
            let _ = Self::write_frame(&mut writer, &ChannelEvent::Bye).await;
            let _ = writer.shutdown().await;
            tracing::info!("push channel closed");
        }
        drop(guard);

        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
    }
}
