//! Mock push channel for testing.
//!
//! Records emitted events and lets tests inject inbound events through
//! the handler table, exactly as the reader task would.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use chat_types::{ChannelEvent, UserId};

use super::{ChannelError, DisconnectHandler, EventHandler, HandlerScope, HandlerTable, PushChannel};

#[derive(Default)]
struct MockChannelInner {
    connected: bool,
    opened_as: Option<UserId>,
    opened_address: Option<String>,
    open_count: u32,
    emitted: Vec<ChannelEvent>,
    fail_next_open: Option<String>,
    dropped: Option<DisconnectHandler>,
}

/// Mock push channel for testing.
#[derive(Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
    handlers: Arc<HandlerTable>,
}

impl MockChannel {
    /// Create a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an inbound event to the bound handlers.
    pub fn inject(&self, event: ChannelEvent) {
        self.handlers.dispatch(&event);
    }

    /// Events emitted by the client so far.
    pub fn emitted(&self) -> Vec<ChannelEvent> {
        self.inner.lock().unwrap().emitted.clone()
    }

    /// The identity the channel was last opened as.
    pub fn opened_as(&self) -> Option<UserId> {
        self.inner.lock().unwrap().opened_as.clone()
    }

    /// The address the channel was last opened against.
    pub fn opened_address(&self) -> Option<String> {
        self.inner.lock().unwrap().opened_address.clone()
    }

    /// How many times `open` actually opened a connection.
    pub fn open_count(&self) -> u32 {
        self.inner.lock().unwrap().open_count
    }

    /// How many handlers are currently bound.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Cause the next `open` to fail with the given error.
    pub fn fail_next_open(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_open = Some(error.to_string());
    }

    /// Simulate the server dropping the connection: the channel goes
    /// offline and the registered disconnect callback fires.
    pub fn drop_connection(&self) {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            inner.connected = false;
            inner.dropped.take()
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Clone for MockChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handlers: Arc::clone(&self.handlers),
        }
    }
}

#[async_trait]
impl PushChannel for MockChannel {
    async fn open(&self, address: &str, user: &UserId) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_open.take() {
            return Err(ChannelError::ConnectFailed(error));
        }
        inner.connected = true;
        inner.opened_as = Some(user.clone());
        inner.opened_address = Some(address.to_string());
        inner.open_count += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    async fn emit(&self, event: ChannelEvent) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.connected {
            return Err(ChannelError::NotConnected);
        }
        inner.emitted.push(event);
        Ok(())
    }

    fn bind(&self, scope: HandlerScope, handler: EventHandler) {
        self.handlers.bind(scope, handler);
    }

    fn unbind(&self, scope: HandlerScope) {
        self.handlers.unbind(scope);
    }

    fn on_disconnect(&self, callback: DisconnectHandler) {
        self.inner.lock().unwrap().dropped = Some(callback);
    }

    async fn close(&self) {
        self.inner.lock().unwrap().connected = false;
    }
}
