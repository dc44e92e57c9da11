//! SessionManager - authentication state and push channel lifecycle.
//!
//! Owns the authenticated [`Identity`], the presence set, and the single
//! push channel. Global (non-conversation) events arriving on the channel
//! are dispatched into the injected [`ConversationManager`]; the channel
//! itself is never exposed for the conversation side to close or replace.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chat_core::{SessionAction, SessionEvent, SessionPhase};
use chat_types::{ChannelEvent, ChatError, Credentials, Identity, ProfileUpdate, UserId};

use crate::channel::{HandlerScope, PushChannel};
use crate::config::ClientConfig;
use crate::conversation::ConversationManager;
use crate::notify::{NoticeKind, Notifier};
use crate::rest::RestTransport;

/// Manages authentication state and the lifecycle of the push channel.
///
/// Exactly one session exists per running client. Explicitly constructed,
/// explicitly torn down with [`SessionManager::disconnect`].
pub struct SessionManager<R, C> {
    config: ClientConfig,
    rest: Arc<R>,
    channel: Arc<C>,
    identity: Arc<Mutex<Option<Identity>>>,
    presence: Arc<Mutex<HashSet<UserId>>>,
    phase: Arc<Mutex<SessionPhase>>,
    /// Serializes connect() calls so two channels can never coexist.
    connect_lock: Arc<tokio::sync::Mutex<()>>,
    notifier: Arc<dyn Notifier>,
}

impl<R, C> Clone for SessionManager<R, C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            rest: Arc::clone(&self.rest),
            channel: Arc::clone(&self.channel),
            identity: Arc::clone(&self.identity),
            presence: Arc::clone(&self.presence),
            phase: Arc::clone(&self.phase),
            connect_lock: Arc::clone(&self.connect_lock),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<R, C> SessionManager<R, C>
where
    R: RestTransport + 'static,
    C: PushChannel + 'static,
{
    /// Create a session manager with injected transport and channel.
    pub fn new(
        config: ClientConfig,
        rest: Arc<R>,
        channel: Arc<C>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            rest,
            channel,
            identity: Arc::new(Mutex::new(None)),
            presence: Arc::new(Mutex::new(HashSet::new())),
            phase: Arc::new(Mutex::new(SessionPhase::SignedOut)),
            connect_lock: Arc::new(tokio::sync::Mutex::new(())),
            notifier,
        }
    }

    /// Query the current-session endpoint.
    ///
    /// Silent in both directions: success installs the identity, failure
    /// tears the local session down (identity, presence, channel) and is
    /// treated as "not authenticated".
    pub async fn check_auth(&self) {
        match self.rest.check_auth().await {
            Ok(identity) => {
                *self.identity.lock().unwrap() = Some(identity);
                self.advance(SessionEvent::SignInSucceeded);
            }
            Err(e) => {
                tracing::debug!("auth check failed: {e}");
                self.force_sign_out().await;
            }
        }
    }

    /// Create an account. Sets the identity on success but does not open
    /// the channel; that happens on sign-in.
    pub async fn sign_up(&self, credentials: Credentials) {
        if let Err(e) = credentials.validate() {
            self.report(e).await;
            return;
        }
        match self.rest.sign_up(&credentials).await {
            Ok(identity) => {
                *self.identity.lock().unwrap() = Some(identity);
                self.advance(SessionEvent::SignInSucceeded);
                self.notifier
                    .notify(NoticeKind::Success, "Account created successfully");
            }
            Err(e) => self.report(e.into()).await,
        }
    }

    /// Establish a session. On success the identity is installed and the
    /// push channel is opened; on failure the identity is left as it was.
    pub async fn sign_in(&self, credentials: Credentials, conversation: &ConversationManager<R, C>) {
        if let Err(e) = credentials.validate() {
            self.report(e).await;
            return;
        }
        match self.rest.sign_in(&credentials).await {
            Ok(identity) => {
                tracing::info!(user = %identity.id, "signed in");
                *self.identity.lock().unwrap() = Some(identity);
                let actions = self.advance(SessionEvent::SignInSucceeded);
                self.notifier
                    .notify(NoticeKind::Success, "Signed in successfully");
                self.run_actions(actions, conversation).await;
            }
            Err(e) => self.report(e.into()).await,
        }
    }

    /// End the session. Best-effort: if the remote call fails, local state
    /// is kept (the server is the source of truth) and the failure is
    /// reported.
    pub async fn sign_out(&self) {
        match self.rest.sign_out().await {
            Ok(()) => {
                tracing::info!("signed out");
                self.force_sign_out().await;
                self.notifier
                    .notify(NoticeKind::Success, "Signed out successfully");
            }
            Err(e) => self.report(e.into()).await,
        }
    }

    /// Post a partial profile update; the identity is replaced wholesale
    /// with the server's response.
    pub async fn update_profile(&self, update: ProfileUpdate) {
        match self.rest.update_profile(&update).await {
            Ok(identity) => {
                *self.identity.lock().unwrap() = Some(identity);
                self.notifier
                    .notify(NoticeKind::Success, "Profile updated successfully");
            }
            Err(e) => self.report(e.into()).await,
        }
    }

    /// Open the push channel for the current identity. Idempotent: no
    /// identity or an already-open channel is a no-op, and concurrent
    /// calls are serialized so exactly one channel ever exists.
    pub async fn connect(&self, conversation: &ConversationManager<R, C>) {
        let _guard = self.connect_lock.lock().await;

        let user = match self.identity.lock().unwrap().as_ref() {
            Some(identity) => identity.id.clone(),
            None => return,
        };
        if self.channel.is_connected() {
            return;
        }

        self.bind_session_handler(conversation);
        self.bind_disconnect_handler(conversation);
        match self.channel.open(&self.config.channel_address, &user).await {
            Ok(()) => {
                self.advance(SessionEvent::ChannelOpened);
            }
            Err(e) => {
                self.channel.unbind(HandlerScope::Session);
                self.report(ChatError::Channel(e.to_string())).await;
            }
        }
    }

    /// Close the channel and remove the session handler. Idempotent; safe
    /// to call when no channel is open.
    pub async fn disconnect(&self) {
        self.channel.close().await;
        self.channel.unbind(HandlerScope::Session);
    }

    /// The authenticated identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.identity.lock().unwrap().clone()
    }

    /// The current session phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    /// Whether a peer currently holds an open push channel.
    pub fn is_online(&self, peer: &UserId) -> bool {
        self.presence.lock().unwrap().contains(peer)
    }

    /// Exactly one handler for the session scope: presence goes to the
    /// presence set, friend-request lifecycle goes to the conversation.
    fn bind_session_handler(&self, conversation: &ConversationManager<R, C>) {
        let presence = Arc::clone(&self.presence);
        let conversation = conversation.clone();
        self.channel.bind(
            HandlerScope::Session,
            Box::new(move |event| match event {
                ChannelEvent::PresenceUpdate { online } => {
                    *presence.lock().unwrap() = online.into_iter().collect();
                }
                ChannelEvent::FriendRequestReceived { from } => {
                    conversation.handle_peer_request(&from);
                }
                ChannelEvent::FriendRequestResolved { peer, resolution } => {
                    conversation.handle_resolution(&peer, resolution);
                }
                _ => {}
            }),
        );
    }

    /// A dropped channel feeds `ChannelLost` back into the phase machine,
    /// which requests a reconnect. Runs off the channel's reader task, so
    /// the actual work is spawned.
    fn bind_disconnect_handler(&self, conversation: &ConversationManager<R, C>) {
        let manager = self.clone();
        let conversation = conversation.clone();
        self.channel.on_disconnect(Box::new(move || {
            let manager = manager.clone();
            let conversation = conversation.clone();
            tokio::spawn(async move {
                manager.handle_channel_loss(&conversation).await;
            });
        }));
    }

    async fn handle_channel_loss(&self, conversation: &ConversationManager<R, C>) {
        self.report(ChatError::Channel("connection lost".into())).await;
        let actions = self.advance(SessionEvent::ChannelLost);
        self.run_actions(actions, conversation).await;
    }

    /// Tear down local session state: identity, presence, phase, and the
    /// channel along with its session handler.
    async fn force_sign_out(&self) {
        *self.identity.lock().unwrap() = None;
        self.presence.lock().unwrap().clear();
        for action in self.advance(SessionEvent::SignOutRequested) {
            if action == SessionAction::CloseChannel {
                self.disconnect().await;
            }
        }
    }

    fn advance(&self, event: SessionEvent) -> Vec<SessionAction> {
        let mut phase = self.phase.lock().unwrap();
        let (next, actions) = phase.on_event(event);
        *phase = next;
        actions
    }

    async fn run_actions(
        &self,
        actions: Vec<SessionAction>,
        conversation: &ConversationManager<R, C>,
    ) {
        for action in actions {
            match action {
                SessionAction::OpenChannel => self.connect(conversation).await,
                SessionAction::CloseChannel => self.disconnect().await,
            }
        }
    }

    /// Convert a failure into a notification. Auth failures additionally
    /// tear the session down: the session is gone server-side, so the
    /// channel must not stay open for it.
    async fn report(&self, err: ChatError) {
        if matches!(err, ChatError::Auth(_)) {
            self.force_sign_out().await;
        }
        tracing::warn!("session operation failed: {err}");
        self.notifier.notify(NoticeKind::Error, &err.to_string());
    }
}
