/// Client-side session store
///
/// Owns the current authenticated identity and wraps an [`AuthProvider`] in
/// a uniform result shape for the presentation layer. State transitions are
/// published on a broadcast channel; [`SessionStore::subscribe`] attaches a
/// listener that sees every transition emitted after it subscribed, in
/// order, once.
///
/// # Lifecycle
///
/// ```text
/// new() -> init(persisted) -> sign_in / sign_up / refresh / sign_out ... -> shutdown()
/// ```
///
/// # Example
///
/// ```no_run
/// use notekeep_client::session::{SessionEvent, SessionStore};
/// use notekeep_shared::auth::local::{LocalAuthConfig, LocalAuthProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = Arc::new(LocalAuthProvider::new(LocalAuthConfig::new("x".repeat(32))));
/// let store = SessionStore::new(auth);
///
/// let _subscription = store.subscribe(|event: SessionEvent| {
///     println!("session changed: {:?}", event);
/// });
///
/// store.init(None).await;
/// store.sign_in("ada@example.com", "secret123").await?;
/// # Ok(())
/// # }
/// ```
use crate::signup::{FallbackAction, RegistrationFallback};
use notekeep_shared::auth::AuthProvider;
use notekeep_shared::error::{ServiceError, ServiceResult};
use notekeep_shared::models::{Session, SignUpOutcome, SignUpRequest, User};
use notekeep_shared::validation::{is_valid_email, validate_password};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffered events per listener before the slowest one starts lagging
const EVENT_CAPACITY: usize = 32;

/// A session transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A sign-in (or a sign-up that signed in) completed
    SignedIn(User),

    /// The session was cleared
    SignedOut,

    /// The access token was exchanged for a new one
    TokenRefreshed(User),

    /// The store was initialised, with or without a persisted session
    InitialSession(Option<User>),
}

/// What a registration produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    /// Registered and signed in
    SignedIn(User),

    /// Registered; the provider wants the email confirmed first
    ConfirmationRequired(User),

    /// Registered through the fallback route, but the follow-up sign-in
    /// failed; the user should log in manually
    NeedsLogin(User),
}

impl SignUpResult {
    pub fn user(&self) -> &User {
        match self {
            SignUpResult::SignedIn(user)
            | SignUpResult::ConfirmationRequired(user)
            | SignUpResult::NeedsLogin(user) => user,
        }
    }

    pub fn needs_login(&self) -> bool {
        matches!(self, SignUpResult::NeedsLogin(_))
    }
}

/// Handle returned by [`SessionStore::subscribe`]
///
/// Dropping it, or calling [`unsubscribe`](Subscription::unsubscribe), stops
/// delivery to the listener.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.token.cancel();
    }

    /// Whether delivery has stopped
    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Owner of the current session
pub struct SessionStore {
    auth: Arc<dyn AuthProvider>,
    fallback: Option<Arc<dyn RegistrationFallback>>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

impl SessionStore {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            auth,
            fallback: None,
            session: RwLock::new(None),
            events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Enables the secondary registration path for transient sign-up failures
    pub fn with_fallback(mut self, fallback: Arc<dyn RegistrationFallback>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Name of the wrapped auth provider
    pub fn provider_name(&self) -> &str {
        self.auth.name()
    }

    /// Starts the store from an optionally persisted session
    ///
    /// An expired session is refreshed first; if that fails the store starts
    /// signed out. Emits exactly one [`SessionEvent::InitialSession`].
    pub async fn init(&self, persisted: Option<Session>) -> Option<User> {
        let session = match persisted {
            Some(session) if session.is_expired() => {
                debug!(user_id = %session.user.id, "Persisted session expired, refreshing");
                match self.auth.refresh(&session.refresh_token).await {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        info!(error = %e, "Could not refresh persisted session");
                        None
                    }
                }
            }
            other => other,
        };

        match session {
            Some(session) => Some(self.restore(session).await),
            None => {
                *self.session.write().await = None;
                self.emit(SessionEvent::InitialSession(None));
                None
            }
        }
    }

    /// Installs a previously persisted session as-is
    pub async fn restore(&self, session: Session) -> User {
        let user = session.user.clone();
        *self.session.write().await = Some(session);
        self.emit(SessionEvent::InitialSession(Some(user.clone())));
        user
    }

    /// Drops every listener
    ///
    /// The session itself is kept; call [`sign_out`](Self::sign_out) first to
    /// end it.
    pub fn shutdown(&self) {
        debug!("Session store shutting down");
        self.shutdown.cancel();
    }

    /// Registers a listener for session transitions
    ///
    /// Must be called from within a Tokio runtime; delivery runs on a
    /// spawned task.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(SessionEvent) + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let mut stream = BroadcastStream::new(self.events.subscribe());
        let cancelled = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    item = stream.next() => match item {
                        Some(Ok(event)) => listener(event),
                        Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                            warn!(skipped, "Session listener fell behind, events dropped");
                        }
                        None => break,
                    },
                }
            }
        });

        Subscription { token }
    }

    /// Current identity, `None` when signed out
    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    /// Current session, for callers that need the tokens
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Bearer token of the current session
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Signs in with email and password
    ///
    /// On failure the previous session, if any, is left in place.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials`, `RateLimited`, `NetworkError`, `ServerError`
    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<User> {
        let session = self.auth.sign_in(email, password).await?;
        let user = session.user.clone();

        *self.session.write().await = Some(session);
        info!(user_id = %user.id, "Signed in");
        self.emit(SessionEvent::SignedIn(user.clone()));

        Ok(user)
    }

    /// Registers a new account
    ///
    /// Transient provider failures fall back to the registration route (see
    /// [`FallbackAction`]) followed by a sign-in.
    ///
    /// # Errors
    ///
    /// `Validation` before any network call for a malformed email or short
    /// password, otherwise the provider's (or the fallback's) classified
    /// failure
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> ServiceResult<SignUpResult> {
        if !is_valid_email(email) {
            return Err(ServiceError::validation(
                "email",
                "Please enter a valid email address",
            ));
        }
        validate_password(password)?;

        let request = SignUpRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.auth.sign_up(&request).await {
            Ok(SignUpOutcome::Active(session)) => {
                let user = session.user.clone();
                *self.session.write().await = Some(session);
                info!(user_id = %user.id, "Signed up and signed in");
                self.emit(SessionEvent::SignedIn(user.clone()));
                Ok(SignUpResult::SignedIn(user))
            }
            Ok(SignUpOutcome::ConfirmationRequired(user)) => {
                info!(user_id = %user.id, "Signed up, confirmation pending");
                Ok(SignUpResult::ConfirmationRequired(user))
            }
            Err(err) => match FallbackAction::for_kind(err.kind) {
                FallbackAction::Fail => Err(err),
                FallbackAction::RegisterThenSignIn => self.register_via_fallback(&request, err).await,
            },
        }
    }

    async fn register_via_fallback(
        &self,
        request: &SignUpRequest,
        direct: ServiceError,
    ) -> ServiceResult<SignUpResult> {
        let Some(fallback) = &self.fallback else {
            return Err(direct);
        };

        warn!(
            kind = %direct.kind,
            detail = direct.detail().unwrap_or(""),
            "Direct sign-up failed, trying the registration route"
        );

        let user = fallback.register(request).await?;

        match self.sign_in(&request.email, &request.password).await {
            Ok(user) => Ok(SignUpResult::SignedIn(user)),
            Err(e) => {
                info!(user_id = %user.id, error = %e, "Registered, but sign-in after fallback failed");
                Ok(SignUpResult::NeedsLogin(user))
            }
        }
    }

    /// Exchanges the refresh token for a new session
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when signed out, otherwise the provider's failure.
    /// The old session stays in place on failure.
    pub async fn refresh(&self) -> ServiceResult<User> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| ServiceError::unauthenticated("Not signed in"))?;

        let session = self.auth.refresh(&refresh_token).await?;
        let user = session.user.clone();

        *self.session.write().await = Some(session);
        debug!(user_id = %user.id, "Session refreshed");
        self.emit(SessionEvent::TokenRefreshed(user.clone()));

        Ok(user)
    }

    /// Ends the session
    ///
    /// The local session is always cleared; a provider failure is only
    /// logged.
    pub async fn sign_out(&self) {
        let Some(session) = self.session.write().await.take() else {
            return;
        };

        if let Err(e) = self.auth.sign_out(&session.access_token).await {
            warn!(user_id = %session.user.id, error = %e, "Provider sign-out failed");
        }

        info!(user_id = %session.user.id, "Signed out");
        self.emit(SessionEvent::SignedOut);
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
