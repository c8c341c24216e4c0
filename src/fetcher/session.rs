//! Scoped session management for metadata fetches
//!
//! A [`SessionManager`] owns at most one open session and hands it out through
//! [`SessionLease`] guards. The caller states up front how many uses it expects;
//! once that many leases have been released the session is closed. A lease that
//! is dropped without [`SessionLease::release`] closes the session immediately,
//! so a failed fetch never leaves a session open.

use async_trait::async_trait;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use super::{Fetcher, FetcherResult};

/// Opens and closes sessions
pub trait SessionFactory: Send + Sync {
    /// Session type handed out by leases
    type Session: Send + Sync;

    /// Open a new session
    fn open(&self) -> FetcherResult<Self::Session>;

    /// Close a session that is no longer needed
    fn close(&self, _session: &Self::Session) {}
}

struct Slot<S> {
    session: Option<Arc<S>>,
    remaining: usize,
    opened: u64,
}

/// Hands out one shared session for a known number of uses
pub struct SessionManager<F: SessionFactory> {
    factory: F,
    expected_uses: usize,
    slot: Mutex<Slot<F::Session>>,
}

impl<F: SessionFactory> SessionManager<F> {
    /// Create a manager expecting `expected_uses` leases per session (minimum 1)
    pub fn new(factory: F, expected_uses: usize) -> Self {
        Self {
            factory,
            expected_uses: expected_uses.max(1),
            slot: Mutex::new(Slot {
                session: None,
                remaining: 0,
                opened: 0,
            }),
        }
    }

    /// Uses per session before it is closed
    pub fn expected_uses(&self) -> usize {
        self.expected_uses
    }

    /// Whether a session is currently open
    pub fn is_open(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> u64 {
        self.lock().opened
    }

    /// Lease the shared session, opening it if needed
    pub fn checkout(&self) -> FetcherResult<SessionLease<'_, F>> {
        let mut slot = self.lock();

        let session = match &slot.session {
            Some(session) => Arc::clone(session),
            None => {
                let session = Arc::new(self.factory.open()?);
                slot.opened += 1;
                slot.remaining = self.expected_uses;
                slot.session = Some(Arc::clone(&session));
                debug!(expected_uses = self.expected_uses, "Session opened");
                session
            }
        };

        Ok(SessionLease {
            manager: self,
            session,
            released: false,
        })
    }

    /// Close the open session, if any, without waiting for the remaining uses
    pub fn abort(&self) {
        let mut slot = self.lock();
        if let Some(session) = slot.session.take() {
            self.factory.close(&session);
            warn!(remaining = slot.remaining, "Session aborted before expected uses");
        }
        slot.remaining = 0;
    }

    fn finish(&self, succeeded: bool) {
        let mut slot = self.lock();
        if slot.session.is_none() {
            return;
        }

        slot.remaining = slot.remaining.saturating_sub(1);
        if !succeeded || slot.remaining == 0 {
            if let Some(session) = slot.session.take() {
                self.factory.close(&session);
            }
            slot.remaining = 0;
            if succeeded {
                debug!("Session closed after expected uses");
            } else {
                warn!("Session closed after failed use");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot<F::Session>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped access to the managed session
///
/// Call [`release`](Self::release) after a successful use. Dropping the lease
/// without releasing counts as a failure and closes the session.
pub struct SessionLease<'a, F: SessionFactory> {
    manager: &'a SessionManager<F>,
    session: Arc<F::Session>,
    released: bool,
}

impl<F: SessionFactory> SessionLease<'_, F> {
    /// Return the session after a successful use
    pub fn release(mut self) {
        self.released = true;
        self.manager.finish(true);
    }
}

impl<F: SessionFactory> Deref for SessionLease<'_, F> {
    type Target = F::Session;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<F: SessionFactory> Drop for SessionLease<'_, F> {
    fn drop(&mut self) {
        if !self.released {
            self.manager.finish(false);
        }
    }
}

/// [`Fetcher`] that leases a managed session for every call
pub struct SessionFetcher<F: SessionFactory> {
    manager: SessionManager<F>,
}

impl<F: SessionFactory> SessionFetcher<F> {
    /// Wrap a manager
    pub fn new(manager: SessionManager<F>) -> Self {
        Self { manager }
    }

    /// The underlying manager
    pub fn manager(&self) -> &SessionManager<F> {
        &self.manager
    }
}

#[async_trait]
impl<F> Fetcher for SessionFetcher<F>
where
    F: SessionFactory,
    F::Session: Fetcher,
{
    async fn fetch(&self, url: &str) -> FetcherResult<String> {
        let lease = self.manager.checkout()?;
        let body = lease.fetch(url).await?;
        lease.release();
        Ok(body)
    }

    fn abort(&self) {
        self.manager.abort();
    }
}
