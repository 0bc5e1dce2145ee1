//! Bridges identity provider change notifications into reconciliation.

use crate::reconciler::SessionReconciler;
use std::sync::Arc;
use supabase_gateway::AuthChange;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct AuthChangeListener;

impl AuthChangeListener {
    /// Reconcile every change received on `changes` until unsubscribed or
    /// the provider goes away.
    pub fn spawn(
        reconciler: Arc<SessionReconciler>,
        mut changes: broadcast::Receiver<AuthChange>,
    ) -> AuthSubscription {
        let handle = tokio::spawn(async move {
            loop {
                let session = match changes.recv().await {
                    Ok(change) => {
                        debug!(event = ?change.event, "Auth change received");
                        change.session
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth change listener lagged, re-reading session");
                        match reconciler.provider().get_session().await {
                            Ok(session) => session,
                            Err(e) => {
                                warn!(error = %e, "Could not re-read session after lag");
                                continue;
                            }
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Auth change channel closed, listener exiting");
                        break;
                    }
                };

                if let Err(e) = reconciler.reconcile_existing_session(session).await {
                    warn!(error = %e, "Reconciling auth change failed");
                }
            }
        });

        info!("Auth change listener started");
        AuthSubscription {
            handle: Some(handle),
        }
    }
}

/// Handle to a running listener. Dropping it unsubscribes.
pub struct AuthSubscription {
    handle: Option<JoinHandle<()>>,
}

impl AuthSubscription {
    /// Stop listening. Returns true only for the call that actually tore the
    /// listener down.
    pub fn unsubscribe(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("Auth change listener stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
