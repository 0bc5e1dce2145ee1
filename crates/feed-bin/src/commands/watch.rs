//! Follow auth state changes until interrupted.
//!
//! Besides changes made by this process, the provider's stored session is
//! polled: a login or logout from another invocation, or an expired token
//! being refreshed, is reconciled and printed too.

use super::auth::AuthStatusView;
use crate::app::App;
use crate::output::{self, OutputFormat};
use auth_session::AuthRuntime;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// How often the provider's stored session is re-read.
const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub async fn watch(app: &App, format: &OutputFormat) -> anyhow::Result<()> {
    output::print_progress("Watching auth state (Ctrl-C to stop)...", format);
    follow(
        &app.auth,
        SESSION_POLL_INTERVAL,
        tokio::signal::ctrl_c(),
        |view| output::print(&view, format),
    )
    .await
}

/// Report the current state, then every change, until `stop` resolves.
async fn follow<S, F>(
    auth: &AuthRuntime,
    poll_interval: Duration,
    stop: S,
    mut report: F,
) -> anyhow::Result<()>
where
    S: Future<Output = std::io::Result<()>>,
    F: FnMut(AuthStatusView),
{
    let mut changes = auth.subscribe();
    report(AuthStatusView::from(&*changes.borrow_and_update()));

    let mut seen_token = auth.access_token();
    let mut poll = tokio::time::interval(poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll.tick().await;

    tokio::pin!(stop);
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                report(AuthStatusView::from(&*changes.borrow_and_update()));
            }
            _ = poll.tick() => {
                let session = match auth.reconciler().provider().get_session().await {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(error = %e, "Could not re-read stored session");
                        continue;
                    }
                };
                let token = session.as_ref().map(|s| s.access_token.clone());
                if token == seen_token {
                    continue;
                }
                debug!("Stored session changed, reconciling");
                seen_token = token;
                if let Err(e) = auth.reconciler().reconcile_existing_session(session).await {
                    warn!(error = %e, "Reconciling stored session failed");
                }
            }
            signal = &mut stop => {
                signal?;
                break;
            }
        }
    }

    Ok(())
}
