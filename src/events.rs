use crate::auth::SessionManager;
use crate::background_tasks::spawn_auth_change;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Follows the session's auth state for the lifetime of the app.
///
/// Transitions are applied one at a time, in the order they were published,
/// so a sign-out can never be overtaken by the sign-in before it.
pub async fn spawn_auth_listener(
    session: Arc<SessionManager>,
    state_arc: Arc<RwLock<AppState>>,
) -> JoinHandle<()> {
    let mut subscription = session.subscribe().await;
    drop(session);

    tokio::spawn(async move {
        while let Some(auth) = subscription.next().await {
            debug!(signed_in = auth.is_signed_in(), "auth state changed");
            if spawn_auth_change(state_arc.clone(), auth).await.is_err() {
                break;
            }
        }
        info!("auth listener stopped");
    })
}
