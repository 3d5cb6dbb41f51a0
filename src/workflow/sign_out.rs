use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::services::sessions::SessionService;

use super::{Navigation, Navigator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignOutState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Ends the session and reloads the page so no per-user state survives.
/// A failure is only logged; the page stays as it is.
pub struct SignOut {
    sessions: Arc<dyn SessionService>,
    state: SignOutState,
}

impl SignOut {
    pub fn new(sessions: Arc<dyn SessionService>) -> Self {
        Self {
            sessions,
            state: SignOutState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SignOutState {
        self.state
    }

    pub async fn run(&mut self, token: Uuid, navigator: &dyn Navigator) -> SignOutState {
        // the reload for this flow has already been issued
        if self.state == SignOutState::Succeeded {
            return self.state;
        }

        self.state = SignOutState::Pending;
        match self.sessions.sign_out(token).await {
            Ok(()) => {
                info!("signed out");
                self.state = SignOutState::Succeeded;
                navigator.navigate(Navigation::Reload);
            }
            Err(e) => {
                warn!(%e, "sign out failed");
                self.state = SignOutState::Failed;
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::async_trait;

    use super::*;
    use crate::models::user::{Session, User};

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    struct FakeSessions {
        ok: bool,
        journal: Journal,
    }

    #[async_trait]
    impl SessionService for FakeSessions {
        async fn sign_in(&self, _email: &str) -> anyhow::Result<Option<Session>> {
            Ok(None)
        }

        async fn current_user(&self, _token: Uuid) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn sign_out(&self, _token: Uuid) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push("sign_out");
            anyhow::ensure!(self.ok, "session store unavailable");
            Ok(())
        }
    }

    struct Reloads(Journal);

    impl Navigator for Reloads {
        fn navigate(&self, to: Navigation) {
            assert_eq!(to, Navigation::Reload);
            self.0.lock().unwrap().push("reload");
        }
    }

    fn flow(ok: bool) -> (SignOut, Journal) {
        let journal = Journal::default();
        let sessions = Arc::new(FakeSessions {
            ok,
            journal: journal.clone(),
        });
        (SignOut::new(sessions), journal)
    }

    #[tokio::test]
    async fn reloads_once_after_success() {
        let (mut sign_out, journal) = flow(true);
        let nav = Reloads(journal.clone());
        assert_eq!(sign_out.state(), SignOutState::Idle);

        let token = Uuid::now_v7();
        assert_eq!(sign_out.run(token, &nav).await, SignOutState::Succeeded);
        assert_eq!(sign_out.run(token, &nav).await, SignOutState::Succeeded);

        assert_eq!(*journal.lock().unwrap(), vec!["sign_out", "reload"]);
    }

    #[tokio::test]
    async fn failure_is_silent() {
        let (mut sign_out, journal) = flow(false);
        let nav = Reloads(journal.clone());

        assert_eq!(sign_out.run(Uuid::now_v7(), &nav).await, SignOutState::Failed);
        assert_eq!(*journal.lock().unwrap(), vec!["sign_out"]);
    }
}
