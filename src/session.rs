use std::future::Future;
use std::sync::Arc;

use derive_new::new;
use snafu::{Location, OptionExt as _, Snafu};
use tokio::sync::RwLock;

use crate::database::Record;
use crate::model::User;
use crate::Located;

/// The signed-in user on whose behalf writes are made.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Actor {
    pub id: Record<User>,
    pub display_name: String,
}

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("no user is signed in"))]
    Unauthenticated {
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for SessionError {
    fn location(&self) -> Location {
        match self {
            SessionError::Unauthenticated { location } => *location,
        }
    }
}

/// Resolves who is currently signed in.
pub trait SessionProvider: Send + Sync {
    fn current_actor(&self) -> impl Future<Output = Result<Actor, SessionError>> + Send;
}

/// In-process session the embedding application signs in and out of.
///
/// Clones share the same sign-in state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    actor: Arc<RwLock<Option<Actor>>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(actor: Actor) -> Self {
        Self {
            actor: Arc::new(RwLock::new(Some(actor))),
        }
    }

    pub async fn sign_in(&self, actor: Actor) {
        tracing::info!(user = %actor.id, "signed in");
        *self.actor.write().await = Some(actor);
    }

    pub async fn sign_out(&self) {
        if let Some(actor) = self.actor.write().await.take() {
            tracing::info!(user = %actor.id, "signed out");
        }
    }
}

impl SessionProvider for Session {
    async fn current_actor(&self) -> Result<Actor, SessionError> {
        self.actor.read().await.clone().context(UnauthenticatedSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anonymous_session_is_unauthenticated() {
        let session = Session::anonymous();
        assert!(matches!(
            session.current_actor().await,
            Err(SessionError::Unauthenticated { .. })
        ));
    }

    #[tokio::test]
    async fn clones_share_sign_in_state() {
        let session = Session::anonymous();
        let shared = session.clone();
        let actor = Actor::new(Record::new("fubuki"), "Fubuki".into());

        session.sign_in(actor.clone()).await;
        assert_eq!(shared.current_actor().await.unwrap(), actor);

        shared.sign_out().await;
        assert!(session.current_actor().await.is_err());
    }
}
