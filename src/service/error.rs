use snafu::{Location, Snafu};

use crate::database::DatabaseError;
use crate::session::SessionError;
use crate::Located;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ServiceError {
    #[snafu(display("this action requires a signed-in user: {source}"))]
    Unauthenticated {
        source: SessionError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("document store request failed: {source}"))]
    Store {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// How a failure should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Nobody is signed in.
    Unauthenticated,
    /// A referenced record vanished between operations.
    NotFound,
    /// The store could not be reached or rejected the request.
    Service,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            ServiceError::Store { source, .. } if source.is_not_found() => ErrorKind::NotFound,
            ServiceError::Store { .. } => ErrorKind::Service,
        }
    }
}

impl Located for ServiceError {
    fn location(&self) -> Location {
        match self {
            ServiceError::Unauthenticated { location, .. } | ServiceError::Store { location, .. } => {
                *location
            }
        }
    }
}
