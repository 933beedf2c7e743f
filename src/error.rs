use snafu::{Location, Snafu};

use crate::assets::AssetError;
use crate::database::DatabaseError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// Could not read the configuration from the environment
    ConfigLoad {
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not connect to the document store, even after retrying
    ConnectDatabase {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not define the collections and indexes
    ApplySchema {
        source: DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },

    /// The asset endpoint is unusable
    Assets {
        source: AssetError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not write the feed to stdout
    Output {
        source: serde_json::Error,
        #[snafu(implicit)]
        location: Location,
    },
}
