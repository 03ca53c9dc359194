use thiserror::Error;

use crate::channel::ChannelError;
use crate::registry::RegistryError;
use crate::sync::SyncError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
