//! Audio backend error types

use thiserror::Error;

/// Errors that can occur while bringing up or talking to the audio server
///
/// All of these are setup failures; there is no degraded operating mode for
/// an engine that cannot establish its ports, so callers are expected to
/// fail fast on any of them.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Could not connect to the JACK server
    #[error("failed to open JACK client: {0}")]
    ClientOpen(jack::Error),

    /// A port could not be registered
    #[error("failed to register JACK port \"{name}\": {source}")]
    PortRegister {
        name: &'static str,
        source: jack::Error,
    },

    /// The client could not be activated
    #[error("failed to activate JACK client: {0}")]
    Activate(jack::Error),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
