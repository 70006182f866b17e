use thiserror::Error;

/// Every failure the runtime can surface to the embedding binary.
///
/// All of these are fatal: the host restarts a misbehaving worker, so the
/// runtime never retries or recovers locally. The only non-error ways to
/// finish a run are input exhaustion and cancellation.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The process argument vector had the wrong number of entries.
    #[error("invalid number of process arguments: {0}")]
    InvalidArgumentCount(usize),

    /// The same entrypoint name was registered twice on one mux.
    #[error("entrypoint {0:?} is already registered on this mux")]
    AlreadyRegistered(String),

    /// The configured entrypoint was never registered.
    #[error("entrypoint {0:?} does not exist")]
    UnknownEntrypoint(String),

    /// The incoming message could not be decoded into the handler's
    /// request shape.
    #[error("parsing request payload: {0}")]
    Parsing(#[source] serde_json::Error),

    /// The handler itself returned an error. The user's message is kept
    /// verbatim.
    #[error("executing handler: {0}")]
    Execution(#[source] anyhow::Error),

    /// A response value cannot be represented in JSON, e.g. a non-finite
    /// float. serde_json would silently coerce these to `null`, which the
    /// host must never observe.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// Serializing the response envelope failed.
    #[error("encoding response: {0}")]
    Encode(#[source] serde_json::Error),

    /// The input stream became unreadable for a reason other than clean
    /// closure.
    #[error("reading from input stream failed: {0}")]
    Io(#[from] std::io::Error),
}
