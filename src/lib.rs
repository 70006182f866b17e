//! In-process runtime for functions invoked by a FaaS host over a
//! line-based stdin/stdout protocol.
//!
//! The host spawns the worker process once, passes its configuration as
//! fixed-position arguments and then drives invocations by writing one
//! JSON message per line to stdin. The runtime decodes each message into
//! the registered entrypoint's request shape, invokes the handler and
//! writes the framed JSON response back to stdout. In keepalive mode the
//! worker stays up between invocations and answers `ping` probes with
//! `pong`.
//!
//! # Quick start
//!
//! ```no_run
//! use faas_runtime::{Mux, Request, Response};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! struct Numbers {
//!     a: i64,
//!     b: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), faas_runtime::RuntimeError> {
//!     let mut mux = Mux::new();
//!     mux.handle_fn("sum", |_cancel, request: Request<Numbers>| async move {
//!         let response = Response::json(request.data().a + request.data().b)?;
//!         Ok(Some(response))
//!     })?;
//!
//!     faas_runtime::run(mux).await
//! }
//! ```
//!
//! Payload and context types are chosen per entrypoint at registration
//! time; they only need to implement `Deserialize` and `Default`. Binary
//! payloads use [`File`], which carries its content base64 encoded on the
//! wire.
//!
//! Every runtime failure is fatal by design: the host restarts a worker
//! that exits abnormally, so errors are propagated out of [`run`] instead
//! of being swallowed.

mod encode;
mod engine;
mod error;
mod file;
mod handler;
mod mux;
mod options;
mod types;

pub use engine::{run, write_metadata, Engine};
pub use error::RuntimeError;
pub use file::File;
pub use handler::{handler_fn, Handler, HandlerFn};
pub use mux::Mux;
pub use options::{Launch, Options};
pub use types::{Context, Event, EventDataType, Request, Response, ResultDataType};

/// Version of the binary interface this library implements, reported to
/// the host through the metadata document.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");
