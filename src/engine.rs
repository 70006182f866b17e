use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::RuntimeError;
use crate::handler::Entry;
use crate::mux::Mux;
use crate::options::{Launch, Options};
use crate::types::Response;
use crate::LIBRARY_VERSION;

/// Keepalive probe the host writes between invocations.
const PING: &str = "ping";
/// Reply to the keepalive probe.
const PONG: &str = "pong";

/// The invocation engine: reads newline-delimited messages from the input
/// stream, dispatches them to the configured entrypoint and writes framed
/// responses.
///
/// The engine is generic over its streams so tests can drive it with
/// in-memory buffers; production use goes through [`run`].
pub struct Engine {
    mux: Mux,
    options: Options,
}

impl Engine {
    pub fn new(mux: Mux, options: Options) -> Self {
        Self { mux, options }
    }

    /// Runs the engine until completion.
    ///
    /// Exactly one background task reads lines from `stdin` and forwards
    /// them over a capacity-one channel; the protocol is strictly
    /// request/response, never pipelined. Cancelling `cancel` stops the
    /// reader at its next line boundary, after which the loop drains and
    /// finishes cleanly without emitting a partial response.
    pub async fn run<I, O, E>(
        &self,
        stdin: I,
        stdout: &mut O,
        stderr: &mut E,
        cancel: CancellationToken,
    ) -> Result<(), RuntimeError>
    where
        I: AsyncRead + Send + Unpin + 'static,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let entry = self
            .mux
            .lookup(&self.options.entrypoint)
            .ok_or_else(|| RuntimeError::UnknownEntrypoint(self.options.entrypoint.clone()))?;

        info!(
            entrypoint = %self.options.entrypoint,
            keep_alive = self.options.keep_alive,
            "invocation engine started"
        );

        let (tx, mut rx) = mpsc::channel::<io::Result<String>>(1);
        let reader_token = cancel.child_token();
        let reader = tokio::spawn(read_lines(stdin, tx, reader_token.clone()));

        let outcome = self
            .serve(entry, &mut rx, stdout, stderr, &cancel)
            .await;

        // Unblock the reader whichever await it is parked in, then join it.
        reader_token.cancel();
        rx.close();
        let _ = reader.await;

        if let Err(err) = &outcome {
            error!(error = %err, "invocation engine failed");
        }
        outcome
    }

    async fn serve<O, E>(
        &self,
        entry: &dyn Entry,
        rx: &mut mpsc::Receiver<io::Result<String>>,
        stdout: &mut O,
        stderr: &mut E,
        cancel: &CancellationToken,
    ) -> Result<(), RuntimeError>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        while let Some(message) = rx.recv().await {
            let message = message?;

            if self.options.keep_alive && message == PING {
                trace!("answering keepalive probe");
                stdout.write_all(PONG.as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }

            debug!(bytes = message.len(), "dispatching message");
            let response = entry.invoke(cancel.clone(), message.as_bytes()).await?;
            let body = encode_envelope(response.as_ref())?;

            stdout
                .write_all(self.options.stdout_sequence.as_bytes())
                .await?;
            stdout.write_all(body.as_bytes()).await?;
            stdout.flush().await?;

            if !self.options.keep_alive {
                break;
            }

            stdout
                .write_all(self.options.termination_sequence.as_bytes())
                .await?;
            stdout.flush().await?;
            stderr
                .write_all(self.options.termination_sequence.as_bytes())
                .await?;
            stderr.flush().await?;
        }

        Ok(())
    }
}

/// Scans the input stream for newline-terminated messages, skipping empty
/// lines, and forwards each one to the dispatch loop. Stops at the next
/// line boundary once cancellation fires, or when the input is exhausted.
async fn read_lines<I>(
    stdin: I,
    tx: mpsc::Sender<io::Result<String>>,
    cancel: CancellationToken,
) where
    I: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(stdin).lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                break;
            }
        }
    }
}

fn encode_envelope(response: Option<&Response>) -> Result<String, RuntimeError> {
    #[derive(Serialize)]
    struct Envelope<'a> {
        result: Option<&'a Response>,
    }

    serde_json::to_string(&Envelope { result: response }).map_err(RuntimeError::Encode)
}

/// The self-description document the host reads in metadata mode.
#[derive(Serialize)]
struct Metadata {
    library_version: &'static str,
    runtime: &'static str,
    runtime_version: &'static str,
    features: &'static [&'static str],
}

/// Writes the metadata document to `out`.
pub async fn write_metadata<W: AsyncWrite + Unpin>(out: &mut W) -> Result<(), RuntimeError> {
    let metadata = Metadata {
        library_version: LIBRARY_VERSION,
        runtime: "Rust",
        runtime_version: env!("FAAS_RUNTIME_RUSTC_VERSION"),
        features: &["keepalive"],
    };

    let body = serde_json::to_vec(&metadata).map_err(RuntimeError::Encode)?;
    out.write_all(&body).await?;
    out.flush().await?;
    Ok(())
}

/// Parses the process arguments and runs the worker over the real standard
/// streams until the host closes the input, the run completes or an
/// interrupt arrives.
///
/// Any returned error is fatal; the embedding `main` is expected to
/// propagate it so the process exits abnormally and the host restarts the
/// worker.
pub async fn run(mux: Mux) -> Result<(), RuntimeError> {
    let args: Vec<String> = std::env::args().collect();
    match Launch::parse(&args)? {
        Launch::Metadata => write_metadata(&mut tokio::io::stdout()).await,
        Launch::Execute(options) => {
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });

            Engine::new(mux, options)
                .run(
                    tokio::io::stdin(),
                    &mut tokio::io::stdout(),
                    &mut tokio::io::stderr(),
                    cancel,
                )
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metadata_document_has_the_expected_fields() {
        let mut out = Vec::new();
        write_metadata(&mut out).await.unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["library_version"], LIBRARY_VERSION);
        assert_eq!(doc["runtime"], "Rust");
        assert_eq!(doc["features"], serde_json::json!(["keepalive"]));
        assert!(doc["runtime_version"].is_string());
    }

    #[test]
    fn envelope_wraps_result_or_null() {
        assert_eq!(encode_envelope(None).unwrap(), r#"{"result":null}"#);

        let response = Response::json(5).unwrap();
        assert_eq!(
            encode_envelope(Some(&response)).unwrap(),
            r#"{"result":{"data":5}}"#
        );
    }
}
