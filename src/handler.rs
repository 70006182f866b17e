use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::types::{Request, Response};

/// A handler responds to one decoded request.
///
/// Returning `Ok(None)` is a valid, successful outcome and serializes as
/// `{"result":null}`. Returning an error fails the whole run. The
/// cancellation token fires when the worker is asked to shut down; long
/// running handlers should observe it.
#[async_trait]
pub trait Handler<T, C>: Send + Sync {
    async fn handle(
        &self,
        cancel: CancellationToken,
        request: Request<T, C>,
    ) -> anyhow::Result<Option<Response>>;
}

/// Wraps an async closure into a [`Handler`].
pub fn handler_fn<T, C, F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(CancellationToken, Request<T, C>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Response>>> + Send,
{
    HandlerFn(f)
}

/// See [`handler_fn`].
pub struct HandlerFn<F>(F);

#[async_trait]
impl<T, C, F, Fut> Handler<T, C> for HandlerFn<F>
where
    T: Send + 'static,
    C: Send + 'static,
    F: Fn(CancellationToken, Request<T, C>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Response>>> + Send,
{
    async fn handle(
        &self,
        cancel: CancellationToken,
        request: Request<T, C>,
    ) -> anyhow::Result<Option<Response>> {
        (self.0)(cancel, request).await
    }
}

/// The uniform decode-and-invoke contract the engine dispatches through.
/// Each entry closes over its concrete payload types, so no runtime type
/// inspection is needed.
#[async_trait]
pub(crate) trait Entry: Send + Sync {
    async fn invoke(
        &self,
        cancel: CancellationToken,
        payload: &[u8],
    ) -> Result<Option<Response>, RuntimeError>;
}

pub(crate) struct TypedEntry<T, C, H> {
    handler: H,
    _request: PhantomData<fn() -> (T, C)>,
}

impl<T, C, H> TypedEntry<T, C, H> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _request: PhantomData,
        }
    }
}

#[async_trait]
impl<T, C, H> Entry for TypedEntry<T, C, H>
where
    T: DeserializeOwned + Default + Send + 'static,
    C: DeserializeOwned + Default + Send + 'static,
    H: Handler<T, C>,
{
    async fn invoke(
        &self,
        cancel: CancellationToken,
        payload: &[u8],
    ) -> Result<Option<Response>, RuntimeError> {
        let request: Request<T, C> =
            serde_json::from_slice(payload).map_err(RuntimeError::Parsing)?;
        self.handler
            .handle(cancel, request)
            .await
            .map_err(RuntimeError::Execution)
    }
}
