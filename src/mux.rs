use std::collections::HashMap;
use std::future::Future;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::handler::{handler_fn, Entry, Handler, TypedEntry};
use crate::types::{Request, Response};

/// Name-keyed registry of entrypoints.
///
/// A mux is built once by the embedding binary, populated before the
/// engine starts and never mutated afterwards; registration takes
/// `&mut self`, so concurrent double-registration is impossible by
/// construction and steady-state lookups need no locking.
#[derive(Default)]
pub struct Mux {
    entries: HashMap<String, Box<dyn Entry>>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `entrypoint`.
    ///
    /// Registering the same entrypoint twice fails with
    /// [`RuntimeError::AlreadyRegistered`].
    pub fn handle<T, C, H>(
        &mut self,
        entrypoint: impl Into<String>,
        handler: H,
    ) -> Result<(), RuntimeError>
    where
        T: DeserializeOwned + Default + Send + 'static,
        C: DeserializeOwned + Default + Send + 'static,
        H: Handler<T, C> + 'static,
    {
        let entrypoint = entrypoint.into();
        if self.entries.contains_key(&entrypoint) {
            return Err(RuntimeError::AlreadyRegistered(entrypoint));
        }
        self.entries
            .insert(entrypoint, Box::new(TypedEntry::new(handler)));
        Ok(())
    }

    /// Binds an async closure to `entrypoint`.
    pub fn handle_fn<T, C, F, Fut>(
        &mut self,
        entrypoint: impl Into<String>,
        f: F,
    ) -> Result<(), RuntimeError>
    where
        T: DeserializeOwned + Default + Send + 'static,
        C: DeserializeOwned + Default + Send + 'static,
        F: Fn(CancellationToken, Request<T, C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Response>>> + Send + 'static,
    {
        self.handle(entrypoint, handler_fn(f))
    }

    /// The names of all registered entrypoints.
    pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn lookup(&self, entrypoint: &str) -> Option<&dyn Entry> {
        self.entries.get(entrypoint).map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn noop(mux: &mut Mux, name: &str) -> Result<(), RuntimeError> {
        mux.handle_fn(name, |_cancel, _request: Request<Value>| async move {
            Ok(None)
        })
    }

    #[test]
    fn distinct_names_register() {
        let mut mux = Mux::new();
        noop(&mut mux, "first").unwrap();
        noop(&mut mux, "second").unwrap();

        let mut names: Vec<_> = mux.entrypoints().collect();
        names.sort_unstable();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut mux = Mux::new();
        noop(&mut mux, "sum").unwrap();

        let err = noop(&mut mux, "sum").unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyRegistered(name) if name == "sum"));
    }

    #[test]
    fn lookup_misses_unregistered_names() {
        let mut mux = Mux::new();
        noop(&mut mux, "sum").unwrap();

        assert!(mux.lookup("sum").is_some());
        assert!(mux.lookup("missing").is_none());
    }
}
