use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encode;
use crate::error::RuntimeError;

/// Semantic shape of the data inside an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventDataType {
    /// A plain string, equivalent to the `text/plain` content type.
    Text,
    /// A JSON object or primitive, equivalent to `application/*`.
    Object,
    /// A base64 encoded binary representation of the body.
    Binary,
    /// Multipart form data. Each field maps to a list of values since a
    /// field name may occur multiple times within one request.
    Mixed,
}

/// Semantic shape of the data inside a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultDataType {
    Text,
    Object,
    Binary,
}

/// The trigger data of one invocation: query parameters, request headers
/// and the typed payload.
///
/// Immutable once decoded; owned by the single in-flight invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Event<T = Value> {
    /// GET parameters of the request. A parameter can occur multiple
    /// times, so the values are given as a list.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, Vec<String>>,

    /// HTTP headers that were sent with the request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub request_headers: HashMap<String, String>,

    /// The shape of [`Event::data`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventDataType>,

    /// The payload submitted with the request.
    ///
    /// Unlike the sibling fields this is always present when an event is
    /// serialized; an unset payload appears as its default value. Skipping
    /// it would impose `Default + PartialEq` bounds on every payload type.
    #[serde(default)]
    pub data: T,
}

/// Metadata about why the invocation happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de> + Default"))]
pub struct Context<C = Value> {
    /// True if the trigger does not wait for the function to return.
    #[serde(rename = "async", default, skip_serializing_if = "is_false")]
    pub asynchronous: bool,

    /// ISO-8601 timestamp of the trigger.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,

    /// The kind of trigger. The host falls back to `generic` if the
    /// trigger is unknown.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Additional data about the context.
    ///
    /// Always present when a context is serialized, like [`Event::data`].
    #[serde(default)]
    pub data: C,
}

/// The envelope combining one [`Event`] and one [`Context`], each
/// parameterized by a payload type the handler picks at registration time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    deserialize = "T: Deserialize<'de> + Default, C: Deserialize<'de> + Default"
))]
pub struct Request<T = Value, C = Value> {
    #[serde(default)]
    pub event: Event<T>,
    #[serde(default)]
    pub context: Context<C>,
}

impl<T, C> Request<T, C> {
    /// Shortcut to the event's payload.
    pub fn data(&self) -> &T {
        &self.event.data
    }
}

/// The outbound value a handler passes back to the host.
///
/// A handler may also return no response at all, which serializes as an
/// explicit `{"result":null}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Optional HTTP-ish status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,

    /// Headers the host sets on the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<HashMap<String, String>>,

    /// The payload. Serializes as `null` when left at the default.
    #[serde(default)]
    pub data: Value,

    /// The shape of [`Response::data`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResultDataType>,
}

impl Response {
    /// Builds a response carrying `data` as its payload.
    ///
    /// Fails with [`RuntimeError::UnsupportedValue`] if `data` contains a
    /// value the wire format cannot represent, such as a non-finite float.
    pub fn json<T: Serialize>(data: T) -> Result<Self, RuntimeError> {
        Ok(Self {
            data: encode::to_value(data)?,
            ..Default::default()
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
