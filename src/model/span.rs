use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::model::{Annotation, Endpoint};
use crate::trace_context::{SpanId, TraceId};

/// The role a span played in an RPC or messaging exchange.
///
/// An absent kind means the span was local to one service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    /// Initiator of an RPC; `timestamp` is the moment the request was sent.
    Client,
    /// Receiver of an RPC. A server span may share its client's span id, in
    /// which case it sets [`Span::shared`].
    Server,
    /// Origin of a message sent to a broker.
    Producer,
    /// Receiver of a message from a broker.
    Consumer,
}

/// A single timed operation within a trace, in Zipkin v2 shape.
///
/// Spans are immutable values: the assembly pipeline reads them, merges
/// duplicates and hangs them in a tree, but never edits fields in place.
///
/// # Example
///
/// ```
/// use trace_tree::{Kind, Span, TraceId};
///
/// let span = Span::builder()
///     .trace_id(TraceId::from_hex("86154a4ba6e91385").unwrap())
///     .id(0x2fu64)
///     .parent_id(0x1eu64)
///     .kind(Kind::Client)
///     .name("get /users/{id}")
///     .timestamp(1_502_787_600_000_000u64)
///     .duration(207_000u64)
///     .build();
///
/// assert_eq!(span.name.as_deref(), Some("get /users/{id}"));
/// assert!(!span.shared);
/// ```
#[derive(TypedBuilder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// The trace this span belongs to.
    #[builder(setter(into))]
    #[serde(with = "hex_trace_id")]
    pub trace_id: TraceId,
    /// The parent's span id, absent for a root span.
    #[builder(setter(strip_option, into), default)]
    #[serde(skip_serializing_if = "Option::is_none", default, with = "hex_span_id_opt")]
    pub parent_id: Option<SpanId>,
    /// Unique within a trace, except when an RPC server reuses its client's
    /// id and marks its half [`shared`](Span::shared).
    #[builder(setter(into))]
    #[serde(with = "hex_span_id")]
    pub id: SpanId,
    /// The RPC or messaging role, if any.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kind: Option<Kind>,
    /// The logical operation this span represents, lowercase.
    #[builder(setter(strip_option, into), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Epoch microseconds of the start of this span.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<u64>,
    /// Duration in microseconds of the critical path, if known.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration: Option<u64>,
    /// The host that recorded this span.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub local_endpoint: Option<Endpoint>,
    /// The other side of the connection, when known.
    #[builder(setter(strip_option), default)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remote_endpoint: Option<Endpoint>,
    /// Events that explain latency within the span, in timestamp order.
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<Annotation>,
    /// Key-value context, such as `http.path`.
    #[builder(default)]
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub tags: HashMap<String, String>,
    /// True if this span was sampled regardless of the sampling decision.
    #[builder(default)]
    #[serde(default)]
    pub debug: bool,
    /// True when this is the server half of an RPC whose client originated
    /// the span id.
    #[builder(default)]
    #[serde(default)]
    pub shared: bool,
}

mod hex_trace_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::trace_context::TraceId;

    pub(crate) fn serialize<S: Serializer>(id: &TraceId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TraceId, D::Error> {
        let hex = String::deserialize(deserializer)?;
        TraceId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

mod hex_span_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::trace_context::SpanId;

    pub(crate) fn serialize<S: Serializer>(id: &SpanId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SpanId, D::Error> {
        let hex = String::deserialize(deserializer)?;
        SpanId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

mod hex_span_id_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::trace_context::SpanId;

    pub(crate) fn serialize<S: Serializer>(
        id: &Option<SpanId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.collect_str(id),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SpanId>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(hex) => SpanId::from_hex(&hex)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
