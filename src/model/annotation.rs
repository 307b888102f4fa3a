use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// A timestamped event explaining activity within a span.
///
/// Ordering is by timestamp then value, the order annotations keep when
/// duplicate span records are merged.
#[derive(
    TypedBuilder, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Microseconds since epoch.
    pub timestamp: u64,
    /// Usually a short tag indicating an event, like `error`.
    #[builder(setter(into))]
    pub value: String,
}
