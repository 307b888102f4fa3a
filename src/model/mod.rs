//! The span model, in Zipkin v2 shape.
//!
//! Spans arrive pre-decoded from whatever transport the surrounding system
//! uses; this module defines the value types the assembly core consumes and
//! their JSON form, nothing transport-specific.

mod annotation;
mod endpoint;
mod span;

pub use annotation::Annotation;
pub use endpoint::Endpoint;
pub use span::{Kind, Span};
