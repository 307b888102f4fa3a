//! Assembles the spans of a single trace into a parent/child tree.
//!
//! Distributed-tracing backends collect the spans of a trace as an
//! unordered, possibly duplicated, possibly incomplete set. Rendering a
//! timeline, correcting clock skew or linking service dependencies all need
//! that set in parent/child form, including the B3 convention that an RPC
//! server may reuse (share) its client's span id on a different endpoint.
//!
//! The pipeline is: collapse duplicate records with [`merge::merge`], feed
//! the result through a [`TreeBuilder`], then traverse the [`SpanTree`], or
//! flatten it with [`timeline::depth_first_rows`] and compute waterfall
//! connector glyphs with [`timeline::decorate`].
//!
//! # Getting started
//!
//! ```
//! use trace_tree::{NoopLogger, Span, TraceId, TreeBuilder};
//!
//! let trace_id = TraceId::from_hex("86154a4ba6e91385").unwrap();
//! let mut builder = TreeBuilder::new(trace_id, NoopLogger);
//!
//! // Insertion order does not matter; the tree is stitched together by id.
//! builder.add_node(
//!     Span::builder()
//!         .trace_id(trace_id)
//!         .id(2u64)
//!         .parent_id(1u64)
//!         .name("get /users/{id}")
//!         .build(),
//! );
//! builder.add_node(Span::builder().trace_id(trace_id).id(1u64).build());
//!
//! let tree = builder.build();
//! assert_eq!(tree.traverse().count(), 2);
//! assert_eq!(tree.children(tree.root()).len(), 1);
//! ```
//!
//! Malformed traces never fail assembly: orphans are attributed to the
//! root, a missing root is replaced by a synthetic node, and spans claiming
//! themselves as parent are dropped. Each case is reported through the
//! [`Logger`] passed to the builder.
//!
//! # Crate feature flags
//!
//! * `internal-logs`: provides `TracingLogger`, which forwards builder
//!   diagnostics to `tracing` at DEBUG level (enabled by default).

#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

mod error;
mod trace_context;

pub mod logging;
pub mod merge;
pub mod model;
pub mod timeline;
pub mod tree;

pub use error::TreeError;
#[cfg(feature = "internal-logs")]
pub use logging::TracingLogger;
pub use logging::{Logger, MemoryLogger, NoopLogger};
pub use model::{Annotation, Endpoint, Kind, Span};
pub use trace_context::{SpanId, TraceId};
pub use tree::{NodeId, SpanTree, Traverse, TreeBuilder};
