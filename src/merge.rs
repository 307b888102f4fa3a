//! Collapses duplicate span records reported for the same trace.
//!
//! Instrumentation commonly reports the same span more than once: a client
//! flushing twice, a proxy re-forwarding a batch, or both halves of an RPC
//! arriving with the same id and `shared` flag. Before a trace is assembled
//! into a tree, records with the same identity are merged into one canonical
//! span so the builder sees each operation exactly once.

use std::collections::BTreeSet;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::model::{Endpoint, Span};
use crate::trace_context::{SpanId, TraceId};

/// Merges duplicate records into one canonical span per identity.
///
/// Identity is `(trace_id, id, shared)`: the client and server halves of an
/// RPC stay separate even though they share a span id. Output preserves the
/// order in which each identity was first seen.
pub fn merge(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: IndexMap<(TraceId, SpanId, bool), Span> = IndexMap::with_capacity(spans.len());
    for span in spans {
        match merged.entry((span.trace_id, span.id, span.shared)) {
            Entry::Occupied(mut existing) => {
                let canonical = merge_pair(existing.get().clone(), span);
                existing.insert(canonical);
            }
            Entry::Vacant(slot) => {
                slot.insert(span);
            }
        }
    }
    merged.into_values().collect()
}

/// Merges two records of the same span, `later` being the later-arriving one.
///
/// Field dominance:
/// - scalar fields (`name`, `kind`, `timestamp`, `duration`, `parent_id`): a
///   sole non-absent value wins; when both are present and differ, the record
///   with the longer duration wins, ties going to the later record;
/// - endpoints: field-wise union, specific values (non-empty service name,
///   non-zero address or port) override unspecific ones;
/// - tags: union, non-empty values win collisions, ties go to the later
///   record;
/// - annotations: set-union deduplicated by `(timestamp, value)`;
/// - `shared` and `debug`: logical OR.
///
/// The outcome is commutative for non-conflicting fields, and associative.
pub fn merge_pair(earlier: Span, later: Span) -> Span {
    // Conflicting scalars take the value from the record with the longer
    // duration; a tie keeps the later record's value.
    let later_dominates = later.duration.unwrap_or(0) >= earlier.duration.unwrap_or(0);

    let mut tags = earlier.tags;
    for (key, value) in later.tags {
        match tags.entry(key) {
            std::collections::hash_map::Entry::Occupied(mut existing) => {
                let keep_existing = value.is_empty() && !existing.get().is_empty();
                if !keep_existing {
                    existing.insert(value);
                }
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }

    let annotations: BTreeSet<_> = earlier
        .annotations
        .into_iter()
        .chain(later.annotations)
        .collect();

    Span {
        trace_id: later.trace_id,
        id: later.id,
        parent_id: pick(earlier.parent_id, later.parent_id, later_dominates),
        kind: pick(earlier.kind, later.kind, later_dominates),
        name: pick(earlier.name, later.name, later_dominates),
        timestamp: pick(earlier.timestamp, later.timestamp, later_dominates),
        duration: pick(earlier.duration, later.duration, later_dominates),
        local_endpoint: union_endpoints(
            earlier.local_endpoint,
            later.local_endpoint,
            later_dominates,
        ),
        remote_endpoint: union_endpoints(
            earlier.remote_endpoint,
            later.remote_endpoint,
            later_dominates,
        ),
        annotations: annotations.into_iter().collect(),
        tags,
        debug: earlier.debug || later.debug,
        shared: earlier.shared || later.shared,
    }
}

fn pick<T>(earlier: Option<T>, later: Option<T>, later_dominates: bool) -> Option<T> {
    match (earlier, later) {
        (Some(earlier), Some(later)) => Some(if later_dominates { later } else { earlier }),
        (earlier, later) => earlier.or(later),
    }
}

/// Field-wise union of two endpoint records. Specific fields beat unspecific
/// ones; two specific values keep the dominant record's.
fn union_endpoints(
    earlier: Option<Endpoint>,
    later: Option<Endpoint>,
    later_dominates: bool,
) -> Option<Endpoint> {
    match (earlier, later) {
        (Some(earlier), Some(later)) => {
            let (weak, strong) = if later_dominates {
                (earlier, later)
            } else {
                (later, earlier)
            };
            Some(Endpoint {
                service_name: prefer(strong.service_name, weak.service_name, |name| {
                    !name.is_empty()
                }),
                ipv4: prefer(strong.ipv4, weak.ipv4, |ip| !ip.is_unspecified()),
                ipv6: prefer(strong.ipv6, weak.ipv6, |ip| !ip.is_unspecified()),
                port: prefer(strong.port, weak.port, |port| *port != 0),
            })
        }
        (earlier, later) => earlier.or(later),
    }
}

fn prefer<T>(strong: Option<T>, weak: Option<T>, is_specific: impl Fn(&T) -> bool) -> Option<T> {
    match (strong, weak) {
        (Some(strong), _) if is_specific(&strong) => Some(strong),
        (_, Some(weak)) if is_specific(&weak) => Some(weak),
        (strong, weak) => strong.or(weak),
    }
}
