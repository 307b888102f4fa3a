//! Span trees and the builder that assembles them.
//!
//! Multiple backend features require a trace in parent/child form: clock-skew
//! correction walks network boundaries, dependency linking counts edges, and
//! timeline views render one row per node. [`TreeBuilder`] turns an
//! unordered, possibly incomplete set of spans for one trace into a
//! [`SpanTree`] rooted at the real root span when one arrived, or at a
//! synthetic node when none did.
//!
//! The builder is lenient: malformed traces degrade to a best-effort tree,
//! reported through the [`Logger`] rather than as errors. The one hard rule
//! is that a span may not claim itself as parent; such spans are dropped at
//! [`TreeBuilder::add_node`].

use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;

use crate::error::TreeError;
use crate::logging::Logger;
use crate::model::{Endpoint, Span};
use crate::trace_context::{SpanId, TraceId};

/// Identifies a node within the [`SpanTree`] that produced it.
///
/// Ids are plain indices: they are cheap to copy and remain valid for the
/// lifetime of their tree, but mean nothing to any other tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Debug)]
struct Node {
    span: Option<Span>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A trace assembled into parent/child form.
///
/// The tree owns its nodes in a flat arena; children and the parent
/// back-reference are indices, so there is no owning cycle. Once built, a
/// tree only changes through [`set_span`](SpanTree::set_span) (used by
/// transformations such as clock-skew correction); shared read access,
/// including [`traverse`](SpanTree::traverse), needs no synchronization.
#[derive(Debug)]
pub struct SpanTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SpanTree {
    fn with_capacity(capacity: usize) -> Self {
        SpanTree {
            nodes: Vec::with_capacity(capacity),
            root: NodeId(0),
        }
    }

    fn new_node(&mut self, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            span,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// The root node: the first root span seen, or a synthetic node when the
    /// trace was headless.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node's span, or `None` on a synthetic root.
    pub fn span(&self, node: NodeId) -> Option<&Span> {
        self.nodes[node.0].span.as_ref()
    }

    /// The node's parent, or `None` on the root.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// The node's children, in the order their spans were added.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Replaces the node's span, as transformations such as clock-skew
    /// correction do.
    pub fn set_span(&mut self, node: NodeId, span: Span) -> Result<(), TreeError> {
        let slot = self
            .nodes
            .get_mut(node.0)
            .ok_or(TreeError::UnknownNode(node))?;
        slot.span = Some(span);
        Ok(())
    }

    /// Hangs `child` under `parent`, unless it already is a child there.
    ///
    /// Tree assembly can address one node through multiple keys, so the same
    /// edge may be requested more than once; re-adds are absorbed. A node is
    /// never a child of itself.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if parent == child {
            return Err(TreeError::ChildIsSelf(parent));
        }
        if parent.0 >= self.nodes.len() {
            return Err(TreeError::UnknownNode(parent));
        }
        if child.0 >= self.nodes.len() {
            return Err(TreeError::UnknownNode(child));
        }
        if !self.nodes[parent.0].children.contains(&child) {
            self.nodes[parent.0].children.push(child);
        }
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Traverses the tree breadth-first from the root.
    ///
    /// Each call returns a fresh, finite iterator; nodes unreachable from the
    /// root (left over from unmerged duplicate records) are not visited.
    pub fn traverse(&self) -> Traverse<'_> {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        Traverse { tree: self, queue }
    }
}

impl fmt::Display for SpanTree {
    /// Renders the hierarchy one node per line, indented by depth, each span
    /// shown by id and name. Intended for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            match self.span(node) {
                Some(span) => match &span.name {
                    Some(name) => writeln!(f, "{} {}", span.id, name)?,
                    None => writeln!(f, "{}", span.id)?,
                },
                None => f.write_str("(synthetic root)\n")?,
            }
            for &child in self.children(node).iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }
}

/// Breadth-first iterator over a tree, returned by [`SpanTree::traverse`].
#[derive(Debug)]
pub struct Traverse<'a> {
    tree: &'a SpanTree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queue.extend(self.tree.children(node).iter().copied());
        Some(node)
    }
}

/// Lookup identity of a node while its trace is under assembly.
///
/// A span id is not unique within a trace: in an RPC the server reuses
/// (shares) its client's span id, and a retry can accidentally duplicate the
/// share. The endpoint tells children of such duplicate server spans apart.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Key {
    id: SpanId,
    shared: bool,
    endpoint: Option<Endpoint>,
}

impl Key {
    fn new(id: SpanId, shared: bool, endpoint: Option<Endpoint>) -> Self {
        Key {
            id,
            shared,
            endpoint,
        }
    }
}

/// A span buffered between [`TreeBuilder::add_node`] and
/// [`TreeBuilder::build`].
#[derive(Debug)]
struct PendingEntry {
    parent_id: Option<SpanId>,
    id: SpanId,
    shared: bool,
    endpoint: Option<Endpoint>,
    span: Span,
}

/// Assembles the spans of one trace into a [`SpanTree`].
///
/// Feed every span of the trace through [`add_node`](TreeBuilder::add_node)
/// in any order, then call [`build`](TreeBuilder::build). Duplicate records
/// with the same identity should be collapsed with [`crate::merge::merge`]
/// first.
///
/// A builder serves a single trace and is not meant for concurrent use; own
/// one builder per trace being assembled.
pub struct TreeBuilder {
    logger: Box<dyn Logger>,
    trace_id: TraceId,
    root_key: Option<Key>,
    root_node: Option<NodeId>,
    entries: Vec<PendingEntry>,
    /// Nodes representing the trace tree, addressable by key.
    key_to_node: IndexMap<Key, NodeId>,
    /// The parent/child relationships between all spans.
    key_to_parent: IndexMap<Key, Option<Key>>,
}

impl TreeBuilder {
    /// Creates a builder for the given trace. Diagnostics about malformed
    /// data go to `logger`.
    pub fn new(trace_id: TraceId, logger: impl Logger + 'static) -> Self {
        TreeBuilder {
            logger: Box::new(logger),
            trace_id,
            root_key: None,
            root_node: None,
            entries: Vec::new(),
            key_to_node: IndexMap::new(),
            key_to_parent: IndexMap::new(),
        }
    }

    /// Indexes one span of the trace.
    ///
    /// A span whose `parent_id` equals its own id is dropped and `false` is
    /// returned, after logging. The caller is responsible for only feeding
    /// spans whose trace id matches the builder's.
    pub fn add_node(&mut self, span: Span) -> bool {
        if span.parent_id == Some(span.id) {
            if self.logger.enabled() {
                self.logger.log(&format!(
                    "skipping circular dependency: traceId={}, spanId={}",
                    self.trace_id, span.id
                ));
            }
            return false;
        }
        let shared = span.shared;
        let endpoint = span.local_endpoint.clone();

        // Assume first that the span links to a parent addressed without an
        // endpoint; the resolution pass in build() corrects this where the
        // parent turns out to be a shared server span.
        let id_key = Key::new(span.id, shared, None);
        let mut parent_key = None;
        if shared {
            // The parent is most likely on another host.
            parent_key = Some(Key::new(span.id, false, None));
            self.key_to_parent.insert(
                Key::new(span.id, shared, endpoint.clone()),
                parent_key.clone(),
            );
        } else if let Some(parent_id) = span.parent_id {
            parent_key = Some(Key::new(parent_id, false, None));
        }

        self.key_to_parent.insert(id_key, parent_key);
        self.entries.push(PendingEntry {
            parent_id: span.parent_id,
            id: span.id,
            shared,
            endpoint,
            span,
        });
        true
    }

    /// Resolves one buffered entry to a node, fixing up its parent key.
    ///
    /// Nodes are indexed by id, whether that id is shared, and the endpoint.
    /// In B3, a server can reuse its client's id; any child of that server
    /// span should link to the server's endpoint. Without the endpoint in
    /// the key, descendants of multiple servers responding to the same
    /// client would be placed incorrectly.
    ///
    /// This only works because `add_node` populated the parent map for every
    /// entry before this pass runs.
    fn process_entry(&mut self, entry: PendingEntry, tree: &mut SpanTree) {
        let key = Key::new(entry.id, entry.shared, entry.endpoint.clone());
        let bare_key = Key::new(entry.id, entry.shared, None);

        let mut parent_key = None;
        if key.shared {
            // A server span very likely lives on a different endpoint than
            // its client, so pair it with the first span that has the same
            // id and is not shared (clients never know their id gets
            // reused).
            parent_key = Some(Key::new(entry.id, false, None));
        } else if let Some(parent_id) = entry.parent_id {
            // Not a root, not a shared server span. Probe from the most
            // specific parent form to the least.

            // This could be the child of a shared server span on the same
            // endpoint (a local, intermediate span). Try that first.
            let candidate = Key::new(parent_id, true, entry.endpoint.clone());
            if self.key_to_parent.contains_key(&candidate) {
                self.key_to_parent
                    .insert(bare_key.clone(), Some(candidate.clone()));
                parent_key = Some(candidate);
            } else {
                // Next, prefer the same host, in case the data arrived
                // without a shared flag.
                let candidate = Key::new(parent_id, false, entry.endpoint.clone());
                if self.key_to_parent.contains_key(&candidate) {
                    // Non-shared spans look themselves up by the bare key;
                    // forward it so descendants of this entry still find
                    // their parent.
                    self.key_to_parent.insert(bare_key.clone(), Some(candidate));
                }
                // The parent is a normal span, addressed without an endpoint.
                parent_key = Some(Key::new(parent_id, false, None));
            }
        } else if let Some(root_key) = &self.root_key {
            if self.logger.enabled() {
                self.logger.log(&format!(
                    "attributing span missing parent to root: traceId={}, rootSpanId={}, spanId={}",
                    self.trace_id, root_key.id, key.id
                ));
            }
        } else {
            self.root_key = Some(key.clone());
        }

        let node = tree.new_node(Some(entry.span));
        // Special-case the root, and attribute missing parents to it later:
        // the first root seen is assumed to be the real one.
        if parent_key.is_none() && self.root_node.is_none() {
            self.root_node = Some(node);
            self.root_key = Some(key);
            self.key_to_parent.shift_remove(&bare_key);
        } else if key.shared {
            // A shared server span must be addressable both ways: children
            // that know the endpoint and children that don't both have to
            // find it.
            self.key_to_node.insert(key, node);
            self.key_to_node.insert(bare_key, node);
        } else {
            self.key_to_node.insert(bare_key, node);
        }
    }

    /// Builds the tree from the spans fed to [`add_node`](Self::add_node).
    ///
    /// When no root span arrived, the result is rooted at a synthetic node
    /// whose span is `None`, with every headless subtree attached beneath it.
    pub fn build(mut self) -> SpanTree {
        let mut tree = SpanTree::with_capacity(self.entries.len() + 1);

        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            self.process_entry(entry, &mut tree);
        }

        let root = match self.root_node {
            Some(root) => root,
            None => {
                if self.logger.enabled() {
                    self.logger.log(&format!(
                        "substituting dummy node for missing root span: traceId={}",
                        self.trace_id
                    ));
                }
                tree.new_node(None)
            }
        };
        tree.root = root;

        // Materialize the tree using the collected parent/child relations.
        for (child_key, parent_key) in &self.key_to_parent {
            let Some(&child) = self.key_to_node.get(child_key) else {
                // An indexed span without a node is a bug in the passes
                // above, not in the input.
                debug_assert!(false, "no node for indexed key {child_key:?}");
                continue;
            };
            let parent = parent_key
                .as_ref()
                .and_then(|key| self.key_to_node.get(key))
                .copied();
            let result = match parent {
                // The parent never arrived: hang the subtree off the root.
                None => tree.add_child(root, child),
                Some(parent) => tree.add_child(parent, child),
            };
            if let Err(err) = result {
                debug_assert!(false, "failed to materialize edge: {err}");
            }
        }
        tree
    }
}

impl fmt::Debug for TreeBuilder {
    // The logger is opaque; render the assembly state.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("trace_id", &self.trace_id)
            .field("root_key", &self.root_key)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
