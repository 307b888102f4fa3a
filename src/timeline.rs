//! Tree-edge layout for timeline (waterfall) rendering.
//!
//! A timeline view draws one row per span, indented by depth, with connector
//! glyphs tying each row back to its parent: a horizontal stub under the
//! parent's column on the child's own row, and a vertical line down the
//! parent's column spanning its children. This module computes those
//! segments from the depth-first flattening of a built [`SpanTree`], in
//! depth and row units; the renderer scales them to pixels or terminal
//! cells.

use crate::tree::{NodeId, SpanTree};

/// One row of the flattened tree: its position and indentation depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineRow {
    /// Position of the row, top to bottom.
    pub index: usize,
    /// Depth of the span in the tree; the root row is 0.
    pub depth: usize,
}

/// A connector running from `col` to the end of its row, drawn under the
/// span bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HorizontalSegment {
    /// The row the connector belongs to.
    pub row: usize,
    /// The column (depth index) the connector starts at: the parent's depth.
    pub col: usize,
}

/// A connector running down a parent's column to its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerticalSegment {
    /// The column (depth index) the connector is drawn at.
    pub col: usize,
    /// The first row of the connector, inclusive.
    pub from_row: usize,
    /// The last row of the connector, inclusive.
    pub to_row: usize,
}

/// The connector segments for one flattened trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimelineEdges {
    /// Per-row stubs tying each non-root row to its parent's column.
    pub horizontals: Vec<HorizontalSegment>,
    /// Parent-column lines spanning from a parent row to its last child row.
    pub verticals: Vec<VerticalSegment>,
}

/// Flattens a tree depth-first, pairing each row with its node.
///
/// Children are visited in their stored order, so rows come out in the same
/// vertical order a waterfall view lists spans; look the spans up through
/// [`SpanTree::span`] when labelling rows.
pub fn depth_first_nodes(tree: &SpanTree) -> Vec<(NodeId, TimelineRow)> {
    let mut rows = Vec::new();
    let mut stack = vec![(tree.root(), 0usize)];
    while let Some((node, depth)) = stack.pop() {
        rows.push((
            node,
            TimelineRow {
                index: rows.len(),
                depth,
            },
        ));
        for &node in tree.children(node).iter().rev() {
            stack.push((node, depth + 1));
        }
    }
    rows
}

/// Flattens a tree depth-first into bare timeline rows.
pub fn depth_first_rows(tree: &SpanTree) -> Vec<TimelineRow> {
    depth_first_nodes(tree)
        .into_iter()
        .map(|(_, row)| row)
        .collect()
}

/// Computes the connector segments for a depth-first row sequence.
///
/// Single pass over the rows, keeping a stack of the open ancestor rows.
/// A deeper row descends (push), an equal row replaces its sibling, and a
/// shallower row closes every frame at its depth or below, emitting one
/// vertical per closed parent/child pair. A final drain closes the frames
/// still open at the end.
pub fn decorate(rows: &[TimelineRow]) -> TimelineEdges {
    let mut edges = TimelineEdges::default();
    let mut stack: Vec<TimelineRow> = Vec::new();

    for &row in rows {
        match stack.last().copied() {
            None => stack.push(row),
            Some(top) if top.depth < row.depth => {
                edges.horizontals.push(HorizontalSegment {
                    row: row.index,
                    col: top.depth,
                });
                stack.push(row);
            }
            Some(top) if top.depth == row.depth => {
                stack.pop();
                edges.horizontals.push(HorizontalSegment {
                    row: row.index,
                    col: stack.last().map(|frame| frame.depth).unwrap_or(0),
                });
                stack.push(row);
            }
            Some(_) => {
                let mut closed: Vec<TimelineRow> = Vec::new();
                while stack
                    .last()
                    .is_some_and(|frame| frame.depth >= row.depth)
                {
                    if let Some(frame) = stack.pop() {
                        closed.push(frame);
                    }
                }
                // closed is deepest-first; connect each parent down to the
                // child frame that was open below it.
                closed.reverse();
                for pair in closed.windows(2) {
                    edges.verticals.push(VerticalSegment {
                        col: pair[0].depth,
                        from_row: pair[0].index,
                        to_row: pair[1].index,
                    });
                }
                edges.horizontals.push(HorizontalSegment {
                    row: row.index,
                    col: stack.last().map(|frame| frame.depth).unwrap_or(0),
                });
                stack.push(row);
            }
        }
    }

    for pair in stack.windows(2) {
        edges.verticals.push(VerticalSegment {
            col: pair[0].depth,
            from_row: pair[0].index,
            to_row: pair[1].index,
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use crate::model::Span;
    use crate::trace_context::TraceId;
    use crate::tree::TreeBuilder;

    fn rows(depths: &[usize]) -> Vec<TimelineRow> {
        depths
            .iter()
            .enumerate()
            .map(|(index, &depth)| TimelineRow { index, depth })
            .collect()
    }

    #[test]
    fn empty_rows_make_no_edges() {
        assert_eq!(decorate(&[]), TimelineEdges::default());
    }

    #[test]
    fn single_row_makes_no_edges() {
        assert_eq!(decorate(&rows(&[0])), TimelineEdges::default());
    }

    #[test]
    fn chain_connects_each_row_to_its_parent() {
        let edges = decorate(&rows(&[0, 1, 2]));
        assert_eq!(
            edges.horizontals,
            [
                HorizontalSegment { row: 1, col: 0 },
                HorizontalSegment { row: 2, col: 1 },
            ]
        );
        assert_eq!(
            edges.verticals,
            [
                VerticalSegment {
                    col: 0,
                    from_row: 0,
                    to_row: 1
                },
                VerticalSegment {
                    col: 1,
                    from_row: 1,
                    to_row: 2
                },
            ]
        );
    }

    #[test]
    fn siblings_extend_the_parent_vertical() {
        let edges = decorate(&rows(&[0, 1, 1, 1]));
        assert_eq!(
            edges.horizontals,
            [
                HorizontalSegment { row: 1, col: 0 },
                HorizontalSegment { row: 2, col: 0 },
                HorizontalSegment { row: 3, col: 0 },
            ]
        );
        // One vertical from the parent row down to its last child.
        assert_eq!(
            edges.verticals,
            [VerticalSegment {
                col: 0,
                from_row: 0,
                to_row: 3
            }]
        );
    }

    #[test]
    fn ascent_closes_inner_frames() {
        let edges = decorate(&rows(&[0, 1, 2, 1]));
        assert_eq!(
            edges.horizontals,
            [
                HorizontalSegment { row: 1, col: 0 },
                HorizontalSegment { row: 2, col: 1 },
                HorizontalSegment { row: 3, col: 0 },
            ]
        );
        assert_eq!(
            edges.verticals,
            [
                // Emitted when row 3 closes the subtree under row 1.
                VerticalSegment {
                    col: 1,
                    from_row: 1,
                    to_row: 2
                },
                // Drained at the end: the root's children span rows 1..=3.
                VerticalSegment {
                    col: 0,
                    from_row: 0,
                    to_row: 3
                },
            ]
        );
    }

    #[test]
    fn later_sibling_can_reopen_a_subtree() {
        let edges = decorate(&rows(&[0, 1, 2, 1, 2]));
        assert_eq!(
            edges.horizontals,
            [
                HorizontalSegment { row: 1, col: 0 },
                HorizontalSegment { row: 2, col: 1 },
                HorizontalSegment { row: 3, col: 0 },
                HorizontalSegment { row: 4, col: 1 },
            ]
        );
        assert_eq!(
            edges.verticals,
            [
                VerticalSegment {
                    col: 1,
                    from_row: 1,
                    to_row: 2
                },
                VerticalSegment {
                    col: 0,
                    from_row: 0,
                    to_row: 3
                },
                VerticalSegment {
                    col: 1,
                    from_row: 3,
                    to_row: 4
                },
            ]
        );
    }

    #[test]
    fn ascent_over_multiple_levels() {
        let edges = decorate(&rows(&[0, 1, 2, 3, 1]));
        assert_eq!(
            edges.verticals,
            [
                VerticalSegment {
                    col: 1,
                    from_row: 1,
                    to_row: 2
                },
                VerticalSegment {
                    col: 2,
                    from_row: 2,
                    to_row: 3
                },
                VerticalSegment {
                    col: 0,
                    from_row: 0,
                    to_row: 4
                },
            ]
        );
    }

    #[test]
    fn every_non_root_row_gets_exactly_one_horizontal() {
        let depths = [0, 1, 2, 2, 3, 1, 2, 1, 1, 2, 3, 3, 1];
        let edges = decorate(&rows(&depths));
        let mut seen = vec![0usize; depths.len()];
        for segment in &edges.horizontals {
            seen[segment.row] += 1;
        }
        assert_eq!(seen[0], 0, "the root row has no connector");
        assert!(seen[1..].iter().all(|&count| count == 1));
    }

    #[test]
    fn flatten_visits_children_depth_first() {
        let trace = [
            Span::builder().trace_id(0xau128).id(0xau64).build(),
            Span::builder()
                .trace_id(0xau128)
                .id(0xbu64)
                .parent_id(0xau64)
                .build(),
            Span::builder()
                .trace_id(0xau128)
                .id(0xcu64)
                .parent_id(0xbu64)
                .build(),
            Span::builder()
                .trace_id(0xau128)
                .id(0xdu64)
                .parent_id(0xau64)
                .build(),
        ];
        let mut builder = TreeBuilder::new(TraceId::from(0xa), MemoryLogger::new());
        for span in &trace {
            builder.add_node(span.clone());
        }
        let tree = builder.build();

        let rows = depth_first_rows(&tree);
        let depths: Vec<_> = rows.iter().map(|row| row.depth).collect();
        // a, then b with its subtree c, then d.
        assert_eq!(depths, [0, 1, 2, 1]);
        assert_eq!(
            rows.iter().map(|row| row.index).collect::<Vec<_>>(),
            [0, 1, 2, 3]
        );
    }

    #[test]
    fn flatten_pairs_rows_with_their_nodes() {
        let trace = [
            Span::builder().trace_id(0xau128).id(0xau64).build(),
            Span::builder()
                .trace_id(0xau128)
                .id(0xbu64)
                .parent_id(0xau64)
                .build(),
        ];
        let mut builder = TreeBuilder::new(TraceId::from(0xa), MemoryLogger::new());
        for span in &trace {
            builder.add_node(span.clone());
        }
        let tree = builder.build();

        let labels: Vec<_> = depth_first_nodes(&tree)
            .into_iter()
            .map(|(node, row)| (tree.span(node).map(|span| span.id), row.depth))
            .collect();
        assert_eq!(
            labels,
            [
                (Some(crate::SpanId::from(0xa)), 0),
                (Some(crate::SpanId::from(0xb)), 1),
            ]
        );
    }
}
