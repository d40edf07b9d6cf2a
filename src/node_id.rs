//! Opaque identifiers for nodes in a [`Pipeline`](crate::pipeline::Pipeline).
//!
//! Every read, coercion stage and repartition barrier inserted into the graph gets a
//! sequential `NodeId`. Only the pipeline and the runner look inside them.

/// Unique numeric identifier for a node in a pipeline graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }
}
