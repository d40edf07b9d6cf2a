use crate::node::Node;
use crate::node_id::NodeId;
use crate::type_token::{TypeTag, vec_ops_for};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Deferred computation graph for one frame lineage.
///
/// Nodes are only appended; a terminal node plus the edge list is enough for the
/// runner to recover the linear chain back to its source.
pub struct Pipeline {
    pub(crate) inner: Arc<Mutex<PipelineInner>>,
}

pub struct PipelineInner {
    pub next_id: u64,
    pub nodes: HashMap<NodeId, Node>,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineInner {
                next_id: 0,
                nodes: HashMap::new(),
                edges: Vec::new(),
            })),
        }
    }
}

impl Clone for Pipeline {
    fn clone(&self) -> Self {
        Pipeline {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Pipeline {
    fn lock(&self) -> MutexGuard<'_, PipelineInner> {
        // The graph is append-only, so a panic mid-insert cannot leave it torn.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert_node(&self, node: Node) -> NodeId {
        let mut g = self.lock();
        let id = NodeId::new(g.next_id);
        g.next_id += 1;
        g.nodes.insert(id, node);
        id
    }

    pub(crate) fn connect(&self, from: NodeId, to: NodeId) {
        self.lock().edges.push((from, to));
    }

    pub(crate) fn add_source<T: Clone + Send + Sync + 'static>(&self, data: Vec<T>) -> NodeId {
        self.insert_node(Node::Source {
            payload: Arc::new(data),
            vec_ops: vec_ops_for::<T>(),
            elem_tag: TypeTag::of::<T>(),
        })
    }

    /// Walk back from `terminal` to its source and return the chain source-first.
    pub(crate) fn chain_to(&self, terminal: NodeId) -> Result<Vec<(NodeId, Node)>> {
        let g = self.lock();
        let mut chain: Vec<(NodeId, Node)> = Vec::new();
        let mut cur = terminal;
        loop {
            let n = g
                .nodes
                .get(&cur)
                .cloned()
                .ok_or_else(|| anyhow!("missing node {cur:?}"))?;
            chain.push((cur, n));
            match g.edges.iter().find(|(_, to)| *to == cur) {
                Some(&(from, _)) => cur = from,
                None => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }
}
