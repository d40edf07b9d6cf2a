use crate::type_token::{Partition, TypeTag, VecOps};
use std::any::Any;
use std::sync::Arc;

/// A stateless, per-partition transform (map/filter) with its input type erased.
pub trait DynOp: Send + Sync {
    fn apply(&self, input: Partition) -> anyhow::Result<Partition>;
}

#[derive(Clone)]
pub enum Node {
    /// In-memory `Vec<T>` payload; `vec_ops` knows how to split it.
    Source {
        payload: Arc<dyn Any + Send + Sync>,
        vec_ops: Arc<dyn VecOps>,
        elem_tag: TypeTag,
    },

    /// Contiguous element-wise ops; the runner fuses neighbouring stages.
    Stateless(Vec<Arc<dyn DynOp>>),

    /// Barrier: merge all partitions in order, then re-split into `target`.
    Repartition {
        target: usize,
        vec_ops: Arc<dyn VecOps>,
    },
}
