use crate::node::{DynOp, Node};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::runner::Runner;
use crate::type_token::{Partition, vec_ops_for};
use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::sync::Arc;

/// Element bound for anything carried through the pipeline graph.
pub trait ElemBound: 'static + Send + Sync + Clone {}
impl<T> ElemBound for T where T: 'static + Send + Sync + Clone {}

/// A lazily evaluated, partitioned collection of `T`.
#[derive(Clone)]
pub struct PCollection<T> {
    pub(crate) pipeline: Pipeline,
    pub(crate) id: NodeId,
    _t: PhantomData<T>,
}

pub fn from_vec<T: ElemBound>(p: &Pipeline, data: Vec<T>) -> PCollection<T> {
    let id = p.add_source(data);
    PCollection {
        pipeline: p.clone(),
        id,
        _t: PhantomData,
    }
}

struct MapOp<I, O, F>(F, PhantomData<fn(I) -> O>);

impl<I, O, F> DynOp for MapOp<I, O, F>
where
    I: ElemBound,
    O: ElemBound,
    F: Send + Sync + Fn(&I) -> O + 'static,
{
    fn apply(&self, input: Partition) -> Result<Partition> {
        let v = *input
            .downcast::<Vec<I>>()
            .map_err(|_| anyhow!("map input is not a Vec<{}>", std::any::type_name::<I>()))?;
        let out: Vec<O> = v.iter().map(|i| self.0(i)).collect();
        Ok(Box::new(out))
    }
}

impl<T: ElemBound> PCollection<T> {
    fn chain(self, node: Node) -> NodeId {
        let id = self.pipeline.insert_node(node);
        self.pipeline.connect(self.id, id);
        id
    }

    pub fn map<O, F>(self, f: F) -> PCollection<O>
    where
        O: ElemBound,
        F: 'static + Send + Sync + Fn(&T) -> O,
    {
        let op: Arc<dyn DynOp> = Arc::new(MapOp::<T, O, F>(f, PhantomData));
        let pipeline = self.pipeline.clone();
        let id = self.chain(Node::Stateless(vec![op]));
        PCollection {
            pipeline,
            id,
            _t: PhantomData,
        }
    }

    /// Merge all partitions and re-split into at most `target` partitions.
    pub fn repartition(self, target: usize) -> PCollection<T> {
        let pipeline = self.pipeline.clone();
        let id = self.chain(Node::Repartition {
            target: target.max(1),
            vec_ops: vec_ops_for::<T>(),
        });
        PCollection {
            pipeline,
            id,
            _t: PhantomData,
        }
    }

    pub fn collect_with(&self, runner: &Runner) -> Result<Vec<T>> {
        runner.run_collect::<T>(&self.pipeline, self.id)
    }

    pub fn collect_partitions(&self, runner: &Runner) -> Result<Vec<Vec<T>>> {
        runner.run_partitions::<T>(&self.pipeline, self.id)
    }}
