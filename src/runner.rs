//! Partitioned executor for pipeline graphs.
//!
//! A plan is always linear: one `Source`, then any mix of stateless stages and
//! repartition barriers. Contiguous stateless stages are fused and applied per
//! partition; in parallel mode each partition is handed to the session's rayon
//! pool. Partition order is preserved end to end, so collected output matches
//! source order regardless of scheduling.

use crate::node::{DynOp, Node};
use crate::node_id::NodeId;
use crate::pipeline::Pipeline;
use crate::type_token::Partition;
use anyhow::{Result, anyhow, bail};
use log::debug;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Single partition, executed on the calling thread.
    Sequential,
    /// Source split into `partitions` chunks, stages run on the worker pool.
    Parallel { partitions: usize },
}

#[derive(Clone)]
pub struct Runner {
    pub mode: ExecMode,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            mode: ExecMode::Sequential,
            pool: None,
        }
    }
}

impl Runner {
    /// Parallel runner bound to a dedicated pool.
    pub fn parallel(pool: Arc<ThreadPool>, partitions: usize) -> Self {
        Self {
            mode: ExecMode::Parallel {
                partitions: partitions.max(1),
            },
            pool: Some(pool),
        }
    }

    /// Execute the chain ending at `terminal`, keeping the partition layout.
    pub fn run_partitions<T: 'static + Send + Sync + Clone>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<Vec<T>>> {
        let plan = p.chain_to(terminal)?;
        let Some(((_, first), rest)) = plan.split_first() else {
            bail!("empty plan for node {terminal:?}");
        };
        let Node::Source {
            payload,
            vec_ops,
            elem_tag,
        } = first
        else {
            bail!("plan must start with a Source node");
        };

        let mut parts: Vec<Partition> = match self.mode {
            ExecMode::Sequential => vec![
                vec_ops
                    .clone_any(payload.as_ref())
                    .ok_or_else(|| anyhow!("source payload is not a Vec<{}>", elem_tag.name))?,
            ],
            ExecMode::Parallel { partitions } => vec_ops
                .split(payload.as_ref(), partitions)
                .ok_or_else(|| anyhow!("source payload is not a Vec<{}>", elem_tag.name))?,
        };
        debug!(
            "running {} node(s) over {} partition(s) in {:?} mode",
            plan.len(),
            parts.len(),
            self.mode
        );

        let mut i = 0usize;
        while i < rest.len() {
            match &rest[i].1 {
                Node::Stateless(_) => {
                    let mut ops: Vec<Arc<dyn DynOp>> = Vec::new();
                    while let Some((_, Node::Stateless(more))) = rest.get(i) {
                        ops.extend(more.iter().cloned());
                        i += 1;
                    }
                    parts = self.apply_fused(&ops, parts)?;
                }
                Node::Repartition { target, vec_ops } => {
                    let merged = vec_ops
                        .concat(parts)
                        .ok_or_else(|| anyhow!("repartition input type mismatch"))?;
                    parts = vec_ops
                        .split(merged.as_ref(), *target)
                        .ok_or_else(|| anyhow!("repartition output type mismatch"))?;
                    i += 1;
                }
                Node::Source { .. } => bail!("unexpected additional source in plan"),
            }
        }

        parts
            .into_iter()
            .map(|part| {
                part.downcast::<Vec<T>>()
                    .map(|v| *v)
                    .map_err(|_| {
                        anyhow!(
                            "terminal type mismatch, expected Vec<{}>",
                            std::any::type_name::<T>()
                        )
                    })
            })
            .collect()
    }

    /// Execute and flatten all partitions in order.
    pub fn run_collect<T: 'static + Send + Sync + Clone>(
        &self,
        p: &Pipeline,
        terminal: NodeId,
    ) -> Result<Vec<T>> {
        Ok(self
            .run_partitions::<T>(p, terminal)?
            .into_iter()
            .flatten()
            .collect())
    }

    fn apply_fused(&self, ops: &[Arc<dyn DynOp>], parts: Vec<Partition>) -> Result<Vec<Partition>> {
        match (&self.mode, &self.pool) {
            (ExecMode::Parallel { .. }, Some(pool)) => pool.install(|| {
                parts
                    .into_par_iter()
                    .map(|chunk| fuse_stateless(ops, chunk))
                    .collect()
            }),
            _ => parts
                .into_iter()
                .map(|chunk| fuse_stateless(ops, chunk))
                .collect(),
        }
    }
}

fn fuse_stateless(ops: &[Arc<dyn DynOp>], input: Partition) -> Result<Partition> {
    ops.iter().try_fold(input, |acc, op| op.apply(acc))
}
