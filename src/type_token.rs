//! Type tags and type-erased vector helpers.
//!
//! The runner moves data between nodes as opaque [`Partition`]s. Source and
//! repartition nodes carry a [`VecOps`] so the runner can split, clone and
//! re-merge those partitions without knowing the element type at compile time.
//! Every operation returns `None` when the dynamic type is not the `Vec<T>` the
//! implementation was built for.

use std::any::{Any, type_name};
use std::marker::PhantomData;
use std::sync::Arc;

/// A partition buffer carried between nodes at runtime (always a boxed `Vec<T>`).
pub type Partition = Box<dyn Any + Send + Sync>;

/// Runtime type tag attached to source nodes, used in type-mismatch errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub name: &'static str,
}

impl TypeTag {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: type_name::<T>(),
        }
    }
}

/// Type-erased helpers for `Vec<T>`.
pub trait VecOps: Send + Sync {
    /// Split `data` into at most `n` contiguous, order-preserving partitions.
    ///
    /// `n <= 1` or inputs with fewer than two elements yield a single partition,
    /// so an empty source still produces one (empty) partition.
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>>;

    /// Clone the whole `Vec<T>` as a single partition.
    fn clone_any(&self, data: &dyn Any) -> Option<Partition>;

    /// Concatenate owned partitions, in order, into one `Vec<T>` partition.
    fn concat(&self, parts: Vec<Partition>) -> Option<Partition>;
}

pub struct VecOpsImpl<T: Clone + Send + Sync + 'static>(PhantomData<T>);

impl<T: Clone + Send + Sync + 'static> VecOps for VecOpsImpl<T> {
    fn split(&self, data: &dyn Any, n: usize) -> Option<Vec<Partition>> {
        let v = data.downcast_ref::<Vec<T>>()?;
        let len = v.len();
        if n <= 1 || len <= 1 {
            return Some(vec![Box::new(v.clone())]);
        }
        let chunk = len.div_ceil(n);
        Some(
            v.chunks(chunk)
                .map(|c| Box::new(c.to_vec()) as Partition)
                .collect(),
        )
    }

    fn clone_any(&self, data: &dyn Any) -> Option<Partition> {
        data.downcast_ref::<Vec<T>>()
            .map(|v| Box::new(v.clone()) as Partition)
    }

    fn concat(&self, parts: Vec<Partition>) -> Option<Partition> {
        let mut out = Vec::<T>::new();
        for part in parts {
            let v = part.downcast::<Vec<T>>().ok()?;
            out.extend(*v);
        }
        Some(Box::new(out))
    }
}

/// Create a type-erased `VecOps` for `Vec<T>`.
pub fn vec_ops_for<T: Clone + Send + Sync + 'static>() -> Arc<dyn VecOps> {
    Arc::new(VecOpsImpl::<T>(PhantomData))
}
