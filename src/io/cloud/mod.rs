//! Object-store abstraction used to resolve non-local storage roots.
//!
//! The ingest reader never talks to a provider SDK directly. A session maps a URI
//! scheme (`s3a`, `gs`, `abfs`, ...) to an [`ObjectIO`] implementation: the
//! provider-backed [`ObjectStoreIO`] in production, or the in-memory
//! [`FakeObjectIO`] in tests and local demos.
//!
//! ```
//! use churnflow::io::cloud::*;
//!
//! # fn main() -> CloudResult<()> {
//! let store = FakeObjectIO::new();
//! store.put_object("bucket", "datalake/data/churn/x.csv", b"a,b\n1,2\n")?;
//! assert!(store.object_exists("bucket", "datalake/data/churn/x.csv")?);
//! # Ok(())
//! # }
//! ```

pub mod fake;
pub mod store;
pub mod traits;

pub use fake::*;
pub use store::*;
pub use traits::*;
