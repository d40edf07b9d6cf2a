//! Session bootstrap: master parsing, worker pool, warehouse and object stores.
//!
//! A [`Session`] is a cheap, cloneable handle. At most one session is "active"
//! per process: [`SessionBuilder::get_or_create`] hands back the live one if any
//! handle to it still exists, and builds a fresh one otherwise.

use crate::error::SessionError;
use crate::frame::{DataFrame, DataFrameReader};
use crate::io::cloud::ObjectIO;
use crate::runner::Runner;
use crate::warehouse::{TableIdent, Warehouse};
use crate::warehouse::sql::{Statement, execute};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

static ACTIVE: Mutex<Weak<SessionInner>> = Mutex::new(Weak::new());

/// Where work is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Master {
    /// In-process pool with this many worker threads.
    Local { threads: usize },
    /// Remote coordinator; only its reachability is checked.
    Cluster { scheme: String, address: String },
}

impl Master {
    /// Parse `local`, `local[N]`, `local[*]` or `scheme://host:port`.
    ///
    /// The cluster address must be a plain `host:port`.
    ///
    /// # Errors
    /// [`SessionError::InvalidMaster`] for anything else, including `local[0]`.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        let s = s.trim();
        let invalid = || SessionError::InvalidMaster(s.to_string());
        if s == "local" {
            return Ok(Master::Local { threads: 1 });
        }
        if let Some(inner) = s.strip_prefix("local[").and_then(|r| r.strip_suffix(']')) {
            let threads = match inner {
                "*" => num_cpus::get().max(1),
                n => n.parse::<usize>().ok().filter(|&n| n > 0).ok_or_else(invalid)?,
            };
            return Ok(Master::Local { threads });
        }
        let (scheme, address) = s.split_once("://").ok_or_else(invalid)?;
        // A bare host:port only; `k8s://https://api:443` style nesting is not resolvable.
        if address.contains("://") || address.contains('/') {
            return Err(invalid());
        }
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        if scheme.is_empty() || host.is_empty() || port.parse::<u16>().is_err() {
            return Err(invalid());
        }
        Ok(Master::Cluster {
            scheme: scheme.to_ascii_lowercase(),
            address: address.to_string(),
        })
    }

    /// Worker threads for the local pool.
    pub fn threads(&self) -> usize {
        match self {
            Master::Local { threads } => *threads,
            Master::Cluster { .. } => num_cpus::get().max(1),
        }
    }
}

impl std::fmt::Display for Master {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Master::Local { threads } => write!(f, "local[{threads}]"),
            Master::Cluster { scheme, address } => write!(f, "{scheme}://{address}"),
        }
    }
}

fn check_coordinator(address: &str, timeout: Duration) -> Result<(), SessionError> {
    let unreachable = |reason: String| SessionError::CoordinatorUnreachable {
        address: address.to_string(),
        reason,
    };
    let addrs: Vec<_> = address
        .to_socket_addrs()
        .map_err(|e| unreachable(e.to_string()))?
        .collect();
    let mut last = String::from("address resolved to nothing");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => {
                debug!("coordinator {address} answered on {addr}");
                return Ok(());
            }
            Err(e) => last = e.to_string(),
        }
    }
    Err(unreachable(last))
}

#[derive(Debug, Clone)]
pub struct SessionBuilder {
    app_name: String,
    master: String,
    warehouse_dir: PathBuf,
    partitions: Option<usize>,
    connect_timeout: Duration,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            app_name: crate::config::DEFAULT_APP_NAME.to_string(),
            master: crate::config::DEFAULT_MASTER.to_string(),
            warehouse_dir: PathBuf::from(crate::config::DEFAULT_WAREHOUSE_DIR),
            partitions: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn master(mut self, master: impl Into<String>) -> Self {
        self.master = master.into();
        self
    }

    pub fn warehouse_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.warehouse_dir = dir.into();
        self
    }

    /// Partitions per source; defaults to twice the worker count.
    pub fn partitions(mut self, n: usize) -> Self {
        self.partitions = Some(n.max(1));
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Return the active session if one is alive, otherwise build and register
    /// a new one.
    ///
    /// # Errors
    /// Same as [`build`](Self::build).
    pub fn get_or_create(self) -> Result<Session> {
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(inner) = active.upgrade() {
            let existing = Session { inner };
            if existing.app_name() != self.app_name
                || Master::parse(&self.master).ok().as_ref() != Some(existing.master())
            {
                warn!(
                    "reusing active session '{}' ({}); requested '{}' ({}) ignored",
                    existing.app_name(),
                    existing.master(),
                    self.app_name,
                    self.master
                );
            }
            debug!("reusing active session '{}'", existing.app_name());
            return Ok(existing);
        }
        let session = self.build()?;
        *active = Arc::downgrade(&session.inner);
        Ok(session)
    }

    /// Build a new, unregistered session.
    ///
    /// # Errors
    /// Fails on an invalid master string, an unreachable cluster coordinator,
    /// a worker pool that cannot start, or an unusable warehouse directory.
    pub fn build(self) -> Result<Session> {
        let master = Master::parse(&self.master)?;
        if let Master::Cluster { address, .. } = &master {
            check_coordinator(address, self.connect_timeout)?;
            info!("coordinator {address} reachable; executing on the local pool");
        }
        let threads = master.threads();
        let app = self.app_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{app}-worker-{i}"))
            .build()
            .map_err(|e| SessionError::WorkerPool(e.to_string()))?;
        let pool = Arc::new(pool);
        let runner = if threads == 1 && self.partitions.is_none() {
            Runner::default()
        } else {
            Runner::parallel(Arc::clone(&pool), self.partitions.unwrap_or(threads * 2))
        };
        let warehouse = Warehouse::open(&self.warehouse_dir)
            .with_context(|| format!("open warehouse at {}", self.warehouse_dir.display()))?;
        info!(
            "started session '{}' on {master} ({:?}, warehouse {})",
            self.app_name,
            runner.mode,
            self.warehouse_dir.display()
        );
        Ok(Session {
            inner: Arc::new(SessionInner {
                app_name: self.app_name,
                master,
                runner,
                warehouse,
                object_stores: RwLock::new(HashMap::new()),
            }),
        })
    }
}

struct SessionInner {
    app_name: String,
    master: Master,
    runner: Runner,
    warehouse: Warehouse,
    object_stores: RwLock<HashMap<String, Arc<dyn ObjectIO>>>,
}

/// Handle to a running session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("app_name", &self.inner.app_name)
            .field("master", &self.inner.master)
            .field("mode", &self.inner.runner.mode)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn app_name(&self) -> &str {
        &self.inner.app_name
    }

    pub fn master(&self) -> &Master {
        &self.inner.master
    }

    pub fn runner(&self) -> &Runner {
        &self.inner.runner
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.inner.warehouse
    }

    /// `true` if both handles point at the same session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Serve `scheme://bucket/key` URIs through `store`, replacing any previous
    /// registration for that scheme.
    pub fn register_object_store(&self, scheme: &str, store: Arc<dyn ObjectIO>) {
        let scheme = scheme.to_ascii_lowercase();
        debug!("registering object store for {scheme}://");
        self.inner
            .object_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scheme, store);
    }

    pub fn object_store(&self, scheme: &str) -> Option<Arc<dyn ObjectIO>> {
        self.inner
            .object_stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scheme.to_ascii_lowercase())
            .cloned()
    }

    pub fn read(&self) -> DataFrameReader {
        DataFrameReader::new(self.clone())
    }

    /// Load a warehouse table (`db.table` or `table`) as a frame.
    ///
    /// # Errors
    /// Identifier and catalog errors, or a failure reading the shards.
    pub fn table(&self, name: &str) -> Result<DataFrame> {
        let ident = TableIdent::parse(name)?;
        let (schema, rows) = self.warehouse().read_table(&ident)?;
        Ok(DataFrame::from_rows(self, schema, rows))
    }

    /// Run one catalog statement and return its result as a frame.
    ///
    /// # Errors
    /// Parse errors ([`WarehouseError`](crate::error::WarehouseError)) and any
    /// catalog or I/O failure while executing.
    pub fn sql(&self, text: &str) -> Result<DataFrame> {
        let stmt = Statement::parse(text)?;
        let out = execute(self.warehouse(), &stmt)
            .with_context(|| format!("execute `{}`", text.trim()))?;
        Ok(DataFrame::from_rows(self, out.schema, out.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_masters() {
        assert_eq!(Master::parse("local").unwrap(), Master::Local { threads: 1 });
        assert_eq!(Master::parse("local[3]").unwrap(), Master::Local { threads: 3 });
        assert_eq!(
            Master::parse("local[*]").unwrap(),
            Master::Local {
                threads: num_cpus::get().max(1)
            }
        );
    }

    #[test]
    fn cluster_master() {
        assert_eq!(
            Master::parse("spark://coordinator:7077").unwrap(),
            Master::Cluster {
                scheme: "spark".into(),
                address: "coordinator:7077".into()
            }
        );
    }

    #[test]
    fn malformed_masters_are_rejected() {
        for bad in [
            "",
            "local[0]",
            "local[x]",
            "yarn",
            "spark://host",
            "spark://:7077",
            "k8s://https://api:443",
            "spark://host:7077/path",
        ] {
            assert!(
                matches!(Master::parse(bad), Err(SessionError::InvalidMaster(_))),
                "{bad:?}"
            );
        }
    }
}
