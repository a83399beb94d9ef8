//! Instance numbers for concurrently running Tilda processes.
//!
//! Every process owns a file `lock_<pid>_<instance>` in a shared lock
//! directory. A new process first deletes files whose pid is no longer
//! running, then takes an exclusive `flock` on `lock_0_0` while it picks the
//! lowest instance number nobody holds and creates its own file. The global
//! lock totally orders the pick-and-claim step across racing processes.

mod coordinator;
mod lock_file;
mod process;

use std::io;
use std::path::PathBuf;

pub use coordinator::{lowest_free_instance, InstanceLock, LockDir};
pub use lock_file::{LockFileName, LOCK_FILE_PREFIX};
pub use process::{ProcessTable, SysinfoProcessTable};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("cannot create lock directory {path:?}")]
    LockDir { path: PathBuf, source: io::Error },
    #[error("cannot open global lock file {path:?}")]
    GlobalLock { path: PathBuf, source: io::Error },
    #[error("cannot lock {path:?}")]
    Flock { path: PathBuf, source: io::Error },
    #[error("cannot scan lock directory {path:?}")]
    Scan { path: PathBuf, source: io::Error },
    #[error("cannot create instance lock file {path:?}")]
    InstanceLock { path: PathBuf, source: io::Error },
}

/// Claim an instance number in the default lock directory, checking liveness
/// against processes named like the current executable.
pub fn obtain_instance_lock() -> Result<InstanceLock, LockError> {
    LockDir::default().obtain_instance_lock(&SysinfoProcessTable::for_current_exe())
}
