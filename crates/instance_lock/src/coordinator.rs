use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{DirBuilderExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lock_file::LockFileName;
use crate::process::ProcessTable;
use crate::LockError;

/// The directory shared by all instances for their lock files.
#[derive(Debug, Clone)]
pub struct LockDir {
    path: PathBuf,
    claim_delay: Option<Duration>,
}

/// Lock held by this process for its whole lifetime.
#[derive(Debug)]
pub struct InstanceLock {
    pid: u32,
    instance: u32,
    path: PathBuf,
    _file: File,
}

impl InstanceLock {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the lock file. A lock that is dropped instead stays on disk until
    /// the next start finds its pid dead.
    pub fn release(self) -> io::Result<()> {
        fs::remove_file(&self.path)?;
        tracing::debug!("Released instance {} ({:?})", self.instance, self.path);
        Ok(())
    }
}

impl Default for LockDir {
    fn default() -> Self {
        Self::new(tilda_paths::lock_dir())
    }
}

impl LockDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            claim_delay: None,
        }
    }

    /// Pause inside the critical section before claiming an instance.
    /// Only useful to widen the window for race tests.
    pub fn with_claim_delay(mut self, delay: Duration) -> Self {
        self.claim_delay = Some(delay);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory, readable by the owner only.
    pub fn ensure(&self) -> Result<(), LockError> {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.path)
            .map_err(|source| LockError::LockDir {
                path: self.path.clone(),
                source,
            })
    }

    /// Per-process lock files currently in the directory.
    pub fn lock_files(&self) -> io::Result<Vec<(LockFileName, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(LockFileName::parse) {
                found.push((name, entry.path()));
            }
        }
        Ok(found)
    }

    /// Instance numbers in use, sorted ascending.
    pub fn instances(&self) -> io::Result<Vec<u32>> {
        let mut instances: Vec<u32> = self
            .lock_files()?
            .into_iter()
            .map(|(name, _)| name.instance)
            .collect();
        instances.sort_unstable();
        Ok(instances)
    }

    /// The lowest instance number no lock file claims.
    pub fn next_instance(&self) -> io::Result<u32> {
        Ok(lowest_free_instance(&self.instances()?))
    }

    /// Delete lock files whose pid is not running. Returns how many were removed.
    ///
    /// Never fails: without a process list or a readable directory nothing is removed.
    pub fn remove_stale_lock_files(&self, processes: &dyn ProcessTable) -> usize {
        let live = match processes.live_pids() {
            Some(live) if !live.is_empty() => live,
            _ => {
                tracing::debug!("Process list unavailable, skipping stale lock cleanup");
                return 0;
            }
        };

        let lock_files = match self.lock_files() {
            Ok(lock_files) => lock_files,
            Err(err) => {
                tracing::warn!("Cannot read lock directory {:?}: {}", self.path, err);
                return 0;
            }
        };

        let mut removed = 0;
        for (name, path) in lock_files {
            if live.contains(&name.pid) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!("Removed stale lock file {:?}", path);
                    removed += 1;
                }
                Err(err) => tracing::warn!("Cannot remove stale lock file {:?}: {}", path, err),
            }
        }
        removed
    }

    /// Claim the lowest free instance number for this process.
    pub fn obtain_instance_lock(
        &self,
        processes: &dyn ProcessTable,
    ) -> Result<InstanceLock, LockError> {
        self.obtain_instance_lock_as(std::process::id(), processes)
    }

    /// [`obtain_instance_lock`](Self::obtain_instance_lock) on behalf of `pid`.
    pub fn obtain_instance_lock_as(
        &self,
        pid: u32,
        processes: &dyn ProcessTable,
    ) -> Result<InstanceLock, LockError> {
        self.ensure()?;
        self.remove_stale_lock_files(processes);

        let global = GlobalLock::acquire(&self.path.join(LockFileName::GLOBAL.to_string()))?;

        let instance = self.next_instance().map_err(|source| LockError::Scan {
            path: self.path.clone(),
            source,
        })?;
        if let Some(delay) = self.claim_delay {
            std::thread::sleep(delay);
        }

        let path = self.path.join(LockFileName::new(pid, instance).to_string());
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| LockError::InstanceLock {
                path: path.clone(),
                source,
            })?;

        global.release();
        tracing::info!("Obtained instance {} for pid {} ({:?})", instance, pid, path);

        Ok(InstanceLock {
            pid,
            instance,
            path,
            _file: file,
        })
    }
}

/// Lowest number missing from `sorted_instances`, which must be ascending.
pub fn lowest_free_instance(sorted_instances: &[u32]) -> u32 {
    let mut candidate = 0;
    for &instance in sorted_instances {
        if instance > candidate {
            break;
        }
        candidate = instance + 1;
    }
    candidate
}

/// Exclusive advisory lock on `lock_0_0`, held while an instance is picked.
struct GlobalLock {
    path: PathBuf,
    file: File,
}

impl GlobalLock {
    /// Blocks until no other process holds the lock.
    fn acquire(path: &Path) -> Result<Self, LockError> {
        loop {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(|source| LockError::GlobalLock {
                    path: path.to_path_buf(),
                    source,
                })?;

            flock_exclusive(&file).map_err(|source| LockError::Flock {
                path: path.to_path_buf(),
                source,
            })?;

            // The previous holder unlinks the file on release. If that happened
            // while we waited, our lock is on an orphaned inode; start over.
            if same_file(&file, path) {
                tracing::trace!("Holding global lock {:?}", path);
                return Ok(Self {
                    path: path.to_path_buf(),
                    file,
                });
            }
            tracing::trace!("Global lock {:?} was removed while waiting, retrying", path);
        }
    }

    /// Unlink first, so nobody can lock the old inode after we let go.
    fn release(self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!("Cannot remove global lock {:?}: {}", self.path, err);
        }
        drop(self.file);
    }
}

fn flock_exclusive(file: &File) -> io::Result<()> {
    loop {
        // SAFETY: the descriptor stays open for the duration of the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn same_file(file: &File, path: &Path) -> bool {
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
        _ => false,
    }
}
