use std::ffi::{OsStr, OsString};
use std::path::Path;

use collections::FxHashSet;
use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// Source of the pids of running instances of this program.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTable {
    /// `None` when the process list cannot be obtained.
    fn live_pids(&self) -> Option<FxHashSet<u32>>;
}

/// Lists processes by executable name through `sysinfo`.
pub struct SysinfoProcessTable {
    name: OsString,
}

impl SysinfoProcessTable {
    pub fn new(name: impl Into<OsString>) -> Self {
        Self { name: name.into() }
    }

    /// Match processes named like the running executable.
    pub fn for_current_exe() -> Self {
        let name = std::env::current_exe()
            .ok()
            .and_then(|path| path.file_name().map(OsStr::to_os_string))
            .unwrap_or_else(|| OsString::from("tilda"));
        Self::new(name)
    }

    /// Process names are truncated by the kernel, so the executable path is checked too.
    fn matches(&self, process: &Process) -> bool {
        process.name() == self.name.as_os_str()
            || process.exe().and_then(Path::file_name) == Some(self.name.as_os_str())
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn live_pids(&self) -> Option<FxHashSet<u32>> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let pids: FxHashSet<u32> = system
            .processes()
            .iter()
            .filter(|(_, process)| self.matches(process))
            .map(|(pid, _)| pid.as_u32())
            .collect();

        tracing::trace!("{} running process(es) named {:?}", pids.len(), self.name);
        // An empty list means the lookup itself went wrong: we are running.
        (!pids.is_empty()).then_some(pids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_current_process() {
        let table = SysinfoProcessTable::for_current_exe();
        let pids = table.live_pids().unwrap();
        assert!(pids.contains(&std::process::id()));
    }

    #[test]
    fn unknown_program_has_no_processes() {
        let table = SysinfoProcessTable::new("no-such-program-d41d8cd9");
        assert_eq!(table.live_pids(), None);
    }
}
