use std::fmt;

pub const LOCK_FILE_PREFIX: &str = "lock_";

/// Identity encoded in a lock file name: `lock_<pid>_<instance>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockFileName {
    pub pid: u32,
    pub instance: u32,
}

impl LockFileName {
    /// `lock_0_0`, the file all starting processes serialize on.
    pub const GLOBAL: Self = Self {
        pid: 0,
        instance: 0,
    };

    pub fn new(pid: u32, instance: u32) -> Self {
        Self { pid, instance }
    }

    /// Parse the name of a per-process lock file.
    ///
    /// Both numbers must be plain decimal and the pid nonzero, so the global
    /// lock and unrelated files are never mistaken for an instance.
    pub fn parse(name: &str) -> Option<Self> {
        let (pid, instance) = name.strip_prefix(LOCK_FILE_PREFIX)?.split_once('_')?;
        let pid = parse_decimal(pid)?;
        let instance = parse_decimal(instance)?;
        (pid > 0).then_some(Self { pid, instance })
    }
}

fn parse_decimal(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for LockFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LOCK_FILE_PREFIX}{}_{}", self.pid, self.instance)
    }
}
