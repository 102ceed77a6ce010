//! Process memory readout for the load-shedding precondition.

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, get_current_pid};

/// Resident set size of this process in bytes. `None` when the platform
/// cannot identify the current process, which disables the memory guard.
pub fn rss_bytes() -> Option<u64> {
    let pid = get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        ProcessRefreshKind::new().with_memory(),
    );
    Some(system.process(pid)?.memory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_is_nonzero() {
        let rss = rss_bytes().expect("process RSS should be readable");
        assert!(rss > 0);
    }
}
