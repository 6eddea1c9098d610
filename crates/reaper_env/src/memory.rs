// memory.rs
//! Cross-platform helpers to query resident process memory, total RAM and
//! the effective memory limit (cgroup limit on Linux, physical RAM elsewhere).
//! Every query returns `None` when unavailable.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory {
    pub used: u64,  // bytes, resident set of this process
    pub total: u64, // bytes, physical RAM
    pub limit: u64, // bytes, what this process may actually use
}

impl ProcessMemory {
    pub fn usage_ratio(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.used as f64 / self.limit as f64
        }
    }
}

/// Physical RAM, cached after the first successful query.
pub fn total_ram() -> Option<u64> {
    static INSTANCE: OnceLock<Option<u64>> = OnceLock::new();
    *INSTANCE.get_or_init(total_ram_bytes)
}

pub fn process_memory() -> Option<ProcessMemory> {
    let used = resident_bytes()?;
    let total = total_ram()?;
    let limit = match limit_bytes() {
        Some(limit) if limit > 0 && limit < total => limit,
        _ => total,
    };
    Some(ProcessMemory { used, total, limit })
}

/* -------------------------- Windows -------------------------- */

#[cfg(target_os = "windows")]
fn resident_bytes() -> Option<u64> {
    use windows_sys::Win32::System::ProcessStatus::{
        K32GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS,
    };
    use windows_sys::Win32::System::Threading::GetCurrentProcess;
    unsafe {
        let mut counters: PROCESS_MEMORY_COUNTERS = std::mem::zeroed();
        counters.cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
        if K32GetProcessMemoryInfo(GetCurrentProcess(), &mut counters, counters.cb) != 0 {
            Some(counters.WorkingSetSize as u64)
        } else {
            None
        }
    }
}

#[cfg(target_os = "windows")]
fn total_ram_bytes() -> Option<u64> {
    use windows_sys::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};
    unsafe {
        let mut st: MEMORYSTATUSEX = std::mem::zeroed();
        st.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
        if GlobalMemoryStatusEx(&mut st) != 0 { Some(st.ullTotalPhys) } else { None }
    }
}

#[cfg(target_os = "windows")]
fn limit_bytes() -> Option<u64> { None }

/* --------------------- macOS / iOS (Darwin) --------------------- */

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn resident_bytes() -> Option<u64> {
    use libc::{c_int, c_void, proc_pidinfo, proc_taskinfo, PROC_PIDTASKINFO};
    let size = std::mem::size_of::<proc_taskinfo>() as c_int;
    unsafe {
        let mut info: proc_taskinfo = std::mem::zeroed();
        let written = proc_pidinfo(
            libc::getpid(),
            PROC_PIDTASKINFO,
            0,
            &mut info as *mut _ as *mut c_void,
            size,
        );
        if written == size { Some(info.pti_resident_size) } else { None }
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn total_ram_bytes() -> Option<u64> {
    use libc::{c_void, size_t, sysctlbyname};
    let cname = std::ffi::CString::new("hw.memsize").ok()?;
    let mut val: u64 = 0;
    let mut len: size_t = std::mem::size_of::<u64>() as _;
    let out = &mut val as *mut _ as *mut c_void;
    let rc = unsafe { sysctlbyname(cname.as_ptr(), out, &mut len, std::ptr::null_mut(), 0) };
    if rc == 0 && val != 0 { Some(val) } else { None }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn limit_bytes() -> Option<u64> { None }

/* --------------------- Linux / Android --------------------- */

#[cfg(any(target_os = "linux", target_os = "android"))]
fn kib_field(text: &str, key: &str) -> Option<u64> {
    // "VmRSS:     12345 kB"
    text.lines()
        .find_map(|line| line.strip_prefix(key))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb * 1024)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn resident_bytes() -> Option<u64> {
    let text = std::fs::read_to_string("/proc/self/status").ok()?;
    kib_field(&text, "VmRSS:")
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn total_ram_bytes() -> Option<u64> {
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    kib_field(&text, "MemTotal:")
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn parse_cgroup_limit(raw: &str) -> Option<u64> {
    // cgroup v2 writes "max" when unlimited; v1 writes a huge sentinel instead
    let t = raw.trim();
    if t == "max" {
        return None;
    }
    t.parse::<u64>().ok()
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn limit_bytes() -> Option<u64> {
    ["/sys/fs/cgroup/memory.max", "/sys/fs/cgroup/memory/memory.limit_in_bytes"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .find_map(|raw| parse_cgroup_limit(&raw))
}

/* --------------------- Other / WASM / Fallbacks --------------------- */

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn resident_bytes() -> Option<u64> { None }
#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn total_ram_bytes() -> Option<u64> { None }
#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "android"
)))]
fn limit_bytes() -> Option<u64> { None }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_ratio_handles_zero_limit() {
        let sample = ProcessMemory { used: 10, total: 0, limit: 0 };
        assert_eq!(sample.usage_ratio(), 0.0);

        let sample = ProcessMemory { used: 75, total: 200, limit: 100 };
        assert!((sample.usage_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn parses_proc_fields_and_cgroup_limits() {
        let status = "Name:\treaper\nVmRSS:\t    2048 kB\nThreads:\t1\n";
        assert_eq!(kib_field(status, "VmRSS:"), Some(2048 * 1024));
        assert_eq!(kib_field(status, "VmSwap:"), None);

        assert_eq!(parse_cgroup_limit("max\n"), None);
        assert_eq!(parse_cgroup_limit("536870912\n"), Some(536_870_912));
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn windows_reports_physical_ram() {
        let total = total_ram_bytes().unwrap();
        assert!(total > 0);
        assert_eq!(total_ram(), Some(total));
    }

    #[test]
    fn sample_is_consistent_when_available() {
        if let Some(sample) = process_memory() {
            assert!(sample.limit <= sample.total);
            assert!(sample.limit > 0);
        }
    }
}
