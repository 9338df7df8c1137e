//! The "interactive debugger attached" signal.

/// Reports whether an interactive debugger is attached to the process.
///
/// The loader reads the probe exactly once per load and reuses the answer
/// for both the symbol lookup and the choice of loader call.
///
/// Any `Fn() -> bool` is a probe:
///
/// ```
/// use zipload_core::host::DebuggerProbe;
///
/// let attached = || true;
/// assert!(attached.is_attached());
/// ```
pub trait DebuggerProbe {
    /// Returns `true` if a debugger is attached right now.
    fn is_attached(&self) -> bool;
}

impl<F: Fn() -> bool> DebuggerProbe for F {
    fn is_attached(&self) -> bool {
        self()
    }
}

/// Probe that never reports a debugger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDebugger;

impl DebuggerProbe for NoDebugger {
    fn is_attached(&self) -> bool {
        false
    }
}

/// Probe that asks the operating system about the current process.
///
/// On Linux a non-zero `TracerPid` in `/proc/self/status` counts as an
/// attached debugger. On other platforms it always reports `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessDebugger;

impl DebuggerProbe for ProcessDebugger {
    #[cfg(target_os = "linux")]
    fn is_attached(&self) -> bool {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| tracer_pid(&status))
            .is_some_and(|pid| pid != 0)
    }

    #[cfg(not(target_os = "linux"))]
    fn is_attached(&self) -> bool {
        false
    }
}

/// Parses the `TracerPid` field of a `/proc/<pid>/status` document.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_no_debugger() {
        assert!(!NoDebugger.is_attached());
    }

    #[test]
    fn test_closure_probe() {
        let calls = Cell::new(0);
        let probe = || {
            calls.set(calls.get() + 1);
            true
        };

        assert!(probe.is_attached());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_tracer_pid_parsing() {
        let status = "Name:\tcargo\nState:\tR (running)\nTracerPid:\t4242\nUid:\t1000\n";
        assert_eq!(tracer_pid(status), Some(4242));

        let status = "Name:\tcargo\nTracerPid:\t0\n";
        assert_eq!(tracer_pid(status), Some(0));

        assert_eq!(tracer_pid("Name:\tcargo\n"), None);
        assert_eq!(tracer_pid("TracerPid:\tnot-a-pid\n"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_probe_agrees_with_status_file() {
        let status = std::fs::read_to_string("/proc/self/status").unwrap();
        let expected = tracer_pid(&status).is_some_and(|pid| pid != 0);

        assert!(tracer_pid(&status).is_some());
        assert_eq!(ProcessDebugger.is_attached(), expected);
    }
}
