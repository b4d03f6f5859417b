use std::collections::HashSet;

/// Per-tenant resource and capability limits, applied uniformly to every
/// call the tenant makes — a call cannot raise its own limits mid-flight.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_memory_bytes: u64,
    pub max_cpu_ms: u64,
    pub max_calls: u64,
    pub allow_io: bool,
    pub allow_os: bool,
    pub allow_debug: bool,
    pub allow_coroutines: bool,
    pub allow_metatables: bool,
    pub allowed_modules: HashSet<String>,
    pub denied_globals: HashSet<String>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_memory_bytes: 16 * 1024 * 1024,
            max_cpu_ms: 5_000,
            max_calls: 10_000,
            allow_io: false,
            allow_os: false,
            allow_debug: false,
            allow_coroutines: true,
            allow_metatables: true,
            allowed_modules: HashSet::new(),
            denied_globals: ["io", "os", "debug", "package", "dofile", "loadfile", "require"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Limits {
    pub fn is_module_allowed(&self, name: &str) -> bool {
        self.allowed_modules.is_empty() || self.allowed_modules.contains(name)
    }

    pub fn is_global_denied(&self, name: &str) -> bool {
        self.denied_globals.contains(name)
    }

    /// The full set of global names the concrete engine should omit (or
    /// trap) when building this tenant's base sandbox environment:
    /// `denied_globals` plus whichever of the `allow_*` toggles are off.
    pub fn effective_denied_globals(&self) -> HashSet<String> {
        let mut denied = self.denied_globals.clone();
        if !self.allow_io {
            denied.insert("io".to_string());
        }
        if !self.allow_os {
            denied.insert("os".to_string());
        }
        if !self.allow_debug {
            denied.insert("debug".to_string());
        }
        if !self.allow_coroutines {
            denied.insert("coroutine".to_string());
        }
        denied
    }
}

/// Running totals a [`Limits`]-bound tenant has consumed, compared
/// against `max_calls` to enforce the call-count budget (memory and CPU
/// are tracked by the memory accounter and the host-side call timer
/// respectively, not duplicated here).
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageCounters {
    pub calls_made: u64,
    pub cpu_ms_spent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_denies_io_os_debug() {
        let limits = Limits::default();
        assert!(!limits.allow_io);
        assert!(!limits.allow_os);
        assert!(!limits.allow_debug);
        assert!(limits.is_global_denied("io"));
    }

    #[test]
    fn effective_denied_globals_adds_toggled_off_modules() {
        let mut limits = Limits::default();
        limits.allow_coroutines = false;
        let denied = limits.effective_denied_globals();
        assert!(denied.contains("coroutine"));
        assert!(denied.contains("io"));
    }

    #[test]
    fn empty_allowed_modules_means_all_allowed() {
        let limits = Limits::default();
        assert!(limits.is_module_allowed("agent"));
    }

    #[test]
    fn nonempty_allowed_modules_is_an_allowlist() {
        let mut limits = Limits::default();
        limits.allowed_modules.insert("agent".to_string());
        assert!(limits.is_module_allowed("agent"));
        assert!(!limits.is_module_allowed("tool"));
    }
}
