//! Platform checks used when reporting failures.

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root/admin.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(windows)]
    {
        std::env::var("ADMIN").is_ok()
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

/// Hint shown when a package manager reports a permission error.
pub fn permission_hint(is_system: bool) -> Option<&'static str> {
    if is_elevated() {
        return None;
    }
    if is_system {
        Some("System interpreters usually need a virtual environment or `pip install --user`")
    } else {
        Some("Check that you own the environment directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_ci_detects_environment() {
        // Just ensure function doesn't panic
        let _ = is_ci();
    }

    #[test]
    fn permission_hint_depends_on_privileges() {
        if is_elevated() {
            assert!(permission_hint(true).is_none());
        } else {
            assert!(permission_hint(true).unwrap().contains("virtual environment"));
            assert!(permission_hint(false).is_some());
        }
    }
}
