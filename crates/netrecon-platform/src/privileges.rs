//! Privilege and elevation checking.
//!
//! Cross-platform implementation using `std::process::Command`.

/// Check if the current process has elevated/admin privileges.
///
/// - **Unix**: runs `id -u` and checks if output is `"0"` (root).
/// - **Windows**: runs `net session` and checks for success exit status.
/// - **Other**: returns `false`.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("id")
            .arg("-u")
            .output()
            .map(|output| {
                String::from_utf8_lossy(&output.stdout).trim() == "0"
            })
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        std::process::Command::new("net")
            .arg("session")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}
