//! Error types for the simulator core.

use thiserror::Error;

/// Result type alias for memory manager operations.
pub type SimResult<T> = std::result::Result<T, SimError>;

/// Failures surfaced by the memory manager.
///
/// `CapacityExhausted` is recoverable: the driver simply stops admitting
/// new processes. The other two are terminal for the whole run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Virtual memory (RAM + swap) has no room left for a new process.
    #[error("virtual memory exhausted: no room for a new process")]
    CapacityExhausted,

    /// An eviction needs a swap slot and none remains.
    #[error("swap space exhausted: cannot swap out an eviction victim")]
    SwapExhausted,

    /// A page fault could not obtain a frame even after scanning the whole
    /// eviction queue.
    #[error("unrecoverable page fault: no frame could be obtained")]
    UnrecoverableFault,
}

impl SimError {
    /// Whether this error terminates the run. A rejected admission only
    /// stops further admissions.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SimError::CapacityExhausted)
    }
}

/// Rejected sizing parameters.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("physical RAM size must be positive (got {0} MB)")]
    InvalidRamSize(u64),

    #[error("page size must be positive (got {0} KB)")]
    InvalidPageSize(u64),

    #[error("process size range {min}..={max} MB is invalid")]
    InvalidSizeRange { min: u64, max: u64 },

    #[error("page size of {page_kb} KB exceeds the {ram_mb} MB of physical RAM")]
    PageLargerThanRam { ram_mb: u64, page_kb: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_capacity_exhausted_is_recoverable() {
        assert!(!SimError::CapacityExhausted.is_fatal());
        assert!(SimError::SwapExhausted.is_fatal());
        assert!(SimError::UnrecoverableFault.is_fatal());
    }

    #[test]
    fn test_error_messages_name_the_resource() {
        assert!(SimError::CapacityExhausted.to_string().contains("virtual memory"));
        assert!(SimError::SwapExhausted.to_string().contains("swap"));
    }
}
