//! Validated parallel execution parameters.

use std::time::Duration;

use super::error::ParallelisationError;

pub const DEFAULT_FILES_PER_PROCESS: usize = 10;
pub const DEFAULT_PROCESS_TIMEOUT: u64 = 120;

/// Worker-pool parameters: pool size, batch size, and per-worker timeout.
///
/// All three values are strictly positive; construction fails otherwise, so
/// a partially-valid instance never exists. Negative counts are
/// unrepresentable by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    max_processes: usize,
    files_per_process: usize,
    process_timeout: u64,
}

impl ParallelConfig {
    pub fn new(
        max_processes: usize,
        files_per_process: usize,
        process_timeout: u64,
    ) -> Result<Self, ParallelisationError> {
        if max_processes == 0 || files_per_process == 0 || process_timeout == 0 {
            return Err(ParallelisationError::InvalidConfig);
        }

        Ok(Self { max_processes, files_per_process, process_timeout })
    }

    /// Degenerate single-worker preset: run on the calling thread, no
    /// worker pool.
    pub fn sequential() -> Self {
        Self {
            max_processes: 1,
            files_per_process: DEFAULT_FILES_PER_PROCESS,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }

    /// Size the pool to the host's logical core count, with a safe floor of
    /// one when detection is unavailable or untrustworthy.
    pub fn detect() -> Self {
        Self::detect_with(DEFAULT_FILES_PER_PROCESS, DEFAULT_PROCESS_TIMEOUT)
    }

    pub fn detect_with(files_per_process: usize, process_timeout: u64) -> Self {
        Self {
            max_processes: num_cpus::get().max(1),
            files_per_process: files_per_process.max(1),
            process_timeout: process_timeout.max(1),
        }
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes
    }

    pub fn files_per_process(&self) -> usize {
        self.files_per_process
    }

    pub fn process_timeout(&self) -> u64 {
        self.process_timeout
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_values() {
        assert!(ParallelConfig::new(0, 10, 120).is_err());
        assert!(ParallelConfig::new(2, 0, 120).is_err());
        assert!(ParallelConfig::new(2, 10, 0).is_err());
    }

    #[test]
    fn stores_exact_values() {
        let config = ParallelConfig::new(3, 20, 60).unwrap();
        assert_eq!(config.max_processes(), 3);
        assert_eq!(config.files_per_process(), 20);
        assert_eq!(config.process_timeout(), 60);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn sequential_preset_uses_one_worker() {
        let config = ParallelConfig::sequential();
        assert_eq!(config.max_processes(), 1);
        assert_eq!(config.files_per_process(), DEFAULT_FILES_PER_PROCESS);
        assert_eq!(config.process_timeout(), DEFAULT_PROCESS_TIMEOUT);
    }

    #[test]
    fn detect_never_yields_zero_workers() {
        assert!(ParallelConfig::detect().max_processes() >= 1);
    }
}
