//! Testability port for injecting randomness.

#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Uniform integer in `[min, max)`.
    fn gen_range(&self, min: u64, max: u64) -> u64;
}
