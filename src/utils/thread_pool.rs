use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Build a dedicated pool of named worker threads.
///
/// Each scanner owns its pool instead of sharing the rayon global one, so
/// the configured worker count is honoured even when the host application
/// already uses rayon elsewhere.
///
/// # Errors
///
/// Returns an error if the OS refuses to spawn the threads
pub fn build_pool(num_threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .thread_name(|i| format!("codepulse-worker-{i}"))
        .build()
}

/// Resolve a configured worker count, where `0` means "use every core"
#[must_use]
pub fn resolve_workers(configured: usize) -> usize {
    if configured == 0 {
        num_cpus::get()
    } else {
        configured
    }
}

/// Default worker count: the host's available parallelism
#[must_use]
pub fn default_workers() -> usize {
    num_cpus::get()
}

/// Cached host parallelism
mod num_cpus {
    use std::sync::LazyLock;

    /// Probed once on first use
    static NUM_CPUS: LazyLock<usize> = LazyLock::new(|| {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    });

    /// Available cores, at least 1
    pub fn get() -> usize {
        *NUM_CPUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_zero_means_all_cores() {
        assert_eq!(resolve_workers(0), default_workers());
        assert_eq!(resolve_workers(3), 3);
    }

    #[test]
    fn test_build_pool_names_threads() -> anyhow::Result<()> {
        let pool = build_pool(2)?;
        assert_eq!(pool.current_num_threads(), 2);

        let name = pool.install(|| std::thread::current().name().map(str::to_string));
        assert_eq!(name.as_deref().map(|n| n.starts_with("codepulse-worker-")), Some(true));
        Ok(())
    }

    #[test]
    fn test_build_pool_clamps_zero() -> anyhow::Result<()> {
        let pool = build_pool(0)?;
        assert_eq!(pool.current_num_threads(), 1);
        Ok(())
    }
}
