// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::warn;

use super::CacheError;

/// Bounded retry policy for deleting cache files, which may fail transiently
/// while another process still holds them open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Values below 1 are treated as 1.
    pub attempts: u32,

    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Runs a deletion of `path` until it succeeds, or until attempts run out,
    /// in which case [CacheError::PurgeFailed] is returned with the last error.
    ///
    /// A [io::ErrorKind::NotFound] error counts as success.
    pub(super) fn delete<F>(&self, path: &Path, mut op: F) -> Result<(), CacheError>
    where
        F: FnMut(&Path) -> io::Result<()>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(path) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) if attempt >= attempts => {
                    return Err(CacheError::PurgeFailed {
                        path: path.to_path_buf(),
                        attempts,
                        source: e,
                    })
                }
                Err(e) => {
                    warn!(
                        "failed to delete {} (attempt {}/{}): {}, retrying",
                        path.display(),
                        attempt,
                        attempts,
                        e
                    );
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: RetryPolicy = RetryPolicy {
        attempts: 5,
        backoff: Duration::ZERO,
    };

    fn busy() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "file in use")
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        FAST.delete(Path::new("cache.bin"), |_| {
            calls += 1;
            if calls < 3 {
                Err(busy())
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_all_attempts() {
        let mut calls = 0;
        let err = FAST
            .delete(Path::new("cache.bin"), |_| {
                calls += 1;
                Err(busy())
            })
            .unwrap_err();

        assert_eq!(calls, 5);
        match err {
            CacheError::PurgeFailed {
                path,
                attempts,
                source,
            } => {
                assert_eq!(path, Path::new("cache.bin"));
                assert_eq!(attempts, 5);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected PurgeFailed, got {}", other),
        }
    }

    #[test]
    fn not_found_is_success() {
        let mut calls = 0;
        FAST.delete(Path::new("cache.bin"), |_| {
            calls += 1;
            Err(io::Error::from(io::ErrorKind::NotFound))
        })
        .unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn at_least_one_attempt() {
        let policy = RetryPolicy {
            attempts: 0,
            backoff: Duration::ZERO,
        };
        let mut calls = 0;
        assert!(policy
            .delete(Path::new("cache.bin"), |_| {
                calls += 1;
                Err(busy())
            })
            .is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }
}
