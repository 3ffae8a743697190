//! Parallel download fan-out.
//!
//! Each package is fetched on its own scoped thread. All threads run to
//! completion even after one of them fails; there is no cancellation. The
//! reported error is the first one in submission order, so the result does
//! not depend on which download happened to finish first.

use crate::error::{CudaInstallError, Result};
use crate::manifest::PackageDescriptor;
use std::thread;
use tracing::{debug, error};

/// Run `fetch` for every package concurrently.
///
/// Returns the outcomes in the same order as `packages`, or the first error
/// in that order once every fetch has finished.
pub fn fetch_all<T, F>(packages: &[&PackageDescriptor], fetch: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&PackageDescriptor) -> Result<T> + Sync,
{
    debug!("Fetching {} package(s) in parallel", packages.len());

    let results: Vec<Result<T>> = thread::scope(|scope| {
        let fetch = &fetch;
        let handles: Vec<_> = packages
            .iter()
            .map(|&pkg| (pkg, scope.spawn(move || fetch(pkg))))
            .collect();

        // Joining consumes every handle, so no fetch is abandoned early
        handles
            .into_iter()
            .map(|(pkg, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(CudaInstallError::command(
                        format!("fetch {}", pkg.name),
                        "worker thread panicked",
                    ))
                })
            })
            .collect()
    });

    let mut outcomes = Vec::with_capacity(results.len());
    for (pkg, result) in packages.iter().zip(results) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!("Failed to fetch {}: {}", pkg.name, e);
                return Err(e);
            }
        }
    }
    Ok(outcomes)
}
