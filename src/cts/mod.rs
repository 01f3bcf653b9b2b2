//! # Conformance Test Suite
//!
//! A fixed, ordered battery of [`Check`]s that certifies a backend honors
//! the provider contract.
//!
//! ## Overview
//!
//! [`Cts::run`] executes every check in sequence against one provider and
//! collects a [`CtsReport`]. Checks share the provider's state: a later
//! check may rely on files an earlier one wrote, and nothing is rolled back.
//! Every check runs even when an earlier one failed.
//!
//! Each check receives the provider twice: directly, and through a fresh
//! [`CheckContext`]. Checks mix both call styles so that the convenience
//! layer and the raw contract are exercised against the same backend.
//!
//! | Check | Verifies |
//! |-------|----------|
//! | Empty | the root is empty or can be emptied |
//! | Write any | writes in various paths and sizes commit every byte |
//! | Read any | every listed file reads back at its reported size |
//! | Write and Read | written bytes read back identically |
//! | Rename | missing source fails, overwrite replaces the target |
//! | Attributes | unsupported shapes are rejected distinguishably |
//! | Close | closing succeeds |
//!
//! ## Example
//!
//! ```rust
//! use vfs_contract::cts::Cts;
//! use vfs_contract::MemoryProvider;
//!
//! let report = Cts::all().run(&MemoryProvider::new());
//! assert!(report.is_certified(), "{report}");
//! println!("{report}");
//! ```

mod checks;

use std::fmt;

use tracing::{info, warn};

use crate::{
    AttrsMut, DataProvider, DirEntList, ProviderExt, ReadDirOptions, Resource, ResourceInfo,
    VfsError, VfsPath,
};

pub use checks::{ATTRIBUTES, CLOSE, EMPTY, READ_ANY, RENAME, WRITE_AND_READ, WRITE_ANY};

/// Why a check failed.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A provider call failed where the contract requires success.
    #[error(transparent)]
    Provider(#[from] VfsError),

    /// The provider answered, but not the way the contract requires.
    #[error("{0}")]
    Violation(String),
}

impl CheckError {
    /// A contract violation with the given description.
    pub fn violation(message: impl Into<String>) -> Self {
        Self::Violation(message.into())
    }
}

/// Signature of a check body.
pub type CheckFn = fn(&dyn DataProvider, &CheckContext<'_>) -> Result<(), CheckError>;

/// A named, described, independent conformance check.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    /// Short name shown in the report.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// The check body.
    pub test: CheckFn,
}

/// Explicit handle for the convenience calls checks make.
///
/// The harness builds a fresh one before every check.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    provider: &'a dyn DataProvider,
}

impl<'a> CheckContext<'a> {
    /// A context bound to `provider`.
    pub fn new(provider: &'a dyn DataProvider) -> Self {
        Self { provider }
    }

    /// The bound provider.
    pub fn provider(&self) -> &'a dyn DataProvider {
        self.provider
    }

    /// Read a whole resource.
    pub fn read_all(&self, path: &VfsPath) -> Result<Vec<u8>, VfsError> {
        self.provider.read_all(path)
    }

    /// Write and commit a whole buffer, returning the committed count.
    pub fn write_all(&self, path: &VfsPath, data: &[u8]) -> Result<u64, VfsError> {
        self.provider.write_all(path, data)
    }

    /// Delete a resource.
    pub fn delete(&self, path: &VfsPath) -> Result<(), VfsError> {
        self.provider.delete(path)
    }

    /// Rename a resource.
    pub fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        self.provider.rename(from, to)
    }

    /// Read the [`ResourceInfo`] of a path.
    pub fn stat(&self, path: &VfsPath) -> Result<ResourceInfo, VfsError> {
        self.provider.stat(path)
    }

    /// Read attributes into an arbitrary destination.
    pub fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        self.provider.read_attrs(path, dest)
    }

    /// Open a directory listing.
    pub fn read_dir(&self, path: &VfsPath) -> Result<Box<dyn DirEntList>, VfsError> {
        self.provider.read_dir(path, &ReadDirOptions::default())
    }

    /// List one directory level as decoded records.
    pub fn read_dir_infos(&self, path: &VfsPath) -> Result<Vec<ResourceInfo>, VfsError> {
        self.provider.read_dir_infos(path)
    }

    /// List a whole subtree.
    pub fn read_dir_recursive(&self, path: &VfsPath) -> Result<Vec<Resource>, VfsError> {
        self.provider.read_dir_recursive(path)
    }
}

impl fmt::Debug for CheckContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckContext").finish_non_exhaustive()
    }
}

/// The outcome of one check.
#[derive(Debug)]
pub struct CheckResult {
    /// The check that ran.
    pub check: Check,
    /// `Ok` if it passed, otherwise the captured failure.
    pub result: Result<(), CheckError>,
}

impl CheckResult {
    /// Returns `true` if the check passed.
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Results of one CTS run, in check order.
#[derive(Debug, Default)]
pub struct CtsReport {
    results: Vec<CheckResult>,
}

impl CtsReport {
    /// Returns `true` if every check passed.
    pub fn is_certified(&self) -> bool {
        self.results.iter().all(CheckResult::passed)
    }

    /// The first failed check, if any.
    pub fn first_failure(&self) -> Option<&CheckResult> {
        self.results.iter().find(|r| !r.passed())
    }

    /// Look up a result by check name.
    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.check.name == name)
    }

    /// `(name, passed)` per check, in order.
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.results.iter().map(|r| (r.check.name, r.passed()))
    }

    /// All results, in order.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// Render the report as JSON.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            check: &'a str,
            description: &'a str,
            passed: bool,
            error: Option<String>,
        }

        let rows: Vec<Row<'_>> = self
            .results
            .iter()
            .map(|r| Row {
                check: r.check.name,
                description: r.check.description,
                passed: r.passed(),
                error: r.result.as_ref().err().map(ToString::to_string),
            })
            .collect();
        serde_json::to_string_pretty(&rows)
    }
}

impl fmt::Display for CtsReport {
    /// A markdown table, one row per check.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| CTS Check | Result |")?;
        writeln!(f, "| --------- | ------ |")?;
        for (name, passed) in self.rows() {
            let mark = if passed {
                ":white_check_mark:"
            } else {
                ":heavy_exclamation_mark:"
            };
            writeln!(f, "| {name} | {mark} |")?;
        }
        Ok(())
    }
}

/// An ordered set of checks.
#[derive(Debug, Clone)]
pub struct Cts {
    checks: Vec<Check>,
}

impl Cts {
    /// The canonical battery, in canonical order.
    pub fn all() -> Self {
        Self::with_checks([
            EMPTY,
            WRITE_ANY,
            READ_ANY,
            WRITE_AND_READ,
            RENAME,
            ATTRIBUTES,
            CLOSE,
        ])
    }

    /// A custom selection, run in the given order.
    pub fn with_checks(checks: impl IntoIterator<Item = Check>) -> Self {
        Self {
            checks: checks.into_iter().collect(),
        }
    }

    /// The checks this suite runs.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run every check against `provider`, in order.
    pub fn run(&self, provider: &dyn DataProvider) -> CtsReport {
        let results = self
            .checks
            .iter()
            .map(|check| {
                let ctx = CheckContext::new(provider);
                let result = (check.test)(provider, &ctx);
                match &result {
                    Ok(()) => info!(check = check.name, "CTS check passed"),
                    Err(e) => warn!(check = check.name, error = %e, "CTS check failed"),
                }
                CheckResult {
                    check: *check,
                    result,
                }
            })
            .collect();
        CtsReport { results }
    }

    /// Connect to a backend and run the suite.
    ///
    /// # Errors
    ///
    /// The connection failure; no check runs without a reachable backend.
    pub fn certify<P, F>(&self, connect: F) -> Result<CtsReport, VfsError>
    where
        P: DataProvider,
        F: FnOnce() -> Result<P, VfsError>,
    {
        let provider = connect()?;
        Ok(self.run(&provider))
    }
}

impl Default for Cts {
    fn default() -> Self {
        Self::all()
    }
}
