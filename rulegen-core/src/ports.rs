//! Port traits abstracting I/O away from the pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use rulegen_types::Package;

/// Read access to the build files already in the repository.
///
/// The pipeline finds and reads previous build files through this so it can run against an
/// in-memory repository in tests. Shared between pipeline workers.
pub trait RepoView: Sync {
    fn root(&self) -> &Utf8Path;

    fn is_file(&self, path: &Utf8Path) -> bool;

    fn read_to_string(&self, path: &Utf8Path) -> anyhow::Result<String>;

    /// The first of `names` that is a file in `dir`.
    fn find_build_file(&self, dir: &Utf8Path, names: &[String]) -> Option<Utf8PathBuf> {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|path| self.is_file(path))
    }
}

/// Source of the package model produced by the package scanner.
pub trait PackageSource {
    fn load_packages(&self) -> anyhow::Result<Vec<Package>>;
}

/// File-system write operations. Shared between pipeline workers.
pub trait WritePort: Sync {
    /// Writes `contents` to `path`, creating parent directories as needed.
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
}
