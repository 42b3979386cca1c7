//! The generate pipeline, extracted from the CLI.
//!
//! All filesystem access goes through the port traits, so the pipeline runs unchanged against an
//! in-memory repository.

use crate::ports::{PackageSource, RepoView, WritePort};
use crate::settings::GenerateSettings;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use rulegen_domain::Generator;
use rulegen_types::{ConfigError, Package};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Error type for pipeline results. Per-package failures are not errors; they are listed in
/// [`GenerateOutcome::failures`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Created,
    Updated,
    Unchanged,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Created => "created",
            FileStatus::Updated => "updated",
            FileStatus::Unchanged => "unchanged",
        }
    }
}

/// Result for one build file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Package path relative to the repository root.
    pub rel: String,
    pub path: Utf8PathBuf,
    pub status: FileStatus,
    pub contents: String,
    pub previous: Option<String>,
}

/// A package whose build file could not be read or written.
#[derive(Debug, Clone)]
pub struct PackageFailure {
    pub rel: String,
    pub path: Utf8PathBuf,
    pub error: String,
}

/// Outcome of `run_generate`. Files and failures are sorted by path.
#[derive(Debug, Clone, Default)]
pub struct GenerateOutcome {
    pub files: Vec<FileOutcome>,
    pub failures: Vec<PackageFailure>,
    /// Unified diff of every changed file; only built for dry runs.
    pub patch: String,
}

impl GenerateOutcome {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Generates, merges and writes a build file for every package of `source`.
///
/// Packages are processed on `settings.jobs` scoped worker threads. A package whose previous
/// file cannot be read, or whose output cannot be written, is recorded as a failure and the
/// remaining packages still run.
pub fn run_generate(
    settings: &GenerateSettings,
    source: &dyn PackageSource,
    repo: &dyn RepoView,
    writer: &dyn WritePort,
) -> Result<GenerateOutcome, ToolError> {
    let config = settings.generator_config()?;
    let generator = Generator::new(config)?;
    let packages = dedup_packages(repo.root(), source.load_packages()?);

    let jobs = settings.jobs.clamp(1, packages.len().max(1));
    debug!(packages = packages.len(), jobs, dry_run = settings.dry_run, "starting generation");

    let job = PackageJob {
        generator: &generator,
        build_file_names: &settings.build_file_names,
        repo,
        writer,
        dry_run: settings.dry_run,
    };
    let next = AtomicUsize::new(0);
    let results: Vec<Result<FileOutcome, PackageFailure>> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..jobs)
            .map(|_| {
                s.spawn(|| {
                    let mut out = Vec::new();
                    while let Some(pkg) = packages.get(next.fetch_add(1, Ordering::Relaxed)) {
                        out.push(job.run(pkg));
                    }
                    out
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap_or_else(|p| std::panic::resume_unwind(p)))
            .collect()
    });

    let mut outcome = GenerateOutcome::default();
    for result in results {
        match result {
            Ok(file) => outcome.files.push(file),
            Err(failure) => outcome.failures.push(failure),
        }
    }
    outcome.files.sort_by(|a, b| a.path.cmp(&b.path));
    outcome.failures.sort_by(|a, b| a.path.cmp(&b.path));
    if settings.dry_run {
        outcome.patch = render_patch(repo.root(), &outcome.files);
    }

    info!(
        packages = packages.len(),
        created = outcome.count(FileStatus::Created),
        updated = outcome.count(FileStatus::Updated),
        unchanged = outcome.count(FileStatus::Unchanged),
        failed = outcome.failures.len(),
        dry_run = settings.dry_run,
        "generation finished"
    );
    Ok(outcome)
}

/// Directory of `pkg`: `dir` when set (relative paths are taken from the repository root),
/// otherwise `rel` under the root.
pub fn package_dir(root: &Utf8Path, pkg: &Package) -> Utf8PathBuf {
    if pkg.dir.as_str().is_empty() {
        root.join(&pkg.rel)
    } else {
        root.join(&pkg.dir)
    }
}

/// Two entries for the same directory would race on one file; the first wins.
fn dedup_packages(root: &Utf8Path, packages: Vec<Package>) -> Vec<Package> {
    let mut seen = BTreeSet::new();
    packages
        .into_iter()
        .filter(|pkg| {
            let dir = package_dir(root, pkg);
            if seen.insert(dir.clone()) {
                true
            } else {
                warn!(dir = %dir, "duplicate package entry; keeping the first");
                false
            }
        })
        .collect()
}

struct PackageJob<'a> {
    generator: &'a Generator,
    build_file_names: &'a [String],
    repo: &'a dyn RepoView,
    writer: &'a dyn WritePort,
    dry_run: bool,
}

impl PackageJob<'_> {
    fn run(&self, pkg: &Package) -> Result<FileOutcome, PackageFailure> {
        let dir = package_dir(self.repo.root(), pkg);
        let existing = self.repo.find_build_file(&dir, self.build_file_names);
        let path = match &existing {
            Some(path) => path.clone(),
            None => self.repo.root().join(self.generator.build_file_path(pkg)),
        };
        let fail = |err: anyhow::Error| {
            warn!(rel = %pkg.rel, path = %path, "package failed: {err:#}");
            PackageFailure {
                rel: pkg.rel.clone(),
                path: path.clone(),
                error: format!("{err:#}"),
            }
        };

        let previous = match &existing {
            Some(path) => Some(self.repo.read_to_string(path).map_err(fail)?),
            None => None,
        };
        let generated = self.generator.generate_file(pkg);
        let merged = rulegen_merge::merge_with_existing(generated, previous.as_deref());
        let contents = rulegen_syntax::print(&merged);

        let status = match &previous {
            None => FileStatus::Created,
            Some(prev) if *prev == contents => FileStatus::Unchanged,
            Some(_) => FileStatus::Updated,
        };
        if status != FileStatus::Unchanged && !self.dry_run {
            self.writer
                .write_file(&path, contents.as_bytes())
                .map_err(fail)?;
        }
        debug!(rel = %pkg.rel, path = %path, status = status.as_str(), "processed package");

        Ok(FileOutcome {
            rel: pkg.rel.clone(),
            path,
            status,
            contents,
            previous,
        })
    }
}

fn render_patch(root: &Utf8Path, files: &[FileOutcome]) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for file in files {
        if file.status == FileStatus::Unchanged {
            continue;
        }
        let path = file.path.strip_prefix(root).unwrap_or(&file.path);
        let old = file.previous.as_deref().unwrap_or("");

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        if file.previous.is_none() {
            out.push_str("new file mode 100644\n");
        }
        let patch = diffy::create_patch(old, &file.contents);
        out.push_str(&formatter.fmt_patch(&patch).to_string());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
