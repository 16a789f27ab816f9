//! Locating input files and the data directory

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{EtlError, EtlResult};

/// Files whose presence marks a project root
pub const PROJECT_MARKERS: &[&str] = &[
    "Cargo.toml",
    ".git",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
];

/// Conventional data location in hosted sandboxes
pub const SANDBOX_DATA_DIR: &str = "/mnt/data";

/// How many parent directories the ancestor search climbs
const MAX_ANCESTOR_DEPTH: usize = 10;

/// Find the order file for `date` in `data_dir`
///
/// A match is any regular file whose name contains `date` and,
/// case-insensitively, `order`. When several files match, the
/// lexicographically first path wins.
pub fn find_order_file(data_dir: &Path, date: &str) -> EtlResult<PathBuf> {
    let escaped_dir = glob::Pattern::escape(&data_dir.display().to_string());
    let escaped_date = glob::Pattern::escape(date);
    let pattern = format!("{escaped_dir}/*{escaped_date}*");

    let entries = glob::glob(&pattern)
        .map_err(|e| EtlError::Config(format!("invalid order file pattern {pattern}: {e}")))?;

    let mut candidates = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                let is_order_file = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().contains("order"))
                    .unwrap_or(false);
                if is_order_file && path.is_file() {
                    candidates.push(path);
                }
            }
            Err(e) => {
                warn!("Error accessing path: {}", e);
            }
        }
    }

    candidates.sort();

    if candidates.len() > 1 {
        warn!(
            date,
            candidates = ?candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "Several order files match; using the first"
        );
    }

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| EtlError::OrderFileNotFound {
            date: date.to_string(),
            dir: data_dir.to_path_buf(),
        })
}

/// Inputs the data-directory strategies look at
#[derive(Debug, Clone)]
pub struct DirContext {
    /// Caller-supplied override
    pub explicit: Option<PathBuf>,
    /// Working directory the search starts from
    pub cwd: PathBuf,
    /// Root of the project the binary was built from
    pub project_dir: Option<PathBuf>,
    /// Sandbox fallback location
    pub sandbox_dir: PathBuf,
}

impl DirContext {
    /// Context for the running process
    pub fn from_env(explicit: Option<PathBuf>) -> EtlResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| EtlError::io_with_path(".", "reading working directory", e))?;
        Ok(Self {
            explicit,
            cwd,
            project_dir: build_project_dir(),
            sandbox_dir: PathBuf::from(SANDBOX_DATA_DIR),
        })
    }
}

/// Workspace root this crate was compiled in (crates/core -> ../..)
fn build_project_dir() -> Option<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
}

/// One way of finding the data directory
pub type DirStrategy = fn(&DirContext) -> Option<PathBuf>;

/// Strategies in the order they are tried; the working directory is the
/// final fallback and is not listed
pub const DATA_DIR_STRATEGIES: &[(&str, DirStrategy)] = &[
    ("explicit", explicit_dir),
    ("project", project_data_dir),
    ("ancestor", ancestor_data_dir),
    ("sandbox", sandbox_data_dir),
];

/// An override is taken as given, even when it does not exist
fn explicit_dir(ctx: &DirContext) -> Option<PathBuf> {
    ctx.explicit.clone()
}

fn project_data_dir(ctx: &DirContext) -> Option<PathBuf> {
    let candidate = ctx.project_dir.as_ref()?.join("data");
    candidate.is_dir().then_some(candidate)
}

fn ancestor_data_dir(ctx: &DirContext) -> Option<PathBuf> {
    let root = find_project_root(&ctx.cwd)?;
    let candidate = root.join("data");
    candidate.is_dir().then_some(candidate)
}

fn sandbox_data_dir(ctx: &DirContext) -> Option<PathBuf> {
    let mut entries = std::fs::read_dir(&ctx.sandbox_dir).ok()?;
    entries
        .next()
        .is_some()
        .then(|| ctx.sandbox_dir.clone())
}

/// Nearest ancestor of `start` holding a `data` folder or a project marker
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start.ancestors().take(MAX_ANCESTOR_DEPTH).find_map(|dir| {
        let is_root = dir.join("data").exists()
            || PROJECT_MARKERS.iter().any(|m| dir.join(m).exists());
        is_root.then(|| dir.to_path_buf())
    })
}

/// Resolve the data directory, first successful strategy wins
pub fn resolve_data_dir(ctx: &DirContext) -> PathBuf {
    for (name, strategy) in DATA_DIR_STRATEGIES {
        if let Some(dir) = strategy(ctx) {
            debug!(strategy = name, dir = %dir.display(), "Resolved data directory");
            return dir;
        }
    }
    debug!(dir = %ctx.cwd.display(), "Falling back to working directory for data");
    ctx.cwd.clone()
}

/// Resolve the output root: the override, or `<cwd>/output`
pub fn resolve_output_dir(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.join("output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(cwd: &Path) -> DirContext {
        DirContext {
            explicit: None,
            cwd: cwd.to_path_buf(),
            project_dir: None,
            sandbox_dir: cwd.join("no-such-sandbox"),
        }
    }

    #[test]
    fn test_find_order_file_matches_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Orders_20251025.csv"), "a\n").unwrap();
        fs::write(dir.path().join("inventory_20251025.csv"), "a\n").unwrap();

        let path = find_order_file(dir.path(), "20251025").unwrap();
        assert_eq!(path.file_name().unwrap(), "Orders_20251025.csv");
    }

    #[test]
    fn test_find_order_file_picks_lexicographic_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("orders_20251025_b.csv"), "a\n").unwrap();
        fs::write(dir.path().join("orders_20251025_a.csv"), "a\n").unwrap();

        let path = find_order_file(dir.path(), "20251025").unwrap();
        assert_eq!(path.file_name().unwrap(), "orders_20251025_a.csv");
    }

    #[test]
    fn test_find_order_file_missing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("orders_20251026.csv"), "a\n").unwrap();

        let err = find_order_file(dir.path(), "20251025").unwrap_err();
        assert!(matches!(err, EtlError::OrderFileNotFound { .. }));
    }

    #[test]
    fn test_resolve_prefers_explicit_dir() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("custom");
        fs::create_dir(&explicit).unwrap();

        let mut ctx = context(dir.path());
        ctx.explicit = Some(explicit.clone());
        assert_eq!(resolve_data_dir(&ctx), explicit);

        ctx.explicit = Some(dir.path().join("missing"));
        assert_eq!(resolve_data_dir(&ctx), dir.path().join("missing"));
    }

    #[test]
    fn test_missing_explicit_dir_is_not_replaced_by_fallbacks() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data").join("orders_20251025.csv"), "a\n").unwrap();
        let typo = dir.path().join("typo-data");

        let mut ctx = context(dir.path());
        ctx.explicit = Some(typo.clone());
        let resolved = resolve_data_dir(&ctx);
        assert_eq!(resolved, typo);

        let err = find_order_file(&resolved, "20251025").unwrap_err();
        match err {
            EtlError::OrderFileNotFound { dir, .. } => assert_eq!(dir, typo),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_project_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        let cwd = TempDir::new().unwrap();

        let mut ctx = context(cwd.path());
        ctx.project_dir = Some(dir.path().to_path_buf());
        assert_eq!(resolve_data_dir(&ctx), dir.path().join("data"));
    }

    #[test]
    fn test_resolve_searches_ancestors() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let ctx = context(&nested);
        assert_eq!(resolve_data_dir(&ctx), dir.path().join("data"));
    }

    #[test]
    fn test_resolve_uses_non_empty_sandbox() {
        let dir = TempDir::new().unwrap();
        let sandbox = dir.path().join("sandbox");
        fs::create_dir(&sandbox).unwrap();

        let mut ctx = context(dir.path());
        ctx.sandbox_dir = sandbox.clone();
        assert!(sandbox_data_dir(&ctx).is_none());

        fs::write(sandbox.join("products.csv"), "a\n").unwrap();
        assert_eq!(sandbox_data_dir(&ctx), Some(sandbox));
    }

    #[test]
    fn test_resolve_output_dir() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_output_dir(None, cwd), PathBuf::from("/work/output"));
        assert_eq!(
            resolve_output_dir(Some(Path::new("/out")), cwd),
            PathBuf::from("/out")
        );
    }
}
