use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::setup::Checkout;
use crate::workspace::Workspace;

/// Check whether `dir` is inside a git working tree.
pub fn is_repo(dir: &Path) -> bool {
    git2::Repository::discover(dir).is_ok()
}

/// Derive the product name from a product identifier (git URL or bare name).
///
/// Trailing slashes and a `.git` suffix are stripped; the last path
/// segment is the name: `https://host/org/svc-a.git` -> `svc-a`.
pub fn product_name(target: &str) -> String {
    let trimmed = target.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed)
        .to_string()
}

/// Clone `url` into `path`, or update the existing checkout.
pub fn checkout_product(url: &str, path: &Path) -> Result<()> {
    if path.exists() {
        update_repo(path)
    } else {
        git2::Repository::clone(url, path)
            .with_context(|| format!("Failed to clone {} to {:?}", url, path))?;
        Ok(())
    }
}

/// Fetch from origin and fast-forward the current branch.
///
/// A checkout that has diverged from its remote is left untouched and
/// reported as an error rather than merged.
fn update_repo(path: &Path) -> Result<()> {
    let repo = git2::Repository::open(path)
        .with_context(|| format!("Failed to open repository at {:?}", path))?;

    let mut remote = repo
        .find_remote("origin")
        .with_context(|| format!("Repository at {:?} has no 'origin' remote", path))?;
    remote
        .fetch(&[] as &[&str], None, None)
        .with_context(|| format!("Failed to fetch origin for {:?}", path))?;

    let fetch_head = repo
        .find_reference("FETCH_HEAD")
        .context("Fetch produced no FETCH_HEAD")?;
    let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        return Ok(());
    }

    if analysis.is_fast_forward() {
        let head_name = repo
            .head()?
            .name()
            .map(str::to_owned)
            .context("HEAD is not a named reference")?;
        let mut reference = repo.find_reference(&head_name)?;
        reference.set_target(fetch_commit.id(), "wst: fast-forward")?;
        repo.set_head(&head_name)?;
        repo.checkout_head(Some(git2::build::CheckoutBuilder::default().force()))?;
        return Ok(());
    }

    anyhow::bail!(
        "Checkout at {:?} has diverged from origin; resolve it manually",
        path
    )
}

/// Production checkout collaborator backed by git.
///
/// Expands product groups among the targets, then clones or updates each
/// product under the workspace root.
pub struct GitCheckout<'a> {
    workspace: &'a Workspace,
}

impl<'a> GitCheckout<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    /// Resolve the local checkout path for a product identifier.
    pub fn checkout_path(&self, target: &str) -> PathBuf {
        self.workspace.product_path(&product_name(target))
    }
}

impl Checkout for GitCheckout<'_> {
    fn checkout(&self, targets: &[String]) -> Result<()> {
        for target in self.workspace.expand_product_groups(targets)? {
            let target = target.trim_end_matches('/');
            let path = self.checkout_path(target);

            if path.exists() {
                tracing::info!("Updating {}", product_name(target));
            } else {
                tracing::info!("Checking out {}", target);
            }

            checkout_product(target, &path)?;
        }

        Ok(())
    }
}
