//! CLI entry point for the repo-local architecture lint.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};

fn main() -> ExitCode {
    let outcome = workspace_root()
        .ok_or_else(|| "unable to locate the workspace root (a Cargo.toml with [workspace])".to_owned())
        .and_then(|root| {
            architecture_lint::lint_backend_sources(&root.join("backend"))
                .map_err(|err| err.to_string())
        });
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            let _ = writeln!(io::stderr().lock(), "{message}");
            ExitCode::FAILURE
        }
    }
}

fn workspace_root() -> Option<Utf8PathBuf> {
    let from_env = std::env::var("CARGO_WORKSPACE_DIR").ok().map(Utf8PathBuf::from);
    let from_cwd = std::env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
    let from_manifest = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    [from_env, from_cwd, Some(from_manifest)]
        .into_iter()
        .flatten()
        .find_map(|start| find_workspace_root(&start))
}

fn find_workspace_root(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .find(|dir| {
            std::fs::read_to_string(dir.join("Cargo.toml"))
                .is_ok_and(|contents| contents.contains("[workspace]"))
        })
        .map(Utf8Path::to_path_buf)
}
