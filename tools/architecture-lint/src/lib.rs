//! Repo-local lint guarding the layering of the `careplan` backend.
//!
//! The backend keeps business rules in `domain`, HTTP handling in `inbound`
//! and persistence plus credential hashing in `outbound`. This crate parses
//! every source file under those directories and reports imports that cross
//! a boundary:
//!
//! - `domain` may not reach either adapter layer, the web framework, the
//!   OpenAPI generator, the database stack or the password hashing crates.
//! - `inbound` may not reach `outbound`, the database stack or the hashing
//!   crates; it talks to services through domain ports.
//! - `outbound` may not reach `inbound`, the web framework or the OpenAPI
//!   generator.
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the
//! workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use syn::visit::Visit;

/// Name under which integration code refers to the backend crate.
const BACKEND_CRATE: &str = "careplan";

const WEB_CRATES: &[&str] = &[
    "actix",
    "actix_http",
    "actix_service",
    "actix_session",
    "actix_web",
    "awc",
];
const DOC_CRATES: &[&str] = &["utoipa", "utoipa_swagger_ui"];
const DATABASE_CRATES: &[&str] = &["diesel", "diesel_async", "diesel_migrations", "postgres"];
const HASHING_CRATES: &[&str] = &["argon2", "rand"];

/// One architectural layer under `backend/src`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Domain,
    Inbound,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Inbound, Self::Outbound];

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    fn from_path(relative: &Utf8Path) -> Option<Self> {
        let first = relative.components().next()?.as_str();
        Self::ALL.into_iter().find(|layer| layer.dir() == first)
    }

    fn from_module(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.dir() == name)
    }

    fn forbidden_layers(self) -> &'static [Self] {
        match self {
            Self::Domain => &[Self::Inbound, Self::Outbound],
            Self::Inbound => &[Self::Outbound],
            Self::Outbound => &[Self::Inbound],
        }
    }

    fn forbidden_crates(self) -> impl Iterator<Item = &'static str> {
        let groups: &[&[&'static str]] = match self {
            Self::Domain => &[WEB_CRATES, DOC_CRATES, DATABASE_CRATES, HASHING_CRATES],
            Self::Inbound => &[DATABASE_CRATES, HASHING_CRATES],
            Self::Outbound => &[WEB_CRATES, DOC_CRATES],
        };
        groups.iter().flat_map(|group| group.iter().copied())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// What a violating import reached for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reach {
    /// Another layer of the backend crate.
    Layer(Layer),
    /// A third-party crate reserved for other layers.
    Crate(String),
}

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Violation {
    /// File path relative to `backend/src`.
    pub file: Utf8PathBuf,
    /// Layer the file belongs to.
    pub layer: Layer,
    /// The forbidden dependency.
    pub reach: Reach,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reach {
            Reach::Layer(target) => write!(
                f,
                "{}: {} code must not depend on crate::{target}",
                self.file, self.layer
            ),
            Reach::Crate(name) => write!(
                f,
                "{}: {} code must not depend on external crate `{name}`",
                self.file, self.layer
            ),
        }
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    Io(io::Error),
    /// A path was not valid UTF-8 or sat outside every layer.
    UnknownLayer(Utf8PathBuf),
    /// Rust source parsing failed.
    Parse { file: Utf8PathBuf, message: String },
    /// One or more boundary violations were found.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error while linting architecture: {err}"),
            Self::UnknownLayer(file) => write!(f, "{file} does not belong to a known layer"),
            Self::Parse { file, message } => write!(f, "failed to parse {file}: {message}"),
            Self::Violations(violations) => {
                writeln!(f, "Architecture boundary violations:")?;
                for violation in violations {
                    writeln!(f, "- {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `backend/src`.
    pub file: Utf8PathBuf,
    pub contents: String,
}

impl LintSource {
    /// Convenience constructor for tests.
    pub fn new(file: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            contents: contents.into(),
        }
    }
}

/// Lint the backend crate sources on disk.
///
/// `backend_dir` must be the `backend/` directory at the repository root.
pub fn lint_backend_sources(backend_dir: &Utf8Path) -> Result<(), ArchitectureLintError> {
    let src = Dir::open_ambient_dir(backend_dir.join("src"), ambient_authority())?;
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let Ok(dir) = src.open_dir(layer.dir()) else {
            continue;
        };
        collect_sources(&dir, Utf8Path::new(layer.dir()), &mut sources)?;
    }
    lint_sources(&sources)
}

/// Lint the provided Rust sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = BTreeSet::new();
    for source in sources {
        violations.extend(lint_source(source)?);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(
            violations.into_iter().collect(),
        ))
    }
}

fn lint_source(source: &LintSource) -> Result<Vec<Violation>, ArchitectureLintError> {
    let layer = Layer::from_path(&source.file)
        .ok_or_else(|| ArchitectureLintError::UnknownLayer(source.file.clone()))?;
    let parsed = syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
        file: source.file.clone(),
        message: err.to_string(),
    })?;

    let mut collector = PathCollector::default();
    collector.visit_file(&parsed);

    Ok(collector
        .paths
        .iter()
        .filter_map(|segments| forbidden_reach(layer, segments))
        .map(|reach| Violation {
            file: source.file.clone(),
            layer,
            reach,
        })
        .collect())
}

fn forbidden_reach(layer: Layer, segments: &[String]) -> Option<Reach> {
    let first = segments.first()?.as_str();
    if let Some(target) = internal_layer(segments) {
        return layer
            .forbidden_layers()
            .contains(&target)
            .then_some(Reach::Layer(target));
    }
    if matches!(first, "crate" | "self" | "super" | BACKEND_CRATE) {
        return None;
    }
    layer
        .forbidden_crates()
        .any(|name| name == first)
        .then(|| Reach::Crate(first.to_owned()))
}

/// The backend layer a path points into, if any.
///
/// Bare `outbound::` paths count as internal so that `use super::*`
/// re-exports cannot hide a crossing.
fn internal_layer(segments: &[String]) -> Option<Layer> {
    let mut rest = segments.iter().map(String::as_str).peekable();
    if rest.peek() == Some(&BACKEND_CRATE) {
        rest.next();
    }
    let root = rest.find(|segment| !matches!(*segment, "crate" | "self" | "super"))?;
    Layer::from_module(root)
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        let segments: Vec<String> = node
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_sources(
    dir: &Dir,
    relative: &Utf8Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            return Err(ArchitectureLintError::UnknownLayer(relative.to_owned()));
        };
        let path = relative.join(name);
        if entry.file_type()?.is_dir() {
            collect_sources(&entry.open_dir()?, &path, sources)?;
        } else if path.extension() == Some("rs") {
            let contents = dir.read_to_string(name)?;
            sources.push(LintSource {
                file: path,
                contents,
            });
        }
    }
    Ok(())
}
