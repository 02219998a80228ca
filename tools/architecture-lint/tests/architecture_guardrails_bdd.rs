//! Behaviour tests for the layering guardrails, run against a tree on disk.

use std::cell::RefCell;
use std::fs;

use architecture_lint::{ArchitectureLintError, LintSource, Violation};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

#[derive(Default)]
struct LintWorld {
    sources: RefCell<Vec<LintSource>>,
    result: RefCell<Option<Result<(), ArchitectureLintError>>>,
}

impl LintWorld {
    fn add(&self, file: &str, contents: &str) {
        self.sources
            .borrow_mut()
            .push(LintSource::new(file, contents));
    }

    fn violations(&self) -> Vec<Violation> {
        match self.result.borrow().as_ref().expect("lint must have run") {
            Ok(()) => Vec::new(),
            Err(ArchitectureLintError::Violations(violations)) => violations.clone(),
            Err(other) => panic!("expected violations, got: {other:?}"),
        }
    }
}

#[fixture]
fn world() -> LintWorld {
    LintWorld::default()
}

#[given("a well-layered backend tree")]
fn a_well_layered_backend_tree(world: &LintWorld) {
    world.add(
        "domain/protocol.rs",
        "use chrono::NaiveDate; pub struct Protocol { pub starts: NaiveDate }",
    );
    world.add(
        "domain/ports/password_hasher.rs",
        "use crate::domain::Password; pub trait PasswordHasher { fn hash(&self, p: &Password); }",
    );
    world.add(
        "inbound/http/protocols.rs",
        "use actix_web::HttpResponse; use crate::domain::Protocol; fn h() { let _ = HttpResponse::Ok(); }",
    );
    world.add(
        "outbound/security/argon2_password_hasher.rs",
        "use argon2::Argon2; use crate::domain::ports::PasswordHasher; fn h() { let _ = Argon2::default(); }",
    );
}

#[given("an inbound handler that calls argon2 directly")]
fn an_inbound_handler_that_calls_argon2(world: &LintWorld) {
    world.add(
        "inbound/http/auth.rs",
        "fn register() { let _ = argon2::Argon2::default(); }",
    );
}

#[given("a repository that imports the inbound layer")]
fn a_repository_that_imports_the_inbound_layer(world: &LintWorld) {
    world.add(
        "outbound/persistence/bad.rs",
        "use crate::inbound::http::ApiResult; fn q() {}",
    );
}

#[given("a domain aggregate that derives an OpenAPI schema")]
fn a_domain_aggregate_that_derives_a_schema(world: &LintWorld) {
    world.add(
        "domain/protocol.rs",
        "use utoipa::ToSchema; #[derive(ToSchema)] pub struct Protocol;",
    );
}

#[given("an inbound handler that opens a database pool")]
fn an_inbound_handler_that_opens_a_pool(world: &LintWorld) {
    world.add(
        "inbound/http/protocols.rs",
        "use careplan::outbound::persistence::DbPool; fn h(_pool: DbPool) {}",
    );
}

#[when("the architecture lint runs")]
fn the_architecture_lint_runs(world: &LintWorld) {
    let temp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp path");
    let backend = root.join("backend");
    for source in world.sources.borrow().iter() {
        let path = backend.join("src").join(&source.file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        // Later sources replace earlier ones at the same path.
        fs::write(&path, &source.contents).expect("write source file");
    }
    let result = architecture_lint::lint_backend_sources(&backend);
    *world.result.borrow_mut() = Some(result);
}

#[then("the lint succeeds")]
fn the_lint_succeeds(world: &LintWorld) {
    let result = world.result.borrow();
    let outcome = result.as_ref().expect("lint must have run");
    assert!(outcome.is_ok(), "expected success, got: {outcome:?}");
}

#[then("the lint reports {file} reaching {target}")]
fn the_lint_reports(world: &LintWorld, file: String, target: String) {
    let violations = world.violations();
    assert!(
        violations
            .iter()
            .any(|violation| violation.file.as_str() == file
                && violation.to_string().ends_with(&target)),
        "expected {file} reaching {target}, got: {violations:?}"
    );
}

#[then("exactly {count} violations are reported")]
fn exactly_n_violations(world: &LintWorld, count: usize) {
    let violations = world.violations();
    assert_eq!(violations.len(), count, "violations: {violations:?}");
}

#[scenario(path = "tests/features/architecture_guardrails.feature", index = 0)]
fn clean_tree_passes(world: LintWorld) {
    drop(world);
}

#[scenario(path = "tests/features/architecture_guardrails.feature", index = 1)]
fn handlers_may_not_hash(world: LintWorld) {
    drop(world);
}

#[scenario(path = "tests/features/architecture_guardrails.feature", index = 2)]
fn repositories_may_not_reach_http(world: LintWorld) {
    drop(world);
}

#[scenario(path = "tests/features/architecture_guardrails.feature", index = 3)]
fn every_crossing_is_reported(world: LintWorld) {
    drop(world);
}
