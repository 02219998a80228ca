//! Steps shared by every behaviour suite.

use actix_web::http::Method;
use rstest_bdd_macros::{given, then, when};
use serde_json::{Value, json};

use super::{WorldFixture, email, last_body, last_status, register, request, seed_operator};

#[given("a doctor named {alias}")]
fn a_doctor_named(world: &WorldFixture, alias: String) {
    register(&world.world(), &alias, "DOCTOR");
}

#[given("a patient named {alias}")]
fn a_patient_named(world: &WorldFixture, alias: String) {
    register(&world.world(), &alias, "PATIENT");
}

#[given("an operator named {alias}")]
fn an_operator_named(world: &WorldFixture, alias: String) {
    seed_operator(&world.world(), &alias);
}

#[given("{doctor} links {patient} to the care team")]
fn links_to_the_care_team(world: &WorldFixture, doctor: String, patient: String) {
    let world = world.world();
    request(
        &world,
        Some(&doctor),
        Method::POST,
        "/api/v1/care-team/patients",
        Some(json!({ "email": email(&patient) })),
    );
    assert_eq!(last_status(&world), 201, "link {patient}");
}

#[when("the clock advances {days} days")]
fn the_clock_advances(world: &WorldFixture, days: i64) {
    world.world().borrow().clock.advance_days(days);
}

#[then("the response status is {status}")]
fn the_response_status_is(world: &WorldFixture, status: u16) {
    let world = world.world();
    assert_eq!(last_status(&world), status, "body: {}", last_body(&world));
}

#[then("the error detail code is {code}")]
fn the_error_detail_code_is(world: &WorldFixture, code: String) {
    let body = last_body(&world.world());
    assert_eq!(
        body.pointer("/details/code").and_then(Value::as_str),
        Some(code.as_str())
    );
}
