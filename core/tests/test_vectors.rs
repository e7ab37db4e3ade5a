//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use portal_core::types::{ChangePassword, Credentials, OtpVerification};
use portal_core::{
    extract_error_message, ApiError, HttpMethod, HttpRequest, HttpResponse, OtpReason,
    PortalClient,
};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8000";

fn client() -> PortalClient {
    PortalClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PATCH" => HttpMethod::Patch,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_reason(s: &str) -> OtpReason {
    match s {
        "activation" => OtpReason::Activation,
        "forgot_password" => OtpReason::ForgotPassword,
        other => panic!("unknown reason: {other}"),
    }
}

fn from_input<T: serde::de::DeserializeOwned>(case: &Value) -> T {
    serde_json::from_value(case["input"].clone()).unwrap()
}

fn build(c: &PortalClient, operation: &str, case: &Value) -> HttpRequest {
    let token = case["token"].as_str().unwrap_or_default();
    let input = &case["input"];
    match operation {
        "send_otp" => c.build_send_otp(
            parse_reason(input["reason"].as_str().unwrap()),
            input["student_id"].as_str().unwrap(),
        ),
        "activate" => c.build_activate(&from_input::<OtpVerification>(case)),
        "login" => c.build_login(&from_input::<Credentials>(case)),
        "reset_password" => c.build_reset_password(&from_input::<OtpVerification>(case)),
        "change_password" => c.build_change_password(&from_input::<ChangePassword>(case), token),
        "welcome" => c.build_welcome(token),
        "university_info" => c.build_university_info(),
        "list_semesters" => c.build_list_semesters(token),
        "class_schedule" => c.build_class_schedule(
            input["year"].as_i64().unwrap() as i32,
            input["season_id"].as_u64().unwrap() as u32,
            token,
        ),
        "list_courses" => c.build_list_courses(token),
        "list_chosen_courses" => c.build_list_chosen_courses(
            input["season_id"].as_u64().unwrap() as u32,
            input["year"].as_i64().unwrap() as i32,
            token,
        ),
        "select_course" => c.build_select_course(input["course_id"].as_str().unwrap(), token),
        "deselect_course" => c.build_deselect_course(input["course_id"].as_str().unwrap(), token),
        other => panic!("unknown operation: {other}"),
    }
    .unwrap()
}

fn to_json<T: serde::Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
    result.map(|value| serde_json::to_value(value).unwrap())
}

fn parse(c: &PortalClient, operation: &str, response: HttpResponse) -> Result<Value, ApiError> {
    match operation {
        "send_otp" => to_json(c.parse_send_otp(response)),
        "activate" => to_json(c.parse_activate(response)),
        "login" => to_json(c.parse_login(response)),
        "reset_password" => to_json(c.parse_reset_password(response)),
        "change_password" => to_json(c.parse_change_password(response)),
        "welcome" => to_json(c.parse_welcome(response)),
        "university_info" => to_json(c.parse_university_info(response)),
        "list_semesters" => to_json(c.parse_list_semesters(response)),
        "class_schedule" => to_json(c.parse_class_schedule(response)),
        "list_courses" => to_json(c.parse_list_courses(response)),
        "list_chosen_courses" => to_json(c.parse_list_chosen_courses(response)),
        "select_course" => to_json(c.parse_select_course(response)),
        "deselect_course" => to_json(c.parse_deselect_course(response)),
        other => panic!("unknown operation: {other}"),
    }
}

fn assert_error(name: &str, err: &ApiError, expected: &Value) {
    let status = expected["status"].as_u64().unwrap() as u16;
    match expected["kind"].as_str().unwrap() {
        "api" => assert_eq!(
            *err,
            ApiError::Api {
                message: expected["message"].as_str().unwrap().to_string(),
                status,
            },
            "{name}: error"
        ),
        "parse" => {
            assert!(matches!(err, ApiError::Parse { .. }), "{name}: expected parse error, got {err:?}");
            assert_eq!(err.status(), Some(status), "{name}: status");
        }
        other => panic!("{name}: unknown error kind: {other}"),
    }
}

fn run_vectors(raw: &str) {
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let operation = case["operation"].as_str().unwrap();
        let expected_req = &case["expected_request"];

        // Verify build
        let req = build(&c, operation, case);
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: url");

        let expected_headers: Vec<(String, String)> = expected_req["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        let req_body = req
            .body
            .as_deref()
            .map(|body| serde_json::from_str::<Value>(body).unwrap())
            .unwrap_or(Value::Null);
        assert_eq!(req_body, expected_req["body"], "{name}: body");

        // Verify parse
        let sim = &case["response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        let result = parse(&c, operation, response);

        match case.get("expected_error") {
            Some(expected) => assert_error(name, &result.unwrap_err(), expected),
            None => assert_eq!(result.unwrap(), case["expected"], "{name}: parsed"),
        }
    }
}

#[test]
fn auth_test_vectors() {
    run_vectors(include_str!("../../test-vectors/auth.json"));
}

#[test]
fn student_test_vectors() {
    run_vectors(include_str!("../../test-vectors/student.json"));
}

#[test]
fn advising_test_vectors() {
    run_vectors(include_str!("../../test-vectors/advising.json"));
}

#[test]
fn error_message_test_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let message = extract_error_message(case["body"].as_str().unwrap(), status);
        assert_eq!(json!(message), case["expected"], "{name}");
    }
}
