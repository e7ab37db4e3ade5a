//! Stateless HTTP request builder and response parser for the portal API.
//!
//! # Design
//! `PortalClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Protected endpoints take the bearer token as an argument; the client never
//! looks it up itself.

use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{build_request, parse_json, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    Acknowledgement, ChangePassword, ChosenCourse, ChosenCourseList, ClassSchedule,
    ClassScheduleItem, CourseList, Credentials, EligibleCourse, LoginResponse, OtpReason,
    OtpVerification, SendOtp, Semester, SemesterList, StudentProfile, UniversityInfo,
};

const SEND_OTP_PATH: &str = "/send-otp";
const ACTIVATE_PATH: &str = "/activate";
const LOGIN_PATH: &str = "/login";
const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
const CHANGE_PASSWORD_PATH: &str = "/change-password";
const WELCOME_PATH: &str = "/welcome";
const UNIVERSITY_INFO_PATH: &str = "/university-info";
const LIST_SEMESTERS_PATH: &str = "/list-semesters";
const CLASS_SCHEDULE_PATH: &str = "/class-schedule";
const LIST_COURSES_PATH: &str = "/list-courses";
const LIST_CHOSEN_COURSES_PATH: &str = "/list-chosen-courses";
const SELECT_COURSE_PATH: &str = "/select-course";
const DESELECT_COURSE_PATH: &str = "/deselect-course";

/// Synchronous, stateless client for the portal API.
#[derive(Debug, Clone)]
pub struct PortalClient {
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    // --- auth ---

    pub fn build_send_otp(&self, reason: OtpReason, student_id: &str) -> Result<HttpRequest, ApiError> {
        let url = format!("{}?reason_id={}", self.url(SEND_OTP_PATH), reason.id());
        let body = SendOtp {
            student_id: student_id.to_string(),
        };
        build_request(HttpMethod::Patch, &url, Some(&body), None)
    }

    pub fn parse_send_otp(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_or_default(HttpMethod::Patch, SEND_OTP_PATH, &response)
    }

    pub fn build_activate(&self, input: &OtpVerification) -> Result<HttpRequest, ApiError> {
        build_request(HttpMethod::Post, &self.url(ACTIVATE_PATH), Some(input), None)
    }

    pub fn parse_activate(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_required(HttpMethod::Post, ACTIVATE_PATH, &response)
    }

    pub fn build_login(&self, input: &Credentials) -> Result<HttpRequest, ApiError> {
        build_request(HttpMethod::Post, &self.url(LOGIN_PATH), Some(input), None)
    }

    /// A 2xx answer without a usable token is treated as malformed.
    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        let login: LoginResponse = self.parse_required(HttpMethod::Post, LOGIN_PATH, &response)?;
        if login.access_token.trim().is_empty() {
            return Err(ApiError::Parse {
                url: self.url(LOGIN_PATH),
                status: response.status,
            });
        }
        Ok(login)
    }

    pub fn build_reset_password(&self, input: &OtpVerification) -> Result<HttpRequest, ApiError> {
        build_request(HttpMethod::Post, &self.url(FORGOT_PASSWORD_PATH), Some(input), None)
    }

    pub fn parse_reset_password(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_required(HttpMethod::Post, FORGOT_PASSWORD_PATH, &response)
    }

    pub fn build_change_password(
        &self,
        input: &ChangePassword,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        build_request(
            HttpMethod::Patch,
            &self.url(CHANGE_PASSWORD_PATH),
            Some(input),
            Some(token),
        )
    }

    pub fn parse_change_password(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_or_default(HttpMethod::Patch, CHANGE_PASSWORD_PATH, &response)
    }

    // --- student and university ---

    pub fn build_welcome(&self, token: &str) -> Result<HttpRequest, ApiError> {
        build_request::<()>(HttpMethod::Get, &self.url(WELCOME_PATH), None, Some(token))
    }

    pub fn parse_welcome(&self, response: HttpResponse) -> Result<StudentProfile, ApiError> {
        self.parse_required(HttpMethod::Get, WELCOME_PATH, &response)
    }

    pub fn build_university_info(&self) -> Result<HttpRequest, ApiError> {
        build_request::<()>(HttpMethod::Get, &self.url(UNIVERSITY_INFO_PATH), None, None)
    }

    pub fn parse_university_info(&self, response: HttpResponse) -> Result<UniversityInfo, ApiError> {
        self.parse_required(HttpMethod::Get, UNIVERSITY_INFO_PATH, &response)
    }

    /// `/list-semesters` is sent with the bearer token like every other data
    /// endpoint.
    pub fn build_list_semesters(&self, token: &str) -> Result<HttpRequest, ApiError> {
        build_request::<()>(HttpMethod::Get, &self.url(LIST_SEMESTERS_PATH), None, Some(token))
    }

    pub fn parse_list_semesters(&self, response: HttpResponse) -> Result<Vec<Semester>, ApiError> {
        let list: SemesterList = self.parse_or_default(HttpMethod::Get, LIST_SEMESTERS_PATH, &response)?;
        Ok(list.semesters)
    }

    pub fn build_class_schedule(
        &self,
        year: i32,
        season_id: u32,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let url = format!(
            "{}?year={year}&season_id={season_id}",
            self.url(CLASS_SCHEDULE_PATH)
        );
        build_request::<()>(HttpMethod::Get, &url, None, Some(token))
    }

    pub fn parse_class_schedule(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ClassScheduleItem>, ApiError> {
        let schedule: ClassSchedule =
            self.parse_or_default(HttpMethod::Get, CLASS_SCHEDULE_PATH, &response)?;
        Ok(schedule.schedule)
    }

    // --- advising ---

    pub fn build_list_courses(&self, token: &str) -> Result<HttpRequest, ApiError> {
        build_request::<()>(HttpMethod::Get, &self.url(LIST_COURSES_PATH), None, Some(token))
    }

    pub fn parse_list_courses(&self, response: HttpResponse) -> Result<Vec<EligibleCourse>, ApiError> {
        let list: CourseList = self.parse_or_default(HttpMethod::Get, LIST_COURSES_PATH, &response)?;
        Ok(list.courses)
    }

    pub fn build_list_chosen_courses(
        &self,
        season_id: u32,
        year: i32,
        token: &str,
    ) -> Result<HttpRequest, ApiError> {
        let url = format!(
            "{}?season_id={season_id}&year={year}",
            self.url(LIST_CHOSEN_COURSES_PATH)
        );
        build_request::<()>(HttpMethod::Get, &url, None, Some(token))
    }

    pub fn parse_list_chosen_courses(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ChosenCourse>, ApiError> {
        let list: ChosenCourseList =
            self.parse_or_default(HttpMethod::Get, LIST_CHOSEN_COURSES_PATH, &response)?;
        Ok(list.chosen_courses)
    }

    pub fn build_select_course(&self, course_id: &str, token: &str) -> Result<HttpRequest, ApiError> {
        self.build_course_toggle(SELECT_COURSE_PATH, course_id, token)
    }

    pub fn parse_select_course(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_or_default(HttpMethod::Patch, SELECT_COURSE_PATH, &response)
    }

    pub fn build_deselect_course(&self, course_id: &str, token: &str) -> Result<HttpRequest, ApiError> {
        self.build_course_toggle(DESELECT_COURSE_PATH, course_id, token)
    }

    pub fn parse_deselect_course(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        self.parse_or_default(HttpMethod::Patch, DESELECT_COURSE_PATH, &response)
    }

    fn build_course_toggle(&self, path: &str, course_id: &str, token: &str) -> Result<HttpRequest, ApiError> {
        if course_id.trim().is_empty() {
            return Err(ApiError::InvalidArgument("course id must not be empty".to_string()));
        }
        let url = format!(
            "{}?course_id={}",
            self.url(path),
            urlencoding::encode(course_id)
        );
        build_request::<()>(HttpMethod::Patch, &url, None, Some(token))
    }

    // --- helpers ---

    /// Parse a body that must be present.
    fn parse_required<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        response: &HttpResponse,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        match parse_json(method, &url, response)? {
            Some(value) => Ok(value),
            None => Err(ApiError::Parse {
                url,
                status: response.status,
            }),
        }
    }

    /// Parse a body where "no content" means the empty value.
    fn parse_or_default<T: DeserializeOwned + Default>(
        &self,
        method: HttpMethod,
        path: &str,
        response: &HttpResponse,
    ) -> Result<T, ApiError> {
        Ok(parse_json(method, &self.url(path), response)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{DayKey, Weekday};

    fn client() -> PortalClient {
        PortalClient::new("http://localhost:8000")
    }

    fn body_json(req: &HttpRequest) -> serde_json::Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = PortalClient::new("http://localhost:8000/");
        let req = client.build_university_info().unwrap();
        assert_eq!(req.url, "http://localhost:8000/university-info");
    }

    #[test]
    fn build_send_otp_uses_reason_id() {
        let req = client()
            .build_send_otp(OtpReason::Activation, "2022-1-60-002")
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.url, "http://localhost:8000/send-otp?reason_id=2");
        assert_eq!(req.header("authorization"), None);
        assert_eq!(body_json(&req)["student_id"], "2022-1-60-002");

        let req = client()
            .build_send_otp(OtpReason::ForgotPassword, "2022-1-60-002")
            .unwrap();
        assert!(req.url.ends_with("?reason_id=1"));
    }

    #[test]
    fn build_login_has_no_token() {
        let req = client()
            .build_login(&Credentials {
                student_id: "2022-1-60-001".to_string(),
                password: "secret".to_string(),
            })
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8000/login");
        assert_eq!(req.header("authorization"), None);
        let body = body_json(&req);
        assert_eq!(body["student_id"], "2022-1-60-001");
        assert_eq!(body["password"], "secret");
    }

    #[test]
    fn parse_login_success() {
        let response = HttpResponse::new(200, r#"{"access_token":"abc123"}"#);
        let login = client().parse_login(response).unwrap();
        assert_eq!(login.access_token, "abc123");
    }

    #[test]
    fn parse_login_rejected_credentials() {
        let response = HttpResponse::new(401, r#"{"detail":"Invalid credentials"}"#);
        let err = client().parse_login(response).unwrap_err();
        assert_eq!(
            err,
            ApiError::Api {
                message: "Invalid credentials".to_string(),
                status: 401
            }
        );
    }

    #[test]
    fn parse_login_empty_token_is_malformed() {
        let response = HttpResponse::new(200, r#"{"access_token":""}"#);
        let err = client().parse_login(response).unwrap_err();
        assert!(matches!(err, ApiError::Parse { status: 200, .. }));
    }

    #[test]
    fn build_change_password_is_protected_patch() {
        let input = ChangePassword {
            old_password: "secret".to_string(),
            new_password: "n3w-secret".to_string(),
        };
        let req = client().build_change_password(&input, "tok").unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(body_json(&req)["new_password"], "n3w-secret");
    }

    #[test]
    fn build_welcome_is_protected_get() {
        let req = client().build_welcome("tok").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/welcome");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert!(req.body.is_none());
    }

    #[test]
    fn university_info_is_public() {
        let req = client().build_university_info().unwrap();
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn list_semesters_sends_token() {
        let req = client().build_list_semesters("tok").unwrap();
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
    }

    #[test]
    fn build_class_schedule_query() {
        let req = client().build_class_schedule(2025, 3, "tok").unwrap();
        assert_eq!(
            req.url,
            "http://localhost:8000/class-schedule?year=2025&season_id=3"
        );
    }

    #[test]
    fn build_list_chosen_courses_query() {
        let req = client().build_list_chosen_courses(3, 2025, "tok").unwrap();
        assert_eq!(
            req.url,
            "http://localhost:8000/list-chosen-courses?season_id=3&year=2025"
        );
    }

    #[test]
    fn course_toggles_encode_the_course_id() {
        let req = client().build_select_course("CSE 110/L", "tok").unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(
            req.url,
            "http://localhost:8000/select-course?course_id=CSE%20110%2FL"
        );
        assert!(req.body.is_none());

        let req = client().build_deselect_course("CSE207", "tok").unwrap();
        assert_eq!(req.url, "http://localhost:8000/deselect-course?course_id=CSE207");
    }

    #[test]
    fn course_toggle_rejects_empty_id() {
        let err = client().build_select_course(" ", "tok").unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn parse_class_schedule_normalizes_days() {
        let response = HttpResponse::new(
            200,
            r#"{"schedule":[
                {"course_id":"CSE103","section_no":2,"room_no":"AB3-402","day":"Mon",
                 "start_time":"08:30","end_time":"10:00","faculty_short_id":"MSR"},
                {"course_id":"CSE110L","section_no":1,"room_no":"LAB-1","day":"TBA",
                 "start_time":"","end_time":"","faculty_short_id":"TBA"}
            ]}"#,
        );
        let items = client().parse_class_schedule(response).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].day, DayKey::Day(Weekday::Monday));
        assert_eq!(items[1].day, DayKey::Unscheduled);
    }

    #[test]
    fn parse_class_schedule_no_content_is_empty() {
        let response = HttpResponse::new(204, "");
        assert!(client().parse_class_schedule(response).unwrap().is_empty());
    }

    #[test]
    fn parse_welcome_no_content_is_malformed() {
        let response = HttpResponse::new(204, "");
        let err = client().parse_welcome(response).unwrap_err();
        assert_eq!(
            err,
            ApiError::Parse {
                url: "http://localhost:8000/welcome".to_string(),
                status: 204
            }
        );
    }

    #[test]
    fn parse_send_otp_tolerates_empty_body() {
        let response = HttpResponse::new(200, "");
        let ack = client().parse_send_otp(response).unwrap();
        assert_eq!(ack, Acknowledgement::default());
    }

    #[test]
    fn parse_select_course_tolerates_plain_text_body() {
        let ack = client()
            .parse_select_course(HttpResponse::new(200, "OK"))
            .unwrap();
        assert_eq!(ack, Acknowledgement::default());
        let ack = client()
            .parse_deselect_course(HttpResponse::new(200, "OK"))
            .unwrap();
        assert_eq!(ack, Acknowledgement::default());
    }

    #[test]
    fn parse_send_otp_unknown_student() {
        let response = HttpResponse::new(422, r#"{"detail":"unknown student id"}"#);
        let err = client().parse_send_otp(response).unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.to_string(), "unknown student id");
    }

    #[test]
    fn parse_list_courses_bad_json() {
        let response = HttpResponse::new(200, "not json");
        let err = client().parse_list_courses(response).unwrap_err();
        assert_eq!(
            err,
            ApiError::Parse {
                url: "http://localhost:8000/list-courses".to_string(),
                status: 200
            }
        );
    }
}
