use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request, State,
    },
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// OTP accepted for every student.
pub const FIXED_OTP: &str = "123456";

#[derive(Clone, Debug)]
pub struct Student {
    pub student_id: String,
    pub password: Option<String>,
    pub active: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UniversityInfo {
    pub is_advising: bool,
    pub curr_season: String,
    pub curr_season_id: u32,
    pub curr_year: i32,
    pub min_cred_need: u32,
    pub max_cred_need: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Semester {
    pub year: i32,
    pub season_id: u32,
    pub season_name: String,
}

/// Day is kept as the raw string; the seed mixes full names and
/// abbreviations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub course_id: String,
    pub section_no: u32,
    pub room_no: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    pub faculty_short_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub course_title: String,
    pub course_credit: u32,
}

#[derive(Deserialize)]
pub struct SendOtp {
    pub student_id: String,
}

#[derive(Deserialize)]
pub struct OtpVerification {
    pub student_id: String,
    pub password: String,
    pub otp: String,
}

#[derive(Deserialize)]
pub struct Login {
    pub student_id: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePassword {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ReasonQuery {
    pub reason_id: u8,
}

#[derive(Deserialize)]
pub struct SemesterQuery {
    pub year: i32,
    pub season_id: u32,
}

#[derive(Deserialize)]
pub struct CourseQuery {
    pub course_id: String,
}

/// In-memory state of the stub backend.
#[derive(Clone, Debug)]
pub struct Backend {
    pub students: HashMap<String, Student>,
    pub university: UniversityInfo,
    pub semesters: Vec<Semester>,
    pub schedules: HashMap<(i32, u32), Vec<ScheduleItem>>,
    pub courses: Vec<Course>,
    /// Chosen course ids per `(year, season_id)` and student.
    pub chosen: HashMap<(String, i32, u32), Vec<String>>,
    /// Students that requested an OTP and have not used it yet.
    pub pending_otp: HashMap<String, u8>,
    /// Issued bearer token -> student id.
    pub tokens: HashMap<String, String>,
}

pub type Db = Arc<RwLock<Backend>>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown student id")]
    UnknownStudent,
    #[error("invalid reason id")]
    InvalidReason,
    #[error("account is already active")]
    AlreadyActive,
    #[error("account is not activated")]
    NotActivated,
    #[error("invalid or expired otp")]
    InvalidOtp,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authenticated")]
    MissingToken,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("old password is incorrect")]
    WrongPassword,
    #[error("course is not eligible")]
    CourseNotEligible,
    #[error("course is already chosen")]
    AlreadyChosen,
    #[error("course is not chosen")]
    NotChosen,
    #[error("advising is closed")]
    AdvisingClosed,
    /// Body or query string that does not deserialize.
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
}

impl From<JsonRejection> for BackendError {
    fn from(rejection: JsonRejection) -> Self {
        BackendError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for BackendError {
    fn from(rejection: QueryRejection) -> Self {
        BackendError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = match &self {
            BackendError::Rejected { status, .. } => *status,
            BackendError::UnknownStudent | BackendError::InvalidReason => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BackendError::AlreadyActive | BackendError::AlreadyChosen => StatusCode::CONFLICT,
            BackendError::NotActivated | BackendError::AdvisingClosed => StatusCode::FORBIDDEN,
            BackendError::InvalidOtp | BackendError::WrongPassword => StatusCode::BAD_REQUEST,
            BackendError::InvalidCredentials
            | BackendError::MissingToken
            | BackendError::InvalidToken => StatusCode::UNAUTHORIZED,
            BackendError::CourseNotEligible | BackendError::NotChosen => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, BackendError>;

/// [`Json`] with failures reported in the `{"detail": ...}` error shape.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// [`Query`] with failures reported in the `{"detail": ...}` error shape.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

impl Backend {
    /// One active student (`2022-1-60-001` / `secret`), one inactive student
    /// (`2022-1-60-002`), Fall 2025 advising open.
    pub fn seeded() -> Self {
        let mut students = HashMap::new();
        for student in [
            Student {
                student_id: "2022-1-60-001".to_string(),
                password: Some("secret".to_string()),
                active: true,
                first_name: "Nadia".to_string(),
                last_name: "Rahman".to_string(),
                email: "2022-1-60-001@std.example.edu".to_string(),
            },
            Student {
                student_id: "2022-1-60-002".to_string(),
                password: None,
                active: false,
                first_name: "Tanvir".to_string(),
                last_name: "Hossain".to_string(),
                email: "2022-1-60-002@std.example.edu".to_string(),
            },
        ] {
            students.insert(student.student_id.clone(), student);
        }

        let semesters = vec![
            semester(2025, 3, "Fall"),
            semester(2025, 2, "Summer"),
            semester(2025, 1, "Spring"),
            semester(2024, 3, "Fall"),
        ];

        let mut schedules = HashMap::new();
        schedules.insert(
            (2025, 3),
            vec![
                item("CSE103", 2, "AB3-402", "Sat", "08:30", "10:00", "MSR"),
                item("MAT205", 1, "FUB-201", "Monday", "10:10", "11:40", "AKD"),
                item("CSE103", 2, "AB3-402", "Mon", "08:30", "10:00", "MSR"),
                item("ENG102", 5, "AB1-305", "Saturday", "11:50", "13:20", "FZK"),
                item("CSE110L", 1, "LAB-7", "TBA", "TBA", "TBA", "TBA"),
            ],
        );
        schedules.insert(
            (2024, 3),
            vec![
                item("CSE101", 3, "AB2-201", "Sunday", "08:30", "10:00", "RHK"),
                item("PHY109", 1, "FUB-101", "Tue", "13:30", "15:00", "SAA"),
            ],
        );

        let courses = vec![
            course("CSE207", "Data Structures", 3),
            course("CSE246", "Algorithms", 3),
            course("MAT205", "Linear Algebra", 3),
            course("CSE251", "Electronic Circuits", 4),
            course("ENG102", "Composition and Communication", 3),
        ];

        let mut chosen = HashMap::new();
        chosen.insert(
            ("2022-1-60-001".to_string(), 2025, 3),
            vec![
                "CSE207".to_string(),
                "CSE251".to_string(),
                // Retired course that is no longer eligible.
                "CSE999".to_string(),
            ],
        );

        Self {
            students,
            university: UniversityInfo {
                is_advising: true,
                curr_season: "Fall".to_string(),
                curr_season_id: 3,
                curr_year: 2025,
                min_cred_need: 9,
                max_cred_need: 15,
            },
            semesters,
            schedules,
            courses,
            chosen,
            pending_otp: HashMap::new(),
            tokens: HashMap::new(),
        }
    }

    fn student_for(&self, headers: &HeaderMap) -> Result<String, BackendError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(BackendError::MissingToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(BackendError::InvalidToken)?;
        self.tokens
            .get(token)
            .cloned()
            .ok_or(BackendError::InvalidToken)
    }

    fn current_key(&self, student_id: &str) -> (String, i32, u32) {
        (
            student_id.to_string(),
            self.university.curr_year,
            self.university.curr_season_id,
        )
    }
}

fn semester(year: i32, season_id: u32, name: &str) -> Semester {
    Semester {
        year,
        season_id,
        season_name: name.to_string(),
    }
}

fn item(
    course_id: &str,
    section_no: u32,
    room_no: &str,
    day: &str,
    start_time: &str,
    end_time: &str,
    faculty: &str,
) -> ScheduleItem {
    ScheduleItem {
        course_id: course_id.to_string(),
        section_no,
        room_no: room_no.to_string(),
        day: day.to_string(),
        start_time: start_time.to_string(),
        end_time: end_time.to_string(),
        faculty_short_id: faculty.to_string(),
    }
}

fn course(course_id: &str, title: &str, credit: u32) -> Course {
    Course {
        course_id: course_id.to_string(),
        course_title: title.to_string(),
        course_credit: credit,
    }
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

pub fn app() -> Router {
    app_with(Backend::seeded())
}

pub fn app_with(backend: Backend) -> Router {
    let db: Db = Arc::new(RwLock::new(backend));
    Router::new()
        .route("/send-otp", patch(send_otp))
        .route("/activate", post(activate))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/change-password", patch(change_password))
        .route("/welcome", get(welcome))
        .route("/university-info", get(university_info))
        .route("/list-semesters", get(list_semesters))
        .route("/class-schedule", get(class_schedule))
        .route("/list-courses", get(list_courses))
        .route("/list-chosen-courses", get(list_chosen_courses))
        .route("/select-course", patch(select_course))
        .route("/deselect-course", patch(deselect_course))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Backend::seeded()).await
}

pub async fn run_with(listener: TcpListener, backend: Backend) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(backend)).await
}

async fn send_otp(
    State(db): State<Db>,
    ApiQuery(query): ApiQuery<ReasonQuery>,
    ApiJson(input): ApiJson<SendOtp>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    let student = backend
        .students
        .get(&input.student_id)
        .ok_or(BackendError::UnknownStudent)?;
    match query.reason_id {
        1 if !student.active => return Err(BackendError::NotActivated),
        1 => {}
        2 if student.active => return Err(BackendError::AlreadyActive),
        2 => {}
        _ => return Err(BackendError::InvalidReason),
    }
    info!(student_id = %input.student_id, reason_id = query.reason_id, "OTP issued");
    backend.pending_otp.insert(input.student_id, query.reason_id);
    Ok(message("OTP sent successfully"))
}

fn consume_otp(
    backend: &mut Backend,
    input: &OtpVerification,
    reason_id: u8,
) -> Result<(), BackendError> {
    if !backend.students.contains_key(&input.student_id) {
        return Err(BackendError::UnknownStudent);
    }
    if backend.pending_otp.get(&input.student_id) != Some(&reason_id) || input.otp != FIXED_OTP {
        return Err(BackendError::InvalidOtp);
    }
    backend.pending_otp.remove(&input.student_id);
    Ok(())
}

async fn activate(
    State(db): State<Db>,
    ApiJson(input): ApiJson<OtpVerification>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    consume_otp(&mut backend, &input, 2)?;
    if let Some(student) = backend.students.get_mut(&input.student_id) {
        student.password = Some(input.password);
        student.active = true;
    }
    Ok(message("account activated"))
}

async fn forgot_password(
    State(db): State<Db>,
    ApiJson(input): ApiJson<OtpVerification>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    consume_otp(&mut backend, &input, 1)?;
    if let Some(student) = backend.students.get_mut(&input.student_id) {
        student.password = Some(input.password);
    }
    let student_id = input.student_id;
    backend.tokens.retain(|_, owner| *owner != student_id);
    Ok(message("password reset"))
}

async fn login(
    State(db): State<Db>,
    ApiJson(input): ApiJson<Login>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    let student = backend
        .students
        .get(&input.student_id)
        .ok_or(BackendError::InvalidCredentials)?;
    if student.password.as_deref() != Some(input.password.as_str()) {
        return Err(BackendError::InvalidCredentials);
    }
    if !student.active {
        return Err(BackendError::NotActivated);
    }
    let token = Uuid::new_v4().simple().to_string();
    backend.tokens.insert(token.clone(), input.student_id);
    Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
}

async fn change_password(
    State(db): State<Db>,
    headers: HeaderMap,
    ApiJson(input): ApiJson<ChangePassword>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    let student_id = backend.student_for(&headers)?;
    let student = backend
        .students
        .get_mut(&student_id)
        .ok_or(BackendError::InvalidToken)?;
    if student.password.as_deref() != Some(input.old_password.as_str()) {
        return Err(BackendError::WrongPassword);
    }
    student.password = Some(input.new_password);
    backend.tokens.retain(|_, owner| *owner != student_id);
    Ok(message("password changed"))
}

async fn welcome(State(db): State<Db>, headers: HeaderMap) -> ApiResult<serde_json::Value> {
    let backend = db.read().await;
    let student_id = backend.student_for(&headers)?;
    let student = backend
        .students
        .get(&student_id)
        .ok_or(BackendError::InvalidToken)?;
    Ok(Json(json!({
        "student_id": student.student_id,
        "first_name": student.first_name,
        "last_name": student.last_name,
        "email": student.email,
    })))
}

async fn university_info(State(db): State<Db>) -> Json<UniversityInfo> {
    Json(db.read().await.university.clone())
}

async fn list_semesters(State(db): State<Db>, headers: HeaderMap) -> ApiResult<serde_json::Value> {
    let backend = db.read().await;
    backend.student_for(&headers)?;
    Ok(Json(json!({ "semesters": backend.semesters })))
}

async fn class_schedule(
    State(db): State<Db>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<SemesterQuery>,
) -> ApiResult<serde_json::Value> {
    let backend = db.read().await;
    backend.student_for(&headers)?;
    let schedule = backend
        .schedules
        .get(&(query.year, query.season_id))
        .cloned()
        .unwrap_or_default();
    Ok(Json(json!({ "schedule": schedule })))
}

async fn list_courses(State(db): State<Db>, headers: HeaderMap) -> ApiResult<serde_json::Value> {
    let backend = db.read().await;
    backend.student_for(&headers)?;
    Ok(Json(json!({ "courses": backend.courses })))
}

async fn list_chosen_courses(
    State(db): State<Db>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<SemesterQuery>,
) -> ApiResult<serde_json::Value> {
    let backend = db.read().await;
    let student_id = backend.student_for(&headers)?;
    let chosen: Vec<_> = backend
        .chosen
        .get(&(student_id, query.year, query.season_id))
        .map(|ids| ids.iter().map(|id| json!({ "course_id": id })).collect())
        .unwrap_or_default();
    Ok(Json(json!({ "chosen_courses": chosen })))
}

async fn select_course(
    State(db): State<Db>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    let student_id = backend.student_for(&headers)?;
    if !backend.university.is_advising {
        return Err(BackendError::AdvisingClosed);
    }
    if !backend.courses.iter().any(|c| c.course_id == query.course_id) {
        return Err(BackendError::CourseNotEligible);
    }
    let key = backend.current_key(&student_id);
    let chosen = backend.chosen.entry(key).or_default();
    if chosen.contains(&query.course_id) {
        return Err(BackendError::AlreadyChosen);
    }
    chosen.push(query.course_id);
    Ok(message("course selected"))
}

async fn deselect_course(
    State(db): State<Db>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> ApiResult<serde_json::Value> {
    let mut backend = db.write().await;
    let student_id = backend.student_for(&headers)?;
    if !backend.university.is_advising {
        return Err(BackendError::AdvisingClosed);
    }
    let key = backend.current_key(&student_id);
    let chosen = backend.chosen.entry(key).or_default();
    let position = chosen
        .iter()
        .position(|id| *id == query.course_id)
        .ok_or(BackendError::NotChosen)?;
    chosen.remove(position);
    Ok(message("course deselected"))
}
