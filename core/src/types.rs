//! Request and response DTOs for the student portal API.
//!
//! # Design
//! Each endpoint gets a strict schema. List endpoints answer with a small
//! envelope object; a missing list field deserializes as empty. Day values in
//! the class schedule are canonicalized into `DayKey` while deserializing, so
//! nothing downstream ever sees the raw spelling.

use serde::{Deserialize, Serialize};

use crate::schedule::DayKey;

/// Why an OTP is requested; sent as the `reason_id` query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpReason {
    ForgotPassword,
    Activation,
}

impl OtpReason {
    pub fn id(&self) -> u8 {
        match self {
            OtpReason::ForgotPassword => 1,
            OtpReason::Activation => 2,
        }
    }
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub student_id: String,
    pub password: String,
}

/// Successful `POST /login` answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Body of `PATCH /send-otp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOtp {
    pub student_id: String,
}

/// Body shared by `POST /activate` and `POST /forgot-password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub student_id: String,
    pub password: String,
    pub otp: String,
}

/// Body of `PATCH /change-password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub old_password: String,
    pub new_password: String,
}

/// Free-form acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acknowledgement {
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
}

/// `GET /welcome`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentProfile {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// `GET /university-info`: the advising window and the current semester.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniversityInfo {
    pub is_advising: bool,
    pub curr_season: String,
    pub curr_season_id: u32,
    pub curr_year: i32,
    pub min_cred_need: u32,
    pub max_cred_need: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Semester {
    pub year: i32,
    pub season_id: u32,
    pub season_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemesterList {
    #[serde(default)]
    pub semesters: Vec<Semester>,
}

/// One weekly class session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassScheduleItem {
    pub course_id: String,
    pub section_no: u32,
    pub room_no: String,
    pub day: DayKey,
    pub start_time: String,
    pub end_time: String,
    pub faculty_short_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSchedule {
    #[serde(default)]
    pub schedule: Vec<ClassScheduleItem>,
}

/// A course the student may pick during the advising window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibleCourse {
    pub course_id: String,
    pub course_title: String,
    pub course_credit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseList {
    #[serde(default)]
    pub courses: Vec<EligibleCourse>,
}

/// Reference to an eligible course by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChosenCourse {
    pub course_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChosenCourseList {
    #[serde(default)]
    pub chosen_courses: Vec<ChosenCourse>,
}
