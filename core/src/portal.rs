//! High-level portal operations.
//!
//! # Design
//! `Portal` wires the stateless `PortalClient`, a `Transport` and the
//! `SessionManager`. Every protected call reads the token from the session
//! and routes its failure through `SessionManager::observe`, so a 401/403
//! from any endpoint ends the session the same way.

use tracing::{debug, info};

use crate::advising::AdvisingView;
use crate::client::PortalClient;
use crate::config::PortalConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::schedule::{canonical_week, group_by_day, DayBucket, SemesterOptions, Weekday};
use crate::session::{AuthSession, SessionManager, SessionState, TokenStore};
use crate::transport::Transport;
use crate::types::{
    Acknowledgement, ChangePassword, Credentials, OtpReason, OtpVerification, Semester,
    StudentProfile, UniversityInfo,
};

/// Shortest accepted new password.
pub const MIN_PASSWORD_LEN: usize = 8;

pub struct Portal<T, S> {
    client: PortalClient,
    transport: T,
    session: SessionManager<S>,
    week: [Weekday; 7],
}

impl<T: Transport, S: TokenStore> Portal<T, S> {
    /// Build a portal from `config` and pick up any persisted session.
    pub fn new(config: &PortalConfig, transport: T, store: S) -> Result<Self, ApiError> {
        config.validate()?;
        let mut session = SessionManager::new(store);
        session.restore();
        Ok(Self {
            client: PortalClient::new(&config.api_url),
            transport,
            session,
            week: canonical_week(config.first_day_of_week),
        })
    }

    pub fn session(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn student_id(&self) -> Option<&str> {
        self.session.student_id()
    }

    pub fn week(&self) -> &[Weekday; 7] {
        &self.week
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, url = %request.url, "received response");
        Ok(response)
    }

    /// Run a protected call with the current token, applying the forced
    /// logout policy to its outcome.
    fn protected<R>(
        &mut self,
        build: impl FnOnce(&PortalClient, &str) -> Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&PortalClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let token = self.session.require_token()?;
        let request = build(&self.client, token)?;
        let result = self
            .send(request)
            .and_then(|response| parse(&self.client, response));
        if let Err(err) = &result {
            self.session.observe(err);
        }
        result
    }

    // --- authentication ---

    /// Log in and persist the issued token.
    pub fn login(&mut self, student_id: &str, password: &str) -> Result<AuthSession, ApiError> {
        require_field("student id", student_id)?;
        require_field("password", password)?;

        let request = self.client.build_login(&Credentials {
            student_id: student_id.to_string(),
            password: password.to_string(),
        })?;
        let login = self.client.parse_login(self.send(request)?)?;

        let session = AuthSession {
            token: login.access_token,
            student_id: student_id.to_string(),
        };
        self.session.begin(session.clone())?;
        Ok(session)
    }

    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.session.end()
    }

    pub fn send_otp(&self, student_id: &str, reason: OtpReason) -> Result<Acknowledgement, ApiError> {
        require_field("student id", student_id)?;
        let request = self.client.build_send_otp(reason, student_id)?;
        let ack = self.client.parse_send_otp(self.send(request)?)?;
        info!(%student_id, reason_id = reason.id(), "OTP sent");
        Ok(ack)
    }

    pub fn activate(&self, student_id: &str, password: &str, otp: &str) -> Result<Acknowledgement, ApiError> {
        let input = otp_verification(student_id, password, otp)?;
        let request = self.client.build_activate(&input)?;
        self.client.parse_activate(self.send(request)?)
    }

    pub fn reset_password(
        &self,
        student_id: &str,
        password: &str,
        otp: &str,
    ) -> Result<Acknowledgement, ApiError> {
        let input = otp_verification(student_id, password, otp)?;
        let request = self.client.build_reset_password(&input)?;
        self.client.parse_reset_password(self.send(request)?)
    }

    /// Change the password, then end the session so the student logs in again
    /// with the new one.
    pub fn change_password(&mut self, old_password: &str, new_password: &str) -> Result<Acknowledgement, ApiError> {
        require_field("old password", old_password)?;
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::InvalidArgument(format!(
                "new password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        let input = ChangePassword {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        let ack = self.protected(
            |client, token| client.build_change_password(&input, token),
            |client, response| client.parse_change_password(response),
        )?;
        self.session.end()?;
        Ok(ack)
    }

    // --- student data ---

    pub fn profile(&mut self) -> Result<StudentProfile, ApiError> {
        self.protected(
            |client, token| client.build_welcome(token),
            |client, response| client.parse_welcome(response),
        )
    }

    pub fn university_info(&self) -> Result<UniversityInfo, ApiError> {
        let request = self.client.build_university_info()?;
        self.client.parse_university_info(self.send(request)?)
    }

    pub fn semesters(&mut self) -> Result<Vec<Semester>, ApiError> {
        self.protected(
            |client, token| client.build_list_semesters(token),
            |client, response| client.parse_list_semesters(response),
        )
    }

    pub fn semester_options(&mut self) -> Result<SemesterOptions, ApiError> {
        Ok(SemesterOptions::from_semesters(&self.semesters()?))
    }

    /// Fetch one semester's sessions, grouped by day in the configured week
    /// order.
    pub fn class_schedule(&mut self, year: i32, season_id: u32) -> Result<Vec<DayBucket>, ApiError> {
        let sessions = self.protected(
            |client, token| client.build_class_schedule(year, season_id, token),
            |client, response| client.parse_class_schedule(response),
        )?;
        debug!(year, season_id, sessions = sessions.len(), "fetched class schedule");
        Ok(group_by_day(&sessions, &self.week))
    }

    // --- advising ---

    /// Snapshot of the current advising window. Course sets are only fetched
    /// while advising is open.
    pub fn advising(&mut self) -> Result<AdvisingView, ApiError> {
        let university = self.university_info()?;
        if !university.is_advising {
            return Ok(AdvisingView {
                university,
                eligible: Vec::new(),
                chosen: Vec::new(),
            });
        }

        let eligible = self.protected(
            |client, token| client.build_list_courses(token),
            |client, response| client.parse_list_courses(response),
        )?;
        let (season_id, year) = (university.curr_season_id, university.curr_year);
        let chosen = self.protected(
            |client, token| client.build_list_chosen_courses(season_id, year, token),
            |client, response| client.parse_list_chosen_courses(response),
        )?;

        Ok(AdvisingView {
            university,
            eligible,
            chosen,
        })
    }

    pub fn select_course(&mut self, course_id: &str) -> Result<Acknowledgement, ApiError> {
        self.protected(
            |client, token| client.build_select_course(course_id, token),
            |client, response| client.parse_select_course(response),
        )
    }

    pub fn deselect_course(&mut self, course_id: &str) -> Result<Acknowledgement, ApiError> {
        self.protected(
            |client, token| client.build_deselect_course(course_id, token),
            |client, response| client.parse_deselect_course(response),
        )
    }
}

/// Two-step OTP flow shared by account activation and password reset.
///
/// `sent` only becomes true once the backend accepted the OTP request and
/// is reset by every new attempt.
#[derive(Debug, Clone)]
pub struct OtpFlow {
    reason: OtpReason,
    sent: bool,
}

impl OtpFlow {
    pub fn new(reason: OtpReason) -> Self {
        Self { reason, sent: false }
    }

    pub fn reason(&self) -> OtpReason {
        self.reason
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn request<T: Transport, S: TokenStore>(
        &mut self,
        portal: &Portal<T, S>,
        student_id: &str,
    ) -> Result<Acknowledgement, ApiError> {
        self.sent = false;
        let ack = portal.send_otp(student_id, self.reason)?;
        self.sent = true;
        Ok(ack)
    }

    /// Submit the OTP with the new password.
    pub fn complete<T: Transport, S: TokenStore>(
        &self,
        portal: &Portal<T, S>,
        student_id: &str,
        password: &str,
        otp: &str,
    ) -> Result<Acknowledgement, ApiError> {
        if !self.sent {
            return Err(ApiError::InvalidArgument("request an OTP first".to_string()));
        }
        match self.reason {
            OtpReason::Activation => portal.activate(student_id, password, otp),
            OtpReason::ForgotPassword => portal.reset_password(student_id, password, otp),
        }
    }
}

fn require_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(())
}

fn otp_verification(student_id: &str, password: &str, otp: &str) -> Result<OtpVerification, ApiError> {
    require_field("student id", student_id)?;
    require_field("password", password)?;
    require_field("otp", otp)?;
    Ok(OtpVerification {
        student_id: student_id.to_string(),
        password: password.to_string(),
        otp: otp.to_string(),
    })
}
