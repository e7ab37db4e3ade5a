//! Client core for the student portal service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; a `Transport` executes the round-trip in between.
//! On top of that sit the pure schedule and advising aggregations and the
//! authentication session lifecycle.
//!
//! # Design
//! - `PortalClient` is stateless; it holds only `base_url`. Each endpoint is
//!   split into `build_*` and `parse_*`, so the I/O boundary is explicit.
//! - Bearer tokens are passed in by the caller. `SessionManager` owns the
//!   persisted token and `Portal` applies the forced logout policy on every
//!   protected call.
//! - Day names are canonicalized while deserializing the schedule, before
//!   any grouping runs.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod advising;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod portal;
pub mod schedule;
pub mod session;
pub mod transport;
pub mod types;

pub use advising::{filter_courses, resolve_chosen, sum_credits, AdvisingView, CreditStatus};
pub use client::PortalClient;
pub use config::{LogLevel, PortalConfig};
pub use error::ApiError;
pub use http::{build_request, extract_error_message, parse_json, HttpMethod, HttpRequest, HttpResponse};
pub use portal::{OtpFlow, Portal};
pub use schedule::{canonical_week, group_by_day, DayBucket, DayKey, SemesterOptions, Weekday};
pub use session::{
    AuthSession, FileTokenStore, MemoryTokenStore, SessionManager, SessionState, TokenStore,
};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Acknowledgement, ChosenCourse, ClassScheduleItem, EligibleCourse, OtpReason, Semester,
    StudentProfile, UniversityInfo,
};
