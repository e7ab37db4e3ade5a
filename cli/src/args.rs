//! [`Cli`] definitions.

use clap::{Args, Parser, Subcommand};

/// Command-line client for the student portal.
#[derive(Debug, Parser)]
#[command(name = "portal", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = "portal.toml")]
    pub config: String,

    /// Debug logging, overrides the configured level.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Log in and store the session.
    Login(LoginArgs),
    /// Drop the stored session.
    Logout,
    /// Activate a new account with an emailed OTP.
    Activate(OtpArgs),
    /// Set a new password with an emailed OTP.
    ResetPassword(OtpArgs),
    /// Change the password of the logged-in student.
    ChangePassword(ChangePasswordArgs),
    /// Show the logged-in student.
    Profile,
    /// Show the advising window and current semester.
    University,
    /// List semesters with a class schedule.
    Semesters,
    /// Show the weekly class schedule.
    Schedule(ScheduleArgs),
    /// Show eligible and chosen courses for the current semester.
    Advising(AdvisingArgs),
    /// Add a course to the advising selection.
    Select(CourseArgs),
    /// Remove a course from the advising selection.
    Deselect(CourseArgs),
}

#[derive(Clone, Debug, Args)]
pub struct LoginArgs {
    pub student_id: String,
    /// Read from stdin when omitted.
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct OtpArgs {
    pub student_id: String,
    /// New password, read from stdin when omitted.
    #[arg(short, long)]
    pub password: Option<String>,
    /// OTP already received; when omitted a new one is requested and read
    /// from stdin.
    #[arg(long)]
    pub otp: Option<String>,
}

/// Passwords left out are read from stdin.
#[derive(Clone, Debug, Args)]
pub struct ChangePasswordArgs {
    #[arg(long)]
    pub old: Option<String>,
    #[arg(long)]
    pub new: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ScheduleArgs {
    /// Defaults to the current semester.
    #[arg(long, requires = "season")]
    pub year: Option<i32>,
    #[arg(long, requires = "year")]
    pub season: Option<u32>,
}

#[derive(Clone, Debug, Args)]
pub struct AdvisingArgs {
    /// Case-insensitive filter on course id or title.
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct CourseArgs {
    pub course_id: String,
}
