//! Subcommand handlers and plain-text rendering.

use std::io::{self, BufRead, Write};

use anyhow::Context as _;
use portal_core::{
    AdvisingView, CreditStatus, DayBucket, OtpFlow, OtpReason, Portal, Semester, StudentProfile,
    TokenStore, Transport, UniversityInfo,
};

use crate::args::{Commands, OtpArgs};

/// Run `command`, reading omitted secrets from `input`.
pub fn dispatch<T: Transport, S: TokenStore>(
    command: Commands,
    portal: &mut Portal<T, S>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Commands::Login(args) => {
            let password = value_or_prompt(args.password, "Password", input)?;
            let session = portal.login(&args.student_id, &password)?;
            writeln!(out, "Logged in as {}", session.student_id)?;
        }
        Commands::Logout => {
            portal.logout()?;
            writeln!(out, "Logged out")?;
        }
        Commands::Activate(args) => {
            let ack = otp_command(portal, OtpReason::Activation, args, input)?;
            writeln!(out, "{}", ack.unwrap_or_else(|| "Account activated".to_string()))?;
        }
        Commands::ResetPassword(args) => {
            let ack = otp_command(portal, OtpReason::ForgotPassword, args, input)?;
            writeln!(out, "{}", ack.unwrap_or_else(|| "Password reset".to_string()))?;
        }
        Commands::ChangePassword(args) => {
            let old = value_or_prompt(args.old, "Current password", input)?;
            let new = value_or_prompt(args.new, "New password", input)?;
            portal.change_password(&old, &new)?;
            writeln!(out, "Password changed, log in again with the new password")?;
        }
        Commands::Profile => write!(out, "{}", render_profile(&portal.profile()?))?,
        Commands::University => write!(out, "{}", render_university(&portal.university_info()?))?,
        Commands::Semesters => write!(out, "{}", render_semesters(&portal.semesters()?))?,
        Commands::Schedule(args) => {
            let (year, season_id) = match (args.year, args.season) {
                (Some(year), Some(season_id)) => (year, season_id),
                _ => {
                    let info = portal.university_info()?;
                    (info.curr_year, info.curr_season_id)
                }
            };
            let buckets = portal.class_schedule(year, season_id)?;
            write!(out, "{}", render_schedule(&buckets))?;
        }
        Commands::Advising(args) => {
            let view = portal.advising()?;
            write!(out, "{}", render_advising(&view, args.search.as_deref()))?;
        }
        Commands::Select(args) => {
            portal.select_course(&args.course_id)?;
            writeln!(out, "Selected {}", args.course_id)?;
        }
        Commands::Deselect(args) => {
            portal.deselect_course(&args.course_id)?;
            writeln!(out, "Deselected {}", args.course_id)?;
        }
    }
    Ok(())
}

/// Request an OTP unless one was given, then submit it with the new password.
fn otp_command<T: Transport, S: TokenStore>(
    portal: &Portal<T, S>,
    reason: OtpReason,
    args: OtpArgs,
    input: &mut impl BufRead,
) -> anyhow::Result<Option<String>> {
    let password = value_or_prompt(args.password, "New password", input)?;
    let ack = match args.otp {
        Some(otp) => match reason {
            OtpReason::Activation => portal.activate(&args.student_id, &password, &otp)?,
            OtpReason::ForgotPassword => portal.reset_password(&args.student_id, &password, &otp)?,
        },
        None => {
            let mut flow = OtpFlow::new(reason);
            flow.request(portal, &args.student_id)?;
            let otp = prompt("OTP sent to the student email, enter it", input)?;
            flow.complete(portal, &args.student_id, &password, otp.trim())?
        }
    };
    Ok(ack.message)
}

/// `value` if given on the command line, else one line from `input`.
fn value_or_prompt(
    value: Option<String>,
    label: &str,
    input: &mut impl BufRead,
) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label, input),
    }
}

fn prompt(label: &str, input: &mut impl BufRead) -> anyhow::Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .with_context(|| format!("failed to read {} from stdin", label.to_lowercase()))?;
    if read == 0 {
        anyhow::bail!("no {} given on stdin", label.to_lowercase());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub fn render_profile(profile: &StudentProfile) -> String {
    format!(
        "{} {}\n{}\n{}\n",
        profile.first_name, profile.last_name, profile.student_id, profile.email
    )
}

pub fn render_university(info: &UniversityInfo) -> String {
    let advising = if info.is_advising { "open" } else { "closed" };
    format!(
        "Semester: {} {} (season {})\nAdvising: {advising}\nCredits: {}-{}\n",
        info.curr_season, info.curr_year, info.curr_season_id, info.min_cred_need, info.max_cred_need
    )
}

pub fn render_semesters(semesters: &[Semester]) -> String {
    semesters
        .iter()
        .map(|s| format!("{} {} (season {})\n", s.season_name, s.year, s.season_id))
        .collect()
}

pub fn render_schedule(buckets: &[DayBucket]) -> String {
    if buckets.is_empty() {
        return "No classes\n".to_string();
    }
    let mut text = String::new();
    for bucket in buckets {
        text.push_str(bucket.day.label());
        text.push('\n');
        for s in &bucket.sessions {
            text.push_str(&format!(
                "  {:<8} sec {:<3} {:<8} {}-{} {}\n",
                s.course_id, s.section_no, s.room_no, s.start_time, s.end_time, s.faculty_short_id
            ));
        }
    }
    text
}

pub fn render_advising(view: &AdvisingView, search: Option<&str>) -> String {
    let info = &view.university;
    if !view.is_open() {
        return format!(
            "Advising is closed for {} {}\n",
            info.curr_season, info.curr_year
        );
    }

    let mut text = format!("Advising for {} {}\n", info.curr_season, info.curr_year);
    for course in view.search(search).iter() {
        let mark = if view.is_chosen(&course.course_id) { 'x' } else { ' ' };
        text.push_str(&format!(
            "[{mark}] {:<8} {} ({} cr)\n",
            course.course_id, course.course_title, course.course_credit
        ));
    }

    let status = match view.credit_status() {
        CreditStatus::Below => "below minimum",
        CreditStatus::WithinRange => "ok",
        CreditStatus::Above => "above maximum",
    };
    text.push_str(&format!(
        "Chosen: {} credits ({}-{}, {status})\n",
        view.total_credits(),
        info.min_cred_need,
        info.max_cred_need
    ));
    text
}
