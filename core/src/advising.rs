//! Course advising views derived from the eligible and chosen course sets.
//!
//! Every function here is a pure transformation of a fetched snapshot.
//! Chosen courses are resolved by `course_id`; an id that is not in the
//! eligible set is silently left out.

use std::borrow::Cow;

use serde::Serialize;

use crate::types::{ChosenCourse, EligibleCourse, UniversityInfo};

/// Case-insensitive substring search over course id and title.
///
/// An empty or absent term borrows `eligible` unchanged. Matches keep the
/// eligible-set order.
pub fn filter_courses<'a>(
    eligible: &'a [EligibleCourse],
    term: Option<&str>,
) -> Cow<'a, [EligibleCourse]> {
    let term = match term {
        Some(term) if !term.is_empty() => term.to_lowercase(),
        _ => return Cow::Borrowed(eligible),
    };

    Cow::Owned(
        eligible
            .iter()
            .filter(|course| {
                course.course_id.to_lowercase().contains(&term)
                    || course.course_title.to_lowercase().contains(&term)
            })
            .cloned()
            .collect(),
    )
}

/// Look up each chosen course in `eligible`, in chosen order.
pub fn resolve_chosen<'a>(
    chosen: &[ChosenCourse],
    eligible: &'a [EligibleCourse],
) -> Vec<&'a EligibleCourse> {
    chosen
        .iter()
        .filter_map(|c| eligible.iter().find(|e| e.course_id == c.course_id))
        .collect()
}

/// Total credits of the chosen courses; unknown ids count as zero.
pub fn sum_credits(chosen: &[ChosenCourse], eligible: &[EligibleCourse]) -> u32 {
    resolve_chosen(chosen, eligible)
        .iter()
        .fold(0u32, |total, course| total.saturating_add(course.course_credit))
}

/// Where a credit total sits relative to the required window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreditStatus {
    Below,
    WithinRange,
    Above,
}

impl CreditStatus {
    pub fn evaluate(total: u32, min: u32, max: u32) -> Self {
        if total < min {
            CreditStatus::Below
        } else if total > max {
            CreditStatus::Above
        } else {
            CreditStatus::WithinRange
        }
    }
}

/// Snapshot of one advising session.
///
/// When advising is closed the course sets are not fetched and stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisingView {
    pub university: UniversityInfo,
    pub eligible: Vec<EligibleCourse>,
    pub chosen: Vec<ChosenCourse>,
}

impl AdvisingView {
    pub fn is_open(&self) -> bool {
        self.university.is_advising
    }

    pub fn chosen_details(&self) -> Vec<&EligibleCourse> {
        resolve_chosen(&self.chosen, &self.eligible)
    }

    pub fn total_credits(&self) -> u32 {
        sum_credits(&self.chosen, &self.eligible)
    }

    pub fn credit_status(&self) -> CreditStatus {
        CreditStatus::evaluate(
            self.total_credits(),
            self.university.min_cred_need,
            self.university.max_cred_need,
        )
    }

    pub fn search(&self, term: Option<&str>) -> Cow<'_, [EligibleCourse]> {
        filter_courses(&self.eligible, term)
    }

    pub fn is_chosen(&self, course_id: &str) -> bool {
        self.chosen.iter().any(|c| c.course_id == course_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, title: &str, credit: u32) -> EligibleCourse {
        EligibleCourse {
            course_id: id.to_string(),
            course_title: title.to_string(),
            course_credit: credit,
        }
    }

    fn chosen(id: &str) -> ChosenCourse {
        ChosenCourse {
            course_id: id.to_string(),
        }
    }

    fn eligible() -> Vec<EligibleCourse> {
        vec![
            course("CS101", "Structured Programming", 3),
            course("MAT205", "Linear Algebra", 3),
            course("CSE251", "Electronic Circuits", 4),
            course("ENG102", "Composition and Communication", 3),
        ]
    }

    #[test]
    fn empty_term_returns_the_same_slice() {
        let courses = eligible();
        for term in [None, Some("")] {
            let result = filter_courses(&courses, term);
            assert!(matches!(result, Cow::Borrowed(_)));
            assert!(std::ptr::eq(&*result, courses.as_slice()));
        }
    }

    #[test]
    fn filter_is_case_insensitive_on_id() {
        let courses = eligible();
        let result = filter_courses(&courses, Some("cs"));
        let ids: Vec<&str> = result.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["CS101", "CSE251"]);
    }

    #[test]
    fn filter_matches_title_and_keeps_order() {
        let courses = eligible();
        let result = filter_courses(&courses, Some("AL"));
        let ids: Vec<&str> = result.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["MAT205"]);

        let result = filter_courses(&courses, Some("E"));
        assert_eq!(result.len(), 4);
        assert_eq!(result[0].course_id, "CS101");
        assert_eq!(result[3].course_id, "ENG102");
    }

    #[test]
    fn filter_without_match_is_empty() {
        let courses = eligible();
        assert!(filter_courses(&courses, Some("biology")).is_empty());
    }

    #[test]
    fn resolve_drops_unknown_courses() {
        let courses = eligible();
        let picks = vec![chosen("ENG102"), chosen("CSE999"), chosen("CS101")];
        let resolved = resolve_chosen(&picks, &courses);
        let ids: Vec<&str> = resolved.iter().map(|c| c.course_id.as_str()).collect();
        assert_eq!(ids, vec!["ENG102", "CS101"]);
    }

    #[test]
    fn sum_ignores_unknown_courses() {
        let courses = eligible();
        let picks = vec![chosen("CSE251"), chosen("CSE999"), chosen("MAT205")];
        assert_eq!(sum_credits(&picks, &courses), 7);
        assert_eq!(sum_credits(&[], &courses), 0);
        assert_eq!(sum_credits(&picks, &[]), 0);
    }

    #[test]
    fn credit_status_bounds_are_inclusive() {
        assert_eq!(CreditStatus::evaluate(8, 9, 15), CreditStatus::Below);
        assert_eq!(CreditStatus::evaluate(9, 9, 15), CreditStatus::WithinRange);
        assert_eq!(CreditStatus::evaluate(15, 9, 15), CreditStatus::WithinRange);
        assert_eq!(CreditStatus::evaluate(16, 9, 15), CreditStatus::Above);
    }

    #[test]
    fn advising_view_derives_totals() {
        let view = AdvisingView {
            university: UniversityInfo {
                is_advising: true,
                curr_season: "Fall".to_string(),
                curr_season_id: 3,
                curr_year: 2025,
                min_cred_need: 9,
                max_cred_need: 15,
            },
            eligible: eligible(),
            chosen: vec![chosen("CSE251"), chosen("CSE999")],
        };
        assert!(view.is_open());
        assert_eq!(view.total_credits(), 4);
        assert_eq!(view.credit_status(), CreditStatus::Below);
        assert_eq!(view.chosen_details().len(), 1);
        assert!(view.is_chosen("CSE999"));
        assert_eq!(view.search(Some("circuits")).len(), 1);
    }
}
