use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::final_mark::{complete_in_period, final_mark, mean_or_zero};
use super::model::{AssessmentRecord, Term};

#[derive(Debug, Clone, PartialEq)]
pub struct StudentAverage {
    pub student_id: String,
    pub average_mark: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub student_id: String,
    pub average_mark: Decimal,
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub entries: Vec<RankEntry>,
    pub total_students: usize,
}

impl Ranking {
    /// None for students without complete records.
    pub fn position_of(&self, student_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.student_id == student_id)
            .map(|e| e.position)
    }

    pub fn positions(&self) -> HashMap<&str, usize> {
        self.entries
            .iter()
            .map(|e| (e.student_id.as_str(), e.position))
            .collect()
    }
}

/// Per-student mean final mark over complete records, in first-seen order.
/// Incomplete records are skipped; a student with none does not appear.
pub fn student_averages<'a, I>(records: I) -> Vec<StudentAverage>
where
    I: IntoIterator<Item = &'a AssessmentRecord>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut marks: HashMap<&str, Vec<Decimal>> = HashMap::new();
    for r in records {
        let Some(mark) = final_mark(r) else {
            continue;
        };
        let key = r.student_id.as_str();
        marks
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(mark);
    }

    order
        .into_iter()
        .map(|id| StudentAverage {
            student_id: id.to_string(),
            average_mark: mean_or_zero(marks.remove(id).unwrap_or_default()),
        })
        .collect()
}

/// Sorts descending by average and numbers 1..n. Equal averages keep their
/// input order and still get distinct, sequential positions.
pub fn assign_positions(mut averages: Vec<StudentAverage>) -> Ranking {
    averages.sort_by(|a, b| b.average_mark.cmp(&a.average_mark));
    let entries: Vec<RankEntry> = averages
        .into_iter()
        .enumerate()
        .map(|(i, a)| RankEntry {
            student_id: a.student_id,
            average_mark: a.average_mark,
            position: i + 1,
        })
        .collect();
    Ranking {
        total_students: entries.len(),
        entries,
    }
}

/// Ranks a cohort on one academic year and term.
pub fn rank(cohort: &[AssessmentRecord], academic_year: i64, term: Term) -> Ranking {
    let in_period = complete_in_period(cohort, academic_year, term).map(|(r, _)| r);
    assign_positions(student_averages(in_period))
}
