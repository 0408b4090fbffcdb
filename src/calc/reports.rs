use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::final_mark::{completion_percentage, final_mark, mean_or_zero};
use super::grade::{grade_from_percent, grade_from_points, grade_label, Grade};
use super::model::{
    AssessmentRecord, ClassInfo, ClassRef, EducationLevel, MarkType, StudentInfo, StudentRef,
    SubjectInfo, SubjectRef, Term,
};
use super::ranking::{assign_positions, rank, Ranking, StudentAverage};

/// Class-scoped input for every report shape: one class, its students, the
/// subject catalog, and the records of those students.
#[derive(Debug, Clone, Copy)]
pub struct ClassPeriod<'a> {
    pub class: &'a ClassInfo,
    pub students: &'a [StudentInfo],
    pub subjects: &'a [SubjectInfo],
    pub records: &'a [AssessmentRecord],
    pub academic_year: i64,
    pub term: Term,
}

impl<'a> ClassPeriod<'a> {
    /// Ids of the subjects every view averages and ranks over: the active
    /// subjects of the class's level.
    fn ranked_subject_ids(&self) -> HashSet<&'a str> {
        self.subjects
            .iter()
            .filter(|s| s.level == self.class.level && s.is_active)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Records of class members in the selected year and term, limited to the
    /// ranked subjects.
    fn cohort_records(&self) -> Vec<AssessmentRecord> {
        let members: HashSet<&str> = self.students.iter().map(|s| s.id.as_str()).collect();
        let subjects = self.ranked_subject_ids();
        self.records
            .iter()
            .filter(|r| r.in_period(self.academic_year, self.term))
            .filter(|r| members.contains(r.student_id.as_str()))
            .filter(|r| subjects.contains(r.subject_id.as_str()))
            .cloned()
            .collect()
    }

    fn record_index(&self) -> HashMap<(&'a str, &'a str), &'a AssessmentRecord> {
        self.records
            .iter()
            .filter(|r| r.in_period(self.academic_year, self.term))
            .map(|r| ((r.student_id.as_str(), r.subject_id.as_str()), r))
            .collect()
    }

    /// Students ordered by full name. The sort is stable so equal names keep
    /// their storage order.
    fn students_by_name(&self) -> Vec<&'a StudentInfo> {
        let mut out: Vec<&StudentInfo> = self.students.iter().collect();
        out.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        out
    }

    /// Active subjects of the class's level, ordered by name.
    fn sheet_subjects(&self) -> Vec<&'a SubjectInfo> {
        let ranked = self.ranked_subject_ids();
        let mut out: Vec<&SubjectInfo> = self
            .subjects
            .iter()
            .filter(|s| ranked.contains(s.id.as_str()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    fn subject(&self, subject_id: &str) -> Option<&'a SubjectInfo> {
        self.subjects.iter().find(|s| s.id == subject_id)
    }
}

fn level_points(level: EducationLevel, record: &AssessmentRecord) -> Option<Decimal> {
    if level == EducationLevel::OLevel {
        record.points
    } else {
        None
    }
}

// Single-student report.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMarkRow {
    pub subject: SubjectRef,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    pub final_mark: Option<Decimal>,
    pub grade: Option<Grade>,
    pub grade_description: Option<&'static str>,
    pub completion_percentage: u32,
    pub o_level_points: Option<Decimal>,
    pub o_level_grade: Option<Grade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub student: StudentRef,
    pub class: ClassRef,
    pub academic_year: i64,
    pub term: Term,
    pub term_description: &'static str,
    pub subjects: Vec<SubjectMarkRow>,
    pub complete_subjects: usize,
    pub total_marks: Decimal,
    pub average_mark: Decimal,
    pub overall_grade: Grade,
    pub overall_grade_description: &'static str,
    pub class_position: Option<usize>,
    pub total_students: usize,
}

fn build_student_report(
    period: &ClassPeriod<'_>,
    cohort: &[AssessmentRecord],
    ranking: &Ranking,
    student: &StudentInfo,
) -> StudentReport {
    let mut own: Vec<&AssessmentRecord> = cohort
        .iter()
        .filter(|r| r.student_id == student.id)
        .collect();

    let subject_of = |r: &AssessmentRecord| -> SubjectRef {
        period
            .subject(&r.subject_id)
            .map(SubjectRef::from)
            .unwrap_or_else(|| SubjectRef {
                id: r.subject_id.clone(),
                code: String::new(),
                name: String::new(),
            })
    };
    own.sort_by_key(|r| subject_of(*r).name);

    let subjects: Vec<SubjectMarkRow> = own
        .iter()
        .map(|r| {
            let mark = final_mark(r);
            let grade = mark.map(grade_from_percent);
            let points = level_points(student.level, r);
            SubjectMarkRow {
                subject: subject_of(*r),
                bot: r.bot,
                mot: r.mot,
                eot: r.eot,
                final_mark: mark,
                grade,
                grade_description: grade.map(Grade::description),
                completion_percentage: completion_percentage(r),
                o_level_points: points,
                o_level_grade: points.map(grade_from_points),
            }
        })
        .collect();

    let finals: Vec<Decimal> = subjects.iter().filter_map(|row| row.final_mark).collect();
    let average_mark = mean_or_zero(finals.iter().copied());
    let overall_grade = grade_from_percent(average_mark);

    StudentReport {
        student: StudentRef::from(student),
        class: ClassRef::from(period.class),
        academic_year: period.academic_year,
        term: period.term,
        term_description: period.term.description(),
        complete_subjects: finals.len(),
        total_marks: finals.iter().copied().sum(),
        average_mark,
        overall_grade,
        overall_grade_description: overall_grade.description(),
        class_position: ranking.position_of(&student.id),
        total_students: ranking.total_students,
        subjects,
    }
}

/// None when the student is not a member of the class.
pub fn student_report(period: &ClassPeriod<'_>, student_id: &str) -> Option<StudentReport> {
    let student = period.students.iter().find(|s| s.id == student_id)?;
    let cohort = period.cohort_records();
    let ranking = rank(&cohort, period.academic_year, period.term);
    Some(build_student_report(period, &cohort, &ranking, student))
}

/// Report cards for the whole class, ranked once.
pub fn class_report_cards(period: &ClassPeriod<'_>) -> Vec<StudentReport> {
    let cohort = period.cohort_records();
    let ranking = rank(&cohort, period.academic_year, period.term);
    period
        .students_by_name()
        .into_iter()
        .map(|s| build_student_report(period, &cohort, &ranking, s))
        .collect()
}

// Class ranking.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRankingRow {
    pub position: usize,
    pub student: StudentRef,
    pub average_mark: Decimal,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRankingView {
    pub class: ClassRef,
    pub academic_year: i64,
    pub term: Term,
    pub rows: Vec<ClassRankingRow>,
    pub total_students: usize,
}

pub fn class_ranking(period: &ClassPeriod<'_>) -> ClassRankingView {
    let ranking = rank(&period.cohort_records(), period.academic_year, period.term);
    let students: HashMap<&str, &StudentInfo> =
        period.students.iter().map(|s| (s.id.as_str(), s)).collect();
    let rows = ranking
        .entries
        .iter()
        .filter_map(|e| {
            let s = students.get(e.student_id.as_str())?;
            Some(ClassRankingRow {
                position: e.position,
                student: StudentRef::from(*s),
                average_mark: e.average_mark,
                grade: grade_from_percent(e.average_mark),
            })
        })
        .collect();
    ClassRankingView {
        class: ClassRef::from(period.class),
        academic_year: period.academic_year,
        term: period.term,
        rows,
        total_students: ranking.total_students,
    }
}

// Class mark sheet.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSheetCell {
    pub subject_id: String,
    pub has_record: bool,
    pub is_complete: bool,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    /// 0 unless the cell is complete.
    pub final_mark: Decimal,
    pub grade: String,
    pub o_level_points: Option<Decimal>,
    pub o_level_grade: String,
}

impl MarkSheetCell {
    pub fn absent(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            has_record: false,
            is_complete: false,
            bot: None,
            mot: None,
            eot: None,
            final_mark: Decimal::ZERO,
            grade: grade_label(None),
            o_level_points: None,
            o_level_grade: grade_label(None),
        }
    }

    fn from_record(level: EducationLevel, record: &AssessmentRecord) -> Self {
        let mark = final_mark(record);
        let points = level_points(level, record);
        Self {
            subject_id: record.subject_id.clone(),
            has_record: true,
            is_complete: mark.is_some(),
            bot: record.bot,
            mot: record.mot,
            eot: record.eot,
            final_mark: mark.unwrap_or(Decimal::ZERO),
            grade: grade_label(mark.map(grade_from_percent)),
            o_level_points: points,
            o_level_grade: grade_label(points.map(grade_from_points)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSheetRow {
    pub student: StudentRef,
    pub cells: Vec<MarkSheetCell>,
    pub complete_subjects: usize,
    pub overall_average: Decimal,
    pub overall_grade: Grade,
    pub overall_o_level_points: Option<Decimal>,
    pub overall_o_level_grade: String,
    pub position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject: SubjectRef,
    pub average: Decimal,
    pub complete_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMarkSheet {
    pub class: ClassRef,
    pub academic_year: i64,
    pub term: Term,
    pub term_description: &'static str,
    pub subjects: Vec<SubjectRef>,
    pub rows: Vec<MarkSheetRow>,
    pub subject_averages: Vec<SubjectAverage>,
    pub class_average: Decimal,
    pub class_grade: Grade,
    pub total_ranked: usize,
}

pub fn class_mark_sheet(period: &ClassPeriod<'_>) -> ClassMarkSheet {
    let level = period.class.level;
    let subjects = period.sheet_subjects();
    let index = period.record_index();

    let mut rows: Vec<MarkSheetRow> = period
        .students_by_name()
        .into_iter()
        .map(|student| {
            let cells: Vec<MarkSheetCell> = subjects
                .iter()
                .map(|subject| {
                    match index.get(&(student.id.as_str(), subject.id.as_str())) {
                        Some(r) => MarkSheetCell::from_record(level, r),
                        None => MarkSheetCell::absent(&subject.id),
                    }
                })
                .collect();

            let complete: Vec<&MarkSheetCell> = cells.iter().filter(|c| c.is_complete).collect();
            let overall_average = mean_or_zero(complete.iter().map(|c| c.final_mark));
            let point_values: Vec<Decimal> =
                complete.iter().filter_map(|c| c.o_level_points).collect();
            let overall_o_level_points = if point_values.is_empty() {
                None
            } else {
                Some(mean_or_zero(point_values))
            };

            MarkSheetRow {
                student: StudentRef::from(student),
                complete_subjects: complete.len(),
                overall_average,
                overall_grade: grade_from_percent(overall_average),
                overall_o_level_points,
                overall_o_level_grade: grade_label(overall_o_level_points.map(grade_from_points)),
                position: None,
                cells,
            }
        })
        .collect();

    let ranking = assign_positions(
        rows.iter()
            .filter(|r| r.complete_subjects > 0)
            .map(|r| StudentAverage {
                student_id: r.student.id.clone(),
                average_mark: r.overall_average,
            })
            .collect(),
    );
    let positions = ranking.positions();
    for row in &mut rows {
        row.position = positions.get(row.student.id.as_str()).copied();
    }

    let subject_averages: Vec<SubjectAverage> = subjects
        .iter()
        .enumerate()
        .map(|(col, subject)| {
            let finals: Vec<Decimal> = rows
                .iter()
                .map(|r| &r.cells[col])
                .filter(|c| c.is_complete)
                .map(|c| c.final_mark)
                .collect();
            SubjectAverage {
                subject: SubjectRef::from(*subject),
                complete_count: finals.len(),
                average: mean_or_zero(finals),
            }
        })
        .collect();

    let class_average = mean_or_zero(
        rows.iter()
            .filter(|r| r.complete_subjects > 0)
            .map(|r| r.overall_average),
    );

    ClassMarkSheet {
        class: ClassRef::from(period.class),
        academic_year: period.academic_year,
        term: period.term,
        term_description: period.term.description(),
        subjects: subjects.iter().map(|s| SubjectRef::from(*s)).collect(),
        rows,
        subject_averages,
        class_average,
        class_grade: grade_from_percent(class_average),
        total_ranked: ranking.total_students,
    }
}

// Per-mark-type sheet.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsCell {
    pub subject_id: String,
    pub value: Option<Decimal>,
    /// The value as text, or `-` when absent.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsRow {
    pub student: StudentRef,
    pub cells: Vec<SubsCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsMarkSheet {
    pub class: ClassRef,
    pub academic_year: i64,
    pub term: Term,
    pub mark_type: MarkType,
    pub subjects: Vec<SubjectRef>,
    pub rows: Vec<SubsRow>,
}

pub fn subs_mark_sheet(period: &ClassPeriod<'_>, mark_type: MarkType) -> SubsMarkSheet {
    let subjects = period.sheet_subjects();
    let index = period.record_index();

    let rows = period
        .students_by_name()
        .into_iter()
        .map(|student| SubsRow {
            student: StudentRef::from(student),
            cells: subjects
                .iter()
                .map(|subject| {
                    let value = index
                        .get(&(student.id.as_str(), subject.id.as_str()))
                        .and_then(|r| mark_type.select(r));
                    SubsCell {
                        subject_id: subject.id.clone(),
                        value,
                        text: value
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| grade_label(None)),
                    }
                })
                .collect(),
        })
        .collect();

    SubsMarkSheet {
        class: ClassRef::from(period.class),
        academic_year: period.academic_year,
        term: period.term,
        mark_type,
        subjects: subjects.iter().map(|s| SubjectRef::from(*s)).collect(),
        rows,
    }
}

// Mark-entry sheet for one subject.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow {
    pub student: StudentRef,
    pub has_existing_record: bool,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    pub completion_percentage: u32,
    pub final_mark: Option<Decimal>,
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySheet {
    pub class: ClassRef,
    pub subject: SubjectRef,
    pub academic_year: i64,
    pub term: Term,
    pub rows: Vec<EntryRow>,
}

/// None when the subject is not in the catalog.
pub fn entry_sheet(period: &ClassPeriod<'_>, subject_id: &str) -> Option<EntrySheet> {
    let subject = period.subject(subject_id)?;
    let index = period.record_index();

    let rows = period
        .students_by_name()
        .into_iter()
        .map(|student| {
            let record = index.get(&(student.id.as_str(), subject.id.as_str()));
            let mark = record.and_then(|r| final_mark(r));
            EntryRow {
                student: StudentRef::from(student),
                has_existing_record: record.is_some(),
                bot: record.and_then(|r| r.bot),
                mot: record.and_then(|r| r.mot),
                eot: record.and_then(|r| r.eot),
                completion_percentage: record.map(|r| completion_percentage(r)).unwrap_or(0),
                final_mark: mark,
                grade: mark.map(grade_from_percent),
            }
        })
        .collect();

    Some(EntrySheet {
        class: ClassRef::from(period.class),
        subject: SubjectRef::from(subject),
        academic_year: period.academic_year,
        term: period.term,
        rows,
    })
}
