use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::final_mark::{final_mark, mean_or_zero};
use super::grade::{grade_from_percent, Grade};
use super::model::{
    AssessmentRecord, ClassRef, EducationLevel, Snapshot, StudentRef, SubjectInfo, SubjectRef,
    Term,
};
use super::ranking::student_averages;

pub const TOP_PERFORMERS_LIMIT: usize = 5;
pub const RECENT_STUDENTS_LIMIT: usize = 5;
pub const RECENT_MARKS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeDistribution {
    #[serde(rename = "A")]
    pub a: usize,
    #[serde(rename = "B")]
    pub b: usize,
    #[serde(rename = "C")]
    pub c: usize,
    #[serde(rename = "D")]
    pub d: usize,
    #[serde(rename = "E")]
    pub e: usize,
}

impl GradeDistribution {
    pub fn add(&mut self, grade: Grade) {
        match grade {
            Grade::A => self.a += 1,
            Grade::B => self.b += 1,
            Grade::C => self.c += 1,
            Grade::D => self.d += 1,
            Grade::E => self.e += 1,
        }
    }

    pub fn count(&self, grade: Grade) -> usize {
        match grade {
            Grade::A => self.a,
            Grade::B => self.b,
            Grade::C => self.c,
            Grade::D => self.d,
            Grade::E => self.e,
        }
    }

    pub fn total(&self) -> usize {
        Grade::ALL.iter().map(|g| self.count(*g)).sum()
    }
}

/// One grade per complete record.
pub fn grade_distribution<'a, I>(records: I) -> GradeDistribution
where
    I: IntoIterator<Item = &'a AssessmentRecord>,
{
    let mut dist = GradeDistribution::default();
    for mark in records.into_iter().filter_map(final_mark) {
        dist.add(grade_from_percent(mark));
    }
    dist
}

/// Flat mean of every complete record's final mark.
pub fn average_performance<'a, I>(records: I) -> Decimal
where
    I: IntoIterator<Item = &'a AssessmentRecord>,
{
    mean_or_zero(records.into_iter().filter_map(final_mark))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub average_mark: Decimal,
    pub grade: Grade,
}

pub fn top_performers(snapshot: &Snapshot, limit: usize) -> Vec<StudentPerformance> {
    let students = snapshot.students_by_id();
    let classes = snapshot.classes_by_id();
    let mut averages = student_averages(&snapshot.records);
    averages.sort_by(|a, b| b.average_mark.cmp(&a.average_mark));

    averages
        .into_iter()
        .filter_map(|avg| {
            let student = students.get(avg.student_id.as_str())?;
            let class_name = classes
                .get(student.class_id.as_str())
                .map(|c| c.name.clone())
                .unwrap_or_default();
            Some(StudentPerformance {
                student_id: avg.student_id,
                student_name: student.full_name.clone(),
                class_name,
                grade: grade_from_percent(avg.average_mark),
                average_mark: avg.average_mark,
            })
        })
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPerformance {
    pub class: ClassRef,
    pub student_count: usize,
    pub average_performance: Decimal,
    pub top_grade: Grade,
}

/// Complete records grouped by class id. Classes are reported by name.
pub fn class_performance(snapshot: &Snapshot) -> Vec<ClassPerformance> {
    let mut by_class: HashMap<&str, (Vec<Decimal>, HashSet<&str>)> = HashMap::new();
    for r in &snapshot.records {
        let Some(mark) = final_mark(r) else {
            continue;
        };
        let entry = by_class.entry(r.class_id.as_str()).or_default();
        entry.0.push(mark);
        entry.1.insert(r.student_id.as_str());
    }

    let mut out: Vec<ClassPerformance> = snapshot
        .classes
        .iter()
        .filter_map(|c| {
            let (marks, students) = by_class.remove(c.id.as_str())?;
            let average = mean_or_zero(marks);
            Some(ClassPerformance {
                class: ClassRef::from(c),
                student_count: students.len(),
                average_performance: average,
                top_grade: grade_from_percent(average),
            })
        })
        .collect();
    out.sort_by(|a, b| a.class.name.cmp(&b.class.name));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_students: usize,
    pub total_classes: usize,
    pub total_subjects: usize,
    pub o_level_students: usize,
    pub a_level_students: usize,
    pub average_performance: Decimal,
    pub students_with_complete_records: usize,
    pub grade_distribution: GradeDistribution,
    pub top_performers: Vec<StudentPerformance>,
    pub class_performances: Vec<ClassPerformance>,
    pub recent_students: Vec<StudentRef>,
}

pub fn dashboard_summary(snapshot: &Snapshot) -> DashboardSummary {
    let level_count = |level: EducationLevel| {
        snapshot
            .students
            .iter()
            .filter(|s| s.level == level)
            .count()
    };
    let students_with_complete_records = snapshot
        .records
        .iter()
        .filter(|r| final_mark(r).is_some())
        .map(|r| r.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    DashboardSummary {
        total_students: snapshot.students.len(),
        total_classes: snapshot.classes.iter().filter(|c| c.is_active).count(),
        total_subjects: snapshot.subjects.iter().filter(|s| s.is_active).count(),
        o_level_students: level_count(EducationLevel::OLevel),
        a_level_students: level_count(EducationLevel::ALevel),
        average_performance: average_performance(&snapshot.records),
        students_with_complete_records,
        grade_distribution: grade_distribution(&snapshot.records),
        top_performers: top_performers(snapshot, TOP_PERFORMERS_LIMIT),
        class_performances: class_performance(snapshot),
        recent_students: snapshot
            .students
            .iter()
            .rev()
            .take(RECENT_STUDENTS_LIMIT)
            .map(StudentRef::from)
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMark {
    pub student: Option<StudentRef>,
    pub academic_year: i64,
    pub term: Term,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    pub final_mark: Option<Decimal>,
    pub grade: Option<Grade>,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistics {
    pub subject: SubjectRef,
    pub level: EducationLevel,
    pub total_students_enrolled: usize,
    pub complete_records: usize,
    pub average_mark: Decimal,
    pub grade_distribution: GradeDistribution,
    pub recent_marks: Vec<RecentMark>,
}

/// The subject's most recently written records, newest first. Equal write
/// times put the later-stored record first.
pub fn recent_marks(snapshot: &Snapshot, subject_id: &str, limit: usize) -> Vec<RecentMark> {
    let students = snapshot.students_by_id();
    let mut latest: Vec<(&AssessmentRecord, &str)> = snapshot
        .records
        .iter()
        .zip(snapshot.modified.iter())
        .filter(|(r, _)| r.subject_id == subject_id)
        .map(|(r, m)| (r, m.as_str()))
        .rev()
        .collect();
    latest.sort_by(|a, b| b.1.cmp(a.1));

    latest
        .into_iter()
        .take(limit)
        .map(|(r, modified)| {
            let mark = final_mark(r);
            RecentMark {
                student: students.get(r.student_id.as_str()).map(|s| StudentRef::from(*s)),
                academic_year: r.academic_year,
                term: r.term,
                bot: r.bot,
                mot: r.mot,
                eot: r.eot,
                final_mark: mark,
                grade: mark.map(grade_from_percent),
                last_modified: modified.to_string(),
            }
        })
        .collect()
}

pub fn subject_statistics(subject: &SubjectInfo, snapshot: &Snapshot) -> SubjectStatistics {
    let for_subject: Vec<&AssessmentRecord> = snapshot
        .records
        .iter()
        .filter(|r| r.subject_id == subject.id)
        .collect();
    let enrolled = for_subject
        .iter()
        .map(|r| r.student_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let marks: Vec<Decimal> = for_subject.iter().filter_map(|r| final_mark(r)).collect();

    SubjectStatistics {
        subject: SubjectRef::from(subject),
        level: subject.level,
        total_students_enrolled: enrolled,
        complete_records: marks.len(),
        average_mark: mean_or_zero(marks),
        grade_distribution: grade_distribution(for_subject.iter().copied()),
        recent_marks: recent_marks(snapshot, &subject.id, RECENT_MARKS_LIMIT),
    }
}
