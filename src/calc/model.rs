use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "O-Level")]
    OLevel,
    #[serde(rename = "A-Level")]
    ALevel,
}

impl EducationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::OLevel => "O-Level",
            EducationLevel::ALevel => "A-Level",
        }
    }

    /// Accepts the display label as well as the short `O` / `A` forms.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "O-LEVEL" | "OLEVEL" | "O" => Some(EducationLevel::OLevel),
            "A-LEVEL" | "ALEVEL" | "A" => Some(EducationLevel::ALevel),
            _ => None,
        }
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Term {
    One,
    Two,
    Three,
}

impl Term {
    pub fn number(self) -> i64 {
        match self {
            Term::One => 1,
            Term::Two => 2,
            Term::Three => 3,
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Term::One),
            2 => Some(Term::Two),
            3 => Some(Term::Three),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Term::One => "Term 1",
            Term::Two => "Term 2",
            Term::Three => "Term 3",
        }
    }
}

impl TryFrom<i64> for Term {
    type Error = String;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Term::from_number(n).ok_or_else(|| format!("term must be 1, 2 or 3 (got {})", n))
    }
}

impl From<Term> for i64 {
    fn from(t: Term) -> i64 {
        t.number()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkType {
    #[serde(rename = "BOT")]
    Bot,
    #[serde(rename = "MOT")]
    Mot,
    #[serde(rename = "EOT")]
    Eot,
}

impl MarkType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BOT" => Some(MarkType::Bot),
            "MOT" => Some(MarkType::Mot),
            "EOT" => Some(MarkType::Eot),
            _ => None,
        }
    }

    pub fn select(self, record: &AssessmentRecord) -> Option<Decimal> {
        match self {
            MarkType::Bot => record.bot,
            MarkType::Mot => record.mot,
            MarkType::Eot => record.eot,
        }
    }
}

/// One row per (student, subject, academic year, term).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    pub student_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub academic_year: i64,
    pub term: Term,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    /// O-Level grade point supplied by the entry workflow. Never derived here.
    pub points: Option<Decimal>,
}

impl AssessmentRecord {
    pub fn in_period(&self, academic_year: i64, term: Term) -> bool {
        self.academic_year == academic_year && self.term == term
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub id: String,
    pub full_name: String,
    pub student_number: String,
    pub class_id: String,
    pub level: EducationLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: String,
    pub name: String,
    pub level: EducationLevel,
    pub academic_year: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub id: String,
    pub code: String,
    pub name: String,
    pub level: EducationLevel,
    pub is_active: bool,
}

/// Everything the engine reads for one call. Built once by the storage layer;
/// students are kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub classes: Vec<ClassInfo>,
    pub students: Vec<StudentInfo>,
    pub subjects: Vec<SubjectInfo>,
    pub records: Vec<AssessmentRecord>,
    /// Last write time of each record, index-aligned with `records`.
    pub modified: Vec<String>,
}

impl Snapshot {
    pub fn students_by_id(&self) -> HashMap<&str, &StudentInfo> {
        self.students.iter().map(|s| (s.id.as_str(), s)).collect()
    }

    pub fn classes_by_id(&self) -> HashMap<&str, &ClassInfo> {
        self.classes.iter().map(|c| (c.id.as_str(), c)).collect()
    }
}

// Compact references embedded in report shapes.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub id: String,
    pub full_name: String,
    pub student_number: String,
    pub level: EducationLevel,
}

impl From<&StudentInfo> for StudentRef {
    fn from(s: &StudentInfo) -> Self {
        Self {
            id: s.id.clone(),
            full_name: s.full_name.clone(),
            student_number: s.student_number.clone(),
            level: s.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    pub id: String,
    pub name: String,
    pub level: EducationLevel,
}

impl From<&ClassInfo> for ClassRef {
    fn from(c: &ClassInfo) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            level: c.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: String,
    pub code: String,
    pub name: String,
}

impl From<&SubjectInfo> for SubjectRef {
    fn from(s: &SubjectInfo) -> Self {
        Self {
            id: s.id.clone(),
            code: s.code.clone(),
            name: s.name.clone(),
        }
    }
}
