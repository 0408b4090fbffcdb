//! Assessment aggregation: final marks, grade banding, class ranking,
//! school statistics and the report shapes built from them.
//!
//! Everything here is pure. Callers hand in a fully materialized snapshot
//! and get plain serializable values back; nothing is cached between calls.

pub mod final_mark;
pub mod grade;
pub mod model;
pub mod ranking;
pub mod reports;
pub mod stats;

pub use final_mark::{completion_percentage, final_mark};
pub use model::{
    AssessmentRecord, ClassInfo, EducationLevel, MarkType, Snapshot, StudentInfo, SubjectInfo,
    Term,
};
pub use reports::ClassPeriod;
