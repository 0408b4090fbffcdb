pub mod classes;
pub mod core;
pub mod dashboard;
pub mod marks;
pub mod reports;
pub mod students;
pub mod subjects;
