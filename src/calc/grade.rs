use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};
use std::fmt;

/// Shown in mark-sheet cells that carry no grade.
pub const NO_GRADE: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Grade::A => "Exceptional Achievement",
            Grade::B => "Outstanding Performance",
            Grade::C => "Satisfactory Performance",
            Grade::D => "Basic Understanding",
            Grade::E => "Elementary Understanding",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Lower bounds, highest band first.
const PERCENT_BANDS: [(Decimal, Grade); 4] = [
    (dec!(80), Grade::A),
    (dec!(70), Grade::B),
    (dec!(60), Grade::C),
    (dec!(50), Grade::D),
];

const POINT_BANDS: [(Decimal, Grade); 4] = [
    (dec!(2.50), Grade::A),
    (dec!(2.10), Grade::B),
    (dec!(1.60), Grade::C),
    (dec!(1.00), Grade::D),
];

fn band(value: Decimal, bands: &[(Decimal, Grade)]) -> Grade {
    bands
        .iter()
        .find(|(floor, _)| value >= *floor)
        .map(|(_, g)| *g)
        .unwrap_or(Grade::E)
}

pub fn grade_from_percent(mark: Decimal) -> Grade {
    band(mark, &PERCENT_BANDS)
}

/// O-Level grade-point banding. Independent of the percentage scheme.
pub fn grade_from_points(points: Decimal) -> Grade {
    band(points, &POINT_BANDS)
}

/// Letter for an optional grade, or the `-` placeholder.
pub fn grade_label(grade: Option<Grade>) -> String {
    grade
        .map(|g| g.as_str().to_string())
        .unwrap_or_else(|| NO_GRADE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_boundaries_are_inclusive_low() {
        assert_eq!(grade_from_percent(dec!(100)), Grade::A);
        assert_eq!(grade_from_percent(dec!(80.00)), Grade::A);
        assert_eq!(grade_from_percent(dec!(79.99)), Grade::B);
        assert_eq!(grade_from_percent(dec!(70)), Grade::B);
        assert_eq!(grade_from_percent(dec!(60)), Grade::C);
        assert_eq!(grade_from_percent(dec!(50.00)), Grade::D);
        assert_eq!(grade_from_percent(dec!(49.99)), Grade::E);
        assert_eq!(grade_from_percent(Decimal::ZERO), Grade::E);
    }

    #[test]
    fn point_boundaries_are_inclusive_low() {
        assert_eq!(grade_from_points(dec!(2.50)), Grade::A);
        assert_eq!(grade_from_points(dec!(2.49)), Grade::B);
        assert_eq!(grade_from_points(dec!(2.10)), Grade::B);
        assert_eq!(grade_from_points(dec!(1.60)), Grade::C);
        assert_eq!(grade_from_points(dec!(1.00)), Grade::D);
        assert_eq!(grade_from_points(dec!(0.99)), Grade::E);
    }

    #[test]
    fn schemes_are_not_conflated() {
        // 2.5 is an A in points but an E as a percentage.
        assert_eq!(grade_from_points(dec!(2.5)), Grade::A);
        assert_eq!(grade_from_percent(dec!(2.5)), Grade::E);
    }

    #[test]
    fn descriptions_are_fixed() {
        assert_eq!(Grade::A.description(), "Exceptional Achievement");
        assert_eq!(Grade::C.description(), "Satisfactory Performance");
        assert_eq!(Grade::E.description(), "Elementary Understanding");
        assert_eq!(grade_label(None), "-");
        assert_eq!(grade_label(Some(Grade::B)), "B");
    }
}
