use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::model::{AssessmentRecord, Term};

pub const BOT_WEIGHT: Decimal = dec!(0.1);
pub const MOT_WEIGHT: Decimal = dec!(0.2);
pub const EOT_WEIGHT: Decimal = dec!(0.7);

/// `round(bot*0.1 + mot*0.2 + eot*0.7, 2)`, half away from zero.
pub fn weighted_mark(bot: Decimal, mot: Decimal, eot: Decimal) -> Decimal {
    (bot * BOT_WEIGHT + mot * MOT_WEIGHT + eot * EOT_WEIGHT)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_complete(record: &AssessmentRecord) -> bool {
    record.bot.is_some() && record.mot.is_some() && record.eot.is_some()
}

/// None unless all three sub-scores are present.
pub fn final_mark(record: &AssessmentRecord) -> Option<Decimal> {
    match (record.bot, record.mot, record.eot) {
        (Some(bot), Some(mot), Some(eot)) => Some(weighted_mark(bot, mot, eot)),
        _ => None,
    }
}

/// Integer share of present sub-scores: 0, 33, 66 or 100.
pub fn completion_percentage(record: &AssessmentRecord) -> u32 {
    let present = [record.bot, record.mot, record.eot]
        .iter()
        .filter(|v| v.is_some())
        .count() as u32;
    present * 100 / 3
}

/// Complete records for one period, each paired with its final mark.
pub fn complete_in_period<'a, I>(
    records: I,
    academic_year: i64,
    term: Term,
) -> impl Iterator<Item = (&'a AssessmentRecord, Decimal)>
where
    I: IntoIterator<Item = &'a AssessmentRecord>,
{
    records
        .into_iter()
        .filter(move |r| r.in_period(academic_year, term))
        .filter_map(|r| final_mark(r).map(|m| (r, m)))
}

/// Mean of `values`, 0 for an empty set.
pub fn mean_or_zero<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut count: u64 = 0;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bot: Option<Decimal>, mot: Option<Decimal>, eot: Option<Decimal>) -> AssessmentRecord {
        AssessmentRecord {
            student_id: "s1".into(),
            subject_id: "math".into(),
            class_id: "c1".into(),
            academic_year: 2024,
            term: Term::One,
            bot,
            mot,
            eot,
            points: None,
        }
    }

    #[test]
    fn weights_sum_to_one() {
        assert_eq!(BOT_WEIGHT + MOT_WEIGHT + EOT_WEIGHT, Decimal::ONE);
    }

    #[test]
    fn complete_record_gets_weighted_final() {
        let r = record(Some(dec!(80)), Some(dec!(70)), Some(dec!(60)));
        assert!(is_complete(&r));
        assert_eq!(final_mark(&r), Some(dec!(64.00)));
    }

    #[test]
    fn any_missing_sub_score_leaves_final_undefined() {
        assert_eq!(final_mark(&record(None, Some(dec!(70)), Some(dec!(60)))), None);
        assert_eq!(final_mark(&record(Some(dec!(80)), None, Some(dec!(60)))), None);
        assert_eq!(final_mark(&record(Some(dec!(80)), Some(dec!(70)), None)), None);
        assert!(!is_complete(&record(None, None, None)));
    }

    #[test]
    fn zero_sub_scores_are_present_not_missing() {
        let r = record(Some(dec!(0)), Some(dec!(0)), Some(dec!(0)));
        assert_eq!(final_mark(&r), Some(dec!(0)));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 0.5*0.1 + 0 + 0.05*0.7 = 0.085 -> 0.09
        assert_eq!(weighted_mark(dec!(0.5), dec!(0), dec!(0.05)), dec!(0.09));
        // 33.3*0.1 + 33.3*0.2 + 33.35*0.7 = 33.335 -> 33.34
        assert_eq!(weighted_mark(dec!(33.3), dec!(33.3), dec!(33.35)), dec!(33.34));
    }

    #[test]
    fn completion_percentage_uses_integer_thirds() {
        assert_eq!(completion_percentage(&record(None, None, None)), 0);
        assert_eq!(completion_percentage(&record(Some(dec!(1)), None, None)), 33);
        assert_eq!(completion_percentage(&record(Some(dec!(1)), Some(dec!(1)), None)), 66);
        assert_eq!(
            completion_percentage(&record(Some(dec!(1)), Some(dec!(1)), Some(dec!(1)))),
            100
        );
    }

    #[test]
    fn mean_of_empty_set_is_zero() {
        assert_eq!(mean_or_zero(Vec::new()), Decimal::ZERO);
        assert_eq!(mean_or_zero(vec![dec!(60), dec!(80)]), dec!(70));
    }
}
