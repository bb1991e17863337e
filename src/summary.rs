use crate::knowledge::round2;
use crate::models::{ClassStats, ScoreTable};

/// Class-wide descriptive statistics over student totals.
///
/// The pass line is `pass_fraction` of the batch's attainable total. The rounded
/// average is kept within the extrema.
pub fn summarize(table: &ScoreTable, full_marks_per_question: f64, pass_fraction: f64) -> ClassStats {
    if table.is_empty() {
        return ClassStats::default();
    }

    let totals: Vec<f64> = table.rows().iter().map(|row| row.total).collect();
    let count = totals.len() as f64;
    let sum: f64 = totals.iter().sum();
    let highest = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = totals.iter().copied().fold(f64::INFINITY, f64::min);

    let pass_line = table.max_total(full_marks_per_question) * pass_fraction;
    let passed = totals.iter().filter(|total| **total >= pass_line).count();

    ClassStats {
        total_students: totals.len(),
        average_score: round2(sum / count).max(lowest).min(highest),
        highest_score: highest,
        lowest_score: lowest,
        pass_rate: round2(passed as f64 / count * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreRow;
    use proptest::prelude::*;

    fn table_of_totals(question_count: usize, totals: &[f64]) -> ScoreTable {
        let rows = totals
            .iter()
            .enumerate()
            .map(|(i, total)| {
                ScoreRow::new(format!("S{i}"), format!("学生{i}"), vec![0.0; question_count], Some(*total))
            })
            .collect();
        ScoreTable::new(question_count, rows).unwrap()
    }

    #[test]
    fn empty_batch_is_all_zero() {
        let stats = summarize(&ScoreTable::default(), 3.0, 0.6);
        assert_eq!(stats, ClassStats::default());
    }

    #[test]
    fn computes_extrema_average_and_pass_rate() {
        // 20 questions at 3 marks: pass line 36
        let stats = summarize(&table_of_totals(20, &[60.0, 36.0, 35.5, 10.0]), 3.0, 0.6);
        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.average_score, 35.38);
        assert_eq!(stats.highest_score, 60.0);
        assert_eq!(stats.lowest_score, 10.0);
        assert_eq!(stats.pass_rate, 50.0);
    }

    #[test]
    fn pass_rate_is_rounded() {
        let stats = summarize(&table_of_totals(3, &[9.0, 9.0, 0.0]), 3.0, 0.6);
        assert_eq!(stats.pass_rate, 66.67);
    }

    proptest! {
        #[test]
        fn average_within_extrema_and_rate_bounded(
            totals in prop::collection::vec(0.0f64..=60.0, 1..40)
        ) {
            let stats = summarize(&table_of_totals(20, &totals), 3.0, 0.6);
            prop_assert!(stats.average_score >= stats.lowest_score);
            prop_assert!(stats.average_score <= stats.highest_score);
            prop_assert!((0.0..=100.0).contains(&stats.pass_rate));
        }
    }
}
