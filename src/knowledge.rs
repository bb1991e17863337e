//! Per-question and per-knowledge-point statistics.

use crate::models::{CleanedKnowledgeMap, KnowledgePointStat, MasteryTier, QuestionStat, ScoreTable};

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct QuestionTally {
    average: f64,
    zero_count: usize,
}

fn tally_question(table: &ScoreTable, question: u32) -> QuestionTally {
    let students = table.len();
    if students == 0 {
        return QuestionTally {
            average: 0.0,
            zero_count: 0,
        };
    }

    let mut sum = 0.0;
    let mut zero_count = 0;
    for row in table.rows() {
        let score = row.score_for(question);
        sum += score;
        if score == 0.0 {
            zero_count += 1;
        }
    }

    QuestionTally {
        average: sum / students as f64,
        zero_count,
    }
}

/// Average and zero-score count for every question of the batch.
pub fn question_stats(table: &ScoreTable) -> Vec<QuestionStat> {
    if table.is_empty() {
        return Vec::new();
    }
    (1..=table.question_count() as u32)
        .map(|question| {
            let tally = tally_question(table, question);
            QuestionStat {
                question,
                average: round2(tally.average),
                zero_count: tally.zero_count,
            }
        })
        .collect()
}

fn evidence_for(knowledge_point: &str, questions: &[u32], tallies: &[QuestionTally]) -> String {
    let parts: Vec<String> = questions
        .iter()
        .zip(tallies)
        .filter(|(_, tally)| tally.zero_count > 0)
        .map(|(question, tally)| format!("题{}中{}名学生得0分", question, tally.zero_count))
        .collect();

    if parts.is_empty() {
        format!("{knowledge_point}相关题目表现良好，无学生得0分")
    } else {
        parts.join("，")
    }
}

/// Group questions by knowledge point and score each point.
///
/// A question tagged with two points counts fully toward both. The point's
/// average is the mean of its per-question averages. Questions outside
/// `1..=question_count` are ignored. Output is sorted by descending average,
/// ties keeping first-seen order.
pub fn aggregate(
    table: &ScoreTable,
    cleaned: &CleanedKnowledgeMap,
    coverage_question_count: usize,
    full_marks_per_question: f64,
) -> Vec<KnowledgePointStat> {
    if table.is_empty() || cleaned.is_empty() {
        return Vec::new();
    }

    let question_count = table.question_count() as u32;
    let mut groups: Vec<(String, Vec<u32>)> = Vec::new();
    for (&question, points) in cleaned {
        if question == 0 || question > question_count {
            tracing::debug!("question {question} is outside the score table, skipping");
            continue;
        }
        for point in points {
            match groups.iter_mut().find(|(name, _)| name == point) {
                Some((_, questions)) => questions.push(question),
                None => groups.push((point.clone(), vec![question])),
            }
        }
    }

    let mut stats: Vec<KnowledgePointStat> = groups
        .into_iter()
        .map(|(knowledge_point, questions)| {
            let tallies: Vec<QuestionTally> = questions
                .iter()
                .map(|&question| tally_question(table, question))
                .collect();
            let mean = tallies.iter().map(|t| t.average).sum::<f64>() / tallies.len() as f64;
            let ratio = if full_marks_per_question > 0.0 {
                mean / full_marks_per_question
            } else {
                0.0
            };
            let coverage_percent = if coverage_question_count == 0 {
                0
            } else {
                (questions.len() as f64 / coverage_question_count as f64 * 100.0).round() as u32
            };
            let evidence = evidence_for(&knowledge_point, &questions, &tallies);

            KnowledgePointStat {
                knowledge_point,
                question_numbers: questions,
                coverage_percent,
                average_score: round2(mean),
                mastery_level: MasteryTier::from_ratio(ratio),
                evidence,
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tracing::debug!("aggregated {} knowledge points", stats.len());
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreRow;
    use proptest::prelude::*;

    fn table(rows: &[&[f64]]) -> ScoreTable {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, scores)| ScoreRow::new(format!("S{i}"), format!("学生{i}"), scores.to_vec(), None))
            .collect();
        ScoreTable::from_rows(rows).unwrap()
    }

    fn cleaned(entries: &[(u32, &[&str])]) -> CleanedKnowledgeMap {
        entries
            .iter()
            .map(|(q, points)| (*q, points.iter().map(|p| p.to_string()).collect()))
            .collect()
    }

    #[test]
    fn single_perfect_question_is_excellent() {
        let scores = table(&[&[3.0], &[3.0], &[3.0]]);
        let stats = aggregate(&scores, &cleaned(&[(1, &["小数加减"])]), 20, 3.0);

        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.knowledge_point, "小数加减");
        assert_eq!(stat.question_numbers, vec![1]);
        assert_eq!(stat.coverage_percent, 5);
        assert_eq!(stat.average_score, 3.0);
        assert_eq!(stat.mastery_level, MasteryTier::Excellent);
        assert_eq!(stat.evidence, "小数加减相关题目表现良好，无学生得0分");
    }

    #[test]
    fn shared_question_counts_toward_both_points() {
        let scores = table(&[&[3.0, 0.0, 2.0], &[1.0, 0.0, 2.0]]);
        let map = cleaned(&[(1, &["小数加减", "乘法口诀"]), (2, &["乘法口诀"]), (3, &["小数加减"])]);
        let stats = aggregate(&scores, &map, 20, 3.0);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].knowledge_point, "小数加减");
        assert_eq!(stats[0].question_numbers, vec![1, 3]);
        assert_eq!(stats[0].average_score, 2.0);
        assert_eq!(stats[0].mastery_level, MasteryTier::Fair);
        assert_eq!(stats[0].coverage_percent, 10);

        assert_eq!(stats[1].knowledge_point, "乘法口诀");
        assert_eq!(stats[1].question_numbers, vec![1, 2]);
        assert_eq!(stats[1].average_score, 1.0);
        assert_eq!(stats[1].mastery_level, MasteryTier::NeedsAttention);
        assert_eq!(stats[1].evidence, "题2中2名学生得0分");
    }

    #[test]
    fn all_zero_point_needs_attention() {
        let scores = table(&[&[0.0, 0.0], &[0.0, 0.0]]);
        let stats = aggregate(&scores, &cleaned(&[(1, &["简易方程"]), (2, &["简易方程"])]), 20, 3.0);
        assert_eq!(stats[0].average_score, 0.0);
        assert_eq!(stats[0].mastery_level, MasteryTier::NeedsAttention);
        assert_eq!(stats[0].evidence, "题1中2名学生得0分，题2中2名学生得0分");
    }

    #[test]
    fn average_is_rounded_to_two_places() {
        let scores = table(&[&[1.0], &[1.0], &[0.0]]);
        let stats = aggregate(&scores, &cleaned(&[(1, &["统计图表"])]), 20, 3.0);
        assert_eq!(stats[0].average_score, 0.67);
    }

    #[test]
    fn questions_outside_table_are_ignored() {
        let scores = table(&[&[2.0, 2.0]]);
        let stats = aggregate(&scores, &cleaned(&[(2, &["认识图形"]), (7, &["认识图形"]), (9, &["立体图形"])]), 20, 3.0);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].question_numbers, vec![2]);
    }

    #[test]
    fn empty_inputs_yield_empty_stats() {
        assert!(aggregate(&table(&[]), &cleaned(&[(1, &["认识图形"])]), 20, 3.0).is_empty());
        assert!(aggregate(&table(&[&[1.0]]), &CleanedKnowledgeMap::new(), 20, 3.0).is_empty());
    }

    #[test]
    fn question_stats_cover_every_question() {
        let stats = question_stats(&table(&[&[3.0, 0.0, 1.0], &[0.0, 0.0, 2.0]]));
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0], QuestionStat { question: 1, average: 1.5, zero_count: 1 });
        assert_eq!(stats[1].zero_count, 2);
        assert_eq!(stats[2].average, 1.5);
    }

    proptest! {
        #[test]
        fn output_sorted_and_within_question_range(
            rows in prop::collection::vec(prop::collection::vec(0u8..=3, 6), 1..12),
            tags in prop::collection::btree_map(1u32..10, 0usize..3, 0..9),
        ) {
            const POINTS: &[&str] = &["小数加减", "乘法口诀", "简易方程"];
            let rows: Vec<Vec<f64>> = rows
                .into_iter()
                .map(|r| r.into_iter().map(f64::from).collect())
                .collect();
            let refs: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
            let scores = table(&refs);
            let map: CleanedKnowledgeMap = tags
                .into_iter()
                .map(|(q, p)| (q, vec![POINTS[p].to_string()]))
                .collect();

            let stats = aggregate(&scores, &map, 20, 3.0);
            for pair in stats.windows(2) {
                prop_assert!(pair[0].average_score >= pair[1].average_score);
            }
            for stat in &stats {
                prop_assert!(!stat.question_numbers.is_empty());
                prop_assert!(stat.question_numbers.iter().all(|q| (1..=6).contains(q)));
                prop_assert!(stat.average_score >= 0.0 && stat.average_score <= 3.0);
            }
        }
    }
}
