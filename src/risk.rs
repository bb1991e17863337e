//! Flag at-risk students and classify how they lose marks.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::models::{CleanedKnowledgeMap, FocusStudent, ScoreRow, ScoreTable};

/// How many students the bottom-percentile rule flags (never fewer than one).
pub fn bottom_count(students: usize, bottom_fraction: f64) -> usize {
    if students == 0 {
        return 0;
    }
    // 30 * 0.1 is 3.0000000000000004 in binary floating point
    let raw = (students as f64 * bottom_fraction - 1e-9).ceil();
    (raw.max(1.0) as usize).min(students)
}

/// Students at or below `focus_fraction` of the attainable total.
pub fn below_threshold(table: &ScoreTable, config: &AnalysisConfig) -> BTreeSet<usize> {
    let max_total = table.max_total(config.full_marks_per_question);
    if max_total <= 0.0 {
        return BTreeSet::new();
    }
    let threshold = max_total * config.focus_fraction;
    table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| row.total <= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// The lowest totals in the class; ties keep input order.
pub fn bottom_of_class(table: &ScoreTable, config: &AnalysisConfig) -> BTreeSet<usize> {
    let mut order: Vec<usize> = (0..table.len()).collect();
    let rows = table.rows();
    order.sort_by(|a, b| {
        rows[*a]
            .total
            .partial_cmp(&rows[*b].total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
        .into_iter()
        .take(bottom_count(table.len(), config.bottom_fraction))
        .collect()
}

/// Union of the absolute-threshold and bottom-percentile rules, lowest total first.
pub fn select(table: &ScoreTable, config: &AnalysisConfig) -> Vec<FocusStudent> {
    if table.is_empty() {
        return Vec::new();
    }

    let below = below_threshold(table, config);
    let bottom = bottom_of_class(table, config);
    let flagged: BTreeSet<usize> = below.union(&bottom).copied().collect();
    tracing::debug!(
        "focus selection: {} below threshold, {} in bottom band, {} flagged",
        below.len(),
        bottom.len(),
        flagged.len()
    );

    let mut students: Vec<FocusStudent> = flagged
        .into_iter()
        .map(|i| focus_student(&table.rows()[i], table.question_count(), config))
        .collect();
    students.sort_by(|a, b| a.total.partial_cmp(&b.total).unwrap_or(std::cmp::Ordering::Equal));
    students
}

fn focus_student(row: &ScoreRow, question_count: usize, config: &AnalysisConfig) -> FocusStudent {
    let weak = weak_questions(&row.scores);
    FocusStudent {
        id: row.student_id.clone(),
        name: row.name.clone(),
        total: row.total,
        reason: reason(&weak),
        advice: advice(&weak, question_count, config.first_half_cutoff),
        weak_questions: weak,
        weak_knowledge_points: Vec::new(),
    }
}

/// 1-based numbers of questions scored zero.
pub fn weak_questions(scores: &[f64]) -> Vec<u32> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score == 0.0)
        .map(|(i, _)| i as u32 + 1)
        .collect()
}

pub fn reason(weak: &[u32]) -> String {
    if weak.is_empty() {
        return "表现良好".to_string();
    }
    format!("题{}得0分，共{}道题失分", join_numbers(weak), weak.len())
}

/// Maximal runs of two or more consecutive question numbers.
pub fn consecutive_groups(questions: &[u32]) -> Vec<Vec<u32>> {
    let mut sorted = questions.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut groups = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    for q in sorted {
        if current.last().is_some_and(|last| q != last + 1) {
            if current.len() >= 2 {
                groups.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current.push(q);
    }
    if current.len() >= 2 {
        groups.push(current);
    }
    groups
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeaknessClause {
    /// Whole runs missed: likely one topic not learned.
    Consecutive(Vec<Vec<u32>>),
    /// Many misses, none adjacent.
    Scattered,
    FirstHalf { cutoff: u32, count: usize },
    SecondHalf { remaining: usize, count: usize },
    Volume(usize),
}

impl fmt::Display for WeaknessClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaknessClause::Consecutive(groups) => {
                let runs: Vec<String> = groups.iter().map(|g| join_numbers(g)).collect();
                write!(f, "连续失分题目：{}，建议系统学习相关知识点", runs.join("，"))
            }
            WeaknessClause::Scattered => f.write_str("失分题目分散，建议加强基础训练和细心程度"),
            WeaknessClause::FirstHalf { cutoff, count } => {
                write!(f, "前{cutoff}题失分{count}道，建议加强基础计算能力")
            }
            WeaknessClause::SecondHalf { remaining, count } => {
                write!(f, "后{remaining}题失分{count}道，建议加强逻辑推理和综合应用能力")
            }
            WeaknessClause::Volume(count) => match count {
                0..=3 => f.write_str("失分较少，建议重点攻克这几道题，争取满分"),
                4..=6 => f.write_str("失分适中，建议分阶段提升，先攻克基础题"),
                _ => f.write_str("失分较多，建议全面复习，从基础开始系统学习"),
            },
        }
    }
}

/// Every clause that applies to this set of zero-scored questions.
pub fn classify(weak: &[u32], question_count: usize, first_half_cutoff: u32) -> Vec<WeaknessClause> {
    if weak.is_empty() {
        return Vec::new();
    }

    let mut clauses = Vec::new();
    let groups = consecutive_groups(weak);
    let has_runs = !groups.is_empty();
    if has_runs {
        clauses.push(WeaknessClause::Consecutive(groups));
    }
    if weak.len() >= 4 && !has_runs {
        clauses.push(WeaknessClause::Scattered);
    }

    let early = weak.iter().filter(|q| **q <= first_half_cutoff).count();
    let late = weak.len() - early;
    if early > 0 {
        clauses.push(WeaknessClause::FirstHalf {
            cutoff: first_half_cutoff,
            count: early,
        });
    }
    if late > 0 {
        clauses.push(WeaknessClause::SecondHalf {
            remaining: question_count.saturating_sub(first_half_cutoff as usize),
            count: late,
        });
    }

    clauses.push(WeaknessClause::Volume(weak.len()));
    clauses
}

pub fn advice(weak: &[u32], question_count: usize, first_half_cutoff: u32) -> String {
    let clauses = classify(weak, question_count, first_half_cutoff);
    if clauses.is_empty() {
        return "继续保持".to_string();
    }
    clauses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("；")
}

/// Knowledge points behind a student's zero-scored questions, first-seen order.
pub fn weak_knowledge_points(weak: &[u32], cleaned: &CleanedKnowledgeMap) -> Vec<String> {
    let mut points: Vec<String> = Vec::new();
    for question in weak {
        for point in cleaned.get(question).into_iter().flatten() {
            if !points.contains(point) {
                points.push(point.clone());
            }
        }
    }
    points
}

pub fn with_weak_knowledge_points(
    students: Vec<FocusStudent>,
    cleaned: &CleanedKnowledgeMap,
) -> Vec<FocusStudent> {
    students
        .into_iter()
        .map(|student| FocusStudent {
            weak_knowledge_points: weak_knowledge_points(&student.weak_questions, cleaned),
            ..student
        })
        .collect()
}

/// Question numbers joined with "、".
pub(crate) fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("、")
}
