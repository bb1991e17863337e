use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AnalysisReport, ScoreTable};
use crate::risk::join_numbers;

/// "考试名称 (考试日期)" taken from the first row, if any.
pub fn exam_label(table: &ScoreTable) -> Option<String> {
    let row = table.rows().first()?;
    match (row.exam_name.is_empty(), row.exam_date.is_empty()) {
        (true, true) => None,
        (false, true) => Some(row.exam_name.clone()),
        (true, false) => Some(row.exam_date.clone()),
        (false, false) => Some(format!("{} ({})", row.exam_name, row.exam_date)),
    }
}

pub fn build_report(report: &AnalysisReport, exam: Option<&str>, generated_on: NaiveDate) -> String {
    let mut output = String::new();
    let exam_label = exam.unwrap_or("未命名考试");

    let _ = writeln!(output, "# 学情分析报告");
    let _ = writeln!(output, "考试：{}，生成日期：{}", exam_label, generated_on);
    let _ = writeln!(output);

    let stats = &report.class_stats;
    let _ = writeln!(output, "## 班级整体表现");
    if stats.total_students == 0 {
        let _ = writeln!(output, "本批次没有成绩数据。");
    } else {
        let _ = writeln!(output, "- 学生人数：{}", stats.total_students);
        let _ = writeln!(output, "- 平均分：{:.2}", stats.average_score);
        let _ = writeln!(output, "- 最高分：{}", stats.highest_score);
        let _ = writeln!(output, "- 最低分：{}", stats.lowest_score);
        let _ = writeln!(output, "- 及格率：{:.2}%", stats.pass_rate);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## 知识点掌握情况");
    if report.knowledge_points.is_empty() {
        let _ = writeln!(output, "本批次没有知识点映射。");
    } else {
        for point in &report.knowledge_points {
            let _ = writeln!(
                output,
                "- {}: {} (平均 {:.2} 分, 题{}, 占比 {}%) {}",
                point.knowledge_point,
                point.mastery_level,
                point.average_score,
                join_numbers(&point.question_numbers),
                point.coverage_percent,
                point.evidence
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## 题目得分概览");
    if report.questions.is_empty() {
        let _ = writeln!(output, "本批次没有题目。");
    } else {
        for question in &report.questions {
            let _ = writeln!(
                output,
                "- 题{}: 平均 {:.2} 分, {} 人得0分",
                question.question, question.average, question.zero_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## 重点关注的学生");
    if report.focus_students.is_empty() {
        let _ = writeln!(output, "本批次没有需要重点关注的学生。");
    } else {
        for student in &report.focus_students {
            let _ = writeln!(
                output,
                "- {} ({}) 总分 {}: {}",
                student.name, student.id, student.total, student.reason
            );
            if !student.weak_knowledge_points.is_empty() {
                let _ = writeln!(
                    output,
                    "  - 相关知识点：{}",
                    student.weak_knowledge_points.join("、")
                );
            }
            let _ = writeln!(output, "  - 建议：{}", student.advice);
        }
    }

    if !report.unknown_labels.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## 未匹配的知识点标签");
        let _ = writeln!(output, "{}", report.unknown_labels.join("、"));
    }

    output
}
