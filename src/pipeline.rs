use crate::config::AnalysisConfig;
use crate::knowledge;
use crate::models::{AnalysisReport, KnowledgeMapInput, ScoreTable};
use crate::normalize::{self, WhitelistOutcome};
use crate::risk;
use crate::summary;
use crate::taxonomy::TaxonomyIndex;

/// Run every stage over one batch. Same inputs, same report.
pub fn analyze(
    table: &ScoreTable,
    knowledge_map: &KnowledgeMapInput,
    index: &TaxonomyIndex,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let outcome = match knowledge_map {
        KnowledgeMapInput::Unresolved => {
            tracing::info!("knowledge map unresolved, skipping knowledge point statistics");
            WhitelistOutcome::default()
        }
        KnowledgeMapInput::Resolved(raw) => normalize::whitelist_map(raw, index),
    };

    let class_stats = summary::summarize(table, config.full_marks_per_question, config.pass_fraction);
    let knowledge_points = knowledge::aggregate(
        table,
        &outcome.cleaned,
        config.coverage_question_count,
        config.full_marks_per_question,
    );
    let questions = knowledge::question_stats(table);
    let focus_students =
        risk::with_weak_knowledge_points(risk::select(table, config), &outcome.cleaned);

    tracing::info!(
        "analyzed {} students: {} knowledge points, {} focus students",
        class_stats.total_students,
        knowledge_points.len(),
        focus_students.len()
    );

    AnalysisReport {
        class_stats,
        knowledge_points,
        questions,
        focus_students,
        unknown_labels: outcome.unknown.into_iter().collect(),
    }
}
