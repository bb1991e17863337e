//! Score-table CSV import, template generation and knowledge-map loading.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};

use crate::error::InsightError;
use crate::models::{KnowledgeMapInput, RawKnowledgeMap, ScoreRow, ScoreTable};

/// Identity columns preceding the per-question scores.
pub const FIXED_COLUMNS: [&str; 5] = ["学号", "姓名", "班级", "考试名称", "考试日期"];
pub const TOTAL_COLUMN: &str = "总分";

fn parse_score(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse a score table laid out as `学号,姓名,班级,考试名称,考试日期,题1..题N,总分`.
///
/// Unparseable score cells count as 0. A blank or absent total is derived
/// from the scores. A record missing score cells, or carrying extra ones, is
/// rejected.
pub fn read_scores<R: Read>(reader: R) -> Result<ScoreTable, InsightError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let width = reader.headers()?.len();
    if width < FIXED_COLUMNS.len() + 1 {
        return Err(InsightError::MalformedScoreTable(format!(
            "expected at least {} columns, header has {width}",
            FIXED_COLUMNS.len() + 1
        )));
    }
    let question_count = width - FIXED_COLUMNS.len() - 1;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let student_id = record.get(0).unwrap_or_default().to_string();
        // score cells plus the optional trailing total
        let trailing = record.len().saturating_sub(FIXED_COLUMNS.len());
        if trailing < question_count || trailing > question_count + 1 {
            let found = if trailing < question_count {
                trailing
            } else {
                trailing - 1
            };
            return Err(InsightError::RaggedRow {
                student_id,
                expected: question_count,
                found,
            });
        }

        let scores: Vec<f64> = (0..question_count)
            .map(|i| parse_score(record.get(FIXED_COLUMNS.len() + i)).unwrap_or(0.0))
            .collect();
        let total = if trailing > question_count {
            parse_score(record.get(width - 1))
        } else {
            None
        };

        rows.push(
            ScoreRow::new(student_id, record.get(1).unwrap_or_default(), scores, total).with_exam(
                record.get(2).unwrap_or_default(),
                record.get(3).unwrap_or_default(),
                record.get(4).unwrap_or_default(),
            ),
        );
    }

    tracing::debug!("parsed {} score rows with {question_count} questions", rows.len());
    ScoreTable::new(question_count, rows)
}

pub fn read_scores_file(path: &Path) -> anyhow::Result<ScoreTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open score table {}", path.display()))?;
    read_scores(file).with_context(|| format!("failed to read score table {}", path.display()))
}

/// Blank score template with two sample students.
pub fn template_csv(question_count: usize) -> Result<String, InsightError> {
    let question_count = question_count.max(1);
    let mut buffer = Vec::new();
    let mut writer = csv::Writer::from_writer(&mut buffer);

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend((1..=question_count).map(|q| format!("题{q}")));
    header.push(TOTAL_COLUMN.to_string());
    writer.write_record(&header)?;

    let samples: [(&str, &str, [u32; 3]); 2] = [("A001", "张三", [8, 7, 9]), ("A002", "李四", [5, 6, 4])];
    for (id, name, first_three) in samples {
        let scores: Vec<u32> = (0..question_count)
            .map(|i| first_three.get(i).copied().unwrap_or(0))
            .collect();
        let total: u32 = scores.iter().sum();

        let mut record = vec![
            id.to_string(),
            name.to_string(),
            "初二1班".to_string(),
            "期中考试".to_string(),
            "2025-05-10".to_string(),
        ];
        record.extend(scores.iter().map(ToString::to_string));
        record.push(total.to_string());
        writer.write_record(&record)?;
    }

    writer.flush().map_err(csv::Error::from)?;
    drop(writer);
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn labels_from_value(key: &str, value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(label) => Some(label),
                other => {
                    tracing::warn!("dropping non-string label {other} for question '{key}'");
                    None
                }
            })
            .collect(),
        other => {
            tracing::warn!("labels for question '{key}' are not a list ({other}), treating as empty");
            Vec::new()
        }
    }
}

fn lenient_map(entries: Map<String, Value>) -> RawKnowledgeMap {
    entries
        .into_iter()
        .map(|(key, value)| {
            let labels = labels_from_value(&key, value);
            (key, labels)
        })
        .collect()
}

/// Parse a knowledge map, either a bare `{"1": [...]}` object or the tagged
/// `{"status": ..., "questions": {...}}` form.
///
/// Only invalid JSON is an error. Entries of the wrong shape degrade to empty
/// label lists and a non-object document to an empty map.
pub fn parse_knowledge_map(content: &str) -> Result<KnowledgeMapInput, serde_json::Error> {
    let Value::Object(mut document) = serde_json::from_str::<Value>(content)? else {
        tracing::warn!("knowledge map is not a JSON object, treating as empty");
        return Ok(KnowledgeMapInput::Resolved(RawKnowledgeMap::new()));
    };

    let status = document
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_owned);
    match status.as_deref() {
        Some("unresolved") => Ok(KnowledgeMapInput::Unresolved),
        Some("resolved") => match document.remove("questions") {
            Some(Value::Object(questions)) => Ok(KnowledgeMapInput::Resolved(lenient_map(questions))),
            _ => {
                tracing::warn!("resolved knowledge map has no question object, treating as empty");
                Ok(KnowledgeMapInput::Resolved(RawKnowledgeMap::new()))
            }
        },
        _ => Ok(KnowledgeMapInput::Resolved(lenient_map(document))),
    }
}

/// Load a question→labels JSON file. A missing path means extraction has not run yet.
pub fn read_knowledge_map(path: Option<&Path>) -> anyhow::Result<KnowledgeMapInput> {
    let Some(path) = path else {
        return Ok(KnowledgeMapInput::Unresolved);
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read knowledge map {}", path.display()))?;
    parse_knowledge_map(&content)
        .with_context(|| format!("failed to parse knowledge map {}", path.display()))
}
