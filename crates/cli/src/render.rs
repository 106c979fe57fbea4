//! Answer rendering: human-readable text or one-line JSON.

use salespilot_core::answer::{AgentAnswer, ResultSet};
use std::io::Write;

/// Write the answer as a single JSON line.
///
/// The machine-readable object is `{query, applied_filters?, answer_text,
/// results?, tool_calls?}`; the next-step hint is a human-output detail
/// and stays out of it.
pub fn write_json(out: &mut impl Write, answer: &AgentAnswer) -> std::io::Result<()> {
    let mut payload = serde_json::Map::new();
    payload.insert("query".into(), serde_json::Value::String(answer.query.clone()));
    if !answer.applied_filters.is_empty() {
        payload.insert(
            "applied_filters".into(),
            serde_json::to_value(&answer.applied_filters)?,
        );
    }
    payload.insert(
        "answer_text".into(),
        serde_json::Value::String(answer.answer_text.clone()),
    );
    if let Some(results) = &answer.results {
        payload.insert("results".into(), serde_json::to_value(results)?);
    }
    if !answer.tool_calls.is_empty() {
        payload.insert("tool_calls".into(), serde_json::to_value(&answer.tool_calls)?);
    }
    writeln!(out, "{}", serde_json::Value::Object(payload))
}

/// Write the answer in the human block format.
pub fn write_human(out: &mut impl Write, answer: &AgentAnswer) -> std::io::Result<()> {
    let text = answer.answer_text.trim();

    writeln!(out, "Ответ:")?;
    if text.is_empty() {
        writeln!(out, "- (empty response)")?;
    } else {
        writeln!(out, "- {text}")?;
    }

    let filters = &answer.applied_filters;
    if !filters.is_empty() {
        writeln!(out, "\nФильтры:")?;
        if filters.date_from.is_some() || filters.date_to.is_some() {
            writeln!(
                out,
                "- период: {} — {}",
                format_date(filters.date_from.as_deref()),
                format_date(filters.date_to.as_deref())
            )?;
        }
        if let Some(store_id) = filters.store_id.as_deref().filter(|s| !s.trim().is_empty()) {
            writeln!(out, "- store_id: {store_id}")?;
        }
    }

    if let Some(results) = &answer.results {
        writeln!(out, "\nРезультаты:")?;
        write_results(out, results)?;
    }

    let next_step = answer.next_step.trim();
    if !next_step.is_empty() {
        writeln!(out, "\nСледующий шаг:")?;
        writeln!(out, "- {next_step}")?;
    }

    writeln!(out, "\nЗапрос: {}", answer.query)
}

fn write_results(out: &mut impl Write, results: &ResultSet) -> std::io::Result<()> {
    match results {
        ResultSet::Items(items) => {
            if items.is_empty() {
                return writeln!(out, "- (нет результатов)");
            }
            for (i, item) in items.iter().enumerate() {
                write!(out, "{}) {} (id={}", i + 1, item.name, item.item_id)?;
                if item.price != 0.0 {
                    write!(out, ", цена={:.2}", item.price)?;
                }
                if !item.article_number.is_empty() {
                    write!(out, ", артикул={}", item.article_number)?;
                }
                if let Some(barcode) = item.barcodes.first() {
                    write!(out, ", штрихкод={barcode}")?;
                }
                writeln!(out, ")")?;
            }
            Ok(())
        }
        ResultSet::Documents(docs) => {
            if docs.is_empty() {
                return writeln!(out, "- (нет результатов)");
            }
            for (i, doc) in docs.iter().enumerate() {
                write!(
                    out,
                    "{}) doc_id={}, дата={}, сумма={:.2}",
                    i + 1,
                    doc.doc_id,
                    doc.timestamp,
                    doc.total
                )?;
                if !doc.store_id.is_empty() {
                    write!(out, ", store={}", doc.store_id)?;
                }
                if !doc.device_id.is_empty() {
                    write!(out, ", device={}", doc.device_id)?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

/// RFC3339 timestamps collapse to their date part; anything else prints
/// as-is.
fn format_date(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return "-".into();
    };
    match chrono::DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => value.to_string(),
    }
}
