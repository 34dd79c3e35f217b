//! Terminal output formatting for aggregate results.

use crate::aggregate::AggregateResult;

/// Print mean speedups as a formatted table, one row per test case.
pub fn print_aggregate_table(metrics: &[String], results: &[AggregateResult]) {
    if results.is_empty() {
        println!("  No aggregate results to display.");
        return;
    }

    let max_name = results
        .iter()
        .map(|r| r.test_case.len())
        .max()
        .unwrap_or(9)
        .max(9);
    let widths: Vec<usize> = metrics.iter().map(|m| m.len().max(10)).collect();

    println!();
    let mut header = format!("  {:<width$}", "Test case", width = max_name);
    let mut rule = format!("  {:-<width$}", "", width = max_name);
    for (metric, &w) in metrics.iter().zip(&widths) {
        header.push_str(&format!("  {metric:>w$}"));
        rule.push_str(&format!("  {:->w$}", ""));
    }
    println!("{header}");
    println!("{rule}");

    for result in results {
        let mut line = format!("  {:<width$}", result.test_case, width = max_name);
        for (pct, &w) in result.mean_pct.iter().zip(&widths) {
            line.push_str(&format!("  {:>w$}", format_pct(*pct)));
        }
        println!("{line}");
    }
    println!();
}

/// Format a percentage with a sign, e.g. `+12.50%` or `-3.10%`.
pub fn format_pct(pct: f64) -> String {
    format!("{pct:+.2}%")
}
