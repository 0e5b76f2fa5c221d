//! Rendering a [`ChurnReport`] for humans and machines.

use std::fmt::Write;

use prchurn_core::{ChurnError, ChurnReport, Interval, OutputFormat};

/// Render `report` in `format`.
///
/// # Errors
///
/// Returns [`ChurnError::Serialization`] if JSON encoding fails.
///
/// # Examples
///
/// ```
/// use prchurn_core::{ChurnReport, OutputFormat};
/// use prchurn_review::report::render;
///
/// let report = ChurnReport::new(vec![], vec![], vec![]);
/// let text = render(&report, OutputFormat::Text).unwrap();
/// assert!(text.starts_with("Churn score: 0"));
/// ```
pub fn render(report: &ChurnReport, format: OutputFormat) -> Result<String, ChurnError> {
    match format {
        OutputFormat::Text => Ok(to_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
        OutputFormat::Markdown => Ok(to_markdown(report)),
    }
}

fn join_ranges(ranges: &[Interval]) -> String {
    if ranges.is_empty() {
        return "-".into();
    }
    ranges
        .iter()
        .map(Interval::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_text(report: &ChurnReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Churn score: {}", report.total);

    let hot: Vec<_> = report
        .files
        .iter()
        .filter(|f| f.overlapping_lines > 0)
        .collect();
    if !hot.is_empty() {
        let _ = writeln!(out);
        for file in hot {
            let _ = writeln!(
                out,
                "  {:>5}  {}  (lines {})",
                file.overlapping_lines,
                file.filename,
                join_ranges(&file.overlap)
            );
        }
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped ({}):", report.skipped.len());
        for s in &report.skipped {
            let _ = writeln!(out, "  {}: {}", s.filename, s.reason);
        }
    }
    if !report.excluded.is_empty() {
        let _ = writeln!(out, "\nExcluded: {}", report.excluded.join(", "));
    }
    out
}

fn to_markdown(report: &ChurnReport) -> String {
    let mut out = String::new();
    out.push_str("## Churn risk\n\n");
    let _ = writeln!(
        out,
        "**{}** line(s) this PR rewrites were changed recently on the destination branch.\n",
        report.total
    );

    let hot: Vec<_> = report
        .files
        .iter()
        .filter(|f| f.overlapping_lines > 0)
        .collect();
    if !hot.is_empty() {
        out.push_str("| File | Lines | Ranges |\n|---|---:|---|\n");
        for file in hot {
            let _ = writeln!(
                out,
                "| `{}` | {} | {} |",
                file.filename,
                file.overlapping_lines,
                join_ranges(&file.overlap)
            );
        }
        out.push('\n');
    }

    if !report.skipped.is_empty() {
        out.push_str("<details><summary>Skipped files</summary>\n\n");
        for s in &report.skipped {
            let _ = writeln!(out, "- `{}`: {}", s.filename, s.reason);
        }
        out.push_str("\n</details>\n");
    }
    out
}
