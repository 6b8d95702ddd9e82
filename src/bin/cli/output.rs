//! Output formatting for check results
//!
//! Formats results as human-readable, JSON, JUnit XML, or Markdown

use crate::cli::check::CheckReport;
use cache_lint_core::{AnnotatedElement, Annotation, CacheOperation, Diagnostic};
use serde_json::{json, Value};
use std::fmt::Write;

/// Output format selected on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Junit,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "junit" => Ok(OutputFormat::Junit),
            "markdown" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}. Expected: human, json, junit, markdown", s)),
        }
    }
}

/// Format a check report
pub fn format_report(report: &CheckReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(report),
        OutputFormat::Json => format_json(report),
        OutputFormat::Junit => format_junit(report),
        OutputFormat::Markdown => format_markdown(report),
    }
}

fn location_text(diagnostic: &Diagnostic) -> Option<String> {
    diagnostic.location().map(|loc| loc.to_string())
}

/// Columns `s` takes up inside its `{:?}` rendering, quotes excluded
fn escaped_width(s: &str) -> usize {
    format!("{:?}", s).chars().count() - 2
}

/// Format as human-readable text
fn format_human(report: &CheckReport) -> String {
    let mut output = String::new();

    for diagnostic in &report.diagnostics {
        let _ = writeln!(output, "{}: {}", diagnostic.severity(), diagnostic);
        if let Some(location) = location_text(diagnostic) {
            let _ = writeln!(output, "  --> {}", location);
        }
        if let Some(violation) = diagnostic.violation() {
            let expression = violation.expression.as_str();
            let before = expression.get(..violation.span.start).unwrap_or_default();
            let token = expression.get(violation.span.clone()).unwrap_or_default();
            let _ = writeln!(output, "   | {} = {:?}", violation.attribute, expression);
            let pad = " ".repeat(violation.attribute.name().len() + 4 + escaped_width(before));
            let marks = "^".repeat(escaped_width(token));
            let _ = writeln!(output, "   | {}{}", pad, marks);
        }
        output.push('\n');
    }

    for malformed in &report.malformed {
        let _ = writeln!(output, "error: {}", malformed.message);
        let _ = writeln!(output, "  --> {}\n", malformed.location);
    }

    for skipped in &report.skipped {
        let _ = writeln!(output, "warning: skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    let errors = report.diagnostics.len() + report.malformed.len();
    let _ = writeln!(
        output,
        "check result: {}. {} error(s); {} method(s) checked in {} file(s); {} file(s) skipped",
        if errors > 0 { "FAILED" } else { "ok" },
        errors,
        report.methods_checked,
        report.files_scanned,
        report.skipped.len(),
    );

    output
}

/// Format as JSON
fn format_json(report: &CheckReport) -> String {
    let diagnostics: Vec<Value> = report
        .diagnostics
        .iter()
        .map(|d| {
            let mut value = serde_json::to_value(d).unwrap_or(Value::Null);
            value["message"] = json!(d.to_string());
            value["severity"] = json!(d.severity());
            value
        })
        .collect();

    let malformed: Vec<Value> = report
        .malformed
        .iter()
        .map(|m| json!({ "message": m.message, "location": m.location }))
        .collect();

    let skipped: Vec<Value> = report
        .skipped
        .iter()
        .map(|s| json!({ "file": s.path.display().to_string(), "reason": s.reason }))
        .collect();

    let output = json!({
        "summary": {
            "files_scanned": report.files_scanned,
            "methods_checked": report.methods_checked,
            "errors": report.diagnostics.len() + report.malformed.len(),
            "skipped": report.skipped.len(),
        },
        "diagnostics": diagnostics,
        "malformed": malformed,
        "skipped": skipped,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Format as JUnit XML, one test case per diagnostic
fn format_junit(report: &CheckReport) -> String {
    let failures = report.diagnostics.len() + report.malformed.len();
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites name=\"cache-lint\" tests=\"{}\" failures=\"{}\" time=\"0.0\">",
        failures.max(1),
        failures
    );
    let _ = writeln!(
        xml,
        "  <testsuite name=\"expressions\" tests=\"{}\" failures=\"{}\" time=\"0.0\">",
        failures.max(1),
        failures
    );

    if failures == 0 {
        xml.push_str("    <testcase name=\"all expressions resolve\" classname=\"cache-lint\"/>\n");
    }

    for diagnostic in &report.diagnostics {
        let name = match diagnostic {
            Diagnostic::UnresolvedReference(v) => format!("{} {}", v.method, v.attribute),
            Diagnostic::NotAMethod { element, .. } => element.clone(),
        };
        let classname = location_text(diagnostic).unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            xml,
            "    <testcase name=\"{}\" classname=\"{}\">",
            xml_escape(&name),
            xml_escape(&classname)
        );
        let _ = writeln!(
            xml,
            "      <failure message=\"{}\"/>",
            xml_escape(&diagnostic.to_string())
        );
        xml.push_str("    </testcase>\n");
    }

    for malformed in &report.malformed {
        let _ = writeln!(
            xml,
            "    <testcase name=\"malformed annotation\" classname=\"{}\">",
            xml_escape(&malformed.location.to_string())
        );
        let _ = writeln!(xml, "      <failure message=\"{}\"/>", xml_escape(&malformed.message));
        xml.push_str("    </testcase>\n");
    }

    xml.push_str("  </testsuite>\n");
    xml.push_str("</testsuites>\n");
    xml
}

/// Format as Markdown
fn format_markdown(report: &CheckReport) -> String {
    let mut md = String::new();
    let errors = report.diagnostics.len() + report.malformed.len();

    md.push_str("# Cache Lint Report\n\n");
    md.push_str("## Summary\n\n");
    let _ = writeln!(md, "- **Files scanned:** {}", report.files_scanned);
    let _ = writeln!(md, "- **Methods checked:** {}", report.methods_checked);
    let _ = writeln!(md, "- **Errors:** {}", errors);
    let _ = writeln!(md, "- **Files skipped:** {}\n", report.skipped.len());

    if report.diagnostics.is_empty() {
        return md;
    }

    md.push_str("## Diagnostics\n\n");
    md.push_str("| Location | Identifier | Attribute | Message |\n");
    md.push_str("|----------|------------|-----------|---------|\n");
    for diagnostic in &report.diagnostics {
        let location = location_text(diagnostic).unwrap_or_else(|| "-".to_string());
        let (identifier, attribute) = match diagnostic.violation() {
            Some(v) => (format!("`{}`", v.identifier), v.attribute.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            location,
            identifier,
            attribute,
            diagnostic.to_string().replace('|', "\\|")
        );
    }

    md
}

fn describe_operation(op: &CacheOperation, indent: &str, out: &mut String) {
    let _ = writeln!(out, "{}#[{}]", indent, op.kind());
    for (attr, expr) in op.expressions() {
        if expr.is_empty() {
            continue;
        }
        let ids: Vec<&str> = expr.identifiers().collect();
        let _ = writeln!(out, "{}  {} = {:?} -> [{}]", indent, attr, expr.as_str(), ids.join(", "));
    }
}

/// Format the `list` subcommand output
pub fn format_listing(elements: &[AnnotatedElement], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let items: Vec<Value> = elements
            .iter()
            .map(|element| match element {
                AnnotatedElement::Method(method) => json!({
                    "method": method.signature,
                    "location": method.location,
                    "parameters": method.parameters.iter().collect::<Vec<_>>(),
                    "annotations": method.annotations.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
                }),
                AnnotatedElement::Other { description, kinds, location } => json!({
                    "element": description,
                    "annotations": kinds.iter().map(|k| format!("#[{}]", k)).collect::<Vec<_>>(),
                    "location": location,
                }),
            })
            .collect();
        return serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string());
    }

    let mut out = String::new();
    for element in elements {
        match element {
            AnnotatedElement::Method(method) => {
                let location = method.location.as_ref().map(|l| l.to_string()).unwrap_or_default();
                let _ = writeln!(out, "{}  ({})", method.signature, location);
                for annotation in &method.annotations {
                    match annotation {
                        Annotation::Operation(op) => describe_operation(op, "  ", &mut out),
                        Annotation::Caching(group) => {
                            let _ = writeln!(out, "  #[caching]");
                            for op in group.operations() {
                                describe_operation(op, "    ", &mut out);
                            }
                        }
                    }
                }
            }
            AnnotatedElement::Other { description, location, .. } => {
                let location = location.as_ref().map(|l| l.to_string()).unwrap_or_default();
                let _ = writeln!(out, "{}  ({}) [not a method]", description, location);
            }
        }
    }
    let _ = writeln!(out, "{} annotated element(s)", elements.len());
    out
}
