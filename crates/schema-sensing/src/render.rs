//! HTML report over a persisted schema store.
//!
//! Every partition is flattened before anything is written, so a
//! structural error never leaves a half-written report behind.

use std::io::Write;

use tracing::debug;

use wirelog_config::ReportConfig;

use crate::errors::SensorResult;
use crate::flatten::{
    Line, LineKind, Presence, ScalarDetail, ScalarDisplay, ScalarLine, flatten_root,
};
use crate::kind::ValueKind;
use crate::node::ValueCount;
use crate::store::PersistedStore;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2em; }
code, .schema { font-family: monospace; white-space: pre; }
.line { margin: 0; }
.line details { display: inline-block; vertical-align: top; }
.line summary { cursor: pointer; }
.stats { margin: 0.3em 0 0.6em 1.5em; padding: 0.4em 0.8em; border-left: 3px solid #ccc; white-space: normal; }
.badge { display: inline-block; padding: 0 0.5em; margin-left: 0.4em; border-radius: 0.8em; font-size: 0.8em; background: #ddd; }
.badge.optional { background: #d9edf7; }
.badge.error { background: #f2dede; color: #a94442; }
.badge.warn { background: #fcf8e3; color: #8a6d3b; }
section { margin-top: 2em; }
"#;

/// Escape text for use inside HTML elements and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    title: String,
    low_sample_thresholds: Vec<u64>,
    /// Longest value list rendered with counts.
    value_limit: usize,
}

struct Section<'a> {
    name: &'a str,
    anchor: String,
    samples: u64,
    lines: Vec<Line>,
}

impl HtmlRenderer {
    pub fn new(config: &ReportConfig, value_limit: usize) -> Self {
        let mut low_sample_thresholds = config.low_sample_thresholds.clone();
        low_sample_thresholds.sort_unstable();
        Self {
            title: config.title.clone(),
            low_sample_thresholds,
            value_limit,
        }
    }

    /// Write the full report for `persisted` to `out`.
    pub fn render<W: Write>(&self, persisted: &PersistedStore, out: &mut W) -> SensorResult<()> {
        let sections = persisted
            .store
            .iter()
            .enumerate()
            .map(|(idx, (name, root))| -> SensorResult<Section<'_>> {
                Ok(Section {
                    name,
                    anchor: anchor_for(idx, name),
                    samples: root.count,
                    lines: flatten_root(root)?,
                })
            })
            .collect::<SensorResult<Vec<_>>>()?;

        self.write_head(out)?;
        self.write_summary(persisted, &sections, out)?;
        for section in &sections {
            self.write_section(section, out)?;
        }
        writeln!(out, "</body>\n</html>")?;

        debug!(sections = sections.len(), "report rendered");
        Ok(())
    }

    /// Convenience wrapper collecting the report into a string.
    pub fn render_to_string(&self, persisted: &PersistedStore) -> SensorResult<String> {
        let mut buf = Vec::new();
        self.render(persisted, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Low-sample label for a bucket, if any.
    pub fn confidence(&self, samples: u64) -> Option<&'static str> {
        let idx = self
            .low_sample_thresholds
            .iter()
            .position(|&limit| samples < limit)?;
        Some(if idx == 0 {
            "very low confidence"
        } else {
            "low confidence"
        })
    }

    fn write_head<W: Write>(&self, out: &mut W) -> SensorResult<()> {
        let title = escape_html(&self.title);
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html>")?;
        writeln!(out, "<head>")?;
        writeln!(out, "<meta charset=\"UTF-8\">")?;
        writeln!(out, "<title>{title}</title>")?;
        writeln!(out, "<style>{STYLE}</style>")?;
        writeln!(out, "</head>")?;
        writeln!(out, "<body>")?;
        writeln!(out, "<h1>{title}</h1>")?;
        Ok(())
    }

    fn write_summary<W: Write>(
        &self,
        persisted: &PersistedStore,
        sections: &[Section<'_>],
        out: &mut W,
    ) -> SensorResult<()> {
        let stats = &persisted.stats;
        writeln!(
            out,
            "<p>Prepared at {} from {} rows ({} merged, {} dropped, {} malformed).</p>",
            persisted.prepared_at.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.rows,
            stats.merged,
            stats.dropped,
            stats.malformed,
        )?;

        writeln!(out, "<nav>\n<ul>")?;
        for section in sections {
            writeln!(
                out,
                "<li><a href=\"#{}\">{}</a>{}</li>",
                section.anchor,
                escape_html(section.name),
                self.section_badges(section.samples),
            )?;
        }
        writeln!(out, "</ul>\n</nav>")?;
        Ok(())
    }

    fn section_badges(&self, samples: u64) -> String {
        let mut badges = badge("", &format!("{samples} samples"));
        if let Some(label) = self.confidence(samples) {
            badges.push_str(&badge("warn", label));
        }
        badges
    }

    fn write_section<W: Write>(&self, section: &Section<'_>, out: &mut W) -> SensorResult<()> {
        writeln!(out, "<section id=\"{}\">", section.anchor)?;
        writeln!(
            out,
            "<h2>{}{}</h2>",
            escape_html(section.name),
            self.section_badges(section.samples),
        )?;
        writeln!(out, "<div class=\"schema\">")?;
        for line in &section.lines {
            self.write_line(line, out)?;
        }
        writeln!(out, "</div>\n</section>")?;
        Ok(())
    }

    fn write_line<W: Write>(&self, line: &Line, out: &mut W) -> SensorResult<()> {
        let indent = "    ".repeat(line.depth);
        if line.is_delimiter() {
            let text = match line.kind {
                LineKind::ObjectOpen => "{",
                LineKind::ObjectClose => "}",
                LineKind::ArrayClose => "]",
                _ => "or",
            };
            writeln!(out, "<div class=\"line\">{indent}{text}</div>")?;
            return Ok(());
        }

        let label = match &line.field {
            Some(name) => format!("\"{}\": ", escape_html(name)),
            None => String::new(),
        };
        let head = match &line.kind {
            LineKind::ObjectOpen => "{".to_string(),
            LineKind::ArrayOpen { .. } => "[".to_string(),
            LineKind::Scalar(scalar) => display_scalar(scalar),
            _ => String::new(),
        };
        let presence = match line.presence() {
            Presence::Always => String::new(),
            Presence::Optional => badge("optional", "optional"),
            Presence::CountError => badge("error", "count error"),
        };
        let mixed = match line.kind {
            LineKind::ObjectOpen | LineKind::ArrayOpen { .. } => mixed_scalars(line)
                .map(|kinds| badge("warn", &format!("also {kinds}")))
                .unwrap_or_default(),
            _ => String::new(),
        };

        writeln!(
            out,
            "<div class=\"line\">{indent}<details><summary>{label}{head}{presence}{mixed}</summary>{}</details></div>",
            self.stats_panel(line),
        )?;
        Ok(())
    }

    fn stats_panel(&self, line: &Line) -> String {
        let mut html = String::from("<div class=\"stats\">");
        html.push_str(&format!(
            "<div>samples: {} of {} ({})</div>",
            line.count,
            line.parent_count,
            percent(line.count, line.parent_count),
        ));

        match &line.kind {
            LineKind::ArrayOpen { leaf_count } => {
                html.push_str(&format!("<div>elements: {leaf_count}</div>"));
            }
            LineKind::Scalar(scalar) => html.push_str(&self.scalar_detail(&scalar.detail)),
            _ => {}
        }

        if !line.types.is_empty() {
            let kinds = line
                .types
                .iter()
                .map(|(kind, n)| format!("{kind}: {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            html.push_str(&format!("<div>types: {}</div>", escape_html(&kinds)));
        }
        html.push_str("</div>");
        html
    }

    fn scalar_detail(&self, detail: &ScalarDetail) -> String {
        match detail {
            ScalarDetail::Values(values) if values.len() > self.value_limit => {
                let sample = values
                    .iter()
                    .take(self.value_limit)
                    .map(|vc| format!("<li><code>{}</code></li>", escape_html(&vc.value.to_string())))
                    .collect::<String>();
                format!("<div>sample values:</div><ul>{sample}</ul>")
            }
            ScalarDetail::Values(values) => value_table(values),
            ScalarDetail::Range { min, max } => {
                format!("<div>range: <code>{min}</code> .. <code>{max}</code></div>")
            }
            ScalarDetail::Charset(chars) => {
                format!("<div>charset: <code>{}</code></div>", escape_html(chars))
            }
            ScalarDetail::Histogram => String::new(),
        }
    }
}

fn value_table(values: &[ValueCount]) -> String {
    if values.is_empty() {
        return String::new();
    }
    let rows = values
        .iter()
        .map(|vc| {
            format!(
                "<tr><td><code>{}</code></td><td>{}</td></tr>",
                escape_html(&vc.value.to_string()),
                vc.count
            )
        })
        .collect::<String>();
    format!("<table><tr><th>value</th><th>count</th></tr>{rows}</table>")
}

fn display_scalar(scalar: &ScalarLine) -> String {
    match &scalar.display {
        ScalarDisplay::Literal(lit) => format!("<code>{}</code>", escape_html(&lit.to_string())),
        ScalarDisplay::Kinds(kinds) if kinds.is_empty() => "<em>no elements</em>".to_string(),
        ScalarDisplay::Kinds(kinds) => kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Non-null scalar kinds seen at a container path, joined for display.
fn mixed_scalars(line: &Line) -> Option<String> {
    let kinds: Vec<&str> = line
        .types
        .keys()
        .filter(|k| !k.is_container() && **k != ValueKind::Null)
        .map(ValueKind::as_str)
        .collect();
    (!kinds.is_empty()).then(|| kinds.join(" | "))
}

fn badge(class: &str, text: &str) -> String {
    if class.is_empty() {
        format!("<span class=\"badge\">{}</span>", escape_html(text))
    } else {
        format!(
            "<span class=\"badge {class}\">{}</span>",
            escape_html(text)
        )
    }
}

fn percent(count: u64, of: u64) -> String {
    if of == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", count as f64 * 100.0 / of as f64)
}

/// Unique fragment id for the `idx`-th partition.
fn anchor_for(idx: usize, name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("p{idx}-{}", slug.trim_matches('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::ingest::IngestStats;
    use crate::store::SchemaStore;
    use serde_json::json;

    fn renderer() -> HtmlRenderer {
        HtmlRenderer::new(&ReportConfig::default(), 10)
    }

    fn persisted(parts: &[(&str, Vec<serde_json::Value>)]) -> PersistedStore {
        let agg = Aggregator::default();
        let mut store = SchemaStore::new();
        for (name, values) in parts {
            for v in values {
                agg.merge(store.partition_mut(name), v).unwrap();
            }
        }
        PersistedStore::new(store, IngestStats::default())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_confidence_badges() {
        let r = renderer();
        assert_eq!(r.confidence(3), Some("very low confidence"));
        assert_eq!(r.confidence(10), Some("low confidence"));
        assert_eq!(r.confidence(99), Some("low confidence"));
        assert_eq!(r.confidence(100), None);
    }

    #[test]
    fn test_anchor_is_unique_and_clean() {
        assert_eq!(anchor_for(0, "CHANNEL_CREATE (private)"), "p0-channel-create--private");
        assert_eq!(anchor_for(3, "op 10 (HELLO)"), "p3-op-10--hello");
    }

    #[test]
    fn test_report_structure() {
        let p = persisted(&[
            ("TYPING_START", vec![json!({"d": {"user_id": "1"}}), json!({"d": {}})]),
            ("op 10 (HELLO)", vec![json!({"op": 10})]),
        ]);
        let html = renderer().render_to_string(&p).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Gateway Message Analysis</title>"));
        assert!(html.contains("<a href=\"#p0-typing-start\">TYPING_START</a>"));
        assert!(html.contains("<section id=\"p1-op-10--hello\">"));
        assert!(html.contains("2 samples"));
        assert!(html.contains("very low confidence"));
        // user_id is present in one of two payloads
        assert!(html.contains(
            "\"user_id\": <code>&quot;1&quot;</code><span class=\"badge optional\">optional</span>"
        ));
        assert!(html.contains("samples: 1 of 2 (50.0%)"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_scalar_summaries() {
        let values = (0..=10)
            .map(|i| json!({"n": i, "s": format!("<{i}>")}))
            .collect();
        let html = renderer()
            .render_to_string(&persisted(&[("X", values)]))
            .unwrap();
        assert!(html.contains("range: <code>0</code> .. <code>10</code>"));
        assert!(html.contains("charset: <code>0123456789&lt;&gt;</code>"));
    }

    #[test]
    fn test_value_list_above_limit_is_unlabeled() {
        let values = (0..5).map(|i| json!({"n": i})).collect();
        let p = persisted(&[("X", values)]);

        let full = HtmlRenderer::new(&ReportConfig::default(), 10)
            .render_to_string(&p)
            .unwrap();
        assert!(full.contains("<th>count</th>"));

        let sampled = HtmlRenderer::new(&ReportConfig::default(), 3)
            .render_to_string(&p)
            .unwrap();
        assert!(sampled.contains("sample values:"));
        assert!(!sampled.contains("<th>count</th>"));
        assert!(!sampled.contains("<li><code>3</code></li>"));
    }

    #[test]
    fn test_element_objects_show_their_stats() {
        let p = persisted(&[(
            "READY",
            vec![json!({"d": {"guilds": [{"id": "1", "unavailable": true}, {"id": "2"}]}})],
        )]);
        let html = renderer().render_to_string(&p).unwrap();

        assert_eq!(
            html.matches("<summary>{<span class=\"badge optional\">optional</span></summary><div class=\"stats\"><div>samples: 1 of 2 (50.0%)</div>")
                .count(),
            2
        );
        assert!(html.contains("<div class=\"line\">            or</div>"));
    }

    #[test]
    fn test_scalar_beside_container_is_flagged() {
        let p = persisted(&[(
            "X",
            vec![json!({"d": {"a": 1}}), json!({"d": "gone"}), json!({"d": null})],
        )]);
        let html = renderer().render_to_string(&p).unwrap();

        assert!(html.contains(
            "\"d\": {<span class=\"badge warn\">also string</span></summary>"
        ));
        assert!(html.contains("types: object: 1, string: 1, null: 1"));

        let clean = persisted(&[("X", vec![json!({"d": {"a": 1}}), json!({"d": null})])]);
        let html = renderer().render_to_string(&clean).unwrap();
        assert!(!html.contains("also "));
    }

    #[test]
    fn test_contradiction_aborts_before_output() {
        let p = persisted(&[("X", vec![json!({"x": {}}), json!({"x": []})])]);
        let mut buf = Vec::new();
        assert!(renderer().render(&p, &mut buf).is_err());
        assert!(buf.is_empty());
    }
}
