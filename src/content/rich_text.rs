//! Structured rich text as delivered by the content API
//!
//! A body is an ordered list of blocks (paragraphs, headings, list items,
//! images, embeds). Inline formatting is expressed as spans over character
//! ranges of a block's text.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A single rich-text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<serde_json::Value>,
}

impl Block {
    /// Create a text block without formatting
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: Some(text.to_string()),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }

    /// Shorthand for a plain paragraph
    pub fn paragraph(text: &str) -> Self {
        Self::new("paragraph", text)
    }

    /// Add an inline span
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Inline formatting over `start..end` (character offsets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Span {
    pub fn new(kind: &str, start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            kind: kind.to_string(),
            data: None,
        }
    }

    /// A hyperlink span pointing at `url`
    pub fn link(start: usize, end: usize, url: &str) -> Self {
        Self {
            start,
            end,
            kind: "hyperlink".to_string(),
            data: Some(serde_json::json!({ "link_type": "Web", "url": url })),
        }
    }
}

/// Plain text of a body: texts of all text-bearing blocks joined by a space
pub fn as_text(blocks: &[Block]) -> String {
    let mut result = String::new();
    for block in blocks {
        let text = block.text();
        if text.is_empty() {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(text);
    }
    result
}

/// Render a body to HTML
pub fn as_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list_tag = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        html.push_str(&render_block(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn render_block(block: &Block) -> String {
    let inner = || render_spans(block.text(), &block.spans);

    match block.kind.as_str() {
        "paragraph" => format!("<p>{}</p>", inner()),
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "image" => {
            let src = block.url.as_deref().unwrap_or("");
            let alt = block.alt.as_deref().unwrap_or("");
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(src),
                html_escape(alt)
            )
        }
        "embed" => render_embed(block),
        kind => match heading_level(kind) {
            Some(level) => format!("<h{level}>{}</h{level}>", inner()),
            None => {
                tracing::debug!("Rendering unknown block type '{}' as paragraph", kind);
                format!("<p>{}</p>", inner())
            }
        },
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    let level: u8 = kind.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn render_embed(block: &Block) -> String {
    let Some(oembed) = block.oembed.as_ref() else {
        return String::new();
    };
    let field = |name: &str| oembed.get(name).and_then(|v| v.as_str()).unwrap_or("");

    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(field("embed_url")),
        html_escape(field("type")),
        html_escape(field("provider_name")),
        field("html")
    )
}

/// Apply spans to a block's text. Spans that cross a sibling's boundary are dropped.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut sorted: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.end <= chars.len())
        .collect();
    // Outer spans first when two start at the same offset
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    render_range(&chars, 0, chars.len(), &sorted)
}

fn render_range(chars: &[char], start: usize, end: usize, spans: &[&Span]) -> String {
    let mut out = String::new();
    let mut pos = start;
    let mut i = 0;

    while i < spans.len() {
        let span = spans[i];
        i += 1;
        if span.start < pos || span.end > end {
            continue;
        }

        out.push_str(&escape_text(&chars[pos..span.start]));

        // Children are the following spans nested inside this one
        let mut j = i;
        while j < spans.len() && spans[j].start < span.end {
            j += 1;
        }
        let inner = render_range(chars, span.start, span.end, &spans[i..j]);
        out.push_str(&wrap_span(span, &inner));

        pos = span.end;
        i = j;
    }

    out.push_str(&escape_text(&chars[pos..end]));
    out
}

fn wrap_span(span: &Span, inner: &str) -> String {
    match span.kind.as_str() {
        "strong" => format!("<strong>{}</strong>", inner),
        "em" => format!("<em>{}</em>", inner),
        "hyperlink" => {
            let data = span.data.as_ref();
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or("");
            let blank = data
                .and_then(|d| d.get("target"))
                .and_then(|t| t.as_str())
                == Some("_blank");
            if blank {
                format!(
                    r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
                    html_escape(url),
                    inner
                )
            } else {
                format!(r#"<a href="{}">{}</a>"#, html_escape(url), inner)
            }
        }
        "label" => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|l| l.as_str())
                .unwrap_or("");
            format!(r#"<span class="{}">{}</span>"#, html_escape(label), inner)
        }
        _ => inner.to_string(),
    }
}

fn escape_text(chars: &[char]) -> String {
    let text: String = chars.iter().collect();
    html_escape(&text).replace('\n', "<br />")
}
