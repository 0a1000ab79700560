//! HTML pages for the browser form.
//!
//! Rendering only; the routes live in the `serve` command.

use crate::rag::VideoAnswer;
use serde::Deserialize;
use std::fmt::Write;

/// Topics offered on the basics page.
pub const TOPICS: [&str; 5] = ["Supernova", "Black Hole", "Neutron Star", "Pulsar", "Quasar"];

/// Column width answers and previews are wrapped at.
pub const WRAP_WIDTH: usize = 85;

/// Characters of each source document shown under an answer.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
form{display:flex;flex-direction:column;gap:.5rem;max-width:30rem}\
pre{white-space:pre-wrap;background:#f6f6f6;padding:.75rem}\
.banner{padding:.5rem .75rem;margin:.25rem 0;border-radius:4px}\
.warning{background:#fff4d6}.error{background:#fde2e1}.info{background:#e3effd}";

/// Status line shown above the results.
#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    Warning(String),
    Error(String),
    Info(String),
}

impl Banner {
    fn class(&self) -> &'static str {
        match self {
            Banner::Warning(_) => "warning",
            Banner::Error(_) => "error",
            Banner::Info(_) => "info",
        }
    }

    fn text(&self) -> &str {
        match self {
            Banner::Warning(t) | Banner::Error(t) | Banner::Info(t) => t,
        }
    }
}

/// Banners shown when answering a question failed.
pub fn error_banners(error: &str) -> Vec<Banner> {
    vec![
        Banner::Error(format!("Error processing request: {}", error)),
        Banner::Info("Please make sure:".to_string()),
        Banner::Info("1. The YouTube URL is valid and public".to_string()),
        Banner::Info("2. The video has captions/transcript available".to_string()),
        Banner::Info("3. You have a stable internet connection".to_string()),
    ]
}

/// Fields posted by the assistant form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantForm {
    #[serde(default)]
    pub youtube_url: String,
    #[serde(default)]
    pub query: String,
}

impl AssistantForm {
    /// Trim both fields and cut them to `max_chars` characters.
    pub fn normalized(&self, max_chars: usize) -> Self {
        let clamp = |s: &str| s.trim().chars().take(max_chars).collect::<String>();
        Self {
            youtube_url: clamp(&self.youtube_url),
            query: clamp(&self.query),
        }
    }

    /// Warnings for fields left empty.
    pub fn missing_field_warnings(&self) -> Vec<Banner> {
        let mut warnings = Vec::new();
        if self.youtube_url.trim().is_empty() {
            warnings.push(Banner::Warning("Please provide a YouTube URL".to_string()));
        }
        if self.query.trim().is_empty() {
            warnings.push(Banner::Warning(
                "Please provide a question about the video".to_string(),
            ));
        }
        warnings
    }
}

/// State of the assistant page.
#[derive(Debug, Default)]
pub struct AssistantPage {
    pub form: AssistantForm,
    pub banners: Vec<Banner>,
    pub answer: Option<VideoAnswer>,
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Greedy word wrap. Whitespace runs collapse to one space and words
/// longer than `width` are broken.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while !word.is_empty() {
            let gap = usize::from(line_len > 0);
            if line_len + gap + word.len() <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.extend(word.iter());
                line_len += gap + word.len();
                break;
            }

            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
                continue;
            }

            // Word alone does not fit
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
    }

    if line_len > 0 {
        lines.push(line);
    }
    lines.join("\n")
}

fn source_preview(content: &str) -> String {
    let head: String = content.chars().take(SOURCE_PREVIEW_CHARS).collect();
    wrap_text(&format!("{}...", head), WRAP_WIDTH)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><a href=\"/\">YouTube Assistant</a> | <a href=\"/basics\">Basics</a></nav>\n\
         <h1>{title}</h1>\n\
         <p>This is a simple app to demonstrate the basics of prompt chains.</p>\n\
         {body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn render_banners(out: &mut String, banners: &[Banner]) {
    for banner in banners {
        let _ = writeln!(
            out,
            "<div class=\"banner {}\">{}</div>",
            banner.class(),
            escape_html(banner.text())
        );
    }
}

/// The YouTube assistant page.
pub fn render_assistant_page(state: &AssistantPage, max_input_chars: usize) -> String {
    let mut body = String::new();

    let _ = write!(
        body,
        "<form method=\"post\" action=\"/\">\n\
         <label for=\"youtube_url\">What is the YouTube video URL?</label>\n\
         <textarea id=\"youtube_url\" name=\"youtube_url\" maxlength=\"{max}\" rows=\"2\">{url}</textarea>\n\
         <label for=\"query\">Ask me about the video?</label>\n\
         <textarea id=\"query\" name=\"query\" maxlength=\"{max}\" rows=\"2\">{query}</textarea>\n\
         <button type=\"submit\">Submit</button>\n</form>\n",
        max = max_input_chars,
        url = escape_html(&state.form.youtube_url),
        query = escape_html(&state.form.query),
    );

    render_banners(&mut body, &state.banners);

    if let Some(answer) = &state.answer {
        let _ = writeln!(
            body,
            "<h2>Answer:</h2>\n<pre>{}</pre>",
            escape_html(&wrap_text(&answer.answer, WRAP_WIDTH))
        );
        body.push_str("<h2>Source Documents:</h2>\n");
        for (i, source) in answer.sources.iter().enumerate() {
            let _ = writeln!(
                body,
                "<p><strong>Document {}:</strong> <a href=\"{}\">{}</a></p>\n<pre>{}</pre>",
                i + 1,
                escape_html(&source.url),
                escape_html(&source.timestamp),
                escape_html(&source_preview(&source.content))
            );
        }
    }

    page("YouTube Assistant", &body)
}

/// The basics page: a topic select and the step-by-step chain's reply.
pub fn render_basics_page(selected: &str, response: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str(
        "<form method=\"post\" action=\"/basics\">\n\
         <label for=\"topic\">select a topic</label>\n<select id=\"topic\" name=\"topic\">\n",
    );
    for topic in TOPICS {
        let _ = writeln!(
            body,
            "<option value=\"{0}\"{1}>{0}</option>",
            escape_html(topic),
            if topic == selected { " selected" } else { "" }
        );
    }
    body.push_str("</select>\n<button type=\"submit\">Generate</button>\n</form>\n");

    if TOPICS.contains(&selected) {
        let _ = writeln!(body, "<p>You selected: {}</p>", escape_html(selected));
    }
    if let Some(response) = response {
        let _ = writeln!(body, "<pre>{}</pre>\n<p>Done</p>", escape_html(response));
    }

    page("Chain Basics", &body)
}
