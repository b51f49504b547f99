//! Markdown rendering with syntax highlighting
//!
//! Output is safe to embed as-is: raw HTML in a post is escaped, and links
//! or images pointing at script-capable schemes lose their destination.

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::config::HighlightConfig;
use crate::helpers::html_escape;

/// URL schemes links and images may use
const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

/// Heading collected until its end tag so it can be given an anchor
struct PendingHeading<'a> {
    level: HeadingLevel,
    id: Option<String>,
    text: String,
    events: Vec<Event<'a>>,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("InspiredGitHub", false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::with_options(&config.theme, config.line_number)
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        // YAML metadata blocks stay off, front-matter is split off beforehand
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_MATH
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut code_block: Option<Option<String>> = None;
        let mut code_block_content = String::new();
        let mut heading: Option<PendingHeading> = None;
        let mut slugs: HashMap<String, usize> = HashMap::new();

        for event in parser {
            // Code blocks swallow everything up to their end tag
            if let Some(lang) = &code_block {
                match event {
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted = self.highlight_code(&code_block_content, lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                        code_block = None;
                    }
                    Event::Text(text) => code_block_content.push_str(&text),
                    _ => {}
                }
                continue;
            }

            let event = match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code_block = Some(match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    });
                    code_block_content.clear();
                    continue;
                }
                Event::Start(Tag::Heading { level, id, .. }) => {
                    heading = Some(PendingHeading {
                        level,
                        id: id.map(|id| id.to_string()),
                        text: String::new(),
                        events: Vec::new(),
                    });
                    continue;
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(pending) = heading.take() {
                        push_heading(&mut events, pending, &mut slugs);
                    }
                    continue;
                }
                other => sanitize(other),
            };

            match heading.as_mut() {
                Some(pending) => {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        pending.text.push_str(text);
                    }
                    pending.events.push(event);
                }
                None => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");

        // Try to find syntax for the language
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Some(highlighted) => highlighted,
            None => {
                // Fallback to plain code block
                format!(
                    r#"<pre><code class="language-{}">{}</code></pre>"#,
                    html_escape(lang),
                    html_escape(code)
                )
            }
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter: Vec<String> = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect();

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            html_escape(lang),
            gutter.join("\n"),
            lines.join("\n")
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Neutralize raw HTML, script-capable URLs and emit math for KaTeX
fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::InlineMath(tex) => Event::Html(CowStr::from(format!(
            r#"<span class="math math-inline">${}$</span>"#,
            html_escape(&tex)
        ))),
        Event::DisplayMath(tex) => Event::Html(CowStr::from(format!(
            r#"<span class="math math-display">$${}$$</span>"#,
            html_escape(&tex)
        ))),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

/// Keep relative URLs and allowed schemes, drop anything else
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let trimmed = url.trim();
    let scheme_end = trimmed.find(|c| matches!(c, ':' | '/' | '?' | '#'));

    match scheme_end {
        Some(pos) if trimmed[pos..].starts_with(':') => {
            let scheme = trimmed[..pos].to_ascii_lowercase();
            if ALLOWED_SCHEMES.contains(&scheme.as_str()) {
                url
            } else {
                CowStr::Borrowed("")
            }
        }
        _ => url,
    }
}

/// Emit a heading with an id and its content wrapped in a self-link
fn push_heading<'a>(
    events: &mut Vec<Event<'a>>,
    heading: PendingHeading<'a>,
    slugs: &mut HashMap<String, usize>,
) {
    let base = heading.id.unwrap_or_else(|| slug::slugify(&heading.text));
    let base = if base.is_empty() {
        "section".to_string()
    } else {
        base
    };

    // A suffixed slug may already belong to a literal heading
    let mut anchor = base.clone();
    while slugs.contains_key(&anchor) {
        let count = slugs.entry(base.clone()).or_insert(0);
        *count += 1;
        anchor = format!("{}-{}", base, count);
    }
    slugs.insert(anchor.clone(), 0);

    let anchor = html_escape(&anchor);
    events.push(Event::Html(CowStr::from(format!(
        r##"<{level} id="{anchor}"><a href="#{anchor}">"##,
        level = heading.level,
        anchor = anchor
    ))));
    events.extend(heading.events);
    events.push(Event::Html(CowStr::from(format!(
        "</a></{}>\n",
        heading.level
    ))));
}
