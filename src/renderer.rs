use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser as MdParser, Tag};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Markdown to HTML renderer with class-based syntax highlighting for
/// fenced code blocks.
pub struct Renderer {
    syntax_set: SyntaxSet,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
        }
    }

    pub fn render_markdown(&self, markdown: &str) -> String {
        let mut events: Vec<Event> = Vec::new();
        let mut lang: Option<String> = None;
        let mut code = String::new();

        for event in MdParser::new_ext(markdown, Options::all()) {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info)))
                    if !info.trim().is_empty() =>
                {
                    lang = info.split_whitespace().next().map(str::to_string);
                    code.clear();
                }
                Event::Text(ref text) if lang.is_some() => code.push_str(text),
                Event::End(Tag::CodeBlock(_)) if lang.is_some() => {
                    let language = lang.take().unwrap_or_default();
                    match self.highlight_code(&code, &language) {
                        Ok(highlighted) => events.push(Event::Html(highlighted.into())),
                        Err(err) => {
                            tracing::warn!(%language, %err, "syntax highlighting failed");
                            let kind = || CodeBlockKind::Fenced(CowStr::from(language.clone()));
                            events.push(Event::Start(Tag::CodeBlock(kind())));
                            events.push(Event::Text(CowStr::from(code.clone())));
                            events.push(Event::End(Tag::CodeBlock(kind())));
                        }
                    }
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    pub fn highlight_code(&self, code: &str, lang: &str) -> Result<String, syntect::Error> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        // Use ClassedHTMLGenerator for CSS class-based highlighting
        let mut html_generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, ClassStyle::Spaced);

        for line in LinesWithEndings::from(code) {
            html_generator.parse_html_for_line_which_includes_newline(line)?;
        }

        Ok(format!(
            "<pre class=\"syntax-highlight\"><code>{}</code></pre>\n",
            html_generator.finalize()
        ))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain CommonMark rendering (all extensions, no highlighting).
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = MdParser::new_ext(markdown, Options::all());

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}
