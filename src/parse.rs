use scraper::{Html, Selector};

/// Pulls raw, untrimmed user-agent candidates out of a page. Implementations
/// own all knowledge of the source site's markup.
pub trait PageParser: Send + Sync {
    fn candidates(&self, html: &str) -> Vec<String>;
}

/// Reads `td li span.code`, the layout of the "latest user agent" guides.
pub struct CodeSpanParser {
    sel_code: Selector,
}

impl CodeSpanParser {
    pub const SELECTOR: &'static str = "td li span.code";
}

impl Default for CodeSpanParser {
    fn default() -> Self {
        Self {
            sel_code: Selector::parse(Self::SELECTOR).unwrap(),
        }
    }
}

impl PageParser for CodeSpanParser {
    fn candidates(&self, html: &str) -> Vec<String> {
        let html = Html::parse_document(html);
        html.select(&self.sel_code)
            .map(|span| span.text().collect())
            .collect()
    }
}
