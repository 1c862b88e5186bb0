use std::str::FromStr;

use tl::HTMLTag;
use url::Url;

use pkm_version::VersionSpecifier;

/// One `<a href>` entry on a simple-index page: a distribution filename plus the metadata the
/// index can annotate it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    pub filename: String,
    pub url: Url,
    pub sha256: Option<String>,
    pub requires_python: Option<VersionSpecifier>,
}

#[derive(Debug, Clone)]
pub struct SimpleIndexPage {
    pub files: Vec<IndexFile>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    HtmlParse(#[from] tl::ParseError),
    #[error("anchor tag has no href attribute")]
    MissingHref,
    #[error("failed to parse URL `{0}`: {1}")]
    UrlParse(String, url::ParseError),
    #[error("unreadable `requires-python` specifier `{0}`")]
    RequiresPython(String),
}

impl SimpleIndexPage {
    /// Parses the anchor tags of a simple-index HTML page: each `<a href>` points to a
    /// distribution file, resolved against an optional `<base href>` tag or the page's own URL.
    pub fn parse(text: &str, page_url: &Url) -> Result<Self, Error> {
        let dom = tl::parse(text, tl::ParserOptions::default())?;
        let parser = dom.parser();

        let base = dom
            .nodes()
            .iter()
            .filter_map(|node| node.as_tag())
            .take_while(|tag| !matches!(tag.name().as_bytes(), b"a" | b"link"))
            .find(|tag| tag.name().as_bytes() == b"base")
            .and_then(|tag| tag.attributes().get("href").flatten())
            .and_then(|href| std::str::from_utf8(href.as_bytes()).ok())
            .and_then(|href| Url::parse(href).ok())
            .unwrap_or_else(|| page_url.clone());

        let files = dom
            .nodes()
            .iter()
            .filter_map(|node| node.as_tag())
            .filter(|tag| tag.name().as_bytes() == b"a")
            .map(|tag| Self::parse_anchor(tag, &base, parser))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { files })
    }

    fn parse_anchor(tag: &HTMLTag, base: &Url, _parser: &tl::Parser) -> Result<IndexFile, Error> {
        let href = tag
            .attributes()
            .get("href")
            .flatten()
            .and_then(|bytes| std::str::from_utf8(bytes.as_bytes()).ok())
            .ok_or(Error::MissingHref)?;

        let (path, fragment) = href.split_once('#').unwrap_or((href, ""));
        let url = base
            .join(path)
            .map_err(|e| Error::UrlParse(href.to_string(), e))?;

        let filename = path.rsplit('/').next().unwrap_or(path).to_string();

        let sha256 = fragment
            .strip_prefix("sha256=")
            .map(str::to_string);

        let requires_python = tag
            .attributes()
            .get("data-requires-python")
            .flatten()
            .and_then(|bytes| std::str::from_utf8(bytes.as_bytes()).ok())
            .map(html_unescape)
            .map(|spec| {
                VersionSpecifier::from_str(&spec).map_err(|_| Error::RequiresPython(spec.clone()))
            })
            .transpose()?;

        Ok(IndexFile {
            filename,
            url,
            sha256,
            requires_python,
        })
    }
}

/// Decodes the small set of entities simple-index pages actually emit (`&amp;`, `&lt;`, `&gt;`,
/// `&quot;`); a full HTML-entity table is unnecessary for attribute values this constrained.
fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_anchor_with_hash_and_requires_python() {
        let text = r#"<!DOCTYPE html><html><body>
            <a href="/whl/jinja2-3.1.2-py3-none-any.whl#sha256=abc123" data-requires-python="&gt;=3.7">jinja2-3.1.2-py3-none-any.whl</a>
        </body></html>"#;
        let base = Url::parse("https://pypi.example/simple/jinja2/").unwrap();
        let page = SimpleIndexPage::parse(text, &base).unwrap();
        assert_eq!(page.files.len(), 1);
        let file = &page.files[0];
        assert_eq!(file.filename, "jinja2-3.1.2-py3-none-any.whl");
        assert_eq!(file.sha256.as_deref(), Some("abc123"));
        assert!(file.requires_python.is_some());
    }

    #[test]
    fn resolves_relative_hrefs_against_page_url() {
        let text = r#"<a href="jinja2-3.1.2.tar.gz#sha256=def">jinja2-3.1.2.tar.gz</a>"#;
        let base = Url::parse("https://pypi.example/simple/jinja2/").unwrap();
        let page = SimpleIndexPage::parse(text, &base).unwrap();
        assert_eq!(page.files[0].url.as_str(), "https://pypi.example/simple/jinja2/jinja2-3.1.2.tar.gz");
    }
}
