use crate::error::ParseError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// A parsed sitemap document. `Index` children reference further
/// sitemap documents; `UrlSet` children are leaf page URLs. Entries
/// keep document order.
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapNode {
    Index(Vec<String>),
    UrlSet(Vec<String>),
}

/// Which container element a `<loc>` belongs to.
#[derive(Clone, Copy, PartialEq)]
enum Scope {
    Sitemap,
    Url,
}

/// Parse raw sitemap content into a `SitemapNode`.
///
/// Real-world sitemaps are messy: matching is on case-folded local
/// names, so missing or unusual namespace declarations and mixed-case
/// tags are accepted, as are BOM markers and surrounding whitespace.
/// A document with `<sitemap>` entries is an `Index` even if stray
/// `<url>` entries also appear.
pub fn parse(content: &str) -> Result<SitemapNode, ParseError> {
    let content = content.trim_start_matches('\u{feff}').trim();

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut sitemaps: Vec<String> = Vec::new();
    let mut urls: Vec<String> = Vec::new();

    let mut scope: Option<Scope> = None;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"sitemap" => scope = Some(Scope::Sitemap),
                b"url" => scope = Some(Scope::Url),
                b"loc" if scope.is_some() => in_loc = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => {
                let loc = t
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                push_loc(&mut sitemaps, &mut urls, scope, loc.trim());
            }
            Ok(Event::CData(t)) if in_loc => {
                let loc = String::from_utf8_lossy(&t.into_inner()).into_owned();
                push_loc(&mut sitemaps, &mut urls, scope, loc.trim());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref().to_ascii_lowercase().as_slice() {
                b"sitemap" | b"url" => scope = None,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Malformed(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !sitemaps.is_empty() {
        Ok(SitemapNode::Index(sitemaps))
    } else if !urls.is_empty() {
        Ok(SitemapNode::UrlSet(urls))
    } else {
        Err(ParseError::Empty)
    }
}

fn push_loc(sitemaps: &mut Vec<String>, urls: &mut Vec<String>, scope: Option<Scope>, loc: &str) {
    if loc.is_empty() {
        return;
    }
    match scope {
        Some(Scope::Sitemap) => sitemaps.push(loc.to_string()),
        Some(Scope::Url) => urls.push(loc.to_string()),
        None => {}
    }
}
