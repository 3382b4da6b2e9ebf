//! Streaming parser for sitemap and sitemap-index documents
//!
//! Elements are matched by local name, so `<urlset>` with or without the
//! `sitemaps.org` namespace prefix parses the same.

use super::{SitemapError, SitemapResult, SitemapUrl, DEFAULT_PRIORITY};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A `<sitemapindex>`: locations of child sitemaps
    Index(Vec<String>),
    /// A `<urlset>`: page entries
    UrlSet(Vec<SitemapUrl>),
}

/// Fields collected for the `<url>` or `<sitemap>` element being read
#[derive(Default)]
struct Entry {
    loc: String,
    lastmod: String,
    priority: String,
}

impl Entry {
    fn field(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "loc" => Some(&mut self.loc),
            "lastmod" => Some(&mut self.lastmod),
            "priority" => Some(&mut self.priority),
            _ => None,
        }
    }

    fn into_url(self) -> Option<SitemapUrl> {
        let loc = self.loc.trim();
        if loc.is_empty() {
            return None;
        }
        let lastmod = self.lastmod.trim();
        let priority = self.priority.trim();

        Some(SitemapUrl {
            url: loc.to_string(),
            lastmod: (!lastmod.is_empty()).then(|| lastmod.to_string()),
            priority: if priority.is_empty() {
                DEFAULT_PRIORITY.to_string()
            } else {
                priority.to_string()
            },
        })
    }
}

/// Parses a sitemap or sitemap-index document
///
/// # Example
///
/// ```
/// use storefront_sync::sitemap::{parse_sitemap, SitemapDocument};
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://shop.example.com/product/lamp/</loc></url>
/// </urlset>"#;
///
/// match parse_sitemap(xml).unwrap() {
///     SitemapDocument::UrlSet(urls) => assert_eq!(urls[0].priority, "0.5"),
///     SitemapDocument::Index(_) => unreachable!(),
/// }
/// ```
pub fn parse_sitemap(xml: &str) -> SitemapResult<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<String> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut entry = Entry::default();
    let mut children = Vec::new();
    let mut urls = Vec::new();

    loop {
        let text = match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                root.get_or_insert_with(|| name.clone());
                if name == "url" || name == "sitemap" {
                    entry = Entry::default();
                }
                stack.push(name);
                continue;
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                root.get_or_insert(name);
                continue;
            }
            Ok(Event::End(_)) => {
                match stack.pop().as_deref() {
                    Some("url") if stack.len() == 1 => {
                        if let Some(url) = std::mem::take(&mut entry).into_url() {
                            urls.push(url);
                        }
                    }
                    Some("sitemap") if stack.len() == 1 => {
                        if let Some(child) = std::mem::take(&mut entry).into_url() {
                            children.push(child.url);
                        }
                    }
                    _ => {}
                }
                continue;
            }
            Ok(Event::Text(t)) => t
                .unescape()
                .map(|s| s.into_owned())
                .map_err(|e| SitemapError::Xml {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?,
            Ok(Event::CData(c)) => String::from_utf8_lossy(&c.into_inner()).into_owned(),
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => {
                return Err(SitemapError::Xml {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })
            }
        };

        // Only direct children of a top-level <url>/<sitemap> count, so
        // nested extensions like <image:loc> are ignored.
        if stack.len() == 3 {
            if let Some(field) = entry.field(&stack[2]) {
                field.push_str(&text);
            }
        }
    }

    if let Some(open) = stack.pop() {
        return Err(SitemapError::Truncated(open));
    }

    match root.as_deref() {
        None => Err(SitemapError::Empty),
        Some("sitemapindex") => Ok(SitemapDocument::Index(children)),
        Some(_) => Ok(SitemapDocument::UrlSet(urls)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url>
                    <loc>https://shop.example.com/product/widget/</loc>
                    <lastmod>2024-03-01T10:00:00+00:00</lastmod>
                    <priority>0.8</priority>
                </url>
                <url>
                    <loc>https://shop.example.com/about/</loc>
                </url>
            </urlset>"#;

        let SitemapDocument::UrlSet(urls) = parse_sitemap(xml).unwrap() else {
            panic!("expected a urlset");
        };
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].url, "https://shop.example.com/product/widget/");
        assert_eq!(urls[0].lastmod.as_deref(), Some("2024-03-01T10:00:00+00:00"));
        assert_eq!(urls[0].priority, "0.8");
        assert_eq!(urls[1].lastmod, None);
        assert_eq!(urls[1].priority, "0.5");
    }

    #[test]
    fn test_parse_index_with_prefixed_namespace() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
                <sm:sitemap><sm:loc>https://shop.example.com/product-sitemap.xml</sm:loc></sm:sitemap>
                <sm:sitemap><sm:loc>https://shop.example.com/page-sitemap.xml</sm:loc></sm:sitemap>
            </sm:sitemapindex>"#;

        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::Index(vec![
                "https://shop.example.com/product-sitemap.xml".to_string(),
                "https://shop.example.com/page-sitemap.xml".to_string(),
            ])
        );
    }

    #[test]
    fn test_image_extension_does_not_replace_loc() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
                        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
                <url>
                    <loc>https://shop.example.com/product/lamp/</loc>
                    <image:image><image:loc>https://cdn.example.com/lamp.jpg</image:loc></image:image>
                </url>
            </urlset>"#;

        let SitemapDocument::UrlSet(urls) = parse_sitemap(xml).unwrap() else {
            panic!("expected a urlset");
        };
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "https://shop.example.com/product/lamp/");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<urlset>
                <url><loc>https://shop.example.com/?a=1&amp;b=2</loc></url>
                <url><loc><![CDATA[https://shop.example.com/blog/hello/]]></loc></url>
            </urlset>"#;

        let SitemapDocument::UrlSet(urls) = parse_sitemap(xml).unwrap() else {
            panic!("expected a urlset");
        };
        assert_eq!(urls[0].url, "https://shop.example.com/?a=1&b=2");
        assert_eq!(urls[1].url, "https://shop.example.com/blog/hello/");
    }

    #[test]
    fn test_blank_loc_skipped() {
        let xml = "<urlset><url><loc>  </loc></url><url></url></urlset>";
        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::UrlSet(Vec::new())
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_sitemap("<urlset><url><loc>x</url></urlset>"),
            Err(SitemapError::Xml { .. })
        ));
        assert!(parse_sitemap("<urlset><url><loc>x</loc>").is_err());
        assert!(matches!(parse_sitemap(""), Err(SitemapError::Empty)));
        assert!(matches!(
            parse_sitemap("not xml at all"),
            Err(SitemapError::Empty)
        ));
    }
}
