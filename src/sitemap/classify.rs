use super::SitemapUrl;
use std::fmt;

/// Kind of storefront page a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlCategory {
    Product,
    Category,
    Page,
    Post,
    Other,
}

impl UrlCategory {
    pub const ALL: [UrlCategory; 5] = [
        Self::Product,
        Self::Category,
        Self::Page,
        Self::Post,
        Self::Other,
    ];

    /// Bucket name, also used as the `type` of indexed page documents
    pub fn label(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Category => "categories",
            Self::Page => "pages",
            Self::Post => "posts",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for UrlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a URL by path markers; the first matching rule wins
pub fn classify_url(url: &str) -> UrlCategory {
    if url.contains("/product/") || url.contains("/shop/") {
        UrlCategory::Product
    } else if url.contains("/product-category/") || url.contains("/category/") {
        UrlCategory::Category
    } else if url.contains("/page/") || url.ends_with("/about/") || url.ends_with("/contact/") {
        UrlCategory::Page
    } else if url.contains("/blog/") || url.contains("/post/") {
        UrlCategory::Post
    } else {
        UrlCategory::Other
    }
}

/// Sitemap entries split into buckets, each keeping sitemap order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedUrls {
    pub products: Vec<SitemapUrl>,
    pub categories: Vec<SitemapUrl>,
    pub pages: Vec<SitemapUrl>,
    pub posts: Vec<SitemapUrl>,
    pub other: Vec<SitemapUrl>,
}

impl CategorizedUrls {
    pub fn get(&self, category: UrlCategory) -> &[SitemapUrl] {
        match category {
            UrlCategory::Product => &self.products,
            UrlCategory::Category => &self.categories,
            UrlCategory::Page => &self.pages,
            UrlCategory::Post => &self.posts,
            UrlCategory::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, category: UrlCategory) -> &mut Vec<SitemapUrl> {
        match category {
            UrlCategory::Product => &mut self.products,
            UrlCategory::Category => &mut self.categories,
            UrlCategory::Page => &mut self.pages,
            UrlCategory::Post => &mut self.posts,
            UrlCategory::Other => &mut self.other,
        }
    }

    pub fn total(&self) -> usize {
        UrlCategory::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    /// Entries whose text goes into the page collection, with their bucket
    pub fn indexable(&self) -> impl Iterator<Item = (UrlCategory, &SitemapUrl)> {
        self.pages
            .iter()
            .map(|u| (UrlCategory::Page, u))
            .chain(self.posts.iter().map(|u| (UrlCategory::Post, u)))
    }
}

/// Buckets sitemap entries by [`classify_url`]
pub fn categorize(urls: Vec<SitemapUrl>) -> CategorizedUrls {
    let mut categorized = CategorizedUrls::default();
    for entry in urls {
        let category = classify_url(&entry.url);
        categorized.bucket_mut(category).push(entry);
    }
    categorized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rules() {
        let cases = [
            ("https://s.example.com/product/widget", UrlCategory::Product),
            ("https://s.example.com/shop/", UrlCategory::Product),
            ("https://s.example.com/product-category/lamps/", UrlCategory::Category),
            ("https://s.example.com/category/news/", UrlCategory::Category),
            ("https://s.example.com/page/2/", UrlCategory::Page),
            ("https://s.example.com/about/", UrlCategory::Page),
            ("https://s.example.com/contact/", UrlCategory::Page),
            ("https://s.example.com/blog/post-1", UrlCategory::Post),
            ("https://s.example.com/post/hello/", UrlCategory::Post),
            ("https://s.example.com/", UrlCategory::Other),
            ("https://s.example.com/about", UrlCategory::Other),
        ];

        for (url, expected) in cases {
            assert_eq!(classify_url(url), expected, "{}", url);
        }
    }

    #[test]
    fn test_first_rule_wins() {
        // product beats category, category beats post
        assert_eq!(
            classify_url("https://s.example.com/shop/category/x/"),
            UrlCategory::Product
        );
        assert_eq!(
            classify_url("https://s.example.com/blog/category/x/"),
            UrlCategory::Category
        );
    }

    #[test]
    fn test_categorize_keeps_order() {
        let urls = vec![
            SitemapUrl::new("https://s.example.com/about/"),
            SitemapUrl::new("https://s.example.com/product/a"),
            SitemapUrl::new("https://s.example.com/blog/one"),
            SitemapUrl::new("https://s.example.com/product/b"),
        ];

        let categorized = categorize(urls);
        assert_eq!(categorized.total(), 4);
        assert_eq!(categorized.products.len(), 2);
        assert_eq!(categorized.products[1].url, "https://s.example.com/product/b");

        let indexable: Vec<_> = categorized
            .indexable()
            .map(|(c, u)| (c.label(), u.url.as_str()))
            .collect();
        assert_eq!(
            indexable,
            vec![
                ("pages", "https://s.example.com/about/"),
                ("posts", "https://s.example.com/blog/one"),
            ]
        );
    }
}
