//! Crawler endpoints
//!
//! - GET /sitemap.xml - sitemaps.org 0.9 listing of published content
//! - GET /robots.txt  - allow everything, point at the sitemap

use hyper::StatusCode;

use super::response::{body_response, HttpResponse};
use crate::db::schemas::ContentDoc;
use crate::server::AppState;
use crate::store::ContentQuery;
use crate::types::Result;

/// Upper bound on URLs in one sitemap file
const SITEMAP_MAX_URLS: u32 = 50_000;

/// Escape the five XML special characters
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_sitemap(base_url: &str, items: &[ContentDoc]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    xml.push_str(&format!("  <url><loc>{}/</loc></url>\n", xml_escape(base_url)));

    for item in items {
        let loc = xml_escape(&format!("{}/content/{}", base_url, item.slug));
        let entry = match item.last_modified() {
            Some(modified) => format!(
                "  <url><loc>{}</loc><lastmod>{}</lastmod></url>\n",
                loc,
                modified.to_chrono().format("%Y-%m-%d")
            ),
            None => format!("  <url><loc>{}</loc></url>\n", loc),
        };
        xml.push_str(&entry);
    }

    xml.push_str("</urlset>\n");
    xml
}

fn render_robots(base_url: &str) -> String {
    format!("User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n", base_url)
}

/// GET /sitemap.xml
pub async fn handle_sitemap(state: &AppState) -> Result<HttpResponse> {
    let items = state
        .store
        .list_published(&ContentQuery {
            limit: SITEMAP_MAX_URLS,
            ..Default::default()
        })
        .await?;

    Ok(body_response(
        StatusCode::OK,
        "application/xml; charset=utf-8",
        render_sitemap(state.args.base_url(), &items),
    ))
}

/// GET /robots.txt
pub fn handle_robots(state: &AppState) -> HttpResponse {
    body_response(
        StatusCode::OK,
        "text/plain; charset=utf-8",
        render_robots(state.args.base_url()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ContentStatus;

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape("a&b<c>\"d\"'e'"),
            "a&amp;b&lt;c&gt;&quot;d&quot;&apos;e&apos;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_sitemap_lists_content() {
        let mut item = ContentDoc {
            slug: "hello-world".into(),
            ..Default::default()
        };
        item.set_status(ContentStatus::Published);

        let xml = render_sitemap("https://blog.example.com", &[item]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://blog.example.com/</loc>"));
        assert!(xml.contains("<loc>https://blog.example.com/content/hello-world</loc>"));
        assert!(xml.contains("<lastmod>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn test_sitemap_entry_without_dates() {
        let item = ContentDoc {
            slug: "undated".into(),
            ..Default::default()
        };

        let xml = render_sitemap("https://blog.example.com", &[item]);
        let lines: Vec<&str> = xml.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[3],
            "  <url><loc>https://blog.example.com/content/undated</loc></url>"
        );
        assert!(!xml.contains("<lastmod>"));
    }

    #[test]
    fn test_sitemap_escapes_base_url() {
        let xml = render_sitemap("https://example.com/?a=1&b=2", &[]);
        assert!(xml.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_robots_points_at_sitemap() {
        let robots = render_robots("https://blog.example.com");
        assert!(robots.contains("User-agent: *"));
        assert!(robots.contains("Sitemap: https://blog.example.com/sitemap.xml"));
    }
}
