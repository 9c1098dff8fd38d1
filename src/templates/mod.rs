//! Built-in Insights templates using the Tera template engine
//!
//! Templates are embedded in the binary so a deployment is a single file.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Template renderer with the embedded Insights layout
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Context values arrive already escaped (see `page::render`), and
        // Tera's escaper would also mangle the slashes in URLs
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("insights/layout.html")),
            ("article.html", include_str!("insights/article.html")),
            ("missing.html", include_str!("insights/missing.html")),
            ("not_found.html", include_str!("insights/not_found.html")),
            // Partials
            ("partials/nav.html", include_str!("insights/partials/nav.html")),
            (
                "partials/footer.html",
                include_str!("insights/partials/footer.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

// Data structures for template context.
// Every string in these structs is HTML-safe: text is escaped when the
// context is built and the `*_html`/`meta` fields hold generated markup.

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    /// BCP 47 tag for the `lang` attribute
    pub language: String,
    pub home_url: String,
    pub listing_url: String,
    pub contact_url: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadData {
    pub title: String,
    pub description: String,
    /// Prerendered social meta tags
    pub meta: String,
    pub canonical_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageData {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorData {
    pub name: String,
    pub role: Option<String>,
    pub avatar: Option<ImageData>,
    /// Badge letter shown when there is no avatar
    pub initial: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateData {
    pub text: String,
    pub iso: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleData {
    pub title: String,
    pub excerpt: Option<String>,
    pub hero: Option<ImageData>,
    pub categories: Vec<String>,
    pub author: AuthorData,
    pub published: Option<DateData>,
    pub reading_time: u32,
    /// Prerendered body markup
    pub body_html: String,
    pub tags: Vec<String>,
    pub jurisdictions: Vec<String>,
}
