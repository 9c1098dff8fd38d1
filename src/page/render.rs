//! Article page rendering
//!
//! A pure projection from a loaded post to a complete HTML document. All
//! text from the content store is escaped here before it reaches the
//! templates.

use anyhow::Result;
use chrono::{Datelike, Utc};
use tera::Context;

use crate::client::{build_image_url, calculate_reading_time};
use crate::config::SiteConfig;
use crate::content::{portable_text::safe_href, Components, Post, PortableTextRenderer};
use crate::helpers::{
    date_xml, full_url_for, html_escape, long_date, open_graph, post_path, twitter_card, url_for,
};
use crate::templates::{
    ArticleData, AuthorData, DateData, HeadData, ImageData, SiteData, TemplateRenderer,
};

/// Hero image size
pub const HERO_SIZE: (u32, u32) = (1200, 675);
/// Social share image size
pub const SHARE_SIZE: (u32, u32) = (1200, 630);
/// Author avatar size
pub const AVATAR_SIZE: (u32, u32) = (48, 48);

/// Renders article pages for one site
pub struct PageRenderer {
    config: SiteConfig,
    templates: TemplateRenderer,
    body: PortableTextRenderer,
}

impl PageRenderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            templates: TemplateRenderer::new()?,
            body: PortableTextRenderer::new(article_components()),
        })
    }

    /// Render the article page, or a placeholder when there is no post
    pub fn render(&self, post: Option<&Post>) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", &self.site_data());

        let Some(post) = post else {
            return self.templates.render("missing.html", &context);
        };

        context.insert("head", &self.head_data(post));
        context.insert("article", &self.article_data(post));
        self.templates.render("article.html", &context)
    }

    /// The generic not-found page shown to visitors
    pub fn render_not_found(&self) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", &self.site_data());
        self.templates.render("not_found.html", &context)
    }

    fn site_data(&self) -> SiteData {
        SiteData {
            title: html_escape(&self.config.title),
            language: html_escape(&self.config.language),
            home_url: html_escape(&url_for(&self.config, "")),
            listing_url: html_escape(&url_for(&self.config, &self.config.listing_path)),
            contact_url: html_escape(&url_for(&self.config, &self.config.contact_path)),
            year: Utc::now().with_timezone(&self.config.tz()).year(),
        }
    }

    fn head_data(&self, post: &Post) -> HeadData {
        let description = description(post, &self.config.title);
        let share_image = post.main_image_url().map(|src| {
            build_image_url(src, SHARE_SIZE.0, SHARE_SIZE.1, self.config.image_quality)
        });
        let canonical = full_url_for(&self.config, &post_path(&self.config, &post.slug));

        let meta = [
            open_graph(&post.title, &description, &canonical, share_image.as_deref()),
            twitter_card(&post.title, &description, share_image.as_deref()),
        ]
        .join("\n");

        HeadData {
            title: html_escape(&format!("{} - {}", post.title, self.config.title)),
            description: html_escape(&description),
            meta,
            canonical_url: html_escape(&canonical),
        }
    }

    fn article_data(&self, post: &Post) -> ArticleData {
        let quality = self.config.image_quality;
        let tz = self.config.tz();

        let hero = post.main_image.as_ref().and_then(|image| {
            image.url().map(|src| ImageData {
                src: html_escape(&build_image_url(src, HERO_SIZE.0, HERO_SIZE.1, quality)),
                alt: html_escape(image.alt_or(&post.title)),
            })
        });

        let author = post.author.as_ref();
        let name = author
            .and_then(|a| a.name.as_deref())
            .filter(|n| !n.is_empty());
        let avatar = author
            .and_then(|a| a.image.as_ref())
            .and_then(|image| {
                image.url().map(|src| ImageData {
                    src: html_escape(&build_image_url(
                        src,
                        AVATAR_SIZE.0,
                        AVATAR_SIZE.1,
                        quality,
                    )),
                    alt: html_escape(image.alt_or(name.unwrap_or(""))),
                })
            });

        ArticleData {
            title: html_escape(&post.title),
            excerpt: post
                .excerpt
                .as_deref()
                .filter(|e| !e.is_empty())
                .map(html_escape),
            hero,
            categories: post.categories.iter().map(|c| html_escape(&c.title)).collect(),
            author: AuthorData {
                name: html_escape(name.unwrap_or("Unknown Author")),
                role: author
                    .and_then(|a| a.role.as_deref())
                    .filter(|r| !r.is_empty())
                    .map(html_escape),
                avatar,
                initial: html_escape(&author_initial(name)),
            },
            published: post.published_at.map(|date| DateData {
                text: long_date(&date, tz),
                iso: date_xml(&date.with_timezone(&tz)),
            }),
            reading_time: reading_time(post),
            body_html: self.body.render(&post.body),
            tags: post.tags.iter().map(|t| html_escape(t)).collect(),
            jurisdictions: post
                .jurisdictions
                .iter()
                .map(|j| html_escape(&j.to_uppercase()))
                .collect(),
        }
    }
}

/// Page description: the excerpt, or a generated sentence
pub fn description(post: &Post, site_title: &str) -> String {
    match post.excerpt.as_deref() {
        Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
        _ => format!("Read {} on {}", post.title, site_title),
    }
}

/// Precomputed reading time when the store has one
pub fn reading_time(post: &Post) -> u32 {
    match post.estimated_reading_time {
        Some(minutes) if minutes > 0 => minutes,
        _ => calculate_reading_time(&post.body),
    }
}

/// Badge letter for an author without an avatar
pub fn author_initial(name: Option<&str>) -> String {
    name.and_then(|n| n.chars().next())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

/// Mapping table for article bodies
pub fn article_components() -> Components {
    Components::empty()
        .block("normal", |c| {
            format!(r#"<p class="mb-4 text-gray-700 leading-relaxed">{}</p>"#, c)
        })
        .block("h1", |c| {
            format!(r#"<h1 class="text-3xl font-bold mt-8 mb-4 text-gray-900">{}</h1>"#, c)
        })
        .block("h2", |c| {
            format!(r#"<h2 class="text-2xl font-bold mt-6 mb-3 text-gray-900">{}</h2>"#, c)
        })
        .block("h3", |c| {
            format!(r#"<h3 class="text-xl font-bold mt-4 mb-2 text-gray-900">{}</h3>"#, c)
        })
        .block("blockquote", |c| {
            format!(
                r#"<blockquote class="border-l-4 border-blue-500 pl-4 my-6 italic text-gray-600 bg-blue-50 py-2">{}</blockquote>"#,
                c
            )
        })
        .list("bullet", |c| {
            format!(r#"<ul class="list-disc list-inside mb-4 text-gray-700">{}</ul>"#, c)
        })
        .list("number", |c| {
            format!(r#"<ol class="list-decimal list-inside mb-4 text-gray-700">{}</ol>"#, c)
        })
        .list_item("bullet", |c| format!(r#"<li class="mb-1">{}</li>"#, c))
        .list_item("number", |c| format!(r#"<li class="mb-1">{}</li>"#, c))
        .mark("strong", |c, _| {
            format!(r#"<strong class="font-bold text-gray-900">{}</strong>"#, c)
        })
        .mark("em", |c, _| format!(r#"<em class="italic">{}</em>"#, c))
        .mark("link", |c, def| {
            match def.and_then(|d| d.href.as_deref()).and_then(safe_href) {
                Some(href) => format!(
                    r#"<a href="{}" class="text-blue-600 hover:text-blue-700 underline" target="_blank" rel="noopener noreferrer">{}</a>"#,
                    html_escape(href),
                    c
                ),
                None => c.to_string(),
            }
        })
}
