//! Post model as projected by the content store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::portable_text::Block;

/// An Insights article
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Store document id
    #[serde(rename = "_id", default)]
    pub id: String,

    /// URL identifier
    #[serde(with = "slug_field")]
    pub slug: String,

    /// Article title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Short summary shown under the title and used as the description
    #[serde(default)]
    pub excerpt: Option<String>,

    /// Rich-text body
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<Block>,

    /// Hero image
    #[serde(default)]
    pub main_image: Option<Image>,

    #[serde(default)]
    pub author: Option<Author>,

    /// Dangling category references come back as null and are dropped
    #[serde(default, deserialize_with = "skip_nulls")]
    pub categories: Vec<Category>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    /// Jurisdiction codes such as "au" or "eu"
    #[serde(default, deserialize_with = "null_as_default")]
    pub jurisdictions: Vec<String>,

    /// Unset on drafts that were published without a date
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Precomputed reading time in minutes
    #[serde(default, deserialize_with = "whole_minutes")]
    pub estimated_reading_time: Option<u32>,

    /// Sites this post is published to
    #[serde(default, deserialize_with = "null_as_default")]
    pub sites: Vec<String>,
}

impl Post {
    /// Whether the post is published to the given site
    pub fn is_published_to(&self, site: &str) -> bool {
        self.sites.iter().any(|s| s == site)
    }

    /// URL of the main image asset, if there is one
    pub fn main_image_url(&self) -> Option<&str> {
        self.main_image.as_ref().and_then(Image::url)
    }
}

/// Image reference with alt text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub asset: Option<Asset>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Image {
    pub fn url(&self) -> Option<&str> {
        self.asset
            .as_ref()
            .map(|a| a.url.as_str())
            .filter(|u| !u.is_empty())
    }

    /// Alt text, or the fallback when none is set
    pub fn alt_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.alt.as_deref() {
            Some(alt) if !alt.is_empty() => alt,
            _ => fallback,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
}

/// A category label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().flatten().collect())
}

/// Store numbers may be fractional; round to whole minutes
fn whole_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes: Option<f64> = Option::deserialize(deserializer)?;
    Ok(minutes
        .filter(|m| m.is_finite() && *m >= 0.0)
        .map(|m| m.round().min(u32::MAX as f64) as u32))
}

/// The store wraps slugs as `{ "current": "..." }`
mod slug_field {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Slug {
        #[serde(default)]
        current: String,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SlugRepr {
        Wrapped(Slug),
        Plain(String),
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(value: &String, serializer: S) -> Result<S::Ok, S::Error> {
        Slug {
            current: value.clone(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match SlugRepr::deserialize(deserializer)? {
            SlugRepr::Wrapped(slug) => slug.current,
            SlugRepr::Plain(slug) => slug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_store_document() {
        let json = r#"{
            "_id": "post-1",
            "slug": { "current": "gdpr-update" },
            "title": "GDPR Update",
            "excerpt": null,
            "mainImage": { "asset": { "url": "https://cdn.example.com/a.jpg" }, "alt": "Flags" },
            "author": { "name": "Dana", "role": "Counsel" },
            "categories": [{ "_id": "c1", "title": "Privacy" }],
            "tags": null,
            "jurisdictions": ["eu"],
            "publishedAt": "2024-01-15T00:00:00Z",
            "sites": ["assure", "otherBrand"],
            "unknownField": 42
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.slug, "gdpr-update");
        assert_eq!(post.id, "post-1");
        assert!(post.excerpt.is_none());
        assert!(post.tags.is_empty());
        assert!(post.body.is_empty());
        assert_eq!(post.categories[0].title, "Privacy");
        assert_eq!(post.main_image_url(), Some("https://cdn.example.com/a.jpg"));
        assert!(post.is_published_to("assure"));
        assert!(!post.is_published_to("elsewhere"));
    }

    #[test]
    fn test_plain_slug_and_serialize() {
        let json = r#"{"slug": "plain", "title": "T", "publishedAt": "2024-01-15T00:00:00Z"}"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.slug, "plain");

        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["slug"]["current"], "plain");
    }

    #[test]
    fn test_decode_sparse_document() {
        let json = r#"{
            "slug": { "current": "draft-notes" },
            "title": null,
            "categories": [null, { "_id": "c1", "title": "Privacy" }, null],
            "estimatedReadingTime": 4.5,
            "sites": ["assure"]
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.title, "");
        assert!(post.published_at.is_none());
        assert_eq!(post.categories.len(), 1);
        assert_eq!(post.categories[0].title, "Privacy");
        assert_eq!(post.estimated_reading_time, Some(5));
    }

    #[test]
    fn test_reading_time_numbers() {
        let decode = |value: &str| {
            let json = format!(r#"{{"slug": "a", "estimatedReadingTime": {}}}"#, value);
            serde_json::from_str::<Post>(&json).unwrap().estimated_reading_time
        };
        assert_eq!(decode("3"), Some(3));
        assert_eq!(decode("2.4"), Some(2));
        assert_eq!(decode("null"), None);
        assert_eq!(decode("-1"), None);
    }

    #[test]
    fn test_image_alt_fallback() {
        let image = Image {
            asset: None,
            alt: Some(String::new()),
        };
        assert_eq!(image.alt_or("Title"), "Title");
        assert!(image.url().is_none());
    }
}
