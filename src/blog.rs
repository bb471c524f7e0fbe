//! Blog post shape served by `/api/posts` plus the small helpers list/detail views need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTHOR: &str = "SmartStoxVest Team";
pub const PREVIEW_CHARS: usize = 150;

fn default_published() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub content: String,
    /// Comma separated, e.g. "ai,stocks,trading".
    #[serde(default)]
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    /// Legacy field still sent by older posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    #[serde(deserialize_with = "backend_ts::required")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "backend_ts::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "backend_ts::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The backend writes naive UTC timestamps (`2025-03-01T10:00:00.123456`);
/// accept those as well as RFC 3339.
mod backend_ts {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc())
    }

    pub fn required<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(d)?;
        parse(&s).ok_or_else(|| D::Error::custom(format!("bad timestamp: {s}")))
    }

    pub fn optional<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("bad timestamp: {s}"))),
        }
    }
}

impl BlogPost {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn display_author(&self) -> &str {
        match self.author.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a,
            _ => DEFAULT_AUTHOR,
        }
    }

    /// Card image: cover first, then the legacy field.
    pub fn card_image(&self) -> Option<&str> {
        self.cover_image_url
            .as_deref()
            .or(self.image_url.as_deref())
    }

    /// Explicit excerpt, else the first [`PREVIEW_CHARS`] characters of the body.
    pub fn preview(&self) -> String {
        if let Some(ex) = self.excerpt.as_deref().map(str::trim) {
            if !ex.is_empty() {
                return ex.to_string();
            }
        }
        if self.content.chars().count() <= PREVIEW_CHARS {
            return self.content.clone();
        }
        let mut out: String = self.content.chars().take(PREVIEW_CHARS).collect();
        out.push_str("...");
        out
    }
}

/// Newest first by `created_at`.
pub fn sort_newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
pub(crate) fn sample_post(slug: &str, created_at: &str) -> BlogPost {
    BlogPost {
        id: None,
        title: format!("Post {slug}"),
        slug: slug.to_string(),
        content: "body".to_string(),
        tags: String::new(),
        excerpt: None,
        cover_image_url: None,
        image_url: None,
        author: None,
        is_published: true,
        created_at: created_at.parse().expect("rfc3339"),
        published_at: None,
        updated_at: None,
    }
}
