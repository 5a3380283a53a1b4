use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a backend record. The backend hands out both numbers and
/// strings, so equality is by textual form: `5` and `"5"` are the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

pub type ArticleId = RecordId;

impl RecordId {
    fn text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            RecordId::Number(n) => n.to_string().into(),
            RecordId::Text(s) => s.as_str().into(),
        }
    }

    /// The id percent-encoded as one URL path segment, or `None` when no
    /// encoding can keep it a single segment (empty, `.` or `..`).
    pub fn path_segment(&self) -> Option<String> {
        let text = self.text();
        if text.is_empty() || text == "." || text == ".." {
            return None;
        }
        let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
        Some(encoded.replace('+', "%20"))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecordId::Number(a), RecordId::Number(b)) => a == b,
            _ => self.text() == other.text(),
        }
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text().hash(state);
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    #[serde(deserialize_with = "non_empty")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_to_image: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// User-editable part of an article, as submitted by the create and edit forms.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArticleFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub source: String,
    pub url_to_image: Option<String>,
    /// Kept by edits so a replace does not reset the publication date.
    pub published_at: Option<DateTime<Utc>>,
}

impl ArticleFields {
    pub fn into_article(self, id: ArticleId, published_at: DateTime<Utc>) -> Article {
        Article {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            source: self.source,
            url_to_image: self.url_to_image,
            published_at,
        }
    }
}

impl From<&Article> for ArticleFields {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            description: article.description.clone(),
            category: article.category.clone(),
            source: article.source.clone(),
            url_to_image: article.url_to_image.clone(),
            published_at: Some(article.published_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub role: String,
    pub company: String,
    pub duration: String,
}

/// A category label. The backend may list categories as bare strings or as
/// objects carrying a `name` (or `slug`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CategoryRepr", into = "String")]
pub struct Category(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryRepr {
    Label(String),
    Record {
        #[serde(alias = "slug")]
        name: String,
    },
}

impl From<CategoryRepr> for Category {
    fn from(repr: CategoryRepr) -> Self {
        match repr {
            CategoryRepr::Label(name) | CategoryRepr::Record { name } => Category(name),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

fn non_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("title must not be empty"));
    }
    Ok(value)
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
