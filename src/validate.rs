use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Article, ArticleFields};

pub const DEFAULT_CATEGORY: &str = "technology";

/// Raw article form as posted by the create and edit pages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub source: String,
    pub url_to_image: String,
    /// Carried through edits as a hidden field.
    pub published_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Validation failures of a submitted form, one per offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message).collect();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for ValidationError {}

impl ArticleForm {
    pub fn validate(&self) -> Result<ArticleFields, ValidationError> {
        let mut errors = ValidationError::default();

        if self.title.trim().is_empty() {
            errors.push("title", "Title is required");
        } else if self.title.chars().count() < 10 {
            errors.push("title", "Title must be at least 10 characters");
        }

        if self.description.trim().is_empty() {
            errors.push("description", "Description is required");
        } else if self.description.chars().count() < 50 {
            errors.push("description", "Description must be at least 50 characters");
        }

        if self.source.trim().is_empty() {
            errors.push("source", "Source is required");
        }

        let image = self.url_to_image.trim();
        if !image.is_empty() && reqwest::Url::parse(image).is_err() {
            errors.push("url_to_image", "Please enter a valid URL");
        }

        if !errors.errors.is_empty() {
            return Err(errors);
        }

        let category = if self.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            self.category.trim().to_string()
        };

        Ok(ArticleFields {
            title: self.title.clone(),
            description: self.description.clone(),
            category,
            source: self.source.clone(),
            url_to_image: (!image.is_empty()).then(|| image.to_string()),
            published_at: DateTime::parse_from_rfc3339(self.published_at.trim())
                .ok()
                .map(|d| d.with_timezone(&Utc)),
        })
    }
}

impl From<&Article> for ArticleForm {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            description: article.description.clone(),
            category: article.category.clone(),
            source: article.source.clone(),
            url_to_image: article.url_to_image.clone().unwrap_or_default(),
            published_at: article.published_at.to_rfc3339(),
        }
    }
}

/// Splits a comma-separated skills field, dropping empty entries.
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ArticleForm {
        ArticleForm {
            title: "A perfectly fine headline".to_string(),
            description: "This description is comfortably longer than fifty characters in total."
                .to_string(),
            category: "health".to_string(),
            source: "Daily Wire Service".to_string(),
            url_to_image: String::new(),
            published_at: String::new(),
        }
    }

    #[test]
    fn test_valid_form_produces_fields() {
        let fields = valid_form().validate().unwrap();
        assert_eq!(fields.category, "health");
        assert!(fields.url_to_image.is_none());
        assert!(fields.published_at.is_none());
    }

    #[test]
    fn test_missing_fields_reported() {
        let err = ArticleForm::default().validate().unwrap_err();
        assert_eq!(err.get("title"), Some("Title is required"));
        assert_eq!(err.get("description"), Some("Description is required"));
        assert_eq!(err.get("source"), Some("Source is required"));
        assert_eq!(err.get("url_to_image"), None);
    }

    #[test]
    fn test_short_title_and_description() {
        let mut form = valid_form();
        form.title = "Too short".to_string();
        form.description = "Not nearly fifty characters.".to_string();

        let err = form.validate().unwrap_err();
        assert_eq!(err.get("title"), Some("Title must be at least 10 characters"));
        assert_eq!(
            err.get("description"),
            Some("Description must be at least 50 characters")
        );
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_title_length_counts_characters() {
        let mut form = valid_form();
        form.title = "ÄÖÜäöüßéèê".to_string();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_invalid_image_url() {
        let mut form = valid_form();
        form.url_to_image = "not a url".to_string();
        let err = form.validate().unwrap_err();
        assert_eq!(err.get("url_to_image"), Some("Please enter a valid URL"));
    }

    #[test]
    fn test_valid_image_url_kept() {
        let mut form = valid_form();
        form.url_to_image = " https://images.example.com/a.jpg ".to_string();
        let fields = form.validate().unwrap();
        assert_eq!(
            fields.url_to_image.as_deref(),
            Some("https://images.example.com/a.jpg")
        );
    }

    #[test]
    fn test_blank_category_defaults() {
        let mut form = valid_form();
        form.category = String::new();
        assert_eq!(form.validate().unwrap().category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_published_at_carried_through_edit() {
        let mut form = valid_form();
        form.published_at = "2024-01-15T10:00:00+00:00".to_string();
        let fields = form.validate().unwrap();
        assert_eq!(
            fields.published_at.map(|d| d.to_rfc3339()),
            Some("2024-01-15T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_parse_skills() {
        assert_eq!(
            parse_skills(" Rust, writing ,, editing"),
            vec!["Rust".to_string(), "writing".to_string(), "editing".to_string()]
        );
        assert!(parse_skills("").is_empty());
    }
}
