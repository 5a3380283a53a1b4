use crate::model::Article;

pub fn by_category<'a>(articles: &'a [Article], category: &str) -> Vec<&'a Article> {
    articles.iter().filter(|a| a.category == category).collect()
}

/// Case-insensitive substring match over title, description and category.
/// An empty query matches nothing.
pub fn search<'a>(articles: &'a [Article], query: &str) -> Vec<&'a Article> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    articles
        .iter()
        .filter(|a| {
            a.title.to_lowercase().contains(&query)
                || a.description.to_lowercase().contains(&query)
                || a.category.to_lowercase().contains(&query)
        })
        .collect()
}
