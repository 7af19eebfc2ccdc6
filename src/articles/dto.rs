use serde::{Deserialize, Serialize};

use crate::articles::repo::{Article, ArticleStatus};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub pages: i64,
    #[serde(rename = "currentPage")]
    pub current_page: i64,
    pub articles: Vec<Article>,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub article: Article,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

pub fn page_count(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
