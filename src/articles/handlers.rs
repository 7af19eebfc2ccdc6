use std::collections::BTreeMap;
use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::articles::dto::{
    page_count, ArticleListResponse, ArticleResponse, DeletedResponse, ListQuery,
};
use crate::articles::repo::{Article, ArticleFilter, ArticleStatus};
use crate::articles::validate::{validate_create, validate_update, ArticleForm};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::ext_from_mime;

/// Pulls text fields and the optional `image` file out of a multipart form.
/// The file is staged to storage immediately, mirroring how uploads hit disk
/// before the record is validated or persisted; callers clean up on failure.
async fn collect_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<(ArticleForm, Option<String>), ApiError> {
    let mut form = ArticleForm::default();
    let mut staged: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("File upload failed: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            let content_type = field.content_type().map(str::to_string).unwrap_or_default();
            let stem = field
                .file_name()
                .map(|f| {
                    FsPath::new(f)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("image")
                        .to_string()
                })
                .unwrap_or_else(|| "image".to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("File upload failed: {e}")))?;
            if data.is_empty() {
                continue; // an empty file part means no upload
            }

            let Some(ext) = ext_from_mime(&content_type) else {
                discard(state, staged.as_deref()).await;
                return Err(ApiError::BadRequest(
                    "Invalid file type. Only JPEG, PNG, GIF, and WebP images are allowed".into(),
                ));
            };

            let path = state
                .uploads
                .stage(&stem, ext, data)
                .await
                .map_err(|e| ApiError::internal("File upload failed", e))?;
            // A repeated image field replaces the earlier staged file.
            discard(state, staged.as_deref()).await;
            staged = Some(path);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("File upload failed: {e}")))?;
            form.set(&name, value);
        }
    }

    Ok((form, staged))
}

/// Best-effort cleanup of a staged upload after a failed request.
async fn discard(state: &AppState, staged: Option<&str>) {
    if let Some(path) = staged {
        state.uploads.delete(path).await;
    }
}

#[instrument(skip(state, multipart))]
pub async fn create_article(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    let (form, staged) = collect_form(&state, &mut multipart).await?;

    let mut missing = BTreeMap::new();
    if form.name().is_none() {
        missing.insert("name".to_string(), "Name is required".to_string());
    }
    if form.description().is_none() {
        missing.insert(
            "description".to_string(),
            "Description is required".to_string(),
        );
    }
    if form.author().is_none() {
        missing.insert("author".to_string(), "Author is required".to_string());
    }
    if !missing.is_empty() {
        discard(&state, staged.as_deref()).await;
        return Err(ApiError::Validation {
            message: "Name, description, and author are required".into(),
            errors: missing,
        });
    }

    let new = match validate_create(&form, staged.as_deref()) {
        Ok(new) => new,
        Err(errors) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::Validation {
                message: "Validation failed".into(),
                errors,
            });
        }
    };

    let article = match Article::insert(&state.db, &new).await {
        Ok(article) => article,
        Err(e) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::internal("Error creating article", e));
        }
    };

    info!(article_id = %article.id, "article created");
    Ok((
        StatusCode::CREATED,
        Json(ArticleResponse {
            success: true,
            message: Some("Article created successfully".into()),
            article,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.max(1);
    let filter = ArticleFilter {
        status: query.status,
        search: query.search,
    };

    let articles = Article::list(&state.db, &filter, limit, (page - 1) * limit)
        .await
        .map_err(|e| ApiError::internal("Error fetching articles", e))?;
    let total = Article::count(&state.db, &filter)
        .await
        .map_err(|e| ApiError::internal("Error fetching articles", e))?;

    Ok(Json(ArticleListResponse {
        success: true,
        count: articles.len(),
        total,
        pages: page_count(total, limit),
        current_page: page,
        articles,
    }))
}

#[instrument(skip(state))]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = Article::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error fetching article", e))?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;
    Ok(Json(ArticleResponse {
        success: true,
        message: None,
        article,
    }))
}

#[instrument(skip(state, multipart))]
pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ArticleResponse>, ApiError> {
    let (form, staged) = collect_form(&state, &mut multipart).await?;

    let existing = match Article::find_by_id(&state.db, id).await {
        Ok(Some(article)) => article,
        Ok(None) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::NotFound("Article not found".into()));
        }
        Err(e) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::internal("Error updating article", e));
        }
    };

    let mut changes = match validate_update(&form, staged.as_deref()) {
        Ok(changes) => changes,
        Err(errors) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::Validation {
                message: "Validation failed".into(),
                errors,
            });
        }
    };

    // A new upload replaces the previous stored file; otherwise the
    // existing path is kept. File removal and the record update are
    // sequenced, not transactional.
    if changes.image.is_some() {
        if let Some(old) = existing.image.as_deref() {
            state.uploads.delete(old).await;
        }
    } else {
        changes.image = existing.image.clone();
    }

    let article = match Article::update(&state.db, id, &changes).await {
        Ok(Some(article)) => article,
        Ok(None) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::NotFound("Article not found".into()));
        }
        Err(e) => {
            discard(&state, staged.as_deref()).await;
            return Err(ApiError::internal("Error updating article", e));
        }
    };

    info!(article_id = %article.id, "article updated");
    Ok(Json(ArticleResponse {
        success: true,
        message: Some("Article updated successfully".into()),
        article,
    }))
}

#[instrument(skip(state))]
pub async fn remove_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let article = Article::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error deleting article", e))?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    if let Some(image) = article.image.as_deref() {
        state.uploads.delete(image).await;
    }

    let removed = Article::delete(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Error deleting article", e))?;
    if !removed {
        warn!(article_id = %id, "article vanished before delete");
        return Err(ApiError::NotFound("Article not found".into()));
    }

    info!(article_id = %id, "article deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Article deleted successfully".into(),
    }))
}

/// Unconditionally moves the article to `published`; there is no guard on
/// the prior status, so an archived article publishes the same way a draft
/// does.
#[instrument(skip(state))]
pub async fn publish_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = Article::set_status(&state.db, id, ArticleStatus::Published)
        .await
        .map_err(|e| ApiError::internal("Error publishing article", e))?
        .ok_or_else(|| ApiError::NotFound("Article not found".into()))?;

    info!(article_id = %article.id, "article published");
    Ok(Json(ArticleResponse {
        success: true,
        message: Some("Article published successfully".into()),
        article,
    }))
}
