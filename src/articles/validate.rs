use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::articles::repo::{ArticleChanges, ArticleStatus, NewArticle};

pub type FieldErrors = BTreeMap<String, String>;

/// Raw text fields collected from a multipart form. Empty strings are
/// treated as absent throughout, so a form that posts every field still
/// retains unset values on update.
#[derive(Debug, Default)]
pub struct ArticleForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub status: Option<String>,
}

impl ArticleForm {
    pub fn set(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = Some(value),
            "description" => self.description = Some(value),
            "price" => self.price = Some(value),
            "author" => self.author = Some(value),
            "tags" => self.tags = Some(value),
            "status" => self.status = Some(value),
            _ => {} // unknown fields are ignored
        }
    }

    pub fn name(&self) -> Option<&str> {
        present(&self.name)
    }
    pub fn description(&self) -> Option<&str> {
        present(&self.description)
    }
    pub fn author(&self) -> Option<&str> {
        present(&self.author)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Splits a delimited tags string, trimming whitespace per entry:
/// `"a, b ,c"` becomes `["a", "b", "c"]`.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(|tag| tag.trim().to_string()).collect()
}

fn validate_name(name: &str, errors: &mut FieldErrors) {
    let len = name.chars().count();
    if len < 5 {
        errors.insert(
            "name".into(),
            "Article name must be at least 5 characters".into(),
        );
    } else if len > 100 {
        errors.insert(
            "name".into(),
            "Article name cannot exceed 100 characters".into(),
        );
    }
}

fn validate_description(description: &str, errors: &mut FieldErrors) {
    if description.chars().count() < 50 {
        errors.insert(
            "description".into(),
            "Description must be at least 50 characters".into(),
        );
    }
}

fn parse_price(raw: Option<&str>, errors: &mut FieldErrors) -> Option<f64> {
    let raw = raw?;
    match raw.trim().parse::<f64>() {
        Ok(price) if price < 0.0 => {
            errors.insert("price".into(), "Price cannot be negative".into());
            None
        }
        Ok(price) => Some(price),
        Err(_) => {
            errors.insert("price".into(), "Price must be a number".into());
            None
        }
    }
}

fn parse_tags(raw: Option<&str>, errors: &mut FieldErrors) -> Option<Vec<String>> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    let tags = split_tags(raw);
    if tags.len() > 5 {
        errors.insert("tags".into(), "Cannot have more than 5 tags".into());
        return None;
    }
    Some(tags)
}

fn parse_status(raw: Option<&str>, errors: &mut FieldErrors) -> Option<ArticleStatus> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    match raw {
        "draft" => Some(ArticleStatus::Draft),
        "published" => Some(ArticleStatus::Published),
        "archived" => Some(ArticleStatus::Archived),
        _ => {
            errors.insert(
                "status".into(),
                "Status must be one of: draft, published, archived".into(),
            );
            None
        }
    }
}

pub fn validate_image_path(path: &str) -> bool {
    lazy_static! {
        static ref IMAGE_RE: Regex =
            Regex::new(r"^/uploads/articles/[a-zA-Z0-9\-_]+\.(jpg|jpeg|png|gif)$").unwrap();
    }
    IMAGE_RE.is_match(path)
}

fn validate_image(image: Option<&str>, errors: &mut FieldErrors) {
    if let Some(path) = image {
        if !validate_image_path(path) {
            errors.insert("image".into(), format!("{path} is not a valid image path!"));
        }
    }
}

/// Full validation for creation. Assumes the required-field check already
/// passed; `image` is the freshly staged public path, if any.
pub fn validate_create(form: &ArticleForm, image: Option<&str>) -> Result<NewArticle, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = form.name().unwrap_or_default();
    let description = form.description().unwrap_or_default();
    let author = form.author().unwrap_or_default();

    validate_name(name, &mut errors);
    validate_description(description, &mut errors);
    let price = parse_price(form.price.as_deref(), &mut errors).unwrap_or(0.0);
    let tags = parse_tags(form.tags.as_deref(), &mut errors).unwrap_or_default();
    let status = parse_status(form.status.as_deref(), &mut errors).unwrap_or(ArticleStatus::Draft);
    validate_image(image, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewArticle {
        name: name.to_string(),
        description: description.to_string(),
        price,
        author: author.to_string(),
        image: image.map(str::to_string),
        status,
        tags,
    })
}

/// Validation for updates: only supplied fields are checked and carried;
/// everything else is retained by the persistence layer. The returned
/// `image` is the freshly staged path only; the handler merges it with the
/// article's existing image.
pub fn validate_update(
    form: &ArticleForm,
    image: Option<&str>,
) -> Result<ArticleChanges, FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(name) = form.name() {
        validate_name(name, &mut errors);
    }
    if let Some(description) = form.description() {
        validate_description(description, &mut errors);
    }
    let price = parse_price(form.price.as_deref(), &mut errors);
    let tags = parse_tags(form.tags.as_deref(), &mut errors);
    let status = parse_status(form.status.as_deref(), &mut errors);
    validate_image(image, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ArticleChanges {
        name: form.name().map(str::to_string),
        description: form.description().map(str::to_string),
        price,
        author: form.author().map(str::to_string),
        tags,
        status,
        image: image.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> ArticleForm {
        let mut form = ArticleForm::default();
        form.set("name", "A proper article name".into());
        form.set(
            "description",
            "A description that is comfortably longer than the fifty character minimum.".into(),
        );
        form.set("author", "Jane Doe".into());
        form
    }

    #[test]
    fn split_tags_trims_each_entry() {
        assert_eq!(split_tags("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_tags("solo"), vec!["solo"]);
    }

    #[test]
    fn create_defaults_price_zero_status_draft_tags_empty() {
        let new = validate_create(&valid_form(), None).expect("valid");
        assert_eq!(new.price, 0.0);
        assert_eq!(new.status, ArticleStatus::Draft);
        assert!(new.tags.is_empty());
        assert!(new.image.is_none());
    }

    #[test]
    fn create_rejects_short_description_with_field_key() {
        let mut form = valid_form();
        form.set("description", "too short".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert_eq!(
            errors.get("description").map(String::as_str),
            Some("Description must be at least 50 characters")
        );
    }

    #[test]
    fn create_rejects_name_out_of_bounds() {
        let mut form = valid_form();
        form.set("name", "tiny".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert!(errors.contains_key("name"));

        let mut form = valid_form();
        form.set("name", "x".repeat(101));
        let errors = validate_create(&form, None).expect_err("invalid");
        assert_eq!(
            errors.get("name").map(String::as_str),
            Some("Article name cannot exceed 100 characters")
        );
    }

    #[test]
    fn create_rejects_negative_or_unparsable_price() {
        let mut form = valid_form();
        form.set("price", "-3".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert_eq!(
            errors.get("price").map(String::as_str),
            Some("Price cannot be negative")
        );

        let mut form = valid_form();
        form.set("price", "a lot".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert_eq!(
            errors.get("price").map(String::as_str),
            Some("Price must be a number")
        );
    }

    #[test]
    fn create_rejects_more_than_five_tags() {
        let mut form = valid_form();
        form.set("tags", "a,b,c,d,e,f".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert_eq!(
            errors.get("tags").map(String::as_str),
            Some("Cannot have more than 5 tags")
        );
    }

    #[test]
    fn create_parses_status_and_rejects_unknown() {
        let mut form = valid_form();
        form.set("status", "published".into());
        let new = validate_create(&form, None).expect("valid");
        assert_eq!(new.status, ArticleStatus::Published);

        let mut form = valid_form();
        form.set("status", "pending".into());
        let errors = validate_create(&form, None).expect_err("invalid");
        assert!(errors.contains_key("status"));
    }

    #[test]
    fn image_path_pattern_matches_served_uploads_only() {
        assert!(validate_image_path("/uploads/articles/cover-1a2b.jpg"));
        assert!(validate_image_path("/uploads/articles/x_y-z.jpeg"));
        assert!(validate_image_path("/uploads/articles/pic.png"));
        assert!(validate_image_path("/uploads/articles/anim.gif"));
        // webp stages fine but is not a valid persisted image path
        assert!(!validate_image_path("/uploads/articles/photo.webp"));
        assert!(!validate_image_path("/elsewhere/photo.jpg"));
        assert!(!validate_image_path("/uploads/articles/../escape.jpg"));
        assert!(!validate_image_path("/uploads/articles/.jpg"));
    }

    #[test]
    fn create_flags_bad_image_path() {
        let errors =
            validate_create(&valid_form(), Some("/uploads/articles/photo.webp")).expect_err("invalid");
        assert_eq!(
            errors.get("image").map(String::as_str),
            Some("/uploads/articles/photo.webp is not a valid image path!")
        );
    }

    #[test]
    fn update_keeps_absent_fields_out_of_the_changeset() {
        let mut form = ArticleForm::default();
        form.set("tags", "x, y".into());
        let changes = validate_update(&form, None).expect("valid");
        assert!(changes.name.is_none());
        assert!(changes.description.is_none());
        assert!(changes.price.is_none());
        assert!(changes.status.is_none());
        assert_eq!(changes.tags, Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn update_treats_empty_strings_as_absent() {
        let mut form = ArticleForm::default();
        form.set("name", "".into());
        form.set("tags", "".into());
        form.set("status", "".into());
        let changes = validate_update(&form, None).expect("valid");
        assert!(changes.name.is_none());
        assert!(changes.tags.is_none());
        assert!(changes.status.is_none());
    }

    #[test]
    fn update_still_validates_supplied_fields() {
        let mut form = ArticleForm::default();
        form.set("description", "nope".into());
        let errors = validate_update(&form, None).expect_err("invalid");
        assert!(errors.contains_key("description"));
    }
}
