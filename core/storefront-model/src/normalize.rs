//! Record normalizer, the validation boundary for raw catalog records.
//!
//! Admin forms, seed files and snapshot imports all produce loosely typed JSON:
//! prices arrive as strings, checkboxes as `"on"`, image lists as bare URLs.
//! [`normalize`] turns one such record into a canonical [`Product`] or rejects
//! it with a [`ValidationError`] naming the offending field. It is a pure
//! function; nothing downstream sees a record that has not passed through it.

use crate::{Product, ProductImage, ProductVideo, VideoPlatform};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Maximum product name length, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// A raw record failed validation or type coercion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    /// Field path, e.g. `price` or `images[2].url`.
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, "required field is missing")
    }

    fn wrong_type(field: &str, expected: &str, got: &Value) -> Self {
        Self::new(field, format!("expected {expected}, got {}", type_name(got)))
    }
}

/// Validates and canonicalizes a raw catalog record.
pub fn normalize(raw: &Value) -> Result<Product, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::wrong_type("record", "an object", raw))?;

    let name = required_text(obj, "name")?;
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    let description = required_text(obj, "description")?;
    let price = coerce_price(present(obj, "price"))?;
    let inventory = coerce_inventory(present(obj, "inventory"))?;
    let category = required_text(obj, "category")?;
    let featured = coerce_bool("featured", present(obj, "featured"))?;
    let images = coerce_images(present(obj, "images"), &name)?;
    let image_path = coerce_image_path(obj)?;
    let video = coerce_video(present(obj, "video"))?;
    let created_at = coerce_timestamp("createdAt", present(obj, "createdAt"))?;
    let updated_at = coerce_timestamp("updatedAt", present(obj, "updatedAt"))?;

    Ok(Product {
        name,
        description,
        price,
        inventory,
        category,
        featured,
        images,
        image_path,
        video,
        created_at,
        updated_at,
    })
}

/// Returns the field value, treating explicit `null` as absent.
fn present<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required_text(obj: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match present(obj, field) {
        None => Err(ValidationError::missing(field)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::new(field, "must not be empty"))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(other) => Err(ValidationError::wrong_type(field, "a string", other)),
    }
}

fn optional_text(field: &str, value: Option<&Value>) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(ValidationError::wrong_type(field, "a string", other)),
    }
}

fn parse_decimal(field: &str, text: &str) -> Result<Decimal, ValidationError> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| ValidationError::new(field, format!("`{text}` is not a number")))
}

fn numeric(field: &str, value: &Value) -> Result<Decimal, ValidationError> {
    match value {
        Value::Number(n) => parse_decimal(field, &n.to_string()),
        Value::String(s) => parse_decimal(field, s),
        other => Err(ValidationError::wrong_type(field, "a number", other)),
    }
}

fn coerce_price(value: Option<&Value>) -> Result<Decimal, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::missing("price"))?;
    let price = numeric("price", value)?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("price", "must not be negative"));
    }
    Ok(price.normalize())
}

fn coerce_inventory(value: Option<&Value>) -> Result<u32, ValidationError> {
    // Seed data routinely omits stock counts.
    let Some(value) = value else {
        return Ok(0);
    };
    let count = numeric("inventory", value)?;
    if count.is_sign_negative() && !count.is_zero() {
        return Err(ValidationError::new("inventory", "must not be negative"));
    }
    if !count.fract().is_zero() {
        return Err(ValidationError::new("inventory", "must be a whole number"));
    }
    count
        .to_u32()
        .ok_or_else(|| ValidationError::new("inventory", "is too large"))
}

fn coerce_bool(field: &str, value: Option<&Value>) -> Result<bool, ValidationError> {
    match value {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            other => Err(ValidationError::new(
                field,
                format!("`{other}` is not a boolean"),
            )),
        },
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ValidationError::new(field, format!("`{n}` is not a boolean"))),
        },
        Some(other) => Err(ValidationError::wrong_type(field, "a boolean", other)),
    }
}

fn coerce_images(value: Option<&Value>, name: &str) -> Result<Vec<ProductImage>, ValidationError> {
    let entries = match value {
        None => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => return Err(ValidationError::wrong_type("images", "an array", other)),
    };

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| coerce_image(i, entry, name))
        .collect()
}

fn coerce_image(index: usize, entry: &Value, name: &str) -> Result<ProductImage, ValidationError> {
    let field = format!("images[{index}]");
    match entry {
        Value::String(url) => {
            let url = url.trim();
            if url.is_empty() {
                return Err(ValidationError::new(field, "url must not be empty"));
            }
            Ok(ProductImage::new(url, name))
        }
        Value::Object(obj) => {
            let url = required_text(obj, "url")
                .map_err(|e| ValidationError::new(format!("{field}.url"), e.reason))?;
            let alt_text = optional_text(&format!("{field}.altText"), present(obj, "altText"))?
                .unwrap_or_else(|| name.to_string());
            Ok(ProductImage { url, alt_text })
        }
        other => Err(ValidationError::wrong_type(&field, "a string or an object", other)),
    }
}

fn coerce_image_path(obj: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    if let Some(path) = present(obj, "imagePath") {
        return optional_text("imagePath", Some(path));
    }
    // Older exports used `image` for the single-path field.
    optional_text("image", present(obj, "image"))
}

fn coerce_video(value: Option<&Value>) -> Result<Option<ProductVideo>, ValidationError> {
    let obj = match value {
        None => return Ok(None),
        Some(Value::Object(obj)) => obj,
        Some(other) => return Err(ValidationError::wrong_type("video", "an object", other)),
    };

    let url = required_text(obj, "url")
        .map_err(|e| ValidationError::new("video.url", e.reason))?;
    let platform_text = required_text(obj, "platform")
        .map_err(|e| ValidationError::new("video.platform", e.reason))?;
    let platform = VideoPlatform::from_str(&platform_text)
        .map_err(|reason| ValidationError::new("video.platform", reason))?;
    let title = optional_text("video.title", present(obj, "title"))?.unwrap_or_default();

    Ok(Some(ProductVideo {
        url,
        platform,
        title,
    }))
}

fn coerce_timestamp(
    field: &str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| ValidationError::new(field, format!("not an ISO-8601 timestamp: {e}"))),
        Some(other) => Err(ValidationError::wrong_type(field, "a timestamp string", other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
