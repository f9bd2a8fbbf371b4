// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Custom validators and validation helpers

use std::borrow::Cow;
use std::collections::HashMap;
use validator::{ValidationError, ValidationErrors};

/// Accepts absolute http(s) URLs
pub fn validate_link(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut error = ValidationError::new("url");
            error.message = Some(Cow::Borrowed("must be an absolute http(s) URL"));
            Err(error)
        }
    }
}

/// Accepts lowercase ASCII words separated by single hyphens
pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    let well_formed = !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if well_formed {
        Ok(())
    } else {
        let mut error = ValidationError::new("slug");
        error.message = Some(Cow::Borrowed(
            "must contain only lowercase letters, digits and single hyphens",
        ));
        Err(error)
    }
}

/// Derive a URL slug from a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Flatten validator output into `field -> messages`, the shape carried by
/// `ProblemDetails.errors`. Nested struct errors are prefixed with the parent
/// field name.
pub fn field_messages(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    collect(errors, None, &mut out);
    out
}

fn collect(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    out: &mut HashMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                let messages = out.entry(name).or_insert_with(Vec::new);
                messages.extend(list.iter().map(|error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("failed {} validation", error.code),
                }));
            }
            validator::ValidationErrorsKind::Struct(inner) => collect(inner, Some(&name), out),
            validator::ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, Some(&format!("{name}[{index}]")), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Axum -- 2025 "), "rust-axum-2025");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_validator() {
        assert!(validate_slug("my-first-post").is_ok());
        assert!(validate_slug("My-Post").is_err());
        assert!(validate_slug("double--dash").is_err());
        assert!(validate_slug("-leading").is_err());
    }

    #[test]
    fn link_validator() {
        assert!(validate_link("https://example.com/work").is_ok());
        assert!(validate_link("ftp://example.com").is_err());
        assert!(validate_link("example.com").is_err());
    }

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn field_messages_uses_custom_message_or_code() {
        let form = Form {
            name: "ab".into(),
            email: "nope".into(),
        };
        let errors = form.validate().unwrap_err();
        let messages = field_messages(&errors);
        assert_eq!(messages["name"], vec!["too short".to_string()]);
        assert_eq!(messages["email"], vec!["failed email validation".to_string()]);
    }
}
