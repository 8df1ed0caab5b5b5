// src/core/template.rs

use crate::models::ExecutionContext;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;

lazy_static! {
    // `{{` and `}}` are escaped braces; `{name}` is a placeholder.
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is valid");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing parameter '{0}'.")]
    MissingParameter(String),
    #[error("Template contains an empty placeholder '{{}}'.")]
    EmptyPlaceholder,
}

/// Substitutes every `{name}` in `template` with the matching context value.
///
/// Fails on the first placeholder (left to right) whose key is absent from the context.
pub fn bind(template: &str, ctx: &ExecutionContext) -> Result<String, TemplateError> {
    let mut failure: Option<TemplateError> = None;

    let bound = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
        if failure.is_some() {
            return String::new();
        }
        let Some(key) = caps.get(1).map(|m| m.as_str()) else {
            // Escaped brace: keep a single one.
            return caps
                .get(0)
                .and_then(|m| m.as_str().chars().next())
                .map(String::from)
                .unwrap_or_default();
        };
        let key = key.trim();
        if key.is_empty() {
            failure = Some(TemplateError::EmptyPlaceholder);
            return String::new();
        }
        match ctx.get(key) {
            Some(value) => value.to_string(),
            None => {
                failure = Some(TemplateError::MissingParameter(key.to_string()));
                String::new()
            }
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(bound.into_owned()),
    }
}

/// The distinct placeholder names of a template, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        if let Some(key) = caps.get(1).map(|m| m.as_str().trim()) {
            if !key.is_empty() && !names.iter().any(|n| n == key) {
                names.push(key.to_string());
            }
        }
    }
    names
}
