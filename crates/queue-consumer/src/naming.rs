//! Environment-qualified queue and topic names.
//!
//! Every queue is named `{base}_{environment}` and every topic
//! `{prefix}_{base}_{environment}` (prefix optional), so that the same consumer
//! deployed to two environments never shares a backend resource. Resolution
//! refuses to produce a name without an environment.

use crate::error::QueueError;
use crate::message::{QueueName, TopicName};

/// Separator used by nested consumer names
const NESTING_SEPARATOR: &str = "::";

/// Convert a type-style name into lower snake case.
///
/// Acronyms are kept together (`HTTPQueue` becomes `http_queue`), hyphens become
/// underscores and `::` nesting is flattened to `_`.
pub fn underscore(name: &str) -> String {
    let chars: Vec<char> = name.replace(NESTING_SEPARATOR, "/").chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }

        match c {
            '-' | '/' => out.push('_'),
            _ => out.push(c.to_ascii_lowercase()),
        }
    }

    out
}

/// Bare name of a Rust type: module path and generic arguments removed
pub fn type_base_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit(NESTING_SEPARATOR)
        .next()
        .unwrap_or(without_generics)
}

/// Resolve the queue name for a consumer identity.
///
/// `base_override` replaces the name derived from `identity` verbatim.
pub fn resolve_queue_name(
    identity: &str,
    base_override: Option<&str>,
    environment: Option<&str>,
) -> Result<QueueName, QueueError> {
    let environment = environment
        .filter(|e| !e.is_empty())
        .ok_or(QueueError::EnvironmentNotSet)?;

    let base = match base_override {
        Some(name) => name.to_string(),
        None => underscore(identity),
    };

    Ok(QueueName::new(format!("{}_{}", base, environment))?)
}

/// Resolve the full topic name for a base topic name
pub fn resolve_topic_name(
    base: &str,
    prefix: Option<&str>,
    environment: Option<&str>,
) -> Result<TopicName, QueueError> {
    let environment = environment
        .filter(|e| !e.is_empty())
        .ok_or(QueueError::EnvironmentNotSet)?;

    let full_name = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}_{}_{}", prefix, base, environment),
        None => format!("{}_{}", base, environment),
    };

    Ok(TopicName::new(full_name)?)
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
