/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod template;
pub use template::{NameTemplate, TemplateData, TemplateError};

mod route;
pub use route::{RouteFields, RouteNameTemplate};

mod prefix;
pub use prefix::{PrefixFields, parse_prefix, render_prefix};

pub const DOT_SEPARATOR: &str = ".";
pub const PIPE_SEPARATOR: &str = "|";

/// Metric names starting with this segment are route metrics.
pub const ROUTE_PREFIX: &str = "route";

/// Route metric names for backends without label support.
pub const DEFAULT_ROUTE_NAMES: &str =
    "{{clean .Service}}.{{clean .Host}}.{{clean .Path}}.{{clean .TargetURL.Host}}";

pub const DEFAULT_PREFIX: &str = "{{clean .Hostname}}.{{clean .Exec}}";

/// Make a value safe to be used as a single segment of a dotted name.
pub fn clean(s: &str) -> String {
    if s.is_empty() {
        return "_".to_string();
    }
    s.replace(['.', ':'], "_").to_lowercase()
}

pub fn flatten<S: AsRef<str>>(name: &str, values: &[S], separator: &str) -> String {
    if values.is_empty() {
        return name.to_string();
    }
    let mut s = String::with_capacity(name.len() + values.len() * 16);
    s.push_str(name);
    for v in values {
        s.push_str(separator);
        s.push_str(v.as_ref());
    }
    s
}

/// Serialize label pairs as `prefix k1<field_sep>v1<record_sep>k2<field_sep>v2`.
///
/// Missing values are written as empty strings.
pub fn serialize_labels<K, V>(
    keys: &[K],
    values: &[V],
    prefix: &str,
    field_sep: &str,
    record_sep: &str,
) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if keys.is_empty() {
        return String::new();
    }
    let mut s = String::from(prefix);
    for (i, k) in keys.iter().enumerate() {
        if i > 0 {
            s.push_str(record_sep);
        }
        s.push_str(k.as_ref());
        s.push_str(field_sep);
        if let Some(v) = values.get(i) {
            s.push_str(v.as_ref());
        }
    }
    s
}

/// Prepend a non-empty prefix with a dot.
pub(crate) fn with_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{DOT_SEPARATOR}{name}")
    }
}

/// Whether the metric name should be rendered by the route template.
///
/// Only a full leading `route` segment matches, `router.x` does not.
pub fn is_route_metric(name: &str) -> bool {
    match name.strip_prefix(ROUTE_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with(DOT_SEPARATOR),
        None => false,
    }
}
