/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;
use std::path::Path;

use super::{DEFAULT_PREFIX, NameTemplate, TemplateData, TemplateError};

/// Kept for configs written against the old prefix option.
const LEGACY_DEFAULT: &str = "default";

/// Input fields of a prefix template.
#[derive(Debug)]
pub struct PrefixFields<'a> {
    pub hostname: &'a str,
    pub exec: &'a str,
}

impl TemplateData for PrefixFields<'_> {
    fn field(&self, path: &[String]) -> Option<Cow<'_, str>> {
        match path {
            [f] if f == "Hostname" => Some(Cow::Borrowed(self.hostname)),
            [f] if f == "Exec" => Some(Cow::Borrowed(self.exec)),
            _ => None,
        }
    }
}

/// Render the prefix template with explicit field values.
pub fn render_prefix(tmpl: &str, hostname: &str, exec: &str) -> Result<String, TemplateError> {
    let tmpl = if tmpl == LEGACY_DEFAULT {
        DEFAULT_PREFIX
    } else {
        tmpl
    };
    let t = NameTemplate::parse(tmpl)?;
    t.render(&PrefixFields { hostname, exec })
}

/// Render the prefix template for the running process.
pub fn parse_prefix(tmpl: &str) -> Result<String, TemplateError> {
    let hostname = hostname();
    let exec = exec_name();
    render_prefix(tmpl, &hostname, &exec)
}

#[cfg(unix)]
fn hostname() -> String {
    let uname = rustix::system::uname();
    uname.nodename().to_string_lossy().into_owned()
}

#[cfg(not(unix))]
fn hostname() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_default()
}

fn exec_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix() {
        let p = render_prefix(DEFAULT_PREFIX, "Node1.Example.COM", "g3proxy").unwrap();
        assert_eq!(p, "node1_example_com.g3proxy");

        let p = render_prefix("default", "h", "bin").unwrap();
        assert_eq!(p, "h.bin");
    }

    #[test]
    fn literal_prefix() {
        assert_eq!(render_prefix("proxy", "h", "bin").unwrap(), "proxy");
        assert_eq!(render_prefix("", "h", "bin").unwrap(), "");
        assert_eq!(render_prefix("p.{{.Exec}}", "h", "bin").unwrap(), "p.bin");
    }

    #[test]
    fn bad_prefix() {
        assert!(render_prefix("{{.Exec", "h", "bin").is_err());
        assert_eq!(
            render_prefix("{{.Service}}", "h", "bin").unwrap_err(),
            TemplateError::UnknownField(".Service".to_string())
        );
    }

    #[test]
    fn process_prefix() {
        let p = parse_prefix("{{clean .Exec}}").unwrap();
        assert!(!p.is_empty());
        assert!(!p.contains('.'));
    }
}
