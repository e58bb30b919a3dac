/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;
use std::str::FromStr;

use http::Uri;

use super::{DOT_SEPARATOR, NameTemplate, TemplateData, TemplateError};

const SELF_TEST_SERVICE: &str = "testservice";
const SELF_TEST_HOST: &str = "test.example.com";
const SELF_TEST_PATH: &str = "/test";
const SELF_TEST_TARGET: &str = "http://127.0.0.1:12345/";

/// Input fields of a route name template.
#[derive(Debug, Default)]
pub struct RouteFields<'a> {
    pub service: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub target: &'a str,
}

impl RouteFields<'_> {
    /// Sub-fields of `.TargetURL`. The authority is kept as written, so an
    /// explicit default port such as `:80` stays in `Host` and `Port`.
    fn target_url_field(&self, name: &str) -> Option<Cow<'_, str>> {
        let uri = Uri::from_str(self.target).ok();
        let authority = uri.as_ref().and_then(|u| u.authority()).map(|a| {
            let s = a.as_str();
            s.rsplit_once('@').map(|(_, h)| h).unwrap_or(s)
        });
        let value = match name {
            "Host" => authority.unwrap_or_default().to_string(),
            "Hostname" => {
                let host = uri
                    .as_ref()
                    .and_then(|u| u.host())
                    .unwrap_or_default();
                host.strip_prefix('[')
                    .and_then(|h| h.strip_suffix(']'))
                    .unwrap_or(host)
                    .to_string()
            }
            "Port" => uri
                .as_ref()
                .and_then(|u| u.port())
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            "Scheme" => uri
                .as_ref()
                .and_then(|u| u.scheme_str())
                .unwrap_or_default()
                .to_string(),
            "Path" => uri.as_ref().map(|u| u.path().to_string()).unwrap_or_default(),
            _ => return None,
        };
        Some(Cow::Owned(value))
    }
}

impl TemplateData for RouteFields<'_> {
    fn field(&self, path: &[String]) -> Option<Cow<'_, str>> {
        match path {
            [f] => match f.as_str() {
                "Service" => Some(Cow::Borrowed(self.service)),
                "Host" => Some(Cow::Borrowed(self.host)),
                "Path" => Some(Cow::Borrowed(self.path)),
                "TargetURL" => Some(Cow::Borrowed(self.target)),
                _ => None,
            },
            [f, sub] if f == "TargetURL" => self.target_url_field(sub),
            _ => None,
        }
    }
}

/// Compiled route metric name template.
#[derive(Clone, Debug)]
pub struct RouteNameTemplate {
    template: NameTemplate,
}

impl RouteNameTemplate {
    /// Parse the template and render a sample route with it, so that field
    /// errors show up here and not on the first request.
    pub fn compile(tmpl: &str) -> Result<Self, TemplateError> {
        let template = NameTemplate::parse(tmpl)?;
        let t = RouteNameTemplate { template };
        t.target_name(
            SELF_TEST_SERVICE,
            SELF_TEST_HOST,
            SELF_TEST_PATH,
            SELF_TEST_TARGET,
        )?;
        Ok(t)
    }

    pub fn target_name(
        &self,
        service: &str,
        host: &str,
        path: &str,
        target: &str,
    ) -> Result<String, TemplateError> {
        let fields = RouteFields {
            service,
            host,
            path,
            target,
        };
        self.template.render(&fields)
    }

    /// Render the route part of `name` from the bound label values.
    ///
    /// Recognized keys are `service`, `host`, `path` and `target`, others are
    /// ignored. The last dotted segment of `name`, such as `.rx`, is kept as
    /// the suffix of the result.
    pub fn route_name_with<K, V>(
        &self,
        name: &str,
        keys: &[K],
        values: &[V],
    ) -> Result<String, TemplateError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields = RouteFields::default();
        for (k, v) in keys.iter().zip(values.iter()) {
            match k.as_ref() {
                "service" => fields.service = v.as_ref(),
                "host" => fields.host = v.as_ref(),
                "path" => fields.path = v.as_ref(),
                "target" => fields.target = v.as_ref(),
                _ => {}
            }
        }

        let mut s = self.template.render(&fields)?;
        if let Some(i) = name.rfind(DOT_SEPARATOR) {
            s.push_str(&name[i..]);
        }
        Ok(s)
    }
}
