/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;

use thiserror::Error;

mod parse;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed action started at offset {0}")]
    UnclosedAction(usize),
    #[error("unclosed comment started at offset {0}")]
    UnclosedComment(usize),
    #[error("unterminated quoted string at offset {0}")]
    UnterminatedString(usize),
    #[error("unexpected {0:?} in action at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("missing value for command at offset {0}")]
    EmptyCommand(usize),
    #[error("function {0:?} not defined")]
    UnknownFunction(String),
    #[error("wrong number of args for {0}: want 1 got {1}")]
    WrongArgCount(&'static str, usize),
    #[error("can't give argument to non-function {0}")]
    NotAFunction(String),
    #[error("can't evaluate field {0}")]
    UnknownField(String),
}

/// Field lookup for template execution.
pub trait TemplateData {
    /// Resolve a field path, `.TargetURL.Host` is passed as `["TargetURL", "Host"]`.
    fn field(&self, path: &[String]) -> Option<Cow<'_, str>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Function {
    Clean,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "clean" => Some(Function::Clean),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Function::Clean => "clean",
        }
    }

    fn call(&self, arg: &str) -> String {
        match self {
            Function::Clean => super::clean(arg),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Operand {
    Field(Vec<String>),
    Literal(String),
}

impl Operand {
    fn eval(&self, data: &dyn TemplateData) -> Result<String, TemplateError> {
        match self {
            Operand::Field(path) => data
                .field(path)
                .map(|v| v.into_owned())
                .ok_or_else(|| TemplateError::UnknownField(format!(".{}", path.join(".")))),
            Operand::Literal(s) => Ok(s.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Operand(Operand),
    /// A function call, the argument is absent if piped in.
    Call(Function, Option<Operand>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Text(String),
    Action(Vec<Command>),
}

/// A compiled name template.
///
/// Supported actions: `{{ .Field }}`,
/// `{{ .A.B }}`, string literals, `{{ clean .Field }}`, `{{ .Field | clean }}`,
/// trim markers and comments.
#[derive(Clone, Debug)]
pub struct NameTemplate {
    nodes: Vec<Node>,
}

impl NameTemplate {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        let nodes = parse::parse(src)?;
        Ok(NameTemplate { nodes })
    }

    pub fn render(&self, data: &dyn TemplateData) -> Result<String, TemplateError> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(s) => out.push_str(s),
                Node::Action(pipeline) => out.push_str(&eval_pipeline(pipeline, data)?),
            }
        }
        Ok(out)
    }
}

fn eval_pipeline(pipeline: &[Command], data: &dyn TemplateData) -> Result<String, TemplateError> {
    let mut value = String::new();
    for cmd in pipeline {
        value = match cmd {
            Command::Operand(op) => op.eval(data)?,
            Command::Call(f, Some(op)) => f.call(&op.eval(data)?),
            Command::Call(f, None) => f.call(&value),
        };
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestData;

    impl TemplateData for TestData {
        fn field(&self, path: &[String]) -> Option<Cow<'_, str>> {
            match path.iter().map(|s| s.as_str()).collect::<Vec<_>>().as_slice() {
                ["Name"] => Some(Cow::Borrowed("My.Name")),
                ["Empty"] => Some(Cow::Borrowed("")),
                ["Url", "Host"] => Some(Cow::Borrowed("h:1")),
                _ => None,
            }
        }
    }

    fn render(src: &str) -> Result<String, TemplateError> {
        NameTemplate::parse(src)?.render(&TestData)
    }

    #[test]
    fn plain_text() {
        assert_eq!(render("abc").unwrap(), "abc");
        assert_eq!(render("").unwrap(), "");
    }

    #[test]
    fn fields() {
        assert_eq!(render("{{.Name}}").unwrap(), "My.Name");
        assert_eq!(render("x-{{ .Url.Host }}-y").unwrap(), "x-h:1-y");
        assert_eq!(render("{{.Empty}}").unwrap(), "");
    }

    #[test]
    fn clean_call_and_pipe() {
        assert_eq!(render("{{clean .Name}}").unwrap(), "my_name");
        assert_eq!(render("{{.Name | clean}}").unwrap(), "my_name");
        assert_eq!(render("{{ clean .Empty }}").unwrap(), "_");
        assert_eq!(render("{{.Url.Host|clean|clean}}").unwrap(), "h_1");
    }

    #[test]
    fn literals() {
        assert_eq!(render(r#"{{"a.b"}}"#).unwrap(), "a.b");
        assert_eq!(render(r#"{{clean "A.B"}}"#).unwrap(), "a_b");
        assert_eq!(render(r#"{{"q\"x"}}"#).unwrap(), "q\"x");
        assert_eq!(render("{{`r\\n`}}").unwrap(), "r\\n");
    }

    #[test]
    fn trim_and_comment() {
        assert_eq!(render("a  {{- .Empty -}}  b").unwrap(), "ab");
        assert_eq!(render("a{{/* note */}}b").unwrap(), "ab");
        assert_eq!(render("a {{- /* note */ -}} b").unwrap(), "ab");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            NameTemplate::parse("{{.Name").unwrap_err(),
            TemplateError::UnclosedAction(0)
        );
        assert_eq!(
            NameTemplate::parse("{{}}").unwrap_err(),
            TemplateError::EmptyCommand(2)
        );
        assert_eq!(
            NameTemplate::parse("{{upper .Name}}").unwrap_err(),
            TemplateError::UnknownFunction("upper".to_string())
        );
        assert_eq!(
            NameTemplate::parse("{{clean}}").unwrap_err(),
            TemplateError::WrongArgCount("clean", 0)
        );
        assert_eq!(
            NameTemplate::parse("{{.Name | clean .Name}}").unwrap_err(),
            TemplateError::WrongArgCount("clean", 2)
        );
        assert_eq!(
            NameTemplate::parse("{{.Name .Name}}").unwrap_err(),
            TemplateError::NotAFunction(".Name".to_string())
        );
        assert!(matches!(
            NameTemplate::parse("{{\"abc}}").unwrap_err(),
            TemplateError::UnterminatedString(_)
        ));
        assert!(matches!(
            NameTemplate::parse("{{ .Name + }}").unwrap_err(),
            TemplateError::UnexpectedChar('+', _)
        ));
        assert!(matches!(
            NameTemplate::parse("{{/* abc").unwrap_err(),
            TemplateError::UnclosedComment(_)
        ));
    }

    #[test]
    fn unknown_field() {
        let t = NameTemplate::parse("{{.Missing.Sub}}").unwrap();
        assert_eq!(
            t.render(&TestData).unwrap_err(),
            TemplateError::UnknownField(".Missing.Sub".to_string())
        );
    }
}
