/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{Command, Function, Node, Operand, TemplateError};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const RIGHT_TRIM_DELIM: &str = "-}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

enum Token {
    Field(Vec<String>),
    Ident(String),
    Literal(String),
    Pipe,
    Close { trim: bool },
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    action_start: usize,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_space(&mut self) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_space(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos > start
    }

    fn next_token(&mut self) -> Result<(usize, Token), TemplateError> {
        let spaced = self.skip_space();
        let offset = self.pos;
        let rest = self.rest();

        if spaced && rest.starts_with(RIGHT_TRIM_DELIM) {
            self.pos += RIGHT_TRIM_DELIM.len();
            return Ok((offset, Token::Close { trim: true }));
        }
        if rest.starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            return Ok((offset, Token::Close { trim: false }));
        }

        match self.peek_char() {
            None => Err(TemplateError::UnclosedAction(self.action_start)),
            Some('|') => {
                self.pos += 1;
                Ok((offset, Token::Pipe))
            }
            Some('.') => self.lex_field(),
            Some('"') => self.lex_quoted(),
            Some('`') => self.lex_raw(),
            Some(c) if is_ident_start(c) => {
                let ident = self.take_ident();
                Ok((offset, Token::Ident(ident)))
            }
            Some(c) => Err(TemplateError::UnexpectedChar(c, offset)),
        }
    }

    fn take_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_ident_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.src[start..self.pos].to_string()
    }

    fn lex_field(&mut self) -> Result<(usize, Token), TemplateError> {
        let offset = self.pos;
        let mut path = Vec::new();
        while self.peek_char() == Some('.') {
            self.pos += 1;
            let segment = self.take_ident();
            if segment.is_empty() {
                return Err(TemplateError::UnexpectedChar('.', self.pos - 1));
            }
            path.push(segment);
        }
        Ok((offset, Token::Field(path)))
    }

    fn lex_quoted(&mut self) -> Result<(usize, Token), TemplateError> {
        let offset = self.pos;
        self.pos += 1;
        let mut s = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                return Err(TemplateError::UnterminatedString(offset));
            };
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok((offset, Token::Literal(s))),
                '\n' => return Err(TemplateError::UnterminatedString(offset)),
                '\\' => {
                    let Some(e) = self.peek_char() else {
                        return Err(TemplateError::UnterminatedString(offset));
                    };
                    self.pos += e.len_utf8();
                    match e {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        _ => s.push(e),
                    }
                }
                _ => s.push(c),
            }
        }
    }

    fn lex_raw(&mut self) -> Result<(usize, Token), TemplateError> {
        let offset = self.pos;
        let body = &self.src[offset + 1..];
        let Some(end) = body.find('`') else {
            return Err(TemplateError::UnterminatedString(offset));
        };
        self.pos = offset + 1 + end + 1;
        Ok((offset, Token::Literal(body[..end].to_string())))
    }
}

impl Operand {
    fn describe(&self) -> String {
        match self {
            Operand::Field(path) => format!(".{}", path.join(".")),
            Operand::Literal(s) => format!("{s:?}"),
        }
    }
}

fn token_operand(token: Token, offset: usize) -> Result<Operand, TemplateError> {
    match token {
        Token::Field(path) => Ok(Operand::Field(path)),
        Token::Literal(s) => Ok(Operand::Literal(s)),
        Token::Ident(name) => match Function::lookup(&name) {
            Some(f) => Err(TemplateError::WrongArgCount(f.name(), 0)),
            None => Err(TemplateError::UnknownFunction(name)),
        },
        Token::Pipe => Err(TemplateError::UnexpectedChar('|', offset)),
        Token::Close { .. } => Err(TemplateError::EmptyCommand(offset)),
    }
}

/// Build the command at `index` of a pipeline.
///
/// Only the first command takes an explicit argument, later ones get the
/// piped value.
fn build_command(
    tokens: Vec<(usize, Token)>,
    index: usize,
    end_offset: usize,
) -> Result<Command, TemplateError> {
    let mut iter = tokens.into_iter();
    let Some((offset, first)) = iter.next() else {
        return Err(TemplateError::EmptyCommand(end_offset));
    };

    if let Token::Ident(name) = first {
        let f = Function::lookup(&name).ok_or(TemplateError::UnknownFunction(name))?;
        let mut args = Vec::new();
        for (offset, token) in iter {
            args.push(token_operand(token, offset)?);
        }
        let want = if index == 0 { 1 } else { 0 };
        if args.len() != want {
            let got = if index == 0 { args.len() } else { args.len() + 1 };
            return Err(TemplateError::WrongArgCount(f.name(), got));
        }
        return Ok(Command::Call(f, args.pop()));
    }

    let op = token_operand(first, offset)?;
    if index > 0 || iter.next().is_some() {
        return Err(TemplateError::NotAFunction(op.describe()));
    }
    Ok(Command::Operand(op))
}

/// Parse one action, `body_start` is the offset right after the left delimiter
/// and its trim marker.
///
/// Returns the pipeline (`None` for a comment), the offset after the action,
/// and whether the following text should be trimmed.
fn parse_action(
    src: &str,
    open: usize,
    body_start: usize,
) -> Result<(Option<Vec<Command>>, usize, bool), TemplateError> {
    let mut lexer = Lexer {
        src,
        pos: body_start,
        action_start: open,
    };

    lexer.skip_space();
    if lexer.rest().starts_with(LEFT_COMMENT) {
        let comment_start = lexer.pos;
        let body = &lexer.rest()[LEFT_COMMENT.len()..];
        let Some(i) = body.find(RIGHT_COMMENT) else {
            return Err(TemplateError::UnclosedComment(comment_start));
        };
        lexer.pos += LEFT_COMMENT.len() + i + RIGHT_COMMENT.len();
        return match lexer.next_token() {
            Ok((_, Token::Close { trim })) => Ok((None, lexer.pos, trim)),
            _ => Err(TemplateError::UnclosedComment(comment_start)),
        };
    }

    let mut pipeline = Vec::new();
    let mut current = Vec::new();
    loop {
        let (offset, token) = lexer.next_token()?;
        match token {
            Token::Pipe => {
                let cmd = build_command(std::mem::take(&mut current), pipeline.len(), offset)?;
                pipeline.push(cmd);
            }
            Token::Close { trim } => {
                let cmd = build_command(current, pipeline.len(), offset)?;
                pipeline.push(cmd);
                return Ok((Some(pipeline), lexer.pos, trim));
            }
            token => current.push((offset, token)),
        }
    }
}

fn has_left_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_space)
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool, trim_end: bool) {
    let mut text = text;
    if trim_start {
        text = text.trim_start_matches(is_space);
    }
    if trim_end {
        text = text.trim_end_matches(is_space);
    }
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

pub(super) fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    loop {
        let rest = &src[pos..];
        let Some(i) = rest.find(LEFT_DELIM) else {
            push_text(&mut nodes, rest, trim_next, false);
            return Ok(nodes);
        };

        let open = pos + i;
        let mut body_start = open + LEFT_DELIM.len();
        let trim_prev = has_left_trim_marker(&src[body_start..]);
        if trim_prev {
            body_start += 1;
        }
        push_text(&mut nodes, &src[pos..open], trim_next, trim_prev);

        let (pipeline, end, trim) = parse_action(src, open, body_start)?;
        if let Some(pipeline) = pipeline {
            nodes.push(Node::Action(pipeline));
        }
        pos = end;
        trim_next = trim;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_nodes() {
        let nodes = parse("a.{{.B}}.c").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("a.".to_string()),
                Node::Action(vec![Command::Operand(Operand::Field(vec!["B".to_string()]))]),
                Node::Text(".c".to_string()),
            ]
        );
    }

    #[test]
    fn pipeline_commands() {
        let nodes = parse("{{ .A.B | clean }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Action(vec![
                Command::Operand(Operand::Field(vec!["A".to_string(), "B".to_string()])),
                Command::Call(Function::Clean, None),
            ])]
        );
    }

    #[test]
    fn merge_text_around_comment() {
        let nodes = parse("a{{/* x */}}b").unwrap();
        assert_eq!(nodes, vec![Node::Text("ab".to_string())]);
    }

    #[test]
    fn minus_without_space() {
        assert!(matches!(
            parse("{{-.A}}").unwrap_err(),
            TemplateError::UnexpectedChar('-', 2)
        ));
    }

    #[test]
    fn dangling_dot() {
        assert!(matches!(
            parse("{{.A.}}").unwrap_err(),
            TemplateError::UnexpectedChar('.', 4)
        ));
    }

    #[test]
    fn unterminated_raw() {
        assert_eq!(
            parse("{{`abc}}").unwrap_err(),
            TemplateError::UnterminatedString(2)
        );
    }
}
