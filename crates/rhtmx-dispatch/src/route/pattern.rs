/// Path-template parsing and matching
///
/// Pure functional parsing of compiled path templates (`/users/:id`,
/// `/docs/:rest*`, `/foo{/:id}?`) into typed tokens, and a regex-backed
/// matcher built from those tokens.

use std::collections::HashMap;

use regex::Regex;

use crate::error::PatternError;

/// Characters that make a pathname a template rather than a literal path
const TEMPLATE_CHARS: [char; 8] = ['*', ':', '{', '}', '+', '?', '(', ')'];

/// Checks whether a pathname needs template matching
///
/// Pure predicate function: pathname -> bool
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::pattern::is_template;
///
/// assert!(!is_template("/about"));
/// assert!(is_template("/users/:id"));
/// assert!(is_template("*"));
/// ```
pub fn is_template(pathname: &str) -> bool {
    pathname.contains(&TEMPLATE_CHARS[..])
}

/// One token of a path template
///
/// Functional sum type for matching template parts.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateToken {
    /// Literal text matched verbatim
    Literal(String),
    /// `:name` - one path segment (or the text up to the next literal)
    Param(String),
    /// `:name*` or `:name+` - one or more whole segments
    CatchAll(String),
    /// `*` - anything, including nothing
    Wildcard,
    /// `{ ... }?` - tokens matched zero or one time
    Optional(Vec<TemplateToken>),
}

impl TemplateToken {
    fn starts_with_capture(&self) -> bool {
        match self {
            TemplateToken::Literal(_) => false,
            TemplateToken::Optional(inner) => {
                inner.first().is_some_and(TemplateToken::starts_with_capture)
            }
            _ => true,
        }
    }

    fn ends_with_capture(&self) -> bool {
        match self {
            TemplateToken::Literal(_) => false,
            TemplateToken::Optional(inner) => {
                inner.last().is_some_and(TemplateToken::ends_with_capture)
            }
            _ => true,
        }
    }
}

/// Parses a template into tokens (pure function)
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::pattern::{parse_template, TemplateToken};
///
/// let tokens = parse_template("/users/:id").unwrap();
/// assert_eq!(tokens, vec![
///     TemplateToken::Literal("/users/".to_string()),
///     TemplateToken::Param("id".to_string()),
/// ]);
/// ```
pub fn parse_template(pattern: &str) -> Result<Vec<TemplateToken>, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut parser = TemplateParser {
        pattern,
        chars: &chars,
        pos: 0,
    };
    parser.parse(false)
}

struct TemplateParser<'a> {
    pattern: &'a str,
    chars: &'a [char],
    pos: usize,
}

impl TemplateParser<'_> {
    fn invalid(&self, reason: &str) -> PatternError {
        PatternError::InvalidTemplate {
            pattern: self.pattern.to_string(),
            reason: reason.to_string(),
        }
    }

    fn adjacent(&self) -> PatternError {
        PatternError::AdjacentParams {
            path: self.pattern.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn parse(&mut self, in_group: bool) -> Result<Vec<TemplateToken>, PatternError> {
        let mut tokens: Vec<TemplateToken> = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    let escaped = self
                        .chars
                        .get(self.pos + 1)
                        .copied()
                        .ok_or_else(|| self.invalid("trailing escape"))?;
                    push_literal(&mut tokens, escaped);
                    self.pos += 2;
                }
                ':' => {
                    self.pos += 1;
                    let token = self.parse_param(&mut tokens)?;
                    self.push_capture(&mut tokens, token)?;
                }
                '*' => {
                    self.pos += 1;
                    self.push_capture(&mut tokens, TemplateToken::Wildcard)?;
                }
                '{' => {
                    if in_group {
                        return Err(self.invalid("nested groups are not supported"));
                    }
                    self.pos += 1;
                    let inner = self.parse(true)?;
                    // parse(true) stops on the closing brace
                    self.pos += 1;
                    if self.peek() == Some('?') {
                        self.pos += 1;
                        self.push_capture(&mut tokens, TemplateToken::Optional(inner))?;
                    } else {
                        for token in inner {
                            match token {
                                TemplateToken::Literal(text) => {
                                    text.chars().for_each(|c| push_literal(&mut tokens, c))
                                }
                                other => self.push_capture(&mut tokens, other)?,
                            }
                        }
                    }
                }
                '}' if in_group => return Ok(tokens),
                '}' => return Err(self.invalid("unbalanced '}'")),
                '(' | ')' | '+' | '?' => {
                    return Err(self.invalid(&format!("unexpected '{}'", c)));
                }
                _ => {
                    push_literal(&mut tokens, c);
                    self.pos += 1;
                }
            }
        }

        if in_group {
            Err(self.invalid("unclosed '{'"))
        } else {
            Ok(tokens)
        }
    }

    /// Parses `name` plus an optional `*`, `+` or `?` modifier after a `:`
    fn parse_param(&mut self, tokens: &mut Vec<TemplateToken>) -> Result<TemplateToken, PatternError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.invalid("missing parameter name"));
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        let token = match self.peek() {
            Some('*') | Some('+') => {
                self.pos += 1;
                TemplateToken::CatchAll(name)
            }
            Some('?') => {
                self.pos += 1;
                // `/:id?` makes the separating slash optional too
                let mut inner = Vec::new();
                if take_trailing_slash(tokens) {
                    inner.push(TemplateToken::Literal("/".to_string()));
                }
                inner.push(TemplateToken::Param(name));
                TemplateToken::Optional(inner)
            }
            _ => TemplateToken::Param(name),
        };
        Ok(token)
    }

    fn push_capture(
        &self,
        tokens: &mut Vec<TemplateToken>,
        token: TemplateToken,
    ) -> Result<(), PatternError> {
        let touches_previous = tokens.last().is_some_and(TemplateToken::ends_with_capture);
        if touches_previous && token.starts_with_capture() {
            return Err(self.adjacent());
        }
        tokens.push(token);
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn push_literal(tokens: &mut Vec<TemplateToken>, c: char) {
    match tokens.last_mut() {
        Some(TemplateToken::Literal(text)) => text.push(c),
        _ => tokens.push(TemplateToken::Literal(c.to_string())),
    }
}

fn take_trailing_slash(tokens: &mut Vec<TemplateToken>) -> bool {
    let Some(TemplateToken::Literal(text)) = tokens.last_mut() else {
        return false;
    };
    if !text.ends_with('/') {
        return false;
    }
    text.pop();
    if text.is_empty() {
        tokens.pop();
    }
    true
}

/// A compiled path template
///
/// Built once at registration; matching is a single anchored regex run.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    pattern: String,
    regex: Regex,
    /// Capture names in group order; `None` for unnamed wildcards
    names: Vec<Option<String>>,
}

impl PathTemplate {
    /// Compiles a template string
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_dispatch::route::pattern::PathTemplate;
    ///
    /// let template = PathTemplate::compile("/foo/:rest*").unwrap();
    /// let params = template.matches("/foo/a/b/c").unwrap();
    /// assert_eq!(params.get("rest"), Some(&"a/b/c".to_string()));
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let tokens = parse_template(pattern)?;
        let mut source = String::from("^");
        let mut names = Vec::new();
        write_regex(&tokens, &mut source, &mut names);
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| PatternError::InvalidTemplate {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            names,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Matches a pathname, returning decoded captures
    ///
    /// Optional captures that did not participate map to `""`. Values are
    /// percent-decoded; a value that does not decode to UTF-8 is kept raw.
    /// `/` also matches a template that matches the empty path, such as
    /// `{/:id}?`.
    pub fn matches(&self, pathname: &str) -> Option<HashMap<String, String>> {
        let captures = match self.regex.captures(pathname) {
            Some(captures) => captures,
            None if pathname == "/" => self.regex.captures("")?,
            None => return None,
        };

        let params = self
            .names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                let name = name.as_ref()?;
                let value = captures
                    .get(idx + 1)
                    .map(|m| decode_param(m.as_str()))
                    .unwrap_or_default();
                Some((name.clone(), value))
            })
            .collect();

        Some(params)
    }
}

fn write_regex(tokens: &[TemplateToken], out: &mut String, names: &mut Vec<Option<String>>) {
    for token in tokens {
        match token {
            TemplateToken::Literal(text) => out.push_str(&regex::escape(text)),
            TemplateToken::Param(name) => {
                out.push_str("([^/]+?)");
                names.push(Some(name.clone()));
            }
            TemplateToken::CatchAll(name) => {
                out.push_str("([^/]+(?:/[^/]+)*)");
                names.push(Some(name.clone()));
            }
            TemplateToken::Wildcard => {
                out.push_str("(.*)");
                names.push(None);
            }
            TemplateToken::Optional(inner) => {
                out.push_str("(?:");
                write_regex(inner, out, names);
                out.push_str(")?");
            }
        }
    }
}

fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
