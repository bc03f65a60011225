//! Checkpoint criteria.
//!
//! Criteria are short, human-authored sentences such as
//! `"Overall score ≥ 7.0"` or `"Guardrails present (VETO)"`. They are lexed and
//! parsed with the grammar below; byte positions in errors point into the
//! criterion text.
//!
//! ```text
//! criterion  := (floor | presence | comparison) annotation?
//! comparison := subject comparator number
//! presence   := subject 'present' | 'no' 'vetoes'
//! floor      := 'no' subject 'below' number
//! subject    := word (word | '.' | '-' | '_')*
//! comparator := '>=' | '≥' | '>' | '<=' | '≤' | '<' | '==' | '='
//! number     := digits ('.' digits)? '%'?          ; '%' divides by 100
//! annotation := '(' word* ')'
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::gate::types::{CriterionResult, ValueSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    Below,
    #[serde(rename = "==")]
    Equal,
}

impl Comparator {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            ">=" | "≥" => Some(Comparator::AtLeast),
            ">" => Some(Comparator::Above),
            "<=" | "≤" => Some(Comparator::AtMost),
            "<" => Some(Comparator::Below),
            "==" | "=" => Some(Comparator::Equal),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::AtLeast => ">=",
            Comparator::Above => ">",
            Comparator::AtMost => "<=",
            Comparator::Below => "<",
            Comparator::Equal => "==",
        }
    }

    pub fn holds(self, actual: f64, threshold: f64) -> bool {
        match self {
            Comparator::AtLeast => actual >= threshold,
            Comparator::Above => actual > threshold,
            Comparator::AtMost => actual <= threshold,
            Comparator::Below => actual < threshold,
            Comparator::Equal => (actual - threshold).abs() < f64::EPSILON,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaErrorKind {
    EmptyInput,
    UnexpectedCharacter,
    UnexpectedToken,
    UnexpectedEnd,
    InvalidNumber,
    UnknownOperator,
    TrailingInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaError {
    pub kind: CriteriaErrorKind,
    pub message: String,
    pub position: usize,
}

impl CriteriaError {
    fn new(kind: CriteriaErrorKind, message: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for CriteriaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.message, self.position)
    }
}

impl std::error::Error for CriteriaError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum CriterionExpr {
    Compare {
        subject: String,
        comparator: Comparator,
        threshold: f64,
    },
    Present {
        subject: String,
    },
    NoVetoes,
    Floor {
        subject: String,
        threshold: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCriterion {
    pub expr: CriterionExpr,
    pub annotation: Option<String>,
}

impl ParsedCriterion {
    pub fn compare(subject: impl Into<String>, comparator: Comparator, threshold: f64) -> Self {
        Self {
            expr: CriterionExpr::Compare {
                subject: subject.into(),
                comparator,
                threshold,
            },
            annotation: None,
        }
    }

    pub fn floor_threshold(&self) -> Option<f64> {
        match self.expr {
            CriterionExpr::Floor { threshold, .. } => Some(threshold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Number(f64),
    Op(Comparator),
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned<'a> {
    token: Token<'a>,
    position: usize,
}

struct Lexer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, offset: 0 }
    }

    fn lex(mut self) -> Result<Vec<Spanned<'a>>, CriteriaError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            let start = self.offset;
            match ch {
                c if c.is_whitespace() || c == ':' || c == ',' => self.advance(c),
                '(' => {
                    self.advance(ch);
                    tokens.push(Spanned { token: Token::LParen, position: start });
                }
                ')' => {
                    self.advance(ch);
                    tokens.push(Spanned { token: Token::RParen, position: start });
                }
                '≥' | '≤' | '>' | '<' | '=' => {
                    let op = self.operator()?;
                    tokens.push(Spanned { token: Token::Op(op), position: start });
                }
                c if c.is_ascii_digit() => {
                    let value = self.number()?;
                    tokens.push(Spanned { token: Token::Number(value), position: start });
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.word();
                    tokens.push(Spanned { token: Token::Word(word), position: start });
                }
                other => {
                    return Err(CriteriaError::new(
                        CriteriaErrorKind::UnexpectedCharacter,
                        format!("unexpected character `{other}`"),
                        start,
                    ));
                }
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
    }

    fn consume_while(&mut self, condition: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset;
        while let Some(ch) = self.peek() {
            if !condition(ch) {
                break;
            }
            self.advance(ch);
        }
        &self.input[start..self.offset]
    }

    fn operator(&mut self) -> Result<Comparator, CriteriaError> {
        let start = self.offset;
        let raw = self.consume_while(|ch| matches!(ch, '≥' | '≤' | '>' | '<' | '='));
        Comparator::parse(raw).ok_or_else(|| {
            CriteriaError::new(
                CriteriaErrorKind::UnknownOperator,
                format!("unknown comparator `{raw}`"),
                start,
            )
        })
    }

    fn number(&mut self) -> Result<f64, CriteriaError> {
        let start = self.offset;
        let raw = self.consume_while(|ch| ch.is_ascii_digit() || ch == '.');
        let value = raw.parse::<f64>().map_err(|_| {
            CriteriaError::new(
                CriteriaErrorKind::InvalidNumber,
                format!("invalid number `{raw}`"),
                start,
            )
        })?;
        if self.peek() == Some('%') {
            self.advance('%');
            return Ok(value / 100.0);
        }
        Ok(value)
    }

    fn word(&mut self) -> &'a str {
        self.consume_while(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    }
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    index: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Spanned<'a>> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Spanned<'a>> {
        let token = self.tokens.get(self.index).cloned();
        self.index += 1;
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |token| token.position)
    }

    fn peek_word_is(&self, expected: &str) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Word(word), .. }) if word.eq_ignore_ascii_case(expected))
    }

    fn parse(mut self) -> Result<ParsedCriterion, CriteriaError> {
        if self.tokens.is_empty() {
            return Err(CriteriaError::new(
                CriteriaErrorKind::EmptyInput,
                "criterion is empty",
                0,
            ));
        }

        let expr = if self.peek_word_is("no") {
            self.index += 1;
            self.parse_negated()?
        } else {
            self.parse_subject_form()?
        };
        let annotation = self.parse_annotation()?;

        if let Some(extra) = self.peek() {
            return Err(CriteriaError::new(
                CriteriaErrorKind::TrailingInput,
                "unexpected trailing input",
                extra.position,
            ));
        }
        Ok(ParsedCriterion { expr, annotation })
    }

    fn parse_negated(&mut self) -> Result<CriterionExpr, CriteriaError> {
        if self.peek_word_is("vetoes") || self.peek_word_is("veto") {
            self.index += 1;
            return Ok(CriterionExpr::NoVetoes);
        }
        let subject = self.subject(&["below"])?;
        if !self.peek_word_is("below") {
            return Err(self.unexpected("`below`"));
        }
        self.index += 1;
        let threshold = self.number()?;
        Ok(CriterionExpr::Floor { subject, threshold })
    }

    fn parse_subject_form(&mut self) -> Result<CriterionExpr, CriteriaError> {
        let subject = self.subject(&["present"])?;
        if self.peek_word_is("present") {
            self.index += 1;
            return Ok(CriterionExpr::Present { subject });
        }
        match self.next() {
            Some(Spanned { token: Token::Op(comparator), .. }) => {
                let threshold = self.number()?;
                Ok(CriterionExpr::Compare {
                    subject,
                    comparator,
                    threshold,
                })
            }
            Some(Spanned { position, .. }) => Err(CriteriaError::new(
                CriteriaErrorKind::UnexpectedToken,
                "expected a comparator or `present`",
                position,
            )),
            None => Err(CriteriaError::new(
                CriteriaErrorKind::UnexpectedEnd,
                "expected a comparator or `present`",
                self.end,
            )),
        }
    }

    /// Words up to (not including) a stop word, comparator or number.
    fn subject(&mut self, stop_words: &[&str]) -> Result<String, CriteriaError> {
        let mut words = Vec::new();
        while let Some(Spanned { token: Token::Word(word), .. }) = self.peek() {
            if stop_words.iter().any(|stop| word.eq_ignore_ascii_case(stop)) {
                break;
            }
            words.push(*word);
            self.index += 1;
        }
        if words.is_empty() {
            return Err(self.unexpected("a subject"));
        }
        Ok(words.join(" "))
    }

    fn number(&mut self) -> Result<f64, CriteriaError> {
        match self.next() {
            Some(Spanned { token: Token::Number(value), .. }) => Ok(value),
            Some(Spanned { position, .. }) => Err(CriteriaError::new(
                CriteriaErrorKind::UnexpectedToken,
                "expected a number",
                position,
            )),
            None => Err(CriteriaError::new(
                CriteriaErrorKind::UnexpectedEnd,
                "expected a number",
                self.end,
            )),
        }
    }

    fn parse_annotation(&mut self) -> Result<Option<String>, CriteriaError> {
        if !matches!(self.peek(), Some(Spanned { token: Token::LParen, .. })) {
            return Ok(None);
        }
        self.index += 1;
        let mut words = Vec::new();
        loop {
            match self.next() {
                Some(Spanned { token: Token::RParen, .. }) => break,
                Some(Spanned { token: Token::Word(word), .. }) => words.push(word.to_string()),
                Some(Spanned { token: Token::Number(value), .. }) => words.push(value.to_string()),
                Some(Spanned { position, .. }) => {
                    return Err(CriteriaError::new(
                        CriteriaErrorKind::UnexpectedToken,
                        "unexpected token inside annotation",
                        position,
                    ));
                }
                None => {
                    return Err(CriteriaError::new(
                        CriteriaErrorKind::UnexpectedEnd,
                        "unclosed annotation",
                        self.end,
                    ));
                }
            }
        }
        Ok(Some(words.join(" ")))
    }

    fn unexpected(&self, expected: &str) -> CriteriaError {
        let kind = if self.peek().is_some() {
            CriteriaErrorKind::UnexpectedToken
        } else {
            CriteriaErrorKind::UnexpectedEnd
        };
        CriteriaError::new(kind, format!("expected {expected}"), self.position())
    }
}

pub fn parse_criterion(input: &str) -> Result<ParsedCriterion, CriteriaError> {
    let tokens = Lexer::new(input).lex()?;
    Parser {
        tokens,
        index: 0,
        end: input.len(),
    }
    .parse()
}

/// What a criterion can be checked against.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationScope<'a> {
    pub context: &'a Value,
    pub details: &'a Value,
    pub score: f64,
    pub min_dimension: Option<f64>,
    pub veto_count: usize,
    pub total_tasks: Option<usize>,
    pub compliant_tasks: Option<usize>,
}

pub fn evaluate(label: &str, criterion: &ParsedCriterion, scope: &EvaluationScope<'_>) -> CriterionResult {
    match &criterion.expr {
        CriterionExpr::Compare {
            subject,
            comparator,
            threshold,
        } => {
            let (actual, source) = resolve_subject(subject, scope);
            let passed = comparator.holds(actual, *threshold);
            let message = if passed {
                format!("{subject}: {actual} {comparator} {threshold}")
            } else {
                format!("{subject}: {actual} does not meet {comparator} {threshold}")
            };
            CriterionResult {
                criterion: label.to_string(),
                passed,
                actual: json!(actual),
                expected: format!("{comparator} {threshold}"),
                message,
                source,
            }
        }
        CriterionExpr::Floor { subject, threshold } => {
            let (actual, source) = match scope.min_dimension {
                Some(min) => (min, ValueSource::MinDimension),
                None => resolve_subject(subject, scope),
            };
            let passed = actual >= *threshold;
            CriterionResult {
                criterion: label.to_string(),
                passed,
                actual: json!(actual),
                expected: format!(">= {threshold}"),
                message: if passed {
                    format!("No {subject} below {threshold}")
                } else {
                    format!("Lowest {subject} {actual} is below {threshold}")
                },
                source,
            }
        }
        CriterionExpr::NoVetoes => CriterionResult {
            criterion: label.to_string(),
            passed: scope.veto_count == 0,
            actual: json!(scope.veto_count),
            expected: "No vetoes".to_string(),
            message: "Criterion evaluated".to_string(),
            source: ValueSource::Presence,
        },
        CriterionExpr::Present { subject } => evaluate_presence(label, subject, scope),
    }
}

fn evaluate_presence(label: &str, subject: &str, scope: &EvaluationScope<'_>) -> CriterionResult {
    let normalized = subject.to_lowercase();
    if normalized.contains("task anatomy") {
        let compliant = scope.veto_count == 0;
        return CriterionResult {
            criterion: label.to_string(),
            passed: compliant,
            actual: json!(format!(
                "{}/{} tasks",
                scope.compliant_tasks.unwrap_or(0),
                scope.total_tasks.unwrap_or(0)
            )),
            expected: "All tasks compliant".to_string(),
            message: if compliant {
                "All tasks have required fields".to_string()
            } else {
                "Some tasks missing fields".to_string()
            },
            source: ValueSource::Presence,
        };
    }

    let path = normalize_path(subject);
    let present = lookup(scope.context, &path).is_some_and(is_truthy);
    let (found, missing) = if normalized.contains("guardrail") {
        ("Guardrails defined".to_string(), "No guardrails found".to_string())
    } else {
        (format!("{subject} defined"), format!("{subject} not found"))
    };
    CriterionResult {
        criterion: label.to_string(),
        passed: present,
        actual: json!(if present { "Present" } else { "Missing" }),
        expected: "Present".to_string(),
        message: if present { found } else { missing },
        source: ValueSource::Context(path.join(".")),
    }
}

/// "overall score" is the result score, "level"/"dimension" subjects are the
/// lowest dimension, anything else is a context then result path lookup.
pub fn resolve_subject(subject: &str, scope: &EvaluationScope<'_>) -> (f64, ValueSource) {
    let normalized = subject.to_lowercase();
    if normalized.contains("overall score") {
        return (scope.score, ValueSource::Score);
    }
    if (normalized.contains("level") || normalized.contains("dimension"))
        && let Some(min) = scope.min_dimension
    {
        return (min, ValueSource::MinDimension);
    }

    let path = normalize_path(subject);
    let joined = path.join(".");
    if let Some(value) = lookup(scope.context, &path).and_then(Value::as_f64) {
        return (value, ValueSource::Context(joined));
    }
    if let Some(value) = lookup(scope.details, &path).and_then(Value::as_f64) {
        return (value, ValueSource::Details(joined));
    }
    (scope.score, ValueSource::ScoreFallback)
}

/// Lower-cases, turns every character outside `[A-Za-z0-9_.]` into `_`,
/// then splits on `.`.
fn normalize_path(subject: &str) -> Vec<String> {
    subject
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' { ch } else { '_' })
        .collect::<String>()
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'v>(root: &'v Value, path: &[String]) -> Option<&'v Value> {
    if path.is_empty() {
        return None;
    }
    path.iter().try_fold(root, |value, key| value.as_object()?.get(key))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
