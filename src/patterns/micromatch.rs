use crate::error::EngineError;

/// Token types for pattern parsing
#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Char(char),
    Escaped(char),
    OpenParen,
    CloseParen,
    Pipe,
    OpenBracket,
    CloseBracket,
    Question,
    Star,
    Plus,
    At,
    Exclamation,
    Slash,
}

/// Tokenizes the input string into a vector of tokens
fn tokenize(s: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(Token::Escaped(next));
                } else {
                    out.push(Token::Char('\\'));
                }
            }
            '(' => out.push(Token::OpenParen),
            ')' => out.push(Token::CloseParen),
            '|' => out.push(Token::Pipe),
            '[' => out.push(Token::OpenBracket),
            ']' => out.push(Token::CloseBracket),
            '?' => out.push(Token::Question),
            '*' => out.push(Token::Star),
            '+' => out.push(Token::Plus),
            '@' => out.push(Token::At),
            '!' => out.push(Token::Exclamation),
            '/' => out.push(Token::Slash),
            ch => out.push(Token::Char(ch)),
        }
    }
    out
}

/// Returns true when the pattern uses an extglob group such as `@(a|b)`
pub fn has_extglob(pat: &str) -> bool {
    let tokens = tokenize(pat);
    tokens.windows(2).any(|w| {
        matches!(
            w[0],
            Token::Question | Token::Star | Token::Plus | Token::At | Token::Exclamation
        ) && w[1] == Token::OpenParen
    })
}

/// Escapes a character for regex if necessary
fn regex_escape_char(c: char) -> String {
    regex::escape(&c.to_string())
}

/// Collects tokens until the group opened just before the iterator is closed
fn collect_until_balanced<I>(
    tokens: &mut std::iter::Peekable<I>,
    start: Token,
    end: Token,
) -> Result<Vec<Token>, EngineError>
where
    I: Iterator<Item = Token>,
{
    let mut out = Vec::new();
    let mut depth = 1usize;

    for token in tokens.by_ref() {
        if token == start {
            depth += 1;
        } else if token == end {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        out.push(token);
    }

    if depth != 0 {
        return Err(EngineError::Syntax(format!(
            "unbalanced {} in extglob",
            if start == Token::OpenParen {
                "parentheses"
            } else {
                "brackets"
            }
        )));
    }
    Ok(out)
}

/// Converts one extglob group body into a regex alternation
fn process_extglob(tokens: Vec<Token>, operator: Token) -> Result<String, EngineError> {
    let mut alternatives = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            _ => {}
        }

        if token == Token::Pipe && depth == 0 {
            alternatives.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    alternatives.push(current);

    let regex_alternatives = alternatives
        .into_iter()
        .map(tokens_to_regex)
        .collect::<Result<Vec<_>, _>>()?;
    let alternatives_str = regex_alternatives.join("|");

    match operator {
        Token::Question => Ok(format!("(?:{})?", alternatives_str)),
        Token::Star => Ok(format!("(?:{})*", alternatives_str)),
        Token::Plus => Ok(format!("(?:{})+", alternatives_str)),
        Token::At => Ok(format!("(?:{})", alternatives_str)),
        Token::Exclamation => Err(EngineError::Syntax(
            "negated extglob !(...) is not supported".into(),
        )),
        _ => Err(EngineError::Syntax("Invalid extglob operator".into())),
    }
}

/// Processes character class patterns and converts them to regex
fn process_character_class(tokens: &[Token]) -> String {
    let mut class = String::new();
    let mut rest = tokens;

    if let Some((Token::Exclamation | Token::Char('^'), tail)) = rest.split_first() {
        class.push('^');
        rest = tail;
    }

    for token in rest {
        match token {
            Token::Char(c) if *c == '-' => class.push('-'),
            Token::Char(c) | Token::Escaped(c) => class.push_str(&regex_escape_char(*c)),
            Token::OpenParen => class.push_str("\\("),
            Token::CloseParen => class.push_str("\\)"),
            Token::Pipe => class.push('|'),
            Token::OpenBracket => class.push_str("\\["),
            Token::CloseBracket => class.push_str("\\]"),
            Token::Question => class.push('?'),
            Token::Star => class.push('*'),
            Token::Plus => class.push('+'),
            Token::At => class.push('@'),
            Token::Exclamation => class.push('!'),
            Token::Slash => class.push('/'),
        }
    }

    format!("[{}]", class)
}

fn tokens_to_regex(tokens: Vec<Token>) -> Result<String, EngineError> {
    let mut output = String::new();
    let mut tokens_iter = tokens.into_iter().peekable();

    while let Some(token) = tokens_iter.next() {
        match token {
            Token::Question | Token::Star | Token::Plus | Token::At | Token::Exclamation
                if tokens_iter.peek() == Some(&Token::OpenParen) =>
            {
                tokens_iter.next();
                let inner =
                    collect_until_balanced(&mut tokens_iter, Token::OpenParen, Token::CloseParen)?;
                output.push_str(&process_extglob(inner, token)?);
            }
            Token::Star if tokens_iter.peek() == Some(&Token::Star) => {
                tokens_iter.next();
                if tokens_iter.peek() == Some(&Token::Slash) {
                    tokens_iter.next();
                    output.push_str("(?:[^/]*/)*");
                } else {
                    output.push_str(".*");
                }
            }
            Token::Star => output.push_str("[^/]*"),
            Token::Question => output.push_str("[^/]"),
            Token::OpenBracket => {
                let inner = collect_until_balanced(
                    &mut tokens_iter,
                    Token::OpenBracket,
                    Token::CloseBracket,
                )?;
                output.push_str(&process_character_class(&inner));
            }
            Token::Slash => output.push('/'),
            Token::Escaped(c) | Token::Char(c) => output.push_str(&regex_escape_char(c)),
            Token::OpenParen => output.push_str("\\("),
            Token::CloseParen => output.push_str("\\)"),
            Token::Pipe => output.push_str("\\|"),
            Token::CloseBracket => output.push_str("\\]"),
            Token::Plus => output.push_str("\\+"),
            Token::At => output.push('@'),
            Token::Exclamation => output.push('!'),
        }
    }

    Ok(output)
}

/// Converts an extglob pattern to an anchored regex string
///
/// `*` and `?` stay within one path segment, `**/` spans any number of
/// directories and `@(..)`, `?(..)`, `*(..)`, `+(..)` become alternations.
/// Braces must already have been expanded.
///
/// # Errors
///
/// Returns `EngineError::Syntax` for unbalanced groups and for `!(..)`
pub fn micromatch_to_regex(pat: &str, case_sensitive: bool) -> Result<String, EngineError> {
    let body = tokens_to_regex(tokenize(pat))?;
    if case_sensitive {
        Ok(format!("^{}$", body))
    } else {
        Ok(format!("(?i)^{}$", body))
    }
}
