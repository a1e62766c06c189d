//! Routing conditions
//!
//! A small boolean expression language over the fixed identity
//! attributes `{valid, authorized, is_honeypot, agent_type}`.
//! Conditions are parsed once at config load into an expression tree;
//! evaluation is a plain tree walk and cannot fail.
//!
//! Accepted forms:
//!
//! ```text
//! not valid
//! valid and not authorized
//! valid and (is_honeypot or agent_type == "honeypot")
//! identity.valid and identity.fga_allowed      # legacy spelling
//! ```

use crate::error::ConfigError;
use crate::identity::Identity;

/// A boolean identity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Valid,
    Authorized,
    IsHoneypot,
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Always(bool),
    Attr(Attr),
    AgentTypeIs(String),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// Parse a condition string. Malformed input is a fatal
    /// configuration error.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let tokens = tokenize(input).map_err(|reason| ConfigError::InvalidCondition {
            condition: input.to_string(),
            reason,
        })?;

        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser
            .parse_or()
            .map_err(|reason| ConfigError::InvalidCondition {
                condition: input.to_string(),
                reason,
            })?;

        if parser.pos != parser.tokens.len() {
            return Err(ConfigError::InvalidCondition {
                condition: input.to_string(),
                reason: "trailing input after expression".to_string(),
            });
        }

        Ok(condition)
    }

    /// Evaluate against an identity. Infallible by construction.
    pub fn evaluate(&self, identity: &Identity) -> bool {
        match self {
            Condition::Always(value) => *value,
            Condition::Attr(Attr::Valid) => identity.valid,
            Condition::Attr(Attr::Authorized) => identity.authorized,
            Condition::Attr(Attr::IsHoneypot) => identity.is_honeypot,
            Condition::AgentTypeIs(name) => identity.agent_type.as_str() == name,
            Condition::Not(inner) => !inner.evaluate(identity),
            Condition::All(parts) => parts.iter().all(|c| c.evaluate(identity)),
            Condition::Any(parts) => parts.iter().any(|c| c.evaluate(identity)),
        }
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Eq,
    Ne,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("expected '=='".to_string());
                }
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("expected '!='".to_string());
                }
                tokens.push(Token::Ne);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => value.push(ch),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }

    Ok(tokens)
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(ident)) if ident == word)
    }

    fn parse_or(&mut self) -> Result<Condition, String> {
        let mut parts = vec![self.parse_and()?];
        while self.peek_keyword("or") {
            self.next();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Any(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Condition, String> {
        let mut parts = vec![self.parse_unary()?];
        while self.peek_keyword("and") {
            self.next();
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::All(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<Condition, String> {
        if self.peek_keyword("not") {
            self.next();
            return Ok(Condition::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, String> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(Token::Ident(ident)) => self.parse_attribute(&ident),
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_attribute(&mut self, ident: &str) -> Result<Condition, String> {
        // Accept the legacy "identity.<attr>" spelling.
        let name = ident.strip_prefix("identity.").unwrap_or(ident);

        match name {
            "true" | "True" => Ok(Condition::Always(true)),
            "false" | "False" => Ok(Condition::Always(false)),
            "valid" => Ok(Condition::Attr(Attr::Valid)),
            "authorized" | "fga_allowed" => Ok(Condition::Attr(Attr::Authorized)),
            "is_honeypot" => Ok(Condition::Attr(Attr::IsHoneypot)),
            "agent_type" => {
                let negated = match self.next() {
                    Some(Token::Eq) => false,
                    Some(Token::Ne) => true,
                    _ => return Err("agent_type requires '==' or '!='".to_string()),
                };
                let value = match self.next() {
                    Some(Token::Str(value)) => value,
                    _ => return Err("agent_type comparison requires a quoted string".to_string()),
                };
                let comparison = Condition::AgentTypeIs(value);
                Ok(if negated {
                    Condition::Not(Box::new(comparison))
                } else {
                    comparison
                })
            }
            other => Err(format!("unknown attribute '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AgentType;

    fn identity(valid: bool, authorized: bool, honeypot: bool) -> Identity {
        Identity {
            valid,
            agent_id: valid.then(|| "agent-001".to_string()),
            agent_type: if honeypot { AgentType::Honeypot } else { AgentType::Real },
            is_honeypot: honeypot,
            authorized,
            claims: serde_json::Map::new(),
        }
    }

    #[test]
    fn not_valid() {
        let cond = Condition::parse("not valid").unwrap();
        assert!(cond.evaluate(&Identity::invalid()));
        assert!(!cond.evaluate(&identity(true, true, false)));
    }

    #[test]
    fn conjunction_and_negation() {
        let cond = Condition::parse("valid and not authorized").unwrap();
        assert!(cond.evaluate(&identity(true, false, false)));
        assert!(!cond.evaluate(&identity(true, true, false)));
        assert!(!cond.evaluate(&Identity::invalid()));
    }

    #[test]
    fn full_real_agent_condition() {
        let cond = Condition::parse("valid and authorized and not is_honeypot").unwrap();
        assert!(cond.evaluate(&identity(true, true, false)));
        assert!(!cond.evaluate(&identity(true, true, true)));
    }

    #[test]
    fn agent_type_comparison() {
        let cond = Condition::parse("agent_type == \"honeypot\"").unwrap();
        assert!(cond.evaluate(&identity(true, true, true)));
        assert!(!cond.evaluate(&identity(true, true, false)));

        let cond = Condition::parse("agent_type != 'honeypot'").unwrap();
        assert!(cond.evaluate(&identity(true, true, false)));
    }

    #[test]
    fn parentheses_and_disjunction() {
        let cond = Condition::parse("valid and (is_honeypot or not authorized)").unwrap();
        assert!(cond.evaluate(&identity(true, false, false)));
        assert!(cond.evaluate(&identity(true, true, true)));
        assert!(!cond.evaluate(&identity(true, true, false)));
    }

    #[test]
    fn legacy_identity_prefix_and_fga_alias() {
        let cond = Condition::parse("identity.valid and identity.fga_allowed").unwrap();
        assert!(cond.evaluate(&identity(true, true, false)));
        assert!(!cond.evaluate(&identity(true, false, false)));
    }

    #[test]
    fn malformed_conditions_are_rejected() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("valid and").is_err());
        assert!(Condition::parse("bogus_field").is_err());
        assert!(Condition::parse("agent_type == honeypot").is_err());
        assert!(Condition::parse("(valid").is_err());
        assert!(Condition::parse("valid valid").is_err());
    }
}
