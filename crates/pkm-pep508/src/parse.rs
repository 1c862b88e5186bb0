use crate::marker::{parse_var, CompareOp, MarkerTree};
use crate::Pep508Error;

/// A small recursive-descent parser for the marker grammar: `or_expr (and_expr)*`, where each
/// leaf is `ident OP literal` (or its reverse), grouped with parentheses.
pub(crate) struct MarkerParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> MarkerParser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn parse(mut self) -> Result<MarkerTree, Pep508Error> {
        let tree = self.or_expr()?;
        self.skip_ws();
        if self.pos != self.input.len() {
            return Err(Pep508Error::new(
                self.input,
                format!("unexpected trailing input at byte {}", self.pos),
            ));
        }
        Ok(tree)
    }

    fn or_expr(&mut self) -> Result<MarkerTree, Pep508Error> {
        let mut lhs = self.and_expr()?;
        loop {
            self.skip_ws();
            if self.eat_keyword("or") {
                let rhs = self.and_expr()?;
                lhs = lhs.or(rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn and_expr(&mut self) -> Result<MarkerTree, Pep508Error> {
        let mut lhs = self.atom()?;
        loop {
            self.skip_ws();
            if self.eat_keyword("and") {
                let rhs = self.atom()?;
                lhs = lhs.and(rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn atom(&mut self) -> Result<MarkerTree, Pep508Error> {
        self.skip_ws();
        if self.eat_char('(') {
            let inner = self.or_expr()?;
            self.skip_ws();
            if !self.eat_char(')') {
                return Err(Pep508Error::new(self.input, "expected closing `)`"));
            }
            return Ok(inner);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<MarkerTree, Pep508Error> {
        let lhs = self.term()?;
        self.skip_ws();
        let op = self.operator()?;
        self.skip_ws();
        let rhs = self.term()?;

        let (var_token, value) = match (lhs, rhs) {
            (Token::Ident(name), Token::Literal(lit)) => (name, lit),
            (Token::Literal(lit), Token::Ident(name)) => (name, lit),
            _ => return Err(Pep508Error::new(self.input, "marker comparison needs one identifier and one literal")),
        };
        let var = parse_var(&var_token)
            .ok_or_else(|| Pep508Error::new(self.input, format!("unknown marker variable `{var_token}`")))?;
        Ok(MarkerTree::Compare { var, op, value })
    }

    fn term(&mut self) -> Result<Token, Pep508Error> {
        self.skip_ws();
        if self.eat_char('\'') {
            return self.literal('\'');
        }
        if self.eat_char('"') {
            return self.literal('"');
        }
        let start = self.pos;
        while self
            .input
            .as_bytes()
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(Pep508Error::new(self.input, format!("expected identifier or literal at byte {start}")));
        }
        Ok(Token::Ident(self.input[start..self.pos].to_string()))
    }

    fn literal(&mut self, quote: char) -> Result<Token, Pep508Error> {
        let start = self.pos;
        while self.input[self.pos..].chars().next() != Some(quote) {
            if self.pos >= self.input.len() {
                return Err(Pep508Error::new(self.input, "unterminated string literal"));
            }
            self.pos += 1;
        }
        let value = self.input[start..self.pos].to_string();
        self.pos += 1;
        Ok(Token::Literal(value))
    }

    fn operator(&mut self) -> Result<CompareOp, Pep508Error> {
        for (token, op) in [
            ("==", CompareOp::Eq),
            ("!=", CompareOp::NotEq),
            ("<=", CompareOp::LtEq),
            (">=", CompareOp::GtEq),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ] {
            if self.input[self.pos..].starts_with(token) {
                self.pos += token.len();
                return Ok(op);
            }
        }
        if self.eat_keyword("not") {
            self.skip_ws();
            if self.eat_keyword("in") {
                return Ok(CompareOp::NotIn);
            }
            return Err(Pep508Error::new(self.input, "expected `in` after `not`"));
        }
        if self.eat_keyword("in") {
            return Ok(CompareOp::In);
        }
        Err(Pep508Error::new(self.input, format!("expected comparison operator at byte {}", self.pos)))
    }

    fn skip_ws(&mut self) {
        while self.input[self.pos..].starts_with(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat_char(&mut self, c: char) -> bool {
        if self.input[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        let rest = &self.input[self.pos..];
        if rest.starts_with(kw) {
            let after = rest[kw.len()..].chars().next();
            if after.is_none_or(|c| !c.is_alphanumeric() && c != '_') {
                self.pos += kw.len();
                return true;
            }
        }
        false
    }
}

enum Token {
    Ident(String),
    Literal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::MarkerEnvironment;
    use crate::marker::MarkerVar;

    #[test]
    fn parses_simple_comparison() {
        let tree = MarkerParser::new(r#"sys_platform == "linux""#).parse().unwrap();
        let env = MarkerEnvironment::new().with(MarkerVar::SysPlatform, "linux");
        assert!(tree.evaluate(&env));
    }

    #[test]
    fn parses_and_or_with_parens() {
        let tree = MarkerParser::new(
            r#"python_version >= "3.8" and (sys_platform == "linux" or sys_platform == "darwin")"#,
        )
        .parse()
        .unwrap();
        let env = MarkerEnvironment::new()
            .with(MarkerVar::PythonVersion, "3.11")
            .with(MarkerVar::SysPlatform, "darwin");
        assert!(tree.evaluate(&env));
    }

    #[test]
    fn rejects_garbage() {
        assert!(MarkerParser::new("not a marker").parse().is_err());
    }
}
