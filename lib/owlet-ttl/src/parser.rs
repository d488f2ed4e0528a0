use crate::error::{TextPosition, TurtleSyntaxError};
use memchr::{memchr2, memchr_iter, memrchr};
use owlet_rdf::vocab::{rdf, xsd};
use owlet_rdf::{BlankNode, Literal, NamedNode, Subject, Term, Triple};
use oxilangtag::LanguageTag;
use oxiri::{Iri, IriParseError};
use std::collections::HashMap;

/// Maximal number of nested property lists and collections.
///
/// The parser recurses on them, so unbounded nesting would overflow the stack.
const MAX_NESTED_TERMS: usize = 128;

/// A [Turtle](https://www.w3.org/TR/turtle/) parser.
///
/// It materializes the full list of [`Triple`]s of a document.
/// Prefixes and the base IRI declared on the parser are used as defaults
/// and can be overridden by `@prefix` and `@base` declarations inside the
/// document. Declarations never leak from one parsed document into the next.
///
/// Count the number of people:
/// ```
/// use owlet_rdf::vocab::rdf;
/// use owlet_rdf::NamedNodeRef;
/// use owlet_ttl::TurtleParser;
///
/// let file = br#"@base <http://example.com/> .
/// @prefix schema: <http://schema.org/> .
/// <foo> a schema:Person ;
///     schema:name "Foo" .
/// <bar> a schema:Person ;
///     schema:name "Bar" ."#;
///
/// let schema_person = NamedNodeRef::new("http://schema.org/Person")?;
/// let mut count = 0;
/// for triple in TurtleParser::new().parse_slice(file)? {
///     if triple.predicate == rdf::TYPE && triple.object == schema_person.into() {
///         count += 1;
///     }
/// }
/// assert_eq!(2, count);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TurtleParser {
    base: Option<Iri<String>>,
    prefixes: HashMap<String, Iri<String>>,
}

impl TurtleParser {
    /// Builds a new [`TurtleParser`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides an IRI that could be used to resolve the file relative IRIs.
    ///
    /// ```
    /// use owlet_ttl::TurtleParser;
    ///
    /// let file = "</s> </p> </o> .";
    ///
    /// let triples = TurtleParser::new()
    ///     .with_base_iri("http://example.com")?
    ///     .parse_str(file)?;
    /// assert_eq!(triples[0].subject.to_string(), "<http://example.com/s>");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Adds a prefix that is not declared in the file but used in it.
    ///
    /// ```
    /// use owlet_ttl::TurtleParser;
    ///
    /// let file = "ex:s ex:p ex:o .";
    ///
    /// let triples = TurtleParser::new()
    ///     .with_prefix("ex", "http://example.com/")?
    ///     .parse_str(file)?;
    /// assert_eq!(triples[0].predicate.as_str(), "http://example.com/p");
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        self.prefixes
            .insert(prefix_name.into(), Iri::parse(prefix_iri.into())?);
        Ok(self)
    }

    /// Parses a complete Turtle document.
    pub fn parse_str(&self, input: &str) -> Result<Vec<Triple>, TurtleSyntaxError> {
        let mut parser = Parser {
            input,
            position: 0,
            line: 0,
            column: 0,
            base: self.base.clone(),
            prefixes: self.prefixes.clone(),
            nesting: 0,
            triples: Vec::new(),
        };
        parser.parse_document()?;
        Ok(parser.triples)
    }

    /// Parses a complete Turtle document from its UTF-8 encoding.
    pub fn parse_slice(&self, input: &[u8]) -> Result<Vec<Triple>, TurtleSyntaxError> {
        match std::str::from_utf8(input) {
            Ok(input) => self.parse_str(input),
            Err(e) => {
                let valid = &input[..e.valid_up_to()];
                let line_start = memrchr(b'\n', valid).map_or(0, |i| i + 1);
                Err(TurtleSyntaxError::new(
                    TextPosition {
                        line: memchr_iter(b'\n', valid).count() as u64,
                        column: String::from_utf8_lossy(&valid[line_start..]).chars().count()
                            as u64,
                        offset: e.valid_up_to() as u64,
                    },
                    format!("Invalid UTF-8: {e}"),
                ))
            }
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
    line: u64,
    column: u64,
    base: Option<Iri<String>>,
    prefixes: HashMap<String, Iri<String>>,
    nesting: usize,
    triples: Vec<Triple>,
}

impl<'a> Parser<'a> {
    fn parse_document(&mut self) -> Result<(), TurtleSyntaxError> {
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Ok(());
            }
            self.parse_statement()?;
        }
    }

    fn parse_statement(&mut self) -> Result<(), TurtleSyntaxError> {
        if self.peek() == Some('@') {
            self.advance();
            if self.at_keyword("prefix", false) {
                self.consume_ascii("prefix");
                self.parse_prefix_declaration(true)
            } else if self.at_keyword("base", false) {
                self.consume_ascii("base");
                self.parse_base_declaration(true)
            } else {
                let keyword: String = self
                    .remaining()
                    .chars()
                    .take_while(char::is_ascii_alphabetic)
                    .collect();
                Err(self.syntax_error(format!(
                    "Unexpected directive @{keyword}, expecting @prefix or @base"
                )))
            }
        } else if self.at_keyword("PREFIX", true) {
            self.consume_ascii("PREFIX");
            self.parse_prefix_declaration(false)
        } else if self.at_keyword("BASE", true) {
            self.consume_ascii("BASE");
            self.parse_base_declaration(false)
        } else {
            self.parse_triples()
        }
    }

    fn parse_prefix_declaration(&mut self, requires_dot: bool) -> Result<(), TurtleSyntaxError> {
        self.skip_whitespace();
        let prefix = self.parse_pname_prefix()?;
        self.expect(':')?;
        self.skip_whitespace();
        let iri = self.parse_iri_ref()?;
        self.prefixes
            .insert(prefix, Iri::parse_unchecked(iri.into_string()));
        if requires_dot {
            self.skip_whitespace();
            self.expect('.')?;
        }
        Ok(())
    }

    fn parse_base_declaration(&mut self, requires_dot: bool) -> Result<(), TurtleSyntaxError> {
        self.skip_whitespace();
        // Relative base IRIs are resolved against the previous base
        let iri = self.parse_iri_ref()?;
        self.base = Some(Iri::parse_unchecked(iri.into_string()));
        if requires_dot {
            self.skip_whitespace();
            self.expect('.')?;
        }
        Ok(())
    }

    fn parse_triples(&mut self) -> Result<(), TurtleSyntaxError> {
        let subject = if self.peek() == Some('[') {
            let subject = self.parse_blank_node_property_list()?;
            self.skip_whitespace();
            // A blank node property list can form a statement on its own
            if self.peek() == Some('.') {
                self.advance();
                return Ok(());
            }
            subject
        } else {
            let subject = self.parse_subject()?;
            self.skip_whitespace();
            subject
        };
        self.parse_predicate_object_list(&subject)?;
        if self.peek() == Some('.') {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_error("A dot is expected at the end of statements"))
        }
    }

    fn parse_subject(&mut self) -> Result<Subject, TurtleSyntaxError> {
        match self.peek() {
            None => Err(self.syntax_error("Unexpected end of file")),
            Some('<') => Ok(self.parse_iri_ref()?.into()),
            Some('_') => Ok(self.parse_blank_node_label()?.into()),
            Some('(') => self.parse_collection(),
            Some(c) if is_pn_chars_base(c) || c == ':' => Ok(self.parse_prefixed_name()?.into()),
            Some(c) => Err(self.syntax_error(format!("Unexpected character '{c}'"))),
        }
    }

    /// Parses `predicate object (, object)* (; predicate object...)*`.
    ///
    /// Leaves the cursor on the closing `.` or `]`, which stays for the caller.
    fn parse_predicate_object_list(&mut self, subject: &Subject) -> Result<(), TurtleSyntaxError> {
        loop {
            let predicate = self.parse_predicate()?;
            self.skip_whitespace();
            loop {
                let object = self.parse_object()?;
                self.triples
                    .push(Triple::new(subject.clone(), predicate.clone(), object));
                self.skip_whitespace();
                if self.peek() == Some(',') {
                    self.advance();
                    self.skip_whitespace();
                } else {
                    break;
                }
            }
            let mut had_separator = false;
            while self.peek() == Some(';') {
                had_separator = true;
                self.advance();
                self.skip_whitespace();
            }
            // A trailing ';' is allowed before the end of the list
            if !had_separator || matches!(self.peek(), None | Some('.' | ']')) {
                return Ok(());
            }
        }
    }

    fn parse_predicate(&mut self) -> Result<NamedNode, TurtleSyntaxError> {
        if self.at_keyword("a", false) {
            self.advance();
            return Ok(rdf::TYPE.into_owned());
        }
        match self.peek() {
            None => Err(self.syntax_error("Unexpected end of file")),
            Some('<') => self.parse_iri_ref(),
            Some(c) if is_pn_chars_base(c) || c == ':' => self.parse_prefixed_name(),
            Some(c) => Err(self.syntax_error(format!("Unexpected character '{c}'"))),
        }
    }

    fn parse_object(&mut self) -> Result<Term, TurtleSyntaxError> {
        match self.peek() {
            None => Err(self.syntax_error("Unexpected end of file")),
            Some('<') => Ok(self.parse_iri_ref()?.into()),
            Some('_') => Ok(self.parse_blank_node_label()?.into()),
            Some('[') => Ok(self.parse_blank_node_property_list()?.into()),
            Some('(') => Ok(self.parse_collection()?.into()),
            Some('"' | '\'') => Ok(self.parse_quoted_literal()?.into()),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => {
                Ok(self.parse_numeric_literal()?.into())
            }
            Some('.') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.parse_numeric_literal()?.into())
            }
            Some(_) if self.at_keyword("true", false) || self.at_keyword("false", false) => {
                Ok(self.parse_boolean_literal().into())
            }
            Some(c) if is_pn_chars_base(c) || c == ':' => Ok(self.parse_prefixed_name()?.into()),
            Some(c) => Err(self.syntax_error(format!("Unexpected character '{c}'"))),
        }
    }

    fn parse_blank_node_property_list(&mut self) -> Result<Subject, TurtleSyntaxError> {
        self.expect('[')?;
        self.enter_nested()?;
        let subject = Subject::from(BlankNode::default());
        self.skip_whitespace();
        if self.peek() != Some(']') {
            self.parse_predicate_object_list(&subject)?;
        }
        self.expect(']')?;
        self.nesting -= 1;
        Ok(subject)
    }

    fn parse_collection(&mut self) -> Result<Subject, TurtleSyntaxError> {
        self.expect('(')?;
        self.enter_nested()?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.syntax_error("Unexpected end of file")),
                Some(')') => {
                    self.advance();
                    break;
                }
                _ => items.push(self.parse_object()?),
            }
        }
        self.nesting -= 1;
        if items.is_empty() {
            return Ok(rdf::NIL.into());
        }
        let cells: Vec<BlankNode> = items.iter().map(|_| BlankNode::default()).collect();
        let head = cells[0].clone();
        let mut next_cells = cells.iter().skip(1);
        for (cell, item) in cells.iter().zip(items) {
            self.triples
                .push(Triple::new(cell.clone(), rdf::FIRST, item));
            let rest: Term = match next_cells.next() {
                Some(next) => next.clone().into(),
                None => rdf::NIL.into(),
            };
            self.triples.push(Triple::new(cell.clone(), rdf::REST, rest));
        }
        Ok(head.into())
    }

    /// Parses an IRI in one of its two forms, `<...>` or `prefix:local`.
    fn parse_iri(&mut self) -> Result<NamedNode, TurtleSyntaxError> {
        if self.peek() == Some('<') {
            self.parse_iri_ref()
        } else {
            self.parse_prefixed_name()
        }
    }

    fn parse_iri_ref(&mut self) -> Result<NamedNode, TurtleSyntaxError> {
        let start = self.text_position();
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.peek() {
                None => return Err(self.syntax_error("Unexpected end of file")),
                Some('>') => {
                    self.advance();
                    break;
                }
                Some('\n' | '\r') => {
                    return Err(self.syntax_error("Line jumps are not allowed in IRIs"));
                }
                Some('\\') => {
                    self.advance();
                    let c = match self.peek() {
                        None => return Err(self.syntax_error("Unexpected end of file")),
                        Some('u') => {
                            self.advance();
                            self.read_hex_char(4)?
                        }
                        Some('U') => {
                            self.advance();
                            self.read_hex_char(8)?
                        }
                        Some(c) => {
                            return Err(
                                self.syntax_error(format!("Unexpected escape character '\\{c}'"))
                            );
                        }
                    };
                    iri.push(c);
                }
                Some(c) => {
                    iri.push(c);
                    self.advance();
                }
            }
        }
        if let Some(base) = &self.base {
            match base.resolve(&iri) {
                Ok(resolved) => Ok(NamedNode::new_unchecked(resolved.into_inner())),
                Err(e) => Err(TurtleSyntaxError::new(start, e.to_string())),
            }
        } else {
            Iri::parse(iri.as_str()).map_err(|e| TurtleSyntaxError::new(start, e.to_string()))?;
            Ok(NamedNode::new_unchecked(iri))
        }
    }

    fn parse_prefixed_name(&mut self) -> Result<NamedNode, TurtleSyntaxError> {
        let start = self.text_position();
        let prefix = self.parse_pname_prefix()?;
        self.expect(':')?;
        let mut local = String::new();
        while let Some(c) = self.peek() {
            if is_pn_chars(c) || c == ':' {
                local.push(c);
                self.advance();
            } else if c == '.'
                && self
                    .peek_second()
                    .is_some_and(|n| is_pn_chars(n) || matches!(n, ':' | '.' | '%' | '\\'))
            {
                local.push('.');
                self.advance();
            } else if c == '%' {
                self.advance();
                local.push('%');
                for _ in 0..2 {
                    match self.peek() {
                        None => return Err(self.syntax_error("Unexpected end of file")),
                        Some(h) if h.is_ascii_hexdigit() => {
                            local.push(h);
                            self.advance();
                        }
                        Some(h) => {
                            return Err(self.syntax_error(format!(
                                "The character '{h}' is not a valid hexadecimal digit"
                            )));
                        }
                    }
                }
            } else if c == '\\' {
                self.advance();
                match self.peek() {
                    None => return Err(self.syntax_error("Unexpected end of file")),
                    Some(e) if is_pn_local_escapable(e) => {
                        local.push(e);
                        self.advance();
                    }
                    Some(e) => {
                        return Err(
                            self.syntax_error(format!("Unexpected escape character '\\{e}'"))
                        );
                    }
                }
            } else {
                break;
            }
        }
        let Some(base) = self.prefixes.get(&prefix) else {
            return Err(TurtleSyntaxError::new(
                start,
                format!("The prefix {prefix}: has not been declared"),
            ));
        };
        let iri = format!("{base}{local}");
        if let Err(e) = Iri::parse(iri.as_str()) {
            return Err(TurtleSyntaxError::new(
                start,
                format!("The prefixed name {prefix}:{local} builds IRI {iri} that is invalid: {e}"),
            ));
        }
        Ok(NamedNode::new_unchecked(iri))
    }

    fn parse_pname_prefix(&mut self) -> Result<String, TurtleSyntaxError> {
        let mut prefix = String::new();
        match self.peek() {
            None => return Err(self.syntax_error("Unexpected end of file")),
            Some(':') => return Ok(prefix),
            Some(c) if is_pn_chars_base(c) => {
                prefix.push(c);
                self.advance();
            }
            Some(c) => return Err(self.syntax_error(format!("Unexpected character '{c}'"))),
        }
        while let Some(c) = self.peek() {
            if is_pn_chars(c) {
                prefix.push(c);
                self.advance();
            } else if c == '.' && self.peek_second().is_some_and(|n| is_pn_chars(n) || n == '.') {
                prefix.push('.');
                self.advance();
            } else {
                break;
            }
        }
        Ok(prefix)
    }

    fn parse_blank_node_label(&mut self) -> Result<BlankNode, TurtleSyntaxError> {
        self.expect('_')?;
        self.expect(':')?;
        let mut id = String::new();
        match self.peek() {
            Some(c) if is_pn_chars_u(c) || c.is_ascii_digit() => {
                id.push(c);
                self.advance();
            }
            _ => return Err(self.syntax_error("A blank node ID cannot be empty")),
        }
        while let Some(c) = self.peek() {
            if is_pn_chars(c) {
                id.push(c);
                self.advance();
            } else if c == '.' && self.peek_second().is_some_and(|n| is_pn_chars(n) || n == '.') {
                id.push('.');
                self.advance();
            } else {
                break;
            }
        }
        Ok(BlankNode::new_unchecked(id))
    }

    fn parse_quoted_literal(&mut self) -> Result<Literal, TurtleSyntaxError> {
        let value = self.parse_string()?;
        // The language tag or datatype must directly follow the closing quote
        match self.peek() {
            Some('@') => {
                self.advance();
                let start = self.text_position();
                let tag = self.parse_language_tag()?;
                let mut language = LanguageTag::parse(tag)
                    .map_err(|e| TurtleSyntaxError::new(start, e.to_string()))?
                    .into_inner();
                language.make_ascii_lowercase();
                Ok(Literal::new_language_tagged_literal_unchecked(
                    value, language,
                ))
            }
            Some('^') => {
                self.advance();
                self.expect('^')?;
                self.skip_whitespace();
                let datatype = self.parse_iri()?;
                Ok(Literal::new_typed_literal(value, datatype))
            }
            _ => Ok(Literal::new_simple_literal(value)),
        }
    }

    fn parse_string(&mut self) -> Result<String, TurtleSyntaxError> {
        let Some(quote) = self.peek() else {
            return Err(self.syntax_error("Unexpected end of file"));
        };
        self.advance();
        if self.peek() == Some(quote) {
            self.advance();
            if self.peek() == Some(quote) {
                self.advance();
                return self.parse_long_string(quote);
            }
            return Ok(String::new());
        }
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.syntax_error("Unexpected end of file")),
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(value);
                }
                Some('\n' | '\r') => {
                    return Err(
                        self.syntax_error("Line jumps are not allowed in string literals, use \\n")
                    );
                }
                Some('\\') => {
                    self.advance();
                    value.push(self.parse_escape()?);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn parse_long_string(&mut self, quote: char) -> Result<String, TurtleSyntaxError> {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.syntax_error("Unexpected end of file")),
                Some(c) if c == quote => {
                    let mut run = 0;
                    while self.peek() == Some(quote) {
                        self.advance();
                        run += 1;
                    }
                    if run >= 3 {
                        // The last three quotes close the literal, the ones
                        // before them belong to its value
                        for _ in 0..run - 3 {
                            value.push(quote);
                        }
                        return Ok(value);
                    }
                    for _ in 0..run {
                        value.push(quote);
                    }
                }
                Some('\\') => {
                    self.advance();
                    value.push(self.parse_escape()?);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, TurtleSyntaxError> {
        let result = match self.peek() {
            None => return Err(self.syntax_error("Unexpected end of file")),
            Some('t') => '\t',
            Some('b') => '\u{8}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('f') => '\u{C}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u') => {
                self.advance();
                return self.read_hex_char(4);
            }
            Some('U') => {
                self.advance();
                return self.read_hex_char(8);
            }
            Some(c) => {
                return Err(self.syntax_error(format!("Unexpected escape character '\\{c}'")));
            }
        };
        self.advance();
        Ok(result)
    }

    fn read_hex_char(&mut self, len: u32) -> Result<char, TurtleSyntaxError> {
        let start = self.text_position();
        let mut code_point: u32 = 0;
        for _ in 0..len {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    code_point = code_point * 16 + digit;
                    self.advance();
                }
                None => {
                    return Err(
                        self.syntax_error("Hexadecimal digits are expected in escape sequences")
                    );
                }
            }
        }
        char::from_u32(code_point).ok_or_else(|| {
            TurtleSyntaxError::new(
                start,
                format!("The codepoint {code_point:X} is not a valid unicode character"),
            )
        })
    }

    fn parse_numeric_literal(&mut self) -> Result<Literal, TurtleSyntaxError> {
        let start = self.position;
        if matches!(self.peek(), Some('+' | '-')) {
            self.advance();
        }
        let mut integer_digits = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            integer_digits += 1;
        }
        // A dot is part of the number only if a digit follows, so that
        // `ex:s ex:p 5.` keeps its final dot as the statement terminator
        let mut is_decimal = false;
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if integer_digits == 0 && !is_decimal {
            return Err(self.syntax_error("An integer should not be empty"));
        }
        let mut is_double = false;
        if matches!(self.peek(), Some('e' | 'E')) {
            is_double = true;
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            let mut exponent_digits = 0;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                exponent_digits += 1;
            }
            if exponent_digits == 0 {
                return Err(self.syntax_error("A double exponent cannot be empty"));
            }
        }
        let value = &self.input[start..self.position];
        let datatype = if is_double {
            xsd::DOUBLE
        } else if is_decimal {
            xsd::DECIMAL
        } else {
            xsd::INTEGER
        };
        Ok(Literal::new_typed_literal(value, datatype))
    }

    fn parse_boolean_literal(&mut self) -> Literal {
        let value = if self.peek() == Some('t') {
            "true"
        } else {
            "false"
        };
        self.consume_ascii(value);
        Literal::new_typed_literal(value, xsd::BOOLEAN)
    }

    fn parse_language_tag(&mut self) -> Result<String, TurtleSyntaxError> {
        let mut tag = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                tag.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if tag.is_empty() {
            return Err(self.syntax_error("A language code should always start with a letter"));
        }
        while self.peek() == Some('-') {
            tag.push('-');
            self.advance();
            let mut subtag_len = 0;
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() {
                    tag.push(c);
                    self.advance();
                    subtag_len += 1;
                } else {
                    break;
                }
            }
            if subtag_len == 0 {
                return Err(self.syntax_error("A language code subtag cannot be empty"));
            }
        }
        Ok(tag)
    }

    /// Checks for a bare keyword at the cursor, making sure it is not the
    /// start of a longer prefixed name like `true.history:x`.
    fn at_keyword(&self, keyword: &str, ignore_ascii_case: bool) -> bool {
        let rest = self.remaining().as_bytes();
        if rest.len() < keyword.len() {
            return false;
        }
        let head = &rest[..keyword.len()];
        let matches = if ignore_ascii_case {
            head.eq_ignore_ascii_case(keyword.as_bytes())
        } else {
            head == keyword.as_bytes()
        };
        if !matches {
            return false;
        }
        let mut tail = self.remaining()[keyword.len()..].chars();
        match tail.next() {
            None => true,
            Some(c) if is_pn_chars(c) || c == ':' => false,
            Some('.') => !tail.next().is_some_and(|n| is_pn_chars(n) || n == ':'),
            Some(_) => true,
        }
    }

    fn consume_ascii(&mut self, keyword: &str) {
        for _ in keyword.chars() {
            self.advance();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TurtleSyntaxError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.syntax_error(format!("'{expected}' is expected, found '{c}'"))),
            None => Err(self.syntax_error("Unexpected end of file")),
        }
    }

    fn enter_nested(&mut self) -> Result<(), TurtleSyntaxError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTED_TERMS {
            return Err(self.syntax_error("Too many nested terms"));
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => self.advance(),
                Some('#') => {
                    let rest = self.remaining().as_bytes();
                    let comment_len = memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
                    self.column += self.remaining()[..comment_len].chars().count() as u64;
                    self.position += comment_len;
                }
                _ => return,
            }
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.remaining().chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn text_position(&self) -> TextPosition {
        TextPosition {
            line: self.line,
            column: self.column,
            offset: self.position as u64,
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> TurtleSyntaxError {
        TurtleSyntaxError::new(self.text_position(), message)
    }
}

// [163s] PN_CHARS_BASE
fn is_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

// [164s] PN_CHARS_U
fn is_pn_chars_u(c: char) -> bool {
    c == '_' || is_pn_chars_base(c)
}

// [166s] PN_CHARS
fn is_pn_chars(c: char) -> bool {
    is_pn_chars_u(c)
        || matches!(c,
            '-' | '0'..='9' | '\u{00B7}' | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

// [172s] PN_LOCAL_ESC
fn is_pn_local_escapable(c: char) -> bool {
    matches!(
        c,
        '_' | '~'
            | '.'
            | '-'
            | '!'
            | '$'
            | '&'
            | '\''
            | '('
            | ')'
            | '*'
            | '+'
            | ','
            | ';'
            | '='
            | '/'
            | '?'
            | '#'
            | '@'
            | '%'
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic_in_result_fn)]

    use super::*;
    use owlet_rdf::{Graph, TermRef};

    fn parse(input: &str) -> Result<Vec<Triple>, TurtleSyntaxError> {
        TurtleParser::new().parse_str(input)
    }

    #[test]
    fn empty_document() -> Result<(), TurtleSyntaxError> {
        assert_eq!(parse("")?, []);
        assert_eq!(parse(" \t\r\n")?, []);
        assert_eq!(parse("# only a comment")?, []);
        Ok(())
    }

    #[test]
    fn iri_statement() -> Result<(), TurtleSyntaxError> {
        assert_eq!(
            parse("<http://example.com/s> <http://example.com/p> <http://example.com/o> .")?,
            [Triple::new(
                NamedNode::new_unchecked("http://example.com/s"),
                NamedNode::new_unchecked("http://example.com/p"),
                NamedNode::new_unchecked("http://example.com/o"),
            )]
        );
        Ok(())
    }

    #[test]
    fn rdf_type_keyword() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@prefix ex: <http://example.com/> . ex:s a ex:C .")?;
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].predicate, rdf::TYPE);
        assert_eq!(
            triples[0].object,
            NamedNode::new_unchecked("http://example.com/C").into()
        );
        Ok(())
    }

    #[test]
    fn sparql_style_directives() -> Result<(), TurtleSyntaxError> {
        let triples = parse("BASE <http://example.com/>\nPreFix ex: <ns/>\nex:s <p> ex:o .")?;
        assert_eq!(triples[0].subject.to_string(), "<http://example.com/ns/s>");
        assert_eq!(triples[0].predicate.as_str(), "http://example.com/p");
        Ok(())
    }

    #[test]
    fn base_resolution() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@base <http://example.com/a/> .\n<s> <p> <../o> .")?;
        assert_eq!(triples[0].subject.to_string(), "<http://example.com/a/s>");
        assert_eq!(triples[0].object.to_string(), "<http://example.com/o>");
        Ok(())
    }

    #[test]
    fn prefix_redeclaration_applies_from_declaration_point() -> Result<(), TurtleSyntaxError> {
        let triples = parse(
            "@prefix ex: <http://one.org/> . ex:s ex:p ex:o . @prefix ex: <http://two.org/> . ex:s ex:p ex:o .",
        )?;
        assert_eq!(triples[0].subject.to_string(), "<http://one.org/s>");
        assert_eq!(triples[1].subject.to_string(), "<http://two.org/s>");
        Ok(())
    }

    #[test]
    fn predicate_and_object_lists() -> Result<(), TurtleSyntaxError> {
        let triples = parse(
            "@prefix ex: <http://example.com/> .\nex:s ex:p1 ex:a , ex:b ;\n  ex:p2 ex:c ;\n.",
        )?;
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[0].object.to_string(), "<http://example.com/a>");
        assert_eq!(triples[1].object.to_string(), "<http://example.com/b>");
        assert_eq!(triples[2].predicate.as_str(), "http://example.com/p2");
        assert!(
            triples
                .iter()
                .all(|t| t.subject.to_string() == "<http://example.com/s>")
        );
        Ok(())
    }

    #[test]
    fn blank_node_property_lists() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@prefix ex: <http://example.com/> . ex:s ex:p [ ex:q ex:o ] .")?;
        assert_eq!(triples.len(), 2);
        // The inner triple is emitted while the object is parsed
        assert_eq!(triples[0].predicate.as_str(), "http://example.com/q");
        let Term::BlankNode(inner) = &triples[1].object else {
            panic!("expected a blank node object, got {}", triples[1].object);
        };
        assert_eq!(Subject::from(inner.clone()), triples[0].subject);
        Ok(())
    }

    #[test]
    fn blank_node_property_list_as_subject() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@prefix ex: <http://example.com/> . [ ex:p ex:o ] .")?;
        assert_eq!(triples.len(), 1);
        assert!(matches!(triples[0].subject, Subject::BlankNode(_)));

        let triples = parse("@prefix ex: <http://example.com/> . [ ex:p ex:o ] ex:q ex:r .")?;
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].subject, triples[1].subject);
        Ok(())
    }

    #[test]
    fn anonymous_blank_node() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@prefix ex: <http://example.com/> . ex:s ex:p [] .")?;
        assert_eq!(triples.len(), 1);
        assert!(matches!(triples[0].object, Term::BlankNode(_)));
        Ok(())
    }

    #[test]
    fn collections() -> Result<(), TurtleSyntaxError> {
        let triples = parse("@prefix ex: <http://example.com/> . ex:s ex:p (ex:a ex:b) .")?;
        // Two list cells of two triples each, then the wrapping statement
        assert_eq!(triples.len(), 5);
        let Term::BlankNode(head) = &triples[4].object else {
            panic!("expected the list head, got {}", triples[4].object);
        };
        let head = head.clone();
        let graph = Graph::from_triples(triples);
        assert_eq!(
            graph
                .object_for_subject_predicate(head.as_ref(), rdf::FIRST)
                .map(|o| o.to_string()),
            Some("<http://example.com/a>".into())
        );
        let Some(TermRef::BlankNode(second)) =
            graph.object_for_subject_predicate(head.as_ref(), rdf::REST)
        else {
            panic!("expected a second list cell");
        };
        assert_eq!(
            graph
                .object_for_subject_predicate(second, rdf::FIRST)
                .map(|o| o.to_string()),
            Some("<http://example.com/b>".into())
        );
        assert_eq!(
            graph.object_for_subject_predicate(second, rdf::REST),
            Some(rdf::NIL.into())
        );
        Ok(())
    }

    #[test]
    fn empty_collection_is_nil() -> Result<(), TurtleSyntaxError> {
        assert_eq!(
            parse("@prefix ex: <http://example.com/> . ex:s ex:p () .")?,
            [Triple::new(
                NamedNode::new_unchecked("http://example.com/s"),
                NamedNode::new_unchecked("http://example.com/p"),
                rdf::NIL,
            )]
        );
        Ok(())
    }

    #[test]
    fn literal_forms() -> Result<(), TurtleSyntaxError> {
        let triples = parse(concat!(
            "@prefix ex: <http://example.com/> .\n",
            "@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n",
            "ex:s ex:p \"plain\" , 'single' , \"typed\"^^xsd:int , \"hallo\"@DE , 42 , 4.2 , 4.2e0 , true .\n",
        ))?;
        let literals: Vec<&Literal> = triples
            .iter()
            .map(|t| match &t.object {
                Term::Literal(literal) => literal,
                _ => panic!("expected a literal, got {}", t.object),
            })
            .collect();
        assert_eq!(literals[0].value(), "plain");
        assert_eq!(literals[0].datatype(), xsd::STRING);
        assert_eq!(literals[1].value(), "single");
        assert_eq!(literals[2].datatype(), xsd::INT);
        assert_eq!(literals[3].language(), Some("de"));
        assert_eq!(literals[3].datatype(), rdf::LANG_STRING);
        assert_eq!(literals[4], &Literal::new_typed_literal("42", xsd::INTEGER));
        assert_eq!(literals[5], &Literal::new_typed_literal("4.2", xsd::DECIMAL));
        assert_eq!(
            literals[6],
            &Literal::new_typed_literal("4.2e0", xsd::DOUBLE)
        );
        assert_eq!(literals[7], &Literal::new_typed_literal("true", xsd::BOOLEAN));
        Ok(())
    }

    #[test]
    fn long_strings_and_escapes() -> Result<(), TurtleSyntaxError> {
        let triples = parse(
            "@prefix ex: <http://example.com/> .\nex:s ex:p \"\"\"multi\nline \"quoted\" text\"\"\" , \"tab\\there\\n\" , \"\\u00E9\\U0001F600\" .",
        )?;
        let values: Vec<&str> = triples
            .iter()
            .map(|t| match &t.object {
                Term::Literal(literal) => literal.value(),
                _ => panic!("expected a literal, got {}", t.object),
            })
            .collect();
        assert_eq!(values[0], "multi\nline \"quoted\" text");
        assert_eq!(values[1], "tab\there\n");
        assert_eq!(values[2], "\u{E9}\u{1F600}");
        Ok(())
    }

    #[test]
    fn quotes_directly_before_long_string_end() -> Result<(), TurtleSyntaxError> {
        let triples = parse(r##"<http://e.com/s> <http://e.com/p> """x"""" ."##)?;
        let Term::Literal(literal) = &triples[0].object else {
            panic!("expected a literal");
        };
        assert_eq!(literal.value(), "x\"");
        Ok(())
    }

    #[test]
    fn unicode_escapes_in_iris() -> Result<(), TurtleSyntaxError> {
        let triples =
            parse("<http://example.com/\\u00E9> <http://example.com/p> <http://example.com/o> .")?;
        assert_eq!(
            triples[0].subject.to_string(),
            "<http://example.com/\u{E9}>"
        );
        Ok(())
    }

    #[test]
    fn comments_are_skipped() -> Result<(), TurtleSyntaxError> {
        let triples = parse(
            "# leading comment\n@prefix ex: <http://example.com/#> . # trailing\nex:s # mid-statement\n  ex:p \"a # not a comment\" .",
        )?;
        assert_eq!(triples.len(), 1);
        // The '#' inside the IRI reference must not start a comment
        assert_eq!(triples[0].subject.to_string(), "<http://example.com/#s>");
        let Term::Literal(literal) = &triples[0].object else {
            panic!("expected a literal");
        };
        assert_eq!(literal.value(), "a # not a comment");
        Ok(())
    }

    #[test]
    fn blank_node_labels() -> Result<(), TurtleSyntaxError> {
        let triples = parse("_:a <http://e.com/p> _:b.c .")?;
        assert_eq!(triples[0].subject.to_string(), "_:a");
        assert_eq!(triples[0].object.to_string(), "_:b.c");

        let triples =
            parse("_:x <http://e.com/p> <http://e.com/o> . _:x <http://e.com/q> <http://e.com/o> .")?;
        assert_eq!(triples[0].subject, triples[1].subject);
        Ok(())
    }

    #[test]
    fn numeric_before_statement_dot() -> Result<(), TurtleSyntaxError> {
        let triples =
            parse("<http://e.com/s> <http://e.com/p> 5. <http://e.com/s> <http://e.com/q> 5.5.")?;
        assert_eq!(triples.len(), 2);
        assert_eq!(
            triples[0].object,
            Literal::new_typed_literal("5", xsd::INTEGER).into()
        );
        assert_eq!(
            triples[1].object,
            Literal::new_typed_literal("5.5", xsd::DECIMAL).into()
        );
        Ok(())
    }

    #[test]
    fn serialized_triples_reparse_identically() -> Result<(), TurtleSyntaxError> {
        let triples =
            parse("@prefix ex: <http://example.com/> .\nex:s ex:p ex:o ; ex:q \"v\"@en , 4.2 .")?;
        let serialized = triples.iter().cloned().collect::<Graph>().to_string();
        assert_eq!(parse(&serialized)?, triples);
        Ok(())
    }

    #[test]
    fn builder_prefixes_and_overrides() -> Result<(), Box<dyn std::error::Error>> {
        let parser = TurtleParser::new()
            .with_base_iri("http://example.com/")?
            .with_prefix("ex", "http://example.com/ns#")?;
        let triples = parser.parse_str("ex:a <p> ex:b .")?;
        assert_eq!(triples[0].subject.to_string(), "<http://example.com/ns#a>");
        assert_eq!(triples[0].predicate.as_str(), "http://example.com/p");

        // Document declarations override the parser defaults
        let triples = parser.parse_str("@prefix ex: <http://other.org/> . ex:a <p> ex:b .")?;
        assert_eq!(triples[0].subject.to_string(), "<http://other.org/a>");

        // but are forgotten again by the next parse
        let triples = parser.parse_str("ex:a <p> ex:b .")?;
        assert_eq!(triples[0].subject.to_string(), "<http://example.com/ns#a>");
        Ok(())
    }

    #[test]
    fn undeclared_prefix_fails() {
        let error = parse("ex:s ex:p ex:o .").unwrap_err();
        assert_eq!(error.message(), "The prefix ex: has not been declared");
        assert_eq!(error.position().line, 0);
        assert_eq!(error.position().column, 0);
    }

    #[test]
    fn missing_final_dot_fails() {
        let error = parse("<http://e.com/s> <http://e.com/p> <http://e.com/o>").unwrap_err();
        assert_eq!(error.message(), "A dot is expected at the end of statements");
    }

    #[test]
    fn error_positions_are_tracked() {
        let error = parse("@prefix ex: <http://example.com/> .\nex:s ex:p ???").unwrap_err();
        assert_eq!(error.message(), "Unexpected character '?'");
        assert_eq!(error.position().line, 1);
        assert_eq!(error.position().column, 10);
        assert_eq!(error.position().offset, 46);
        assert!(
            error
                .to_string()
                .starts_with("Parser error at line 2 column 11:")
        );
    }

    #[test]
    fn unterminated_string_fails() {
        let error = parse("<http://e.com/s> <http://e.com/p> \"open .").unwrap_err();
        assert_eq!(error.message(), "Unexpected end of file");
    }

    #[test]
    fn line_jump_in_short_string_fails() {
        let error = parse("<http://e.com/s> <http://e.com/p> \"a\nb\" .").unwrap_err();
        assert_eq!(
            error.message(),
            "Line jumps are not allowed in string literals, use \\n"
        );
    }

    #[test]
    fn invalid_iri_fails() {
        let error = parse("<http://e.com/s> <http://e.com/p> <http://e.com/a b> .").unwrap_err();
        assert!(!error.message().is_empty());
    }

    #[test]
    fn unknown_directive_fails() {
        let error = parse("@import <http://example.com/> .").unwrap_err();
        assert_eq!(
            error.message(),
            "Unexpected directive @import, expecting @prefix or @base"
        );
    }

    #[test]
    fn relative_iri_without_base_fails() {
        let error = parse("<s> <p> <o> .").unwrap_err();
        assert_eq!(error.position().column, 0);
    }

    #[test]
    fn deeply_nested_input_fails() {
        let mut input = String::from("<http://e.com/s> <http://e.com/p> ");
        for _ in 0..200 {
            input.push_str("[ <http://e.com/q> ");
        }
        let error = parse(&input).unwrap_err();
        assert_eq!(error.message(), "Too many nested terms");
    }

    #[test]
    fn parse_slice_rejects_invalid_utf8() {
        let error = TurtleParser::new()
            .parse_slice(b"<http://e.com/s> \xFF")
            .unwrap_err();
        assert!(error.message().starts_with("Invalid UTF-8"));
        assert_eq!(error.position().offset, 17);
    }
}
