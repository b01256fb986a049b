//! The style sheet rule parser.
//!
//! Turns style sheet text into a [`StyleSheet`]: a color map from
//! `@name: value;` declarations plus compiled [`StyleRule`]s. One bad
//! rule never aborts the sheet: on a syntax error the parser skips to
//! the matching `}` and resumes at the next rule, reporting what it
//! skipped to the injected [`ErrorSink`]. Declarations whose value
//! cannot be parsed for the property's kind are dropped individually,
//! also with a report.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorSink, StyleError};
use crate::property::StyleRegistry;
use crate::selector::{SelectorPath, parse_selector_list};
use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::value::{SymbolicColor, Value};

/// One parsed `property: value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// The property name as written.
    pub name: String,
    /// The parsed value. Custom (`-`-prefixed) properties keep their
    /// text as [`Value::Raw`].
    pub value: Value,
}

/// The declarations of one `{ ... }` block, in source order.
///
/// Shared behind `Rc` by every rule compiled from the block's
/// comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclarationBlock {
    /// The declarations, in source order. Within one block a later
    /// declaration of the same property wins.
    pub declarations: Vec<Declaration>,
}

/// One selector chain bound to a declaration block.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// The compiled selector.
    pub selector: Rc<SelectorPath>,
    /// The block, shared with the other selectors of the same rule.
    pub declarations: Rc<DeclarationBlock>,
}

/// A parsed style sheet: named colors plus rules.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// Colors declared with `@name: value;`, by name.
    pub colors: HashMap<String, SymbolicColor>,
    /// The style rules, in source order.
    pub rules: Vec<StyleRule>,
}

/// Parse style sheet text.
///
/// Total over any input: every problem is reported to `sink` and
/// recovered from, and whatever parsed cleanly is returned.
pub fn parse_stylesheet(
    source: &str,
    registry: &StyleRegistry,
    sink: &mut dyn ErrorSink,
) -> StyleSheet {
    SheetParser::new(source, registry).parse(sink)
}

struct SheetParser<'a> {
    source: &'a str,
    registry: &'a StyleRegistry,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> SheetParser<'a> {
    fn new(source: &'a str, registry: &'a StyleRegistry) -> Self {
        Self {
            source,
            registry,
            tokens: Vec::new(),
            position: 0,
        }
    }

    fn parse(mut self, sink: &mut dyn ErrorSink) -> StyleSheet {
        let mut tokenizer = Tokenizer::new(self.source);
        loop {
            let token = tokenizer.next_token();
            let done = token.is_eof();
            self.tokens.push(token);
            if done {
                break;
            }
        }
        for diagnostic in tokenizer.take_diagnostics() {
            sink.report(diagnostic);
        }

        let mut sheet = StyleSheet::default();
        loop {
            self.skip_filler();
            match &self.peek().kind {
                TokenKind::Eof => break,

                TokenKind::AtKeyword(_) => self.parse_color_declaration(&mut sheet, sink),

                TokenKind::CloseBrace => {
                    self.syntax_error("unmatched '}'", sink);
                    self.advance();
                }

                _ => self.parse_style_rule(&mut sheet, sink),
            }
        }
        sheet
    }

    /// `@name: <color>;`
    fn parse_color_declaration(&mut self, sheet: &mut StyleSheet, sink: &mut dyn ErrorSink) {
        let TokenKind::AtKeyword(name) = self.peek().kind.clone() else {
            return;
        };
        self.advance();

        self.skip_filler();
        if self.peek().kind != TokenKind::Colon {
            self.syntax_error(&format!("expected ':' after '@{name}'"), sink);
            self.recover_rule();
            return;
        }
        self.advance();

        let value_start = self.position;
        let end_kind = self.scan_to_value_end();
        let value_text = self.slice(value_start, self.position);

        if end_kind != TokenKind::Semicolon {
            self.syntax_error(&format!("expected ';' after '@{name}' declaration"), sink);
            self.recover_rule();
            return;
        }
        self.advance(); // ;

        match SymbolicColor::parse(&value_text) {
            Ok(color) => {
                let _ = sheet.colors.insert(name, color);
            }
            Err(error) => sink.report(StyleError::UnknownValue {
                property: format!("@{name}"),
                message: error.to_string(),
            }),
        }
    }

    /// `selectorList '{' declaration* '}'`
    fn parse_style_rule(&mut self, sheet: &mut StyleSheet, sink: &mut dyn ErrorSink) {
        let selector_start = self.position;
        loop {
            match &self.peek().kind {
                TokenKind::OpenBrace => break,
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::CloseBrace => {
                    self.syntax_error("expected '{' after selector", sink);
                    self.recover_rule();
                    return;
                }
                _ => self.advance(),
            }
        }

        let selector_text = self.slice(selector_start, self.position);
        let selectors = match parse_selector_list(&selector_text) {
            Ok(selectors) => selectors,
            Err(error) => {
                self.syntax_error(&error.to_string(), sink);
                self.recover_rule();
                return;
            }
        };

        self.advance(); // {
        let block = Rc::new(self.parse_declaration_block(sink));

        for selector in selectors {
            sheet.rules.push(StyleRule {
                selector: Rc::new(selector),
                declarations: Rc::clone(&block),
            });
        }
    }

    /// Declarations up to the closing `}`. A bad declaration is dropped
    /// and parsing resumes at the next `;` within the block.
    fn parse_declaration_block(&mut self, sink: &mut dyn ErrorSink) -> DeclarationBlock {
        let mut block = DeclarationBlock::default();

        loop {
            self.skip_filler();
            match self.peek().kind.clone() {
                TokenKind::CloseBrace => {
                    self.advance();
                    return block;
                }
                TokenKind::Eof => {
                    self.syntax_error("unclosed '{' at end of input", sink);
                    return block;
                }
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Ident(name) => {
                    self.advance();
                    if let Some(declaration) = self.parse_declaration(&name, sink) {
                        block.declarations.push(declaration);
                    }
                }
                other => {
                    self.syntax_error(&format!("expected a property name, found {other}"), sink);
                    self.recover_declaration();
                }
            }
        }
    }

    /// The `: value` tail of one declaration, the name already consumed.
    fn parse_declaration(&mut self, name: &str, sink: &mut dyn ErrorSink) -> Option<Declaration> {
        self.skip_filler();
        if self.peek().kind != TokenKind::Colon {
            self.syntax_error(&format!("expected ':' after '{name}'"), sink);
            self.recover_declaration();
            return None;
        }
        self.advance();

        let value_start = self.position;
        let end_kind = self.scan_to_value_end();
        let value_text = self.slice(value_start, self.position);
        if end_kind == TokenKind::Semicolon {
            self.advance();
        }

        // Prefixed names are engine-specific custom properties, kept as
        // opaque text for later interpretation.
        if name.starts_with('-') {
            return Some(Declaration {
                name: name.to_string(),
                value: Value::Raw(value_text),
            });
        }

        let Some(property) = self.registry.property(name) else {
            sink.report(StyleError::UnknownValue {
                property: name.to_string(),
                message: "no such property".to_string(),
            });
            return None;
        };

        match self.registry.parse_value(&property, &value_text) {
            Ok(value) => Some(Declaration {
                name: name.to_string(),
                value,
            }),
            Err(error) => {
                sink.report(StyleError::UnknownValue {
                    property: name.to_string(),
                    message: error.to_string(),
                });
                None
            }
        }
    }

    /// Advance to the token ending a value: `;`, `}` or EOF, honoring
    /// nested parentheses and braces so function arguments can contain
    /// either.
    fn scan_to_value_end(&mut self) -> TokenKind {
        let mut depth = 0_u32;
        loop {
            match &self.peek().kind {
                TokenKind::Semicolon | TokenKind::CloseBrace if depth == 0 => {
                    return self.peek().kind.clone();
                }
                TokenKind::Eof => return TokenKind::Eof,
                TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::CloseParen | TokenKind::CloseBrace | TokenKind::CloseBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => self.advance(),
            }
        }
    }

    /// Rule-level recovery: skip to the end of the current rule, i.e.
    /// past the next balanced `{ ... }` block or top-level `;`.
    fn recover_rule(&mut self) {
        let mut depth = 0_u32;
        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::OpenBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::CloseBrace => {
                    self.advance();
                    if depth <= 1 {
                        return;
                    }
                    depth -= 1;
                }
                _ => self.advance(),
            }
        }
    }

    /// Declaration-level recovery: skip to the next `;` in the block,
    /// leaving the block's `}` for the caller.
    fn recover_declaration(&mut self) {
        let mut depth = 0_u32;
        loop {
            match &self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::CloseBrace if depth == 0 => return,
                TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenBracket => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::CloseParen | TokenKind::CloseBrace | TokenKind::CloseBracket => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                _ => self.advance(),
            }
        }
    }

    fn syntax_error(&self, message: &str, sink: &mut dyn ErrorSink) {
        sink.report(StyleError::Syntax {
            location: self.peek().location,
            message: message.to_string(),
        });
    }

    /// The source text spanned by tokens `[from, to)`, with comments
    /// blanked out, trimmed.
    fn slice(&self, from: usize, to: usize) -> String {
        let mut text = String::new();
        for index in from..to {
            if self.tokens[index].kind == TokenKind::Comment {
                text.push(' ');
                continue;
            }
            let start = self.tokens[index].location.byte_offset;
            let end = self
                .tokens
                .get(index + 1)
                .map_or(self.source.len(), |next| next.location.byte_offset);
            text.push_str(&self.source[start..end]);
        }
        text.trim().to_string()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn skip_filler(&mut self) {
        while self.peek().is_filler() {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Rgba;

    fn parse(source: &str) -> (StyleSheet, Vec<StyleError>) {
        let registry = StyleRegistry::new();
        let mut errors = Vec::new();
        let sheet = parse_stylesheet(source, &registry, &mut errors);
        (sheet, errors)
    }

    #[test]
    fn test_color_declarations_populate_the_map() {
        let (sheet, errors) = parse("@base: #102030;\n@accent: shade(@base, 1.3);");
        assert!(errors.is_empty());
        assert_eq!(
            sheet.colors.get("base"),
            Some(&SymbolicColor::Literal(Rgba::opaque(0x10, 0x20, 0x30)))
        );
        assert!(matches!(
            sheet.colors.get("accent"),
            Some(SymbolicColor::Shade { .. })
        ));
    }

    #[test]
    fn test_comma_selectors_share_one_block() {
        let (sheet, errors) = parse("Button, Entry { border-radius: 3; }");
        assert!(errors.is_empty());
        assert_eq!(sheet.rules.len(), 2);
        assert!(Rc::ptr_eq(
            &sheet.rules[0].declarations,
            &sheet.rules[1].declarations
        ));
    }

    #[test]
    fn test_bad_rule_is_skipped_next_rule_survives() {
        let (sheet, errors) = parse(
            "Button { 42: oops; margin: 2; }\n\
             % { color: red; }\n\
             Entry { margin: 4; }",
        );
        // The bad declaration and the bad selector are reported...
        assert!(errors.len() >= 2);
        // ...but the sound rules still made it.
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].declarations.declarations.len(), 1);
        assert_eq!(sheet.rules[1].declarations.declarations[0].name, "margin");
    }

    #[test]
    fn test_unknown_value_drops_only_that_declaration() {
        let (sheet, errors) = parse("Button { margin: banana; border-radius: 2; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            StyleError::UnknownValue { ref property, .. } if property == "margin"
        ));
        let block = &sheet.rules[0].declarations;
        assert_eq!(block.declarations.len(), 1);
        assert_eq!(block.declarations[0].name, "border-radius");
    }

    #[test]
    fn test_custom_properties_are_kept_raw() {
        let (sheet, errors) = parse("Button { -app-glow-radius: 4 fuzzy; }");
        assert!(errors.is_empty());
        assert_eq!(
            sheet.rules[0].declarations.declarations[0].value,
            Value::Raw("4 fuzzy".to_string())
        );
    }

    #[test]
    fn test_unterminated_string_recovers_at_rule_level() {
        let (sheet, errors) = parse("Button { font: \"oops\nnewline; }\nEntry { margin: 1; }");
        assert!(!errors.is_empty());
        // The rule after the bad one still parses.
        assert!(
            sheet
                .rules
                .iter()
                .any(|rule| rule.declarations.declarations.iter().any(|d| d.name == "margin"))
        );
    }

    #[test]
    fn test_comments_are_ignored_inside_values() {
        let (sheet, errors) = parse("Button { border-radius /* px */: /* small */ 2; }");
        assert!(errors.is_empty());
        assert_eq!(
            sheet.rules[0].declarations.declarations[0].value,
            Value::Integer(2)
        );
    }
}
