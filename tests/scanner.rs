#[cfg(test)]
mod scanner_tests {
    use rox::error::Diagnostic;
    use rox::scanner::{scan, Scanner};
    use rox::token::{Literal, Token, TokenType};

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens: Vec<_> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token, Diagnostic>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(
                    token.lexeme, expected_lexeme,
                    "Expected lexeme '{}', got '{}'",
                    expected_lexeme, token.lexeme
                );
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<&Diagnostic> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(errors.len(), 2, "Expected 2 error messages");

        for err in errors {
            assert_eq!(err.message, "Unexpected character.");
            assert_eq!(err.to_string(), "[line 1] Error: Unexpected character.");
        }
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let (tokens, diagnostics) = scan("é;");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::SEMICOLON);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, diagnostics) = scan("\"abc\n");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Unterminated string.");
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_multi_line_string_counts_lines() {
        let (tokens, diagnostics) = scan("\"one\ntwo\"\nprint");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::STRING);
        assert_eq!(tokens[0].literal, Some(Literal::Str("one\ntwo".to_string())));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].token_type, TokenType::PRINT);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = scan("123 2.5 123.");

        assert_eq!(tokens[0].literal, Some(Literal::Number(123.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(2.5)));

        // A trailing dot is not part of the number.
        assert_eq!(tokens[2].lexeme, "123");
        assert_eq!(tokens[3].token_type, TokenType::DOT);
        assert_eq!(tokens[4].token_type, TokenType::EOF);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_token_sequence(
            "class fun var orchid _tmp nil this",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::FUN, "fun"),
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::NIL, "nil"),
                (TokenType::THIS, "this"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let (tokens, diagnostics) = scan("// nothing here $#\nprint // trailing");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn test_print_statement_tokens() {
        let (tokens, diagnostics) = scan("print 1 + 2 * 3;");

        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 8);

        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "PRINT print null",
                "NUMBER 1 1.0",
                "PLUS + null",
                "NUMBER 2 2.0",
                "STAR * null",
                "NUMBER 3 3.0",
                "SEMICOLON ; null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
