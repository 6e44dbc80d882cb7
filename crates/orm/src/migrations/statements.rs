//! Splitting raw migration SQL into executable statements

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Split SQL text into individual statements using proper SQL parsing.
///
/// Falls back to a quote-aware scan when the parser rejects the text, which
/// keeps PostgreSQL-only syntax (DO blocks, newer DDL) usable in raw steps.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    if sql.trim().is_empty() {
        return Vec::new();
    }

    match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(parsed) => parsed.iter().map(|stmt| stmt.to_string()).collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, splitting on top-level semicolons: {}", e);
            split_top_level(sql)
        }
    }
}

/// Split on `;` outside of quoted strings, quoted identifiers, dollar-quoted
/// bodies and `--` comments
fn split_top_level(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        i = match bytes[i] {
            b'\'' | b'"' => skip_quoted(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => sql[i..]
                .find('\n')
                .map_or(bytes.len(), |end| i + end + 1),
            b'$' => match dollar_tag(&sql[i..]) {
                Some(tag) => {
                    let body = i + tag.len();
                    sql[body..]
                        .find(tag)
                        .map_or(bytes.len(), |end| body + end + tag.len())
                }
                None => i + 1,
            },
            b';' => {
                push_statement(&mut statements, &sql[start..i]);
                start = i + 1;
                i + 1
            }
            _ => i + 1,
        };
    }
    push_statement(&mut statements, &sql[start..]);
    statements
}

/// Index just past the quote closing the one at `open`; doubled quotes escape
fn skip_quoted(bytes: &[u8], open: usize) -> usize {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// `$$` or `$tag$` at the start of `text`
fn dollar_tag(text: &str) -> Option<&str> {
    let close = text[1..].find('$')? + 1;
    let tag = &text[1..close];
    let valid = match tag.chars().next() {
        None => true,
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
    };
    valid.then_some(&text[..=close])
}

fn push_statement(statements: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        statements.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multiple_statements() {
        let statements = split_sql_statements(
            "ALTER TABLE users ADD COLUMN phone VARCHAR(32);\n\
             ALTER TABLE users DROP COLUMN age;",
        );
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("ALTER TABLE users ADD COLUMN phone"));
        assert!(statements[1].contains("DROP COLUMN age"));
    }

    #[test]
    fn test_semicolon_inside_literal_is_not_a_separator() {
        let statements =
            split_sql_statements("ALTER TABLE settings ADD COLUMN note TEXT DEFAULT 'a;b'");
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("'a;b'"));
    }

    #[test]
    fn test_unparseable_sql_falls_back() {
        let statements = split_sql_statements("FROBNICATE things; FROBNICATE more");
        assert_eq!(statements, vec!["FROBNICATE things", "FROBNICATE more"]);
    }

    #[test]
    fn test_do_block_stays_whole() {
        let sql = "DO $$ BEGIN IF NOT EXISTS (SELECT 1) THEN \
                   ALTER TABLE x ADD COLUMN y INT; END IF; END $$;";
        let statements = split_sql_statements(sql);
        assert_eq!(statements, vec![sql.trim_end_matches(';').to_string()]);
    }

    #[test]
    fn test_tagged_dollar_body_then_next_statement() {
        let statements = split_sql_statements(
            "DO $body$ BEGIN PERFORM 'x;$$'; END $body$;\n\
             DO $$ BEGIN RAISE NOTICE 'done'; END $$",
        );
        assert_eq!(
            statements,
            vec![
                "DO $body$ BEGIN PERFORM 'x;$$'; END $body$",
                "DO $$ BEGIN RAISE NOTICE 'done'; END $$",
            ]
        );
    }

    #[test]
    fn test_fallback_respects_literals_and_comments() {
        let statements = split_sql_statements(
            "FROBNICATE 'a;b''c'; -- trailing; comment\nFROBNICATE \"odd;name\"",
        );
        assert_eq!(
            statements,
            vec!["FROBNICATE 'a;b''c'", "-- trailing; comment\nFROBNICATE \"odd;name\""]
        );
    }

    #[test]
    fn test_positional_parameter_is_not_a_dollar_quote() {
        let statements = split_sql_statements("FROBNICATE $1; FROBNICATE $2");
        assert_eq!(statements, vec!["FROBNICATE $1", "FROBNICATE $2"]);
    }

    #[test]
    fn test_empty_sql() {
        assert!(split_sql_statements("   \n").is_empty());
    }
}
