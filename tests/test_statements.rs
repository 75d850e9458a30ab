//! Tests for script splitting and statement classification

use staylift::pipeline::{classify, split_statements, StatementError, StatementKind};

#[test]
fn test_split_stage_script_with_comments_and_literals() {
    let script = "\
-- build the cheap table; keep only listings with a price
DROP TABLE IF EXISTS cheap;
/* multi-line
   comment; still one block */
CREATE TABLE cheap AS
SELECT id, 'a;b' AS note, \"odd;name\" FROM listings WHERE price < 100;

SELECT $body$ semicolons; inside $body$ AS txt;
";
    let statements = split_statements(script).unwrap();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], "DROP TABLE IF EXISTS cheap");
    assert!(statements[1].starts_with("CREATE TABLE cheap AS"));
    assert!(statements[1].ends_with("price < 100"));
    assert!(statements[2].contains("semicolons; inside"));
}

#[test]
fn test_empty_and_comment_only_scripts() {
    assert!(split_statements("").unwrap().is_empty());
    assert!(split_statements(" ;; -- nothing here\n").unwrap().is_empty());
}

#[test]
fn test_escaped_quote_in_literal() {
    let statements = split_statements("SELECT 'it''s; fine' AS x; SELECT 2").unwrap();
    assert_eq!(statements, vec!["SELECT 'it''s; fine' AS x", "SELECT 2"]);
}

#[test]
fn test_classify_each_statement_of_a_script() {
    let script = "DROP TABLE IF EXISTS a, b; CREATE TABLE a AS SELECT 1 AS x; SELECT * FROM a";
    let kinds: Vec<StatementKind> = split_statements(script)
        .unwrap()
        .iter()
        .map(|s| classify(s).unwrap())
        .collect();

    assert_eq!(
        kinds[0],
        StatementKind::DropTable {
            tables: vec!["a".to_string(), "b".to_string()],
            if_exists: true,
        }
    );
    assert!(matches!(
        &kinds[1],
        StatementKind::CreateTableAs { table, if_not_exists: false, query }
            if table == "a" && query == "SELECT 1 AS x"
    ));
    assert_eq!(kinds[2], StatementKind::Query);
}

#[test]
fn test_classify_rejects_writes_other_than_create_and_drop() {
    for statement in [
        "INSERT INTO a VALUES (1)",
        "UPDATE a SET x = 1",
        "DELETE FROM a",
        "ALTER TABLE a ADD COLUMN y INT",
    ] {
        assert!(
            matches!(classify(statement), Err(StatementError::Unsupported(_))),
            "{} should be unsupported",
            statement
        );
    }
}

#[test]
fn test_unterminated_comment_reports_offset() {
    let err = split_statements("SELECT 1; /* open").unwrap_err();
    assert_eq!(err, StatementError::UnterminatedComment(10));
}
