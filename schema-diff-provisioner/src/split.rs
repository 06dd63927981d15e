use schema_diff_types::Dialect;

/// Strips a leading UTF-8 BOM, if present.
pub fn strip_bom(script: &str) -> String {
    script.strip_prefix('\u{feff}').unwrap_or(script).to_string()
}

/// Removes single-line `-- ...` comments while preserving string literals
/// (a `--` inside a quoted string is not a comment marker).
pub fn strip_line_comments(script: &str) -> String {
    let mut out = String::with_capacity(script.len());

    for line in script.split_inclusive('\n') {
        let mut in_string = false;
        let mut comment_start = None;
        let chars: Vec<char> = line.chars().collect();

        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            if ch == '\'' {
                in_string = !in_string;
            } else if !in_string && ch == '-' && chars.get(i + 1) == Some(&'-') {
                comment_start = Some(i);
                break;
            }
            i += 1;
        }

        match comment_start {
            Some(idx) => {
                let kept: String = chars[..idx].iter().collect();
                out.push_str(kept.trim_end());
                if line.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }

    out
}

/// MySQL preprocessing: `ENGINE = INNODB` (in any casing/spacing) gets a
/// `ROW_FORMAT=DYNAMIC` inserted before it so large-key schemas (long
/// indexes on `utf8mb4` columns) succeed under the default row format.
pub fn preprocess_mysql(script: &str) -> String {
    let re = regex::RegexBuilder::new(r"ENGINE\s*=\s*INNODB")
        .case_insensitive(true)
        .build()
        .expect("static regex is valid");

    re.replace_all(script, "ROW_FORMAT=DYNAMIC ENGINE=INNODB").into_owned()
}

/// Splits a preprocessed script into individual statements for `dialect`.
///
/// The default rule is "split on `;` outside single-quoted strings". MSSQL
/// additionally splits on a line containing only the word `GO` (its batch
/// separator); Oracle additionally splits on a line containing only `/`
/// (PL/SQL block terminator).
pub fn split_statements(dialect: Dialect, script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let chars: Vec<char> = script.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
        } else if !in_string && ch == ';' {
            statements.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }

        i += 1;
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    match dialect {
        Dialect::Mssql => statements.into_iter().flat_map(split_on_go_batches).collect(),
        Dialect::Oracle => statements.into_iter().flat_map(split_on_slash_terminator).collect(),
        _ => statements,
    }
}

fn split_on_go_batches(statement: String) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in statement.lines() {
        if line.trim().eq_ignore_ascii_case("go") {
            out.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }

    if !current.trim().is_empty() {
        out.push(current);
    }

    out
}

fn split_on_slash_terminator(statement: String) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in statement.lines() {
        if line.trim() == "/" {
            out.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }

    if !current.trim().is_empty() {
        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bom() {
        assert_eq!(strip_bom("\u{feff}CREATE TABLE x"), "CREATE TABLE x");
    }

    #[test]
    fn strips_comments_but_preserves_literals() {
        let script = "SELECT '--not a comment' AS x; -- a real comment\nSELECT 1;";
        let stripped = strip_line_comments(script);
        assert!(stripped.contains("'--not a comment'"));
        assert!(!stripped.contains("a real comment"));
    }

    #[test]
    fn splits_on_semicolons_outside_strings() {
        let script = "CREATE TABLE x (a TEXT DEFAULT 'a;b'); CREATE TABLE y (b INT);";
        let statements = split_statements(Dialect::Postgres, script);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'a;b'"));
    }

    #[test]
    fn mssql_splits_on_go_batches() {
        let script = "CREATE TABLE x (a INT)\nGO\nCREATE TABLE y (b INT)\nGO\n";
        let statements = split_statements(Dialect::Mssql, script);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn oracle_splits_on_lone_slash() {
        let script = "BEGIN\n  NULL;\nEND;\n/\nCREATE TABLE y (b INT)\n";
        let statements = split_statements(Dialect::Oracle, script);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn mysql_preprocessing_inserts_row_format() {
        let rewritten = preprocess_mysql("CREATE TABLE x (a INT) ENGINE = INNODB;");
        assert!(rewritten.contains("ROW_FORMAT=DYNAMIC ENGINE=INNODB"));
    }
}
