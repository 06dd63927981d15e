use crate::constraint::ForeignKeyAction;

/// Implemented by every object whose identity, for diffing purposes, is its
/// canonical signature rather than its (advisory, vendor-generated) name.
///
/// Signature generation is a pure, deterministic function of the object's
/// canonical fields: `signature(x) == signature(clone(x))` always, and it
/// never consults the enclosing table or model.
pub trait Signature {
    fn signature(&self) -> String;
}

pub fn pk_signature(columns: &[String]) -> String {
    format!("PK:{{{}}}", join_columns(columns))
}

pub fn unique_signature(columns: &[String]) -> String {
    format!("UQ:{{{}}}", join_columns(columns))
}

pub fn fk_signature(
    columns: &[String],
    referenced_table: &str,
    referenced_columns: &[String],
    on_update: ForeignKeyAction,
    on_delete: ForeignKeyAction,
) -> String {
    format!(
        "FK:{{{}}}->{}({})[{}][{}]",
        join_columns(columns),
        referenced_table.to_lowercase(),
        join_columns(referenced_columns),
        on_delete.as_token(),
        on_update.as_token(),
    )
}

pub fn check_signature(clause: &str) -> String {
    format!("CHECK:{}", normalize_check_clause(clause))
}

pub fn index_signature(columns: &[String], index_type: &str, unique: bool) -> String {
    format!(
        "IX:{{{}}}[{}][{}]",
        join_columns(columns),
        index_type,
        if unique { "unique" } else { "non-unique" }
    )
}

fn join_columns(columns: &[String]) -> String {
    columns.iter().map(|c| c.to_lowercase()).collect::<Vec<_>>().join(",")
}

/// Collapses whitespace, strips one layer of outer-enclosing parentheses,
/// and lowercases everything outside of single-quoted string literals.
///
/// Used for `CHECK` clause signatures: two constraints written with
/// different whitespace/parenthesization/casing but the same semantic text
/// must compare equal.
pub fn normalize_check_clause(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw.trim());
    let unwrapped = strip_outer_parens(&collapsed);
    lowercase_outside_string_literals(&unwrapped)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Strips matching outer `(...)` pairs, one layer, repeatedly, as long as the
/// opening paren at index 0 matches the closing paren at the end.
fn strip_outer_parens(s: &str) -> String {
    let mut current = s.to_string();

    loop {
        let trimmed = current.trim();
        if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
            return trimmed.to_string();
        }

        if !parens_are_matching_pair(trimmed) {
            return trimmed.to_string();
        }

        current = trimmed[1..trimmed.len() - 1].to_string();
    }
}

/// True if the first `(` and the last `)` of `s` are the same pair, i.e. the
/// nesting depth never drops to zero before the final character.
fn parens_are_matching_pair(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut depth: i32 = 0;
    let mut in_string = false;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\'' => in_string = !in_string,
            b'(' if !in_string => depth += 1,
            b')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return i == bytes.len() - 1;
                }
            }
            _ => {}
        }
    }

    false
}

fn lowercase_outside_string_literals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;

    for ch in s.chars() {
        if ch == '\'' {
            in_string = !in_string;
            out.push(ch);
        } else if in_string {
            out.push(ch);
        } else {
            out.extend(ch.to_lowercase());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_lowercases() {
        let normalized = normalize_check_clause("  AGE  >   18  ");
        assert_eq!(normalized, "age > 18");
    }

    #[test]
    fn strips_one_layer_of_outer_parens() {
        assert_eq!(normalize_check_clause("((age > 18))"), "age > 18");
    }

    #[test]
    fn preserves_string_literal_case() {
        assert_eq!(
            normalize_check_clause("STATUS IN ('Active', 'Pending')"),
            "status in ('Active', 'Pending')"
        );
    }

    #[test]
    fn does_not_strip_parens_that_are_not_a_single_enclosing_pair() {
        let normalized = normalize_check_clause("(a > 1) AND (b > 2)");
        assert_eq!(normalized, "(a > 1) and (b > 2)");
    }

    #[test]
    fn fk_signature_includes_actions_and_referenced_table() {
        let sig = fk_signature(
            &["user_id".into()],
            "Users",
            &["id".into()],
            ForeignKeyAction::NoAction,
            ForeignKeyAction::Cascade,
        );
        assert_eq!(sig, "FK:{user_id}->users(id)[CASCADE][NO_ACTION]");
    }
}
