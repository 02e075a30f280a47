//! SQL text preparation.
//!
//! Beeline echoes every statement it receives and treats `--` comments
//! inconsistently across versions, so statements are normalized before
//! they are sent. No parsing or validation happens here.

/// Strips comments and blank lines and removes trailing `;` terminators.
///
/// `--` and `/* ... */` comments are removed only outside quoted text
/// (`'...'`, `"..."` and Hive's backquoted identifiers). Backslash escapes
/// and doubled quotes inside literals are respected.
pub fn clean_sql(sql: &str) -> String {
    let stripped = strip_comments(sql);

    let joined = stripped
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut cleaned = joined.trim();
    while let Some(rest) = cleaned.strip_suffix(';') {
        cleaned = rest.trim_end();
    }
    cleaned.to_string()
}

fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                // A doubled quote stays inside the literal.
                if chars.peek() == Some(&q) {
                    out.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        out.push('\n');
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
