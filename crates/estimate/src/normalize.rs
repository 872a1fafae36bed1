//! Declaration splitting and ingredient-name normalization.

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '*', '"', '\''];

/// Split a pasted declaration into raw ingredient tokens.
///
/// Commas and semicolons inside parentheses or brackets do not split, so
/// `Fragrance (Parfum, Limonene)` stays one token. A leading `Ingredients:`
/// label is dropped, as are empty tokens.
pub fn split_declaration(text: &str) -> Vec<String> {
    let body = strip_label(text.trim());

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;

    for c in body.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' | ';' if depth == 0 => {
                push_token(&mut tokens, &current);
                current.clear();
            }
            '\n' | '\r' if depth == 0 => current.push(' '),
            _ => current.push(c),
        }
    }
    push_token(&mut tokens, &current);
    tokens
}

fn strip_label(text: &str) -> &str {
    const LABEL: &str = "ingredients:";
    match text.get(..LABEL.len()) {
        Some(head) if head.eq_ignore_ascii_case(LABEL) => text[LABEL.len()..].trim_start(),
        _ => text,
    }
}

fn push_token(tokens: &mut Vec<String>, raw: &str) {
    let token = raw.trim();
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
}

/// Normalize a declared name: trim, lower-case, drop a `/`-qualifier suffix
/// (`Water/Aqua/Eau` -> `water`), strip trailing punctuation and collapse
/// internal whitespace.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let head = &lowered[..qualifier_split(&lowered)];
    let trimmed = head.trim_end_matches(|c: char| TRAILING_PUNCTUATION.contains(&c) || c.is_whitespace());
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offset of the first `/` outside parentheses, or the string length.
fn qualifier_split(name: &str) -> usize {
    let mut depth: usize = 0;
    for (i, c) in name.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return i,
            _ => {}
        }
    }
    name.len()
}

/// Remove parenthesized qualifiers: `tocopherol (vitamin e)` -> `tocopherol`.
/// Returns `None` when the name has no qualifier or nothing is left.
pub fn strip_parenthetical(name: &str) -> Option<String> {
    if !name.contains('(') {
        return None;
    }

    let mut out = String::with_capacity(name.len());
    let mut depth: usize = 0;
    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    let stripped = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if stripped.is_empty() || stripped == name {
        None
    } else {
        Some(stripped)
    }
}
