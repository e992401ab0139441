//! Name derivation shared by the parser and the emitters.

/// Default storage variable name: lowercased type name plus a trailing `s`.
pub fn storage_name(table: &str) -> String {
    format!("{}s", table.to_lowercase())
}

/// `PlayerStats` -> `player_stats`, `HTTPServer` -> `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev != '_'
                    && (prev.is_lowercase()
                        || prev.is_ascii_digit()
                        || (prev.is_uppercase() && next_is_lower))
                {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn upper_snake_case(name: &str) -> String {
    snake_case(name).to_uppercase()
}

/// Name of the generated element-count constant for an array field.
pub fn size_constant_name(table: &str, field: &str) -> String {
    format!("{}_{}_SIZE", upper_snake_case(table), upper_snake_case(field))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
