/// Parses a dumper offset string ("0x58", "0X58" or bare "58") into a number.
///
/// Returns `None` for empty or non-hexadecimal input; callers treat that as
/// "offset unknown".
pub fn parse_hex_offset(offset: &str) -> Option<u64> {
    let trimmed = offset.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Turns a class name into something usable inside a Lua identifier.
pub fn lua_ident(name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() {
        "_".to_string()
    } else {
        ident
    }
}

/// Escapes a value for use inside a double-quoted Lua string literal.
pub fn lua_str(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

/// Lowercased CamelCase tokens of a name: "PlayerHPBar" -> ["player", "hp", "bar"].
///
/// Digits and punctuation separate tokens and are dropped.
pub fn camel_tokens(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_uppercase() {
            let mut end = i;
            while end < chars.len() && chars[end].is_ascii_uppercase() {
                end += 1;
            }
            let followed_by_lower = end < chars.len() && chars[end].is_ascii_lowercase();
            if followed_by_lower {
                // acronym run ends one before the word that starts with its last capital
                if end - i > 1 {
                    tokens.push(chars[i..end - 1].iter().collect::<String>());
                }
                let word_start = end - 1;
                let mut word_end = end;
                while word_end < chars.len() && chars[word_end].is_ascii_lowercase() {
                    word_end += 1;
                }
                tokens.push(chars[word_start..word_end].iter().collect::<String>());
                i = word_end;
            } else {
                tokens.push(chars[i..end].iter().collect::<String>());
                i = end;
            }
        } else if c.is_ascii_lowercase() {
            let mut end = i;
            while end < chars.len() && chars[end].is_ascii_lowercase() {
                end += 1;
            }
            tokens.push(chars[i..end].iter().collect::<String>());
            i = end;
        } else {
            i += 1;
        }
    }

    tokens.into_iter().map(|t| t.to_ascii_lowercase()).collect()
}
