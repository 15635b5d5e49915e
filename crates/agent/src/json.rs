//! Tolerant JSON recovery from model output.
//!
//! Models frequently wrap JSON in markdown fences or surround it with prose.
//! `first_json_object` scans for the first balanced `{...}` block and parses
//! it, ignoring braces inside string literals.

use serde_json::Value;

/// Extracts and parses the first JSON object embedded in `text`.
/// Returns `None` when no balanced object parses.
pub fn first_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&byte| byte == b'{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[start..=start + offset];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::first_json_object;

    #[test]
    fn parses_bare_object() {
        let value = first_json_object(r#"{"is_valid": true}"#).expect("parses");
        assert_eq!(value["is_valid"], true);
    }

    #[test]
    fn strips_markdown_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"updates\": [{\"key\": \"a\"}]}\n```\nDone.";
        let value = first_json_object(text).expect("parses");
        assert_eq!(value["updates"][0]["key"], "a");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let text = r#"{"reason": "use {braces} and \"quotes\" freely"}"#;
        let value = first_json_object(text).expect("parses");
        assert_eq!(value["reason"], "use {braces} and \"quotes\" freely");
    }

    #[test]
    fn nested_objects_return_the_outermost() {
        let value =
            first_json_object(r#"{"outer": {"inner": 1}} {"second": 2}"#).expect("parses");
        assert_eq!(value["outer"]["inner"], 1);
        assert!(value.get("second").is_none());
    }

    #[test]
    fn rejects_text_without_json() {
        assert!(first_json_object("no structure here").is_none());
        assert!(first_json_object("{ truncated").is_none());
    }
}
