//! Field naming convention conversion between local (camelCase) and remote
//! (snake_case) schemas.

/// Convert a local camelCase field name to the remote snake_case form.
///
/// ```
/// use limber_core::sync::camel_to_snake;
///
/// assert_eq!(camel_to_snake("photoDataUrl"), "photo_data_url");
/// assert_eq!(camel_to_snake("sets"), "sets");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert a remote snake_case column name to the local camelCase form.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Whether the conversion pair restores `name` exactly.
pub fn round_trips(name: &str) -> bool {
    snake_to_camel(&camel_to_snake(name)) == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_medial_capitals() {
        assert_eq!(camel_to_snake("recordedAt"), "recorded_at");
        assert_eq!(camel_to_snake("doseMg"), "dose_mg");
        assert_eq!(camel_to_snake("set1Reps"), "set1_reps");
    }

    #[test]
    fn converts_back_to_camel_case() {
        assert_eq!(snake_to_camel("recorded_at"), "recordedAt");
        assert_eq!(snake_to_camel("photo_data_url"), "photoDataUrl");
        assert_eq!(snake_to_camel("level"), "level");
    }

    #[test]
    fn regular_names_round_trip() {
        for name in ["performedAt", "painDuring", "scheduledAt", "imageURL", "x"] {
            assert!(round_trips(name), "{name} should round-trip");
        }
    }

    #[test]
    fn irregular_names_do_not_round_trip() {
        assert!(!round_trips("pain_level"));
        assert!(!round_trips("Level"));
        assert!(!round_trips("double__underscore"));
    }
}
