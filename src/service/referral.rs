use rand::Rng;

/// `A-Z` and `2-9` without the look-alikes `0 O 1 I L`.
pub const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const REFERRAL_CODE_LENGTH: usize = 8;

pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_CODE_LENGTH)
        .map(|_| REFERRAL_CODE_ALPHABET[rng.random_range(0..REFERRAL_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Uppercased code, or `None` when it cannot possibly be a referral code.
pub fn normalize_referral_code(code: &str) -> Option<String> {
    if code.chars().count() != REFERRAL_CODE_LENGTH {
        return None;
    }
    Some(code.to_uppercase())
}

pub fn generate_referral_link(base_url: &str, code: &str) -> String {
    format!("{}/signup?ref={}", base_url.trim_end_matches('/'), code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_use_only_the_unambiguous_alphabet() {
        for _ in 0..500 {
            let code = generate_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LENGTH);
            assert!(code.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(|c| matches!(c, '0' | 'O' | '1' | 'I' | 'L')));
        }
    }

    #[test]
    fn alphabet_has_no_duplicates() {
        let unique: HashSet<&u8> = REFERRAL_CODE_ALPHABET.iter().collect();
        assert_eq!(unique.len(), REFERRAL_CODE_ALPHABET.len());
    }

    #[test]
    fn normalize_rejects_wrong_length_and_uppercases() {
        assert_eq!(normalize_referral_code(""), None);
        assert_eq!(normalize_referral_code("ABC"), None);
        assert_eq!(normalize_referral_code("ABCDEFGHJ"), None);
        assert_eq!(normalize_referral_code("abcd2345"), Some("ABCD2345".to_string()));
    }

    #[test]
    fn link_points_at_signup_with_code() {
        assert_eq!(
            generate_referral_link("https://app.example.se/", "ABCD2345"),
            "https://app.example.se/signup?ref=ABCD2345"
        );
    }
}
