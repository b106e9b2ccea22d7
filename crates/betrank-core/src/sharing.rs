use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

const TOKEN_BYTES: usize = 24;

/// Generate an unguessable, URL-safe token for a shared ranking link.
pub fn generate_sharing_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn tokens_are_url_safe_and_distinct() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = generate_sharing_token(&mut rng);
        let b = generate_sharing_token(&mut rng);

        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
