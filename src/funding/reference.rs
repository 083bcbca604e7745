//! Human-readable transaction references

use rand::Rng;

/// No 0/O or 1/I to avoid misreading
pub const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// `REF-XXXX-XXXX`
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let mut block = || -> String {
        (0..4)
            .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
            .collect()
    };
    let first = block();
    let second = block();
    format!("REF-{}-{}", first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_format() {
        for _ in 0..200 {
            let r = generate_reference();
            assert_eq!(r.len(), 13);
            assert!(r.starts_with("REF-"));
            assert_eq!(&r[8..9], "-");
            assert!(
                r[4..8]
                    .bytes()
                    .chain(r[9..13].bytes())
                    .all(|b| REFERENCE_ALPHABET.contains(&b))
            );
        }
    }
}
