//! Random identifiers and secrets.

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `len` random upper-case base36 characters.
pub fn random_base36(len: usize) -> String {
    (0..len)
        .map(|_| {
            let idx = usize::from(rand::random::<u8>() % 36);
            BASE36.get(idx).copied().map(char::from).unwrap_or('0')
        })
        .collect()
}

/// Ledger id for ad-hoc postings: `tx_<unix_ms>_<8 base36>`.
pub fn transaction_id(now_ms: i64) -> String {
    format!("tx_{}_{}", now_ms, random_base36(8).to_lowercase())
}

/// 32 random bytes, hex encoded (password reset tokens).
pub fn secret_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let s = random_base36(4);
        assert_eq!(s.len(), 4);
        assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let tx = transaction_id(1_700_000_000_123);
        assert!(tx.starts_with("tx_1700000000123_"));
        assert_eq!(tx.len(), "tx_1700000000123_".len() + 8);

        let token = secret_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, secret_token());
    }
}
