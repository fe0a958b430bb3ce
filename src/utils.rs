use rand::Rng;
use std::time::Duration;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

// Adds the ICE scheme to a server URL if it is missing
pub fn add_ice_url_scheme(url: &str, relay: bool) -> String {
    if url.starts_with("turn:") || url.starts_with("turns:") || url.starts_with("stun:") {
        url.to_string()
    } else {
        let scheme = if relay { "turn:" } else { "stun:" };
        format!("{}{}", scheme, url)
    }
}

/// Delay before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exp).unwrap_or(cap).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_added_only_when_missing() {
        assert_eq!(add_ice_url_scheme("stun.example:3478", false), "stun:stun.example:3478");
        assert_eq!(add_ice_url_scheme("turn.example:3478", true), "turn:turn.example:3478");
        assert_eq!(add_ice_url_scheme("turns:t.example:443", true), "turns:t.example:443");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(16);
        let delays: Vec<u64> = (1..=7).map(|a| backoff_delay(a, base, cap).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 16, 16]);
        assert_eq!(backoff_delay(100, base, cap), cap);
    }

    #[test]
    fn random_ids_are_hex() {
        let id = random_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
