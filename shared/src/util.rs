/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate an order ID: UTC timestamp prefix + 6 random digits.
///
/// Layout: `YYYYMMDDHHMMSS` + `NNNNNN` (20 chars total). The timestamp
/// prefix keeps IDs roughly sortable by creation time; the random suffix
/// avoids collisions between orders created in the same second.
///
/// Order IDs double as the initial payment correlation ID, so they must
/// be unique across the lifetime of the shop.
pub fn order_id() -> String {
    use rand::Rng;
    let ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{ts}{suffix:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_has_fixed_length() {
        let id = order_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn order_ids_are_distinct() {
        let a = order_id();
        let b = order_id();
        // Same second is likely; the random suffix must still differ
        assert_ne!(a, b);
    }
}
