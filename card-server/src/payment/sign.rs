//! epay MD5 签名
//!
//! 固定外部契约：参数按键名升序排列，跳过空值与 `sign`/`sign_type`，
//! 以 `k=v&k=v` 连接后追加商户密钥，取 MD5 小写十六进制。
//! 出站支付请求与入站回调验签共用同一套算法。

use md5::{Digest, Md5};
use std::collections::BTreeMap;

/// Compute the signature over an ordered parameter set
pub fn generate_sign(params: &BTreeMap<String, String>, merchant_key: &str) -> String {
    let joined = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && k.as_str() != "sign" && k.as_str() != "sign_type")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Md5::digest(format!("{joined}{merchant_key}"));
    hex::encode(digest)
}

/// Verify an inbound notification's signature
pub fn verify_sign(params: &BTreeMap<String, String>, merchant_key: &str) -> bool {
    let Some(provided) = params.get("sign") else {
        return false;
    };
    let expected = generate_sign(params, merchant_key);
    // Gateways differ in case; compare case-insensitively
    provided.eq_ignore_ascii_case(&expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sign_known_vector() {
        // md5("money=1.00&out_trade_no=o1&pid=1001key")
        let p = params(&[("pid", "1001"), ("out_trade_no", "o1"), ("money", "1.00")]);
        let sign = generate_sign(&p, "key");
        assert_eq!(sign.len(), 32);
        assert!(sign.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic
        assert_eq!(sign, generate_sign(&p, "key"));
    }

    #[test]
    fn test_sign_skips_empty_and_meta_fields() {
        let base = params(&[("pid", "1001"), ("money", "1.00")]);
        let mut noisy = base.clone();
        noisy.insert("sign_type".into(), "MD5".into());
        noisy.insert("remark".into(), String::new());
        assert_eq!(generate_sign(&base, "key"), generate_sign(&noisy, "key"));
    }

    #[test]
    fn test_verify_roundtrip() {
        let mut p = params(&[("pid", "1001"), ("out_trade_no", "o1"), ("money", "1.00")]);
        let sign = generate_sign(&p, "key");
        p.insert("sign".into(), sign.to_uppercase());
        assert!(verify_sign(&p, "key"));
        assert!(!verify_sign(&p, "other-key"));
    }

    #[test]
    fn test_verify_rejects_missing_or_tampered_sign() {
        let mut p = params(&[("pid", "1001"), ("money", "1.00")]);
        assert!(!verify_sign(&p, "key"));

        p.insert("sign".into(), generate_sign(&p, "key"));
        p.insert("money".into(), "99.00".into());
        assert!(!verify_sign(&p, "key"));
    }

    #[test]
    fn test_key_change_changes_sign() {
        let p = params(&[("pid", "1001")]);
        assert_ne!(generate_sign(&p, "key-a"), generate_sign(&p, "key-b"));
    }
}
