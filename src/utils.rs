use axum::http::HeaderMap;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha3::{Digest, Sha3_256};
use std::env;
use std::str::FromStr;

pub fn get_env(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("Environment variable {} is required", name))
}

pub fn get_env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("Environment variable {} has an invalid value", name)),
        Err(_) => default,
    }
}

pub fn get_header(name: &str, headers: &HeaderMap) -> Option<String> {
    headers
        .get(name)
        .map(|value| value.to_str().unwrap_or_default().to_string())
}

pub fn generate_id() -> String {
    let random_bytes: [u8; 12] = rand::thread_rng().gen();
    BASE64_URL_SAFE_NO_PAD.encode(random_bytes)
}

pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_file_name_safe() {
        let id = generate_id();
        assert_eq!(id.len(), 16);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn api_key_hash_is_hex_sha3() {
        assert_eq!(
            hash_api_key(""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn missing_header_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "secret".parse().unwrap());
        assert_eq!(get_header("x-api-key", &headers), Some("secret".into()));
        assert_eq!(get_header("cookie", &headers), None);
    }
}
