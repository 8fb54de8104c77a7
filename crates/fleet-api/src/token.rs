use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};

use crate::transport::ApiError;

/// Hash applied to the concatenated identity parts when no method is
/// configured.
pub const DEFAULT_SIGNATURE_METHOD: SignatureMethod = SignatureMethod::Sha256;

/// One-way hash used to derive console tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    Sha256,
    Sha512,
}

impl FromStr for SignatureMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(SignatureMethod::Sha256),
            "sha512" | "sha-512" => Ok(SignatureMethod::Sha512),
            other => Err(ApiError::UnknownSignatureMethod(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureMethod::Sha256 => f.write_str("sha256"),
            SignatureMethod::Sha512 => f.write_str("sha512"),
        }
    }
}

/// Derive the console token for a set of ordered identity parts.
///
/// The parts are concatenated in order with no separator and hashed with
/// `method`; the token is the lowercase hex digest. Identical parts and
/// method always produce an identical token. There is no keying material
/// beyond the parts themselves: the scheme rests on cluster and instance
/// ids being unguessable, not on a secret.
pub fn generate_token<S: AsRef<str>>(method: SignatureMethod, parts: &[S]) -> String {
    match method {
        SignatureMethod::Sha256 => digest::<Sha256, S>(parts),
        SignatureMethod::Sha512 => digest::<Sha512, S>(parts),
    }
}

fn digest<D: Digest, S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_identical_tokens() {
        let a = generate_token(SignatureMethod::Sha256, &["cluster-1", "instance-1"]);
        let b = generate_token(SignatureMethod::Sha256, &["cluster-1", "instance-1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn concatenation_has_no_separator() {
        // ["ab", "c"] and ["a", "bc"] concatenate to the same string.
        let a = generate_token(SignatureMethod::Sha256, &["ab", "c"]);
        let b = generate_token(SignatureMethod::Sha256, &["a", "bc"]);
        assert_eq!(a, b);
    }

    #[test]
    fn part_order_changes_the_token() {
        let a = generate_token(SignatureMethod::Sha256, &["cluster-1", "instance-1"]);
        let b = generate_token(SignatureMethod::Sha256, &["instance-1", "cluster-1"]);
        assert_ne!(a, b);
    }

    #[test]
    fn method_changes_the_token() {
        let a = generate_token(SignatureMethod::Sha256, &["cluster-1", "instance-1"]);
        let b = generate_token(SignatureMethod::Sha512, &["cluster-1", "instance-1"]);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(b.len(), 128);
    }

    #[test]
    fn empty_parts_hash_the_empty_string() {
        let token = generate_token::<&str>(SignatureMethod::Sha256, &[]);
        assert_eq!(
            token,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn method_parses_from_config_names() {
        assert_eq!(
            "sha256".parse::<SignatureMethod>().unwrap(),
            SignatureMethod::Sha256
        );
        assert_eq!(
            "SHA-512".parse::<SignatureMethod>().unwrap(),
            SignatureMethod::Sha512
        );
        assert!("md5".parse::<SignatureMethod>().is_err());
    }
}
