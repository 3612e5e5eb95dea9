use sha2::{Digest, Sha256};

/// Tag prefix for profile ids derived purely from request attributes.
pub const PROFILE_TAG_ANONYMOUS: &str = "anon";
/// Tag prefix for profile ids linked to a caller-supplied user id.
pub const PROFILE_TAG_IDENTIFIED: &str = "id";

/// Derive the pseudonymous identity digits for a request.
///
/// Formula: sha256(user_agent ‖ ip ‖ project_id ‖ salt), first 8 digest
/// bytes read as a big-endian u64, rendered as a decimal string. The input
/// order is fixed; changing it changes every derived id. One-way: the raw
/// attributes are never recoverable from (or stored with) the result.
pub fn derive_identity_digits(user_agent: &str, ip: &str, project_id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(ip.as_bytes());
    hasher.update(project_id.as_bytes());
    hasher.update(salt.as_bytes());
    digest_to_digits(&hasher.finalize())
}

/// Digits for a profile linked to a caller-supplied user id. The supplied
/// id replaces the user-agent/IP pair so the profile follows the user
/// across devices within one salt window.
pub fn derive_linked_profile_digits(project_id: &str, supplied_id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(supplied_id.as_bytes());
    hasher.update(project_id.as_bytes());
    hasher.update(salt.as_bytes());
    digest_to_digits(&hasher.finalize())
}

pub fn anonymous_profile_id(digits: &str) -> String {
    format!("{PROFILE_TAG_ANONYMOUS}-{digits}")
}

pub fn identified_profile_id(digits: &str) -> String {
    format!("{PROFILE_TAG_IDENTIFIED}-{digits}")
}

/// True if the profile id was linked to a caller-supplied user id.
pub fn is_identified_profile(profile_id: &str) -> bool {
    profile_id
        .strip_prefix(PROFILE_TAG_IDENTIFIED)
        .is_some_and(|rest| rest.starts_with('-'))
}

fn digest_to_digits(digest: &[u8]) -> String {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes).to_string()
}
