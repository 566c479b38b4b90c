//! PL-007: BLAKE3 fingerprints for compiled plans.

use super::types::Plan;

/// Fingerprint a plan tree from its canonical JSON encoding.
///
/// Maps are ordered, so identical trees always encode identically.
pub fn hash_plan(plan: &Plan) -> Result<String, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, plan)?;
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}
