use sha2::{Digest, Sha256};

/// Deterministic key for a (participant pair, job scope) tuple.
///
/// The pair is unordered: `scope_key(a, b, j) == scope_key(b, a, j)`.
/// A missing job id is its own scope, distinct from every `Some(job_id)`.
pub fn scope_key(user_a: &str, user_b: &str, job_id: Option<&str>) -> String {
    let (first, second) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };

    let mut hasher = Sha256::new();
    // Length prefixes keep ("ab", "c") and ("a", "bc") apart
    for part in [first, second] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    match job_id {
        Some(job) => {
            hasher.update([1u8]);
            hasher.update((job.len() as u64).to_be_bytes());
            hasher.update(job.as_bytes());
        }
        None => hasher.update([0u8]),
    }

    hex::encode(hasher.finalize())
}
