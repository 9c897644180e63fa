//! Random names for anonymous uploads.

use rand::Rng;

/// Returns `len` random lowercase ASCII letters.
pub fn random_name(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}
