use rand::distributions::Alphanumeric;
use rand::Rng;

const PREFIX: &str = "toy_";
const RANDOM_LEN: usize = 32;

/// Issues an opaque bearer credential. Hashing/rotation/revocation are
/// external collaborator concerns; this only generates the token text.
pub fn generate_api_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{PREFIX}{suffix}")
}
