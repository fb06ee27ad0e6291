//! Room code generation.

use rally_protocol::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN, RoomCode};
use rand::Rng;

/// Attempts at finding an unused code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 32;

/// Draws a random code from the unambiguous alphabet.
pub fn generate_code() -> RoomCode {
    generate_code_with(&mut rand::rng())
}

pub fn generate_code_with<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let mut indices = [0usize; ROOM_CODE_LEN];
    for index in &mut indices {
        *index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
    }
    RoomCode::from_alphabet_indices(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_uses_alphabet() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generate_code_parses_back() {
        let code = generate_code();
        assert_eq!(RoomCode::parse(&code.as_str().to_lowercase()).unwrap(), code);
    }
}
