use rand::Rng;

/// Characters used for unique tokens and random padding.
pub const ALPHABET: &[u8; 79] =
    b"#%&()[]{};:/~@ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789.-=";

pub const CODE_WIDTH: usize = 10;
pub const NAME_WIDTH: usize = 20;

/// Encodes `rec` in base 79, least significant digit first, followed by `_`.
///
/// `_` is not part of the alphabet, so distinct record numbers never share
/// a prefix.
pub fn unique_prefix(mut rec: u64) -> String {
    let base = ALPHABET.len() as u64;
    let mut out = String::with_capacity(CODE_WIDTH);
    loop {
        out.push(ALPHABET[(rec % base) as usize] as char);
        rec /= base;
        if rec == 0 {
            break;
        }
    }
    out.push('_');
    out
}

/// Appends random alphabet characters until `s` is `width` characters long.
pub fn pad_random<R: Rng + ?Sized>(rng: &mut R, s: &mut String, width: usize) {
    while s.len() < width {
        let idx = rng.random_range(0..ALPHABET.len());
        s.push(ALPHABET[idx] as char);
    }
}
