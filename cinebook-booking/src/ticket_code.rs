use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cinebook_shared::Masked;
use rand::rngs::OsRng;
use rand::RngCore;

/// 128 bits from the OS generator, base64url without padding (22 characters).
pub fn generate_ticket_code() -> Masked<String> {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    Masked(URL_SAFE_NO_PAD.encode(bytes))
}
