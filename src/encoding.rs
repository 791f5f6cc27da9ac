//! CP437 single-byte text encoding for thermal printers.
//!
//! The printer is switched to code page 437 during initialization
//! (`ESC t 0`), so every text byte we emit must be a CP437 code point.
//! ASCII passes through unchanged; the mapped Latin/currency upper half
//! becomes a single byte; anything else is replaced with `?` so the
//! printed line never shifts column alignment.

/// Encode a string to CP437 bytes. Control characters (LF, CR) pass
/// through so the caller can embed line feeds in text runs.
pub fn encode_cp437(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code < 0x80 {
            bytes.push(code as u8);
            continue;
        }
        // CP437 has no Euro sign on most firmwares - approximate with 'E'
        if ch == '€' {
            bytes.push(b'E');
            continue;
        }
        if let Some(b) = latin_to_cp437(ch) {
            bytes.push(b);
        } else {
            bytes.push(b'?');
        }
    }
    bytes
}

/// Map a Unicode character to its CP437 byte value (0x80-0xFF).
/// Returns `None` for characters outside the code page.
fn latin_to_cp437(ch: char) -> Option<u8> {
    match ch {
        // 0x80-0x8F
        'Ç' => Some(0x80),
        'ü' => Some(0x81),
        'é' => Some(0x82),
        'â' => Some(0x83),
        'ä' => Some(0x84),
        'à' => Some(0x85),
        'å' => Some(0x86),
        'ç' => Some(0x87),
        'ê' => Some(0x88),
        'ë' => Some(0x89),
        'è' => Some(0x8A),
        'ï' => Some(0x8B),
        'î' => Some(0x8C),
        'ì' => Some(0x8D),
        'Ä' => Some(0x8E),
        'Å' => Some(0x8F),
        // 0x90-0x9F
        'É' => Some(0x90),
        'æ' => Some(0x91),
        'Æ' => Some(0x92),
        'ô' => Some(0x93),
        'ö' => Some(0x94),
        'ò' => Some(0x95),
        'û' => Some(0x96),
        'ù' => Some(0x97),
        'ÿ' => Some(0x98),
        'Ö' => Some(0x99),
        'Ü' => Some(0x9A),
        '¢' => Some(0x9B),
        '£' => Some(0x9C),
        '¥' => Some(0x9D),
        'ƒ' => Some(0x9F),
        // 0xA0-0xAD
        'á' => Some(0xA0),
        'í' => Some(0xA1),
        'ó' => Some(0xA2),
        'ú' => Some(0xA3),
        'ñ' => Some(0xA4),
        'Ñ' => Some(0xA5),
        'ª' => Some(0xA6),
        'º' => Some(0xA7),
        '¿' => Some(0xA8),
        '½' => Some(0xAB),
        '¼' => Some(0xAC),
        '¡' => Some(0xAD),
        // Odds and ends printers actually see on receipts
        'ß' => Some(0xE1),
        'µ' => Some(0xE6),
        '°' => Some(0xF8),
        '·' => Some(0xFA),
        '²' => Some(0xFD),
        _ => None,
    }
}
