// ABOUTME: GSM 03.38 default alphabet and extension table lookups
// ABOUTME: Septets are emitted unpacked, one per octet, as SMPP data_coding 0x00 expects

/// Escape to the extension table. Every extension character costs two septets.
pub const ESCAPE: u8 = 0x1B;

// Index is the septet value. 0x1B is the escape code and never matches a char.
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

/// Septets for one character: one for the basic table, escape plus code for
/// the extension table, `None` when the character has no GSM representation.
pub fn encode_char(c: char) -> Option<Septets> {
    if c == '\u{1B}' {
        return None;
    }
    if let Some(code) = BASIC.iter().position(|&b| b == c) {
        return Some(Septets::Basic(code as u8));
    }
    EXTENSION
        .iter()
        .find(|(_, ext)| *ext == c)
        .map(|(code, _)| Septets::Extended(*code))
}

/// True when every character of `text` is in the default alphabet or its
/// extension table
pub fn is_encodable(text: &str) -> bool {
    text.chars().all(|c| encode_char(c).is_some())
}

/// Reverse of `encode_char` over a run of unpacked septets. Unknown escape
/// sequences decode as a space, which is what handsets display.
pub fn decode(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter();
    while let Some(&septet) = iter.next() {
        if septet == ESCAPE {
            let Some(&code) = iter.next() else { break };
            let c = EXTENSION
                .iter()
                .find(|(ext, _)| *ext == code)
                .map(|(_, c)| *c)
                .unwrap_or(' ');
            text.push(c);
        } else if let Some(&c) = BASIC.get(septet as usize) {
            text.push(c);
        }
    }
    text
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Septets {
    Basic(u8),
    Extended(u8),
}

impl Septets {
    pub fn len(self) -> usize {
        match self {
            Septets::Basic(_) => 1,
            Septets::Extended(_) => 2,
        }
    }

    pub fn push_to(self, out: &mut Vec<u8>) {
        match self {
            Septets::Basic(code) => out.push(code),
            Septets::Extended(code) => {
                out.push(ESCAPE);
                out.push(code);
            }
        }
    }
}
