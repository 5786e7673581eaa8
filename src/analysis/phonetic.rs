//! Phonetic keys for sound-alike matching.
//!
//! [`DoubleMetaphone`] is a compact rendition of the Double Metaphone
//! algorithm: it encodes an English word into a primary and an alternate key
//! of at most four characters. Words that sound alike ("felix", "phelix")
//! share at least one key.
//!
//! # Examples
//!
//! ```
//! use quarry::analysis::phonetic::DoubleMetaphone;
//!
//! let encoder = DoubleMetaphone::new();
//! assert_eq!(encoder.encode("felix"), encoder.encode("phelix"));
//! assert_eq!(encoder.encode("felix").primary, "FLKS");
//! ```

/// A pair of phonetic keys produced for one word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneticKeys {
    /// The primary encoding.
    pub primary: String,
    /// The alternate encoding; equal to the primary for most words.
    pub alternate: String,
}

impl PhoneticKeys {
    /// Iterate over the distinct keys.
    pub fn distinct(&self) -> impl Iterator<Item = &str> {
        let alternate = (self.alternate != self.primary).then_some(self.alternate.as_str());
        std::iter::once(self.primary.as_str()).chain(alternate)
    }

    /// Check whether no key could be produced.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.alternate.is_empty()
    }
}

/// Double Metaphone encoder.
#[derive(Debug, Clone)]
pub struct DoubleMetaphone {
    max_len: usize,
}

impl Default for DoubleMetaphone {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates both keys while the word is scanned.
struct KeyBuilder {
    primary: String,
    alternate: String,
}

impl KeyBuilder {
    fn push(&mut self, primary: &str, alternate: &str) {
        self.primary.push_str(primary);
        self.alternate.push_str(alternate);
    }

    fn both(&mut self, code: &str) {
        self.push(code, code);
    }
}

fn starts_with_at(word: &[u8], i: usize, s: &[u8]) -> bool {
    word.get(i..i + s.len()) == Some(s)
}

fn is_vowel(c: u8) -> bool {
    matches!(c, b'A' | b'E' | b'I' | b'O' | b'U' | b'Y')
}

impl DoubleMetaphone {
    /// Create an encoder producing keys of at most four characters.
    pub fn new() -> Self {
        DoubleMetaphone { max_len: 4 }
    }

    /// Create an encoder with a custom key length.
    pub fn with_max_len(max_len: usize) -> Self {
        DoubleMetaphone {
            max_len: max_len.max(1),
        }
    }

    /// Encode a word. Non-ASCII letters and digits are ignored.
    pub fn encode(&self, word: &str) -> PhoneticKeys {
        let w: Vec<u8> = word
            .bytes()
            .filter(u8::is_ascii_alphabetic)
            .map(|b| b.to_ascii_uppercase())
            .collect();

        let mut keys = KeyBuilder {
            primary: String::new(),
            alternate: String::new(),
        };
        if w.is_empty() {
            return PhoneticKeys {
                primary: String::new(),
                alternate: String::new(),
            };
        }

        let at = |i: usize| -> u8 { w.get(i).copied().unwrap_or(0) };
        let starts = |i: usize, s: &[u8]| -> bool { starts_with_at(&w, i, s) };

        let mut i = 0;
        if [&b"GN"[..], b"KN", b"PN", b"WR", b"PS"]
            .iter()
            .any(|prefix| starts(0, prefix))
        {
            i = 1;
        }
        if at(0) == b'X' {
            keys.both("S");
            i = 1;
        } else if is_vowel(at(0)) {
            keys.both("A");
            i = 1;
        } else if at(0) == b'W' && is_vowel(at(1)) {
            keys.push("A", "F");
            i = 1;
        }

        while i < w.len()
            && (keys.primary.len() < self.max_len || keys.alternate.len() < self.max_len)
        {
            let c = at(i);
            let next = at(i + 1);
            match c {
                b'A' | b'E' | b'I' | b'O' | b'U' | b'Y' => i += 1,
                b'B' => {
                    keys.both("P");
                    i += if next == b'B' { 2 } else { 1 };
                }
                b'C' => {
                    if starts(i, &b"CH"[..]) {
                        let hard = at(i + 2) == b'R'
                            || at(i + 2) == b'L'
                            || (i > 0 && at(i - 1) == b'S');
                        if hard {
                            keys.both("K");
                        } else {
                            keys.push("X", "K");
                        }
                        i += 2;
                    } else if starts(i, &b"CIA"[..]) {
                        keys.push("X", "S");
                        i += 3;
                    } else if matches!(next, b'I' | b'E' | b'Y') {
                        keys.both("S");
                        i += 2;
                    } else if starts(i, &b"CC"[..]) && matches!(at(i + 2), b'I' | b'E' | b'H') {
                        keys.both("KS");
                        i += 3;
                    } else {
                        keys.both("K");
                        i += if matches!(next, b'C' | b'K' | b'Q' | b'G') {
                            2
                        } else {
                            1
                        };
                    }
                }
                b'D' => {
                    if starts(i, &b"DG"[..]) && matches!(at(i + 2), b'I' | b'E' | b'Y') {
                        keys.both("J");
                        i += 3;
                    } else {
                        keys.both("T");
                        i += if matches!(next, b'T' | b'D') { 2 } else { 1 };
                    }
                }
                b'F' | b'V' => {
                    keys.both("F");
                    i += if next == c { 2 } else { 1 };
                }
                b'G' => {
                    if next == b'H' {
                        if i > 0 && is_vowel(at(i - 1)) {
                            keys.push("", "F");
                        } else {
                            keys.both("K");
                        }
                        i += 2;
                    } else if next == b'N' {
                        keys.push("N", "KN");
                        i += 2;
                    } else if matches!(next, b'E' | b'I' | b'Y') {
                        if i == 0 {
                            keys.push("K", "J");
                        } else {
                            keys.push("J", "K");
                        }
                        i += 2;
                    } else {
                        keys.both("K");
                        i += if next == b'G' { 2 } else { 1 };
                    }
                }
                b'H' => {
                    if (i == 0 || is_vowel(at(i - 1))) && is_vowel(next) {
                        keys.both("H");
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                b'J' => {
                    keys.push("J", "H");
                    i += if next == b'J' { 2 } else { 1 };
                }
                b'K' | b'Q' => {
                    keys.both("K");
                    i += if next == c { 2 } else { 1 };
                }
                b'L' | b'M' | b'N' | b'R' => {
                    let code = match c {
                        b'L' => "L",
                        b'M' => "M",
                        b'N' => "N",
                        _ => "R",
                    };
                    keys.both(code);
                    i += if next == c { 2 } else { 1 };
                }
                b'P' => {
                    if next == b'H' {
                        keys.both("F");
                        i += 2;
                    } else {
                        keys.both("P");
                        i += if matches!(next, b'P' | b'B') { 2 } else { 1 };
                    }
                }
                b'S' => {
                    if next == b'H' {
                        keys.both("X");
                        i += 2;
                    } else if starts(i, &b"SIO"[..]) || starts(i, &b"SIA"[..]) {
                        keys.push("S", "X");
                        i += 3;
                    } else if starts(i, &b"SCH"[..]) {
                        keys.both("SK");
                        i += 3;
                    } else if next == b'C' && matches!(at(i + 2), b'I' | b'E' | b'Y') {
                        keys.both("S");
                        i += 3;
                    } else {
                        keys.both("S");
                        i += if matches!(next, b'S' | b'Z') { 2 } else { 1 };
                    }
                }
                b'T' => {
                    if starts(i, &b"TIO"[..]) || starts(i, &b"TIA"[..]) {
                        keys.both("X");
                        i += 3;
                    } else if next == b'H' {
                        keys.push("0", "T");
                        i += 2;
                    } else if starts(i, &b"TCH"[..]) {
                        i += 1;
                    } else {
                        keys.both("T");
                        i += if matches!(next, b'T' | b'D') { 2 } else { 1 };
                    }
                }
                b'W' => {
                    i += 1;
                }
                b'X' => {
                    keys.both("KS");
                    i += if matches!(next, b'X' | b'C') { 2 } else { 1 };
                }
                b'Z' => {
                    keys.both("S");
                    i += if next == b'Z' { 2 } else { 1 };
                }
                _ => i += 1,
            }
        }

        keys.primary.truncate(self.max_len);
        keys.alternate.truncate(self.max_len);
        PhoneticKeys {
            primary: keys.primary,
            alternate: keys.alternate,
        }
    }
}
