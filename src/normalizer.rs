// Row Normalizer - canonical text for every CSV field
//
// Transcriptions arrive in whatever encoding the spreadsheet exported.
// Every field is decoded as UTF-8 (bad bytes become U+FFFD), composed to
// NFC, and trimmed of all Unicode whitespace including non-breaking spaces.

use csv::ByteRecord;
use unicode_normalization::UnicodeNormalization;

/// Byte-order mark; not Unicode whitespace but shows up glued to cells
const BOM: char = '\u{feff}';

fn is_trimmable(c: char) -> bool {
    c.is_whitespace() || c == BOM
}

/// Normalize one raw field
pub fn normalize_field(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    let composed: String = decoded.nfc().collect();
    composed.trim_matches(is_trimmable).to_string()
}

/// Normalize a whole record, preserving its length and order
pub fn normalize_record(record: &ByteRecord) -> Vec<String> {
    record.iter().map(normalize_field).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_ascii_whitespace() {
        assert_eq!(normalize_field(b"  Smith \t"), "Smith");
    }

    #[test]
    fn test_trims_non_breaking_space_and_bom() {
        let raw = "\u{feff}\u{a0}Marie\u{a0}\u{2007}".as_bytes();
        assert_eq!(normalize_field(raw), "Marie");
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        assert_eq!(normalize_field(b" Jean Baptiste "), "Jean Baptiste");
    }

    #[test]
    fn test_composes_decomposed_accents() {
        // "e" + combining acute
        let raw = "Rene\u{301}".as_bytes();
        assert_eq!(normalize_field(raw), "Ren\u{e9}");
    }

    #[test]
    fn test_invalid_utf8_passes_through_lossy() {
        // Latin-1 "é" is not valid UTF-8
        let raw = b"Ren\xe9 ";
        assert_eq!(normalize_field(raw), "Ren\u{fffd}");
    }

    #[test]
    fn test_record_length_preserved() {
        let record = ByteRecord::from(vec![" a ", "", "  ", "b"]);
        let fields = normalize_record(&record);

        assert_eq!(fields.len(), 4);
        assert_eq!(fields, vec!["a", "", "", "b"]);
    }

}
