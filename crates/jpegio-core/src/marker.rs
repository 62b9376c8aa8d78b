//! JFIF marker type bytes.
//!
//! Every marker is `0xFF` followed by one of these type bytes. All of them
//! except SOI, EOI and the restart markers are followed by a big-endian
//! segment length that counts the length field itself.

pub const PREFIX: u8 = 0xFF; // All markers start with this byte
pub const STUFFED: u8 = 0x00; // 0xFF 0x00 inside entropy-coded data
pub const RST0: u8 = 0xD0; // Restart interval 0
pub const RST7: u8 = 0xD7; // Restart interval 7
pub const SOI: u8 = 0xD8; // Start of Image
pub const EOI: u8 = 0xD9; // End of Image
pub const SOS: u8 = 0xDA; // Start of Scan
pub const DQT: u8 = 0xDB; // Define Quantization Table
pub const SOF0: u8 = 0xC0; // Start of Frame 0, Baseline DCT
pub const DHT: u8 = 0xC4; // Define Huffman Table
pub const APP0: u8 = 0xE0; // Application Segment 0, JFIF
pub const COM: u8 = 0xFE; // Comment

/// The two bytes every JPEG stream starts with.
pub const SOI_BYTES: [u8; 2] = [PREFIX, SOI];

/// The two bytes a JPEG stream ends with.
pub const EOI_BYTES: [u8; 2] = [PREFIX, EOI];

/// Returns true if a marker with this type byte is followed by a length field.
#[inline]
pub fn has_length(kind: u8) -> bool {
    !matches!(kind, RST0..=EOI)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_markers_have_no_length() {
        assert!(!has_length(SOI));
        assert!(!has_length(EOI));
        for rst in RST0..=RST7 {
            assert!(!has_length(rst), "RST{} carries no length", rst - RST0);
        }
    }

    #[test]
    fn test_segment_markers_have_length() {
        for kind in [SOS, DQT, SOF0, DHT, APP0, COM] {
            assert!(has_length(kind), "marker {kind:#04X} should carry a length");
        }
    }
}
