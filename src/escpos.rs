//! Minimal ESC/POS binary command builder for thermal receipt printers.
//!
//! Generates the raw byte stream the transport layer hands to the device
//! unmodified. Printable text is encoded as CP437 single-byte characters;
//! control sequences (alignment, bold, barcode, cut) are emitted as opaque
//! bytes interleaved with the text.

use crate::encoding::encode_cp437;

// ESC/POS command bytes
const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// Barcode payloads longer than this are truncated; `GS k 73` carries the
/// length in a single byte.
const BARCODE_MAX_LEN: usize = 255;

/// Paper width in characters for the printer's default font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperWidth {
    Mm58,
    Mm80,
}

impl PaperWidth {
    pub fn chars(self) -> usize {
        match self {
            PaperWidth::Mm58 => 32,
            PaperWidth::Mm80 => 48,
        }
    }

    /// Snap a physical width to the nearest supported paper size.
    pub fn from_mm(mm: i32) -> Self {
        if mm <= 58 {
            PaperWidth::Mm58
        } else {
            PaperWidth::Mm80
        }
    }
}

/// Builder for generating ESC/POS binary command buffers.
///
/// ```rust,ignore
/// let data = {
///     let mut b = EscPosBuilder::new(48);
///     b.init()
///         .center()
///         .bold(true).text("RECEIPT").lf().bold(false)
///         .left()
///         .line_pair("TOTAL", "5.00")
///         .feed(3)
///         .cut();
///     b.build()
/// };
/// ```
pub struct EscPosBuilder {
    buffer: Vec<u8>,
    width: usize,
}

impl EscPosBuilder {
    /// Create a builder for the given usable line width in characters.
    pub fn new(width: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(512),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// ESC @ — Initialize printer, reset to defaults.
    pub fn init(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x40]);
        self
    }

    /// ESC t n — Select character code page.
    pub fn code_page(&mut self, page: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x74, page]);
        self
    }

    // -----------------------------------------------------------------------
    // Text formatting
    // -----------------------------------------------------------------------

    /// ESC E n — Bold on/off.
    pub fn bold(&mut self, on: bool) -> &mut Self {
        self.buffer
            .extend_from_slice(&[ESC, 0x45, if on { 1 } else { 0 }]);
        self
    }

    /// GS ! n — Set text size (width × height multiplier, 1–8 each).
    pub fn text_size(&mut self, width: u8, height: u8) -> &mut Self {
        let w = width.clamp(1, 8) - 1;
        let h = height.clamp(1, 8) - 1;
        self.buffer.extend_from_slice(&[GS, 0x21, (w << 4) | h]);
        self
    }

    /// Reset text size to 1×1.
    pub fn normal_size(&mut self) -> &mut Self {
        self.text_size(1, 1)
    }

    /// Double-height text (1×2).
    pub fn double_height(&mut self) -> &mut Self {
        self.text_size(1, 2)
    }

    // -----------------------------------------------------------------------
    // Alignment
    // -----------------------------------------------------------------------

    /// ESC a 0 — Left-align.
    pub fn left(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 0]);
        self
    }

    /// ESC a 1 — Centre-align.
    pub fn center(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 1]);
        self
    }

    /// ESC a 2 — Right-align.
    pub fn right(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x61, 2]);
        self
    }

    // -----------------------------------------------------------------------
    // Text output
    // -----------------------------------------------------------------------

    /// Append text, encoded as CP437.
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buffer.extend(encode_cp437(s));
        self
    }

    /// Append raw bytes (pre-encoded text or a command the builder does
    /// not model).
    pub fn raw(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Append a line-feed.
    pub fn lf(&mut self) -> &mut Self {
        self.buffer.push(LF);
        self
    }

    /// Print a horizontal separator using dashes, exactly one line wide.
    pub fn separator(&mut self) -> &mut Self {
        let line = crate::layout::separator(self.width, '-');
        self.text(&line).lf()
    }

    /// Print a line with left-aligned label and right-aligned value.
    pub fn line_pair(&mut self, label: &str, value: &str) -> &mut Self {
        let gap = self
            .width
            .saturating_sub(label.chars().count() + value.chars().count());
        self.text(label);
        for _ in 0..gap {
            self.buffer.push(b' ');
        }
        self.text(value);
        self.lf()
    }

    // -----------------------------------------------------------------------
    // Barcode / QR
    // -----------------------------------------------------------------------

    /// GS k 73 — Print a Code128 barcode for the given payload.
    ///
    /// HRI text is suppressed and height/module width are set explicitly so
    /// the command renders identically across firmware defaults. The `{B`
    /// prefix selects code set B (full ASCII). Empty payloads emit nothing.
    pub fn barcode_code128(&mut self, payload: &str) -> &mut Self {
        let data: Vec<u8> = payload
            .chars()
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .map(|c| c as u8)
            .take(BARCODE_MAX_LEN - 2)
            .collect();
        if data.is_empty() {
            return self;
        }
        // GS H 0 — no HRI, GS h n — height 80 dots, GS w n — module width 2
        self.buffer.extend_from_slice(&[GS, 0x48, 0x00]);
        self.buffer.extend_from_slice(&[GS, 0x68, 0x50]);
        self.buffer.extend_from_slice(&[GS, 0x77, 0x02]);
        self.buffer
            .extend_from_slice(&[GS, 0x6B, 0x49, (data.len() + 2) as u8, b'{', b'B']);
        self.buffer.extend_from_slice(&data);
        self
    }

    /// GS ( k — Print a QR code (model 2, module size 4, EC level M).
    pub fn qr(&mut self, data: &str) -> &mut Self {
        let payload = encode_cp437(data);
        if payload.is_empty() || payload.len() > 7089 {
            return self;
        }
        // Function 165: select model 2
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);
        // Function 167: module size
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 0x04]);
        // Function 169: error correction level M
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]);
        // Function 180: store data
        let len = payload.len() + 3;
        self.buffer.extend_from_slice(&[
            GS,
            0x28,
            0x6B,
            (len & 0xFF) as u8,
            (len >> 8) as u8,
            0x31,
            0x50,
            0x30,
        ]);
        self.buffer.extend_from_slice(&payload);
        // Function 181: print stored symbol
        self.buffer
            .extend_from_slice(&[GS, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
        self
    }

    // -----------------------------------------------------------------------
    // Feed / cut
    // -----------------------------------------------------------------------

    /// ESC d n — Feed n lines.
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buffer.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    /// GS V B 0 — Partial cut.
    pub fn cut(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x56, 0x42, 0x00]);
        self
    }

    /// GS V 0 — Full cut.
    pub fn full_cut(&mut self) -> &mut Self {
        self.buffer.extend_from_slice(&[GS, 0x56, 0x00]);
        self
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// Consume the builder and return the binary ESC/POS payload.
    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
