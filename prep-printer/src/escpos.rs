//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data.
//! Output is a flat byte sequence: control octets interleaved with raw
//! text bytes. Identical call sequences always produce identical bytes.

/// Display width of a string in printer columns.
///
/// Text is sent to the printer as raw bytes, so the column width is the
/// number of characters. Wide glyphs are the renderer's problem.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
pub struct TicketBuilder {
    buf: Vec<u8>,
    width: usize,
}

impl TicketBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        let mut buf = Vec::with_capacity(4096);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        Self { buf, width }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write raw text
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    /// Align text to right
    pub fn right(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x02]);
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x01]);
        self
    }

    /// Double width only
    pub fn double_width(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x10]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '=' characters
    pub fn sep_double(&mut self) -> &mut Self {
        self.line(&"=".repeat(self.width))
    }

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            // Too long, just print with space
            self.text(left);
            self.text(" ");
            self.line(right);
        } else {
            let spaces = self.width - lw - rw;
            self.text(left);
            self.text(&" ".repeat(spaces));
            self.line(right);
        }
        self
    }

    // === Paper Control ===

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        // GS V 0 - Full cut
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x00]);
        self
    }

    /// Full cut after feeding n lines (GS V 66 n).
    ///
    /// Lets the printer manage cutter-to-head distance, wasting less
    /// top margin on the next ticket than separate feed() + cut().
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    // === Raw Commands ===

    /// Write raw bytes directly
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Reset printer to default state
    pub fn reset(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x40]);
        self
    }

    // === Build ===

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for TicketBuilder {
    fn default() -> Self {
        Self::new(48)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_starts_with_init() {
        let b = TicketBuilder::new(48);
        let data = b.build();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
    }

    #[test]
    fn test_builder_basic() {
        let mut b = TicketBuilder::new(32);
        b.center()
            .double_size()
            .line("HEADER")
            .reset_size()
            .left()
            .line("body");

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("HEADER"));
        assert!(s.contains("body"));
    }

    #[test]
    fn test_builder_deterministic() {
        let render = || {
            let mut b = TicketBuilder::new(48);
            b.bold().line("ORDER #42").bold_off().sep_single().cut();
            b.build()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_line_lr() {
        let mut b = TicketBuilder::new(20);
        b.line_lr("left", "right");

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        // 20 columns: 4 + 11 spaces + 5
        assert!(s.contains(&format!("left{}right", " ".repeat(11))));
    }

    #[test]
    fn test_line_lr_overflow() {
        let mut b = TicketBuilder::new(8);
        b.line_lr("longleft", "longright");

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("longleft longright"));
    }

    #[test]
    fn test_separators() {
        let mut b = TicketBuilder::new(10);
        b.sep_double();

        let data = b.build();
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("=========="));
    }

    #[test]
    fn test_cut_bytes() {
        let mut b = TicketBuilder::new(48);
        b.cut();
        let data = b.build();
        assert_eq!(&data[data.len() - 3..], &[0x1D, 0x56, 0x00]);
    }
}
