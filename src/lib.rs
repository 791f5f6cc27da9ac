//! ESC/POS receipt formatting engine.
//!
//! Takes a structured transaction description and a line width and produces
//! the complete thermal-printer command stream for one receipt: text layout
//! and wrapping, item/price columns, Code128/QR commands, and paper cuts,
//! all in a single CP437-encoded buffer. The engine performs no I/O and
//! holds no device state; the print-job orchestrator owns the transport.

mod encoding;
mod error;
mod escpos;
mod layout;
mod receipt;

pub use error::ReceiptError;
pub use escpos::{EscPosBuilder, PaperWidth};
pub use layout::{estimate_characters_per_line, MIN_LINE_WIDTH};
pub use receipt::{render_receipt, CardSlip, PaymentDetails, ReceiptInput, ReceiptItem};
