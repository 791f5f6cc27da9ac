//! Receipt document model and ESC/POS rendering.
//!
//! The print-job orchestrator constructs a [`ReceiptInput`] from
//! transaction data it already owns and calls [`render_receipt`]; the
//! returned buffer goes to the transport layer unmodified. Rendering is a
//! single-pass, stateless transformation: it either produces a complete
//! buffer or fails validation before emitting anything.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ReceiptError;
use crate::escpos::EscPosBuilder;
use crate::layout::{justify, money, qty, wrap, MIN_LINE_WIDTH};

/// Masked PANs are padded with asterisks to this total width.
const MASKED_PAN_WIDTH: usize = 16;

/// Continuation lines of a wrapped item name are indented this much.
const ITEM_CONT_INDENT: usize = 2;

const FOOTER_HEADLINE: &str = "THANK YOU FOR SHOPPING WITH US";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Card-payment metadata printed on the receipt. Only the last four PAN
/// digits are representable; full card numbers never enter the formatter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardSlip {
    pub provider: String,
    pub brand: String,
    pub last4: String,
    #[serde(default)]
    pub card_type: Option<String>,
    pub auth_code: String,
    #[serde(default)]
    pub terminal_id: Option<String>,
    #[serde(default)]
    pub terminal_txn_id: Option<String>,
}

/// Payment variant. Matching is exhaustive in the payment section builder,
/// so adding a kind is a compile-checked change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Cash { received: f64, change: f64 },
    Card { slip: CardSlip },
    Other { label: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptInput {
    pub store_name: String,
    #[serde(default)]
    pub store_message: Option<String>,
    /// Optional centered label under the store name (e.g. "REPRINT").
    #[serde(default)]
    pub copy_label: Option<String>,
    pub receipt_number: String,
    pub transaction_id: String,
    pub date: String,
    pub time: String,
    /// Machine-readable timestamp; printed as a normalized audit line when
    /// it parses as RFC 3339.
    #[serde(default)]
    pub date_time_iso: Option<String>,
    pub characters_per_line: usize,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub payment: PaymentDetails,
    #[serde(default)]
    pub qr_data: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_money(field: &'static str, value: f64) -> Result<(), ReceiptError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ReceiptError::InvalidMoneyValue { field, value });
    }
    Ok(())
}

fn check_slip(slip: &CardSlip) -> Result<(), ReceiptError> {
    for (field, value) in [
        ("provider", &slip.provider),
        ("brand", &slip.brand),
        ("auth_code", &slip.auth_code),
    ] {
        if value.trim().is_empty() {
            return Err(ReceiptError::IncompleteCardSlip(format!(
                "missing {field}"
            )));
        }
    }
    if slip.last4.len() != 4 || !slip.last4.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReceiptError::IncompleteCardSlip(format!(
            "last4 must be 4 digits, got {:?}",
            slip.last4
        )));
    }
    Ok(())
}

fn validate(input: &ReceiptInput) -> Result<(), ReceiptError> {
    if input.characters_per_line < MIN_LINE_WIDTH {
        return Err(ReceiptError::InvalidWidth(format!(
            "{} columns is below the minimum of {MIN_LINE_WIDTH}",
            input.characters_per_line
        )));
    }
    for item in &input.items {
        check_money("unit_price", item.unit_price)?;
        check_money("total_price", item.total_price)?;
        check_money("quantity", item.quantity)?;
    }
    check_money("subtotal", input.subtotal)?;
    check_money("tax", input.tax)?;
    check_money("total", input.total)?;
    match &input.payment {
        PaymentDetails::Cash { received, change } => {
            check_money("cash_received", *received)?;
            check_money("change", *change)?;
        }
        PaymentDetails::Card { slip } => check_slip(slip)?,
        PaymentDetails::Other { .. } => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Layout plumbing
// ---------------------------------------------------------------------------

fn emit_pair(builder: &mut EscPosBuilder, label: &str, value: &str, width: usize) {
    for line in justify(label, value, width) {
        builder.text(&line).lf();
    }
}

fn emit_wrapped(builder: &mut EscPosBuilder, text: &str, width: usize) {
    for line in wrap(text, width) {
        builder.text(&line).lf();
    }
}

fn masked_pan(last4: &str) -> String {
    let mask = MASKED_PAN_WIDTH.saturating_sub(last4.chars().count());
    let mut out = String::with_capacity(MASKED_PAN_WIDTH);
    for _ in 0..mask {
        out.push('*');
    }
    out.push_str(last4);
    out
}

/// Normalize the optional ISO timestamp for the audit line. Unparseable
/// values are skipped with a warning rather than failing the print job.
fn audit_timestamp(input: &ReceiptInput) -> Option<String> {
    let iso = input.date_time_iso.as_deref().map(str::trim)?;
    if iso.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(iso) {
        Ok(ts) => Some(
            ts.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        Err(err) => {
            warn!(timestamp = iso, %err, "unparseable ISO timestamp; audit line skipped");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Section builders
// ---------------------------------------------------------------------------

fn emit_header(builder: &mut EscPosBuilder, input: &ReceiptInput, width: usize) {
    builder.center().bold(true);
    emit_wrapped(builder, &input.store_name, width);
    builder.bold(false);
    if let Some(label) = input
        .copy_label
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        builder.text(label).lf();
    }
    builder.left();
    emit_pair(builder, "Receipt", &input.receipt_number, width);
    emit_pair(builder, "Transaction", &input.transaction_id, width);
    emit_pair(builder, "Date", &input.date, width);
    emit_pair(builder, "Time", &input.time, width);
    if let Some(ts) = audit_timestamp(input) {
        emit_pair(builder, "Issued", &ts, width);
    }
    builder.separator();
}

fn emit_items(builder: &mut EscPosBuilder, input: &ReceiptInput, width: usize) {
    if input.items.is_empty() {
        builder.text("NO ITEMS").lf();
        builder.separator();
        return;
    }
    let indent = " ".repeat(ITEM_CONT_INDENT);
    for item in &input.items {
        // wrap at a reduced width so indented continuation lines still fit
        let mut name_lines = wrap(&item.name, width - ITEM_CONT_INDENT).into_iter();
        if let Some(first) = name_lines.next() {
            builder.text(&first).lf();
        }
        for cont in name_lines {
            builder.text(&format!("{indent}{cont}")).lf();
        }
        let qty_line = format!(
            "{}{} x {}",
            indent,
            qty(item.quantity),
            money(item.unit_price)
        );
        emit_pair(builder, &qty_line, &money(item.total_price), width);
    }
    builder.separator();
}

fn emit_totals(builder: &mut EscPosBuilder, input: &ReceiptInput, width: usize) {
    emit_pair(builder, "Subtotal", &money(input.subtotal), width);
    emit_pair(builder, "Tax", &money(input.tax), width);
    builder.bold(true);
    emit_pair(builder, "TOTAL", &money(input.total), width);
    builder.bold(false);
}

fn emit_card_slip(builder: &mut EscPosBuilder, slip: &CardSlip, width: usize) {
    emit_pair(builder, "Card", &masked_pan(&slip.last4), width);
    emit_pair(builder, "Provider", slip.provider.trim(), width);
    emit_pair(builder, "Brand", slip.brand.trim(), width);
    if let Some(card_type) = slip
        .card_type
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_pair(builder, "Type", card_type, width);
    }
    emit_pair(builder, "AUTH CODE", slip.auth_code.trim(), width);
    if let Some(terminal) = slip
        .terminal_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_pair(builder, "Terminal", terminal, width);
    }
    if let Some(txn) = slip
        .terminal_txn_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_pair(builder, "Terminal Txn", txn, width);
    }
}

fn emit_payment(builder: &mut EscPosBuilder, input: &ReceiptInput, width: usize) {
    builder.separator();
    match &input.payment {
        PaymentDetails::Cash { received, change } => {
            emit_pair(builder, "Paid", "CASH", width);
            emit_pair(builder, "Cash Received", &money(*received), width);
            emit_pair(builder, "Change", &money(*change), width);
        }
        PaymentDetails::Card { slip } => {
            emit_pair(builder, "Paid", "CARD", width);
            emit_card_slip(builder, slip, width);
        }
        PaymentDetails::Other { label } => {
            emit_pair(builder, "Paid", label.trim(), width);
        }
    }
}

fn emit_barcode(builder: &mut EscPosBuilder, input: &ReceiptInput) {
    builder.center().barcode_code128(&input.receipt_number).lf();
    if let Some(qr) = input
        .qr_data
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        builder.qr(qr).lf();
    }
    builder.left();
}

fn emit_footer(builder: &mut EscPosBuilder, input: &ReceiptInput, width: usize) {
    builder.separator().center().bold(true);
    emit_wrapped(builder, FOOTER_HEADLINE, width);
    builder.bold(false);
    if let Some(message) = input
        .store_message
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        emit_wrapped(builder, message, width);
    }
    builder.left();
}

/// Abbreviated repeat of header + total + card detail, retained by the
/// customer when the merchant keeps the signed primary slip.
fn emit_customer_copy(builder: &mut EscPosBuilder, input: &ReceiptInput, slip: &CardSlip) {
    let width = builder.width();
    builder.center().bold(true).text("*CUSTOMER COPY*").lf().bold(false);
    emit_wrapped(builder, &input.store_name, width);
    builder.left();
    emit_pair(builder, "Receipt", &input.receipt_number, width);
    emit_pair(builder, "Date", &input.date, width);
    emit_pair(builder, "Time", &input.time, width);
    builder.separator();
    builder.bold(true);
    emit_pair(builder, "TOTAL", &money(input.total), width);
    builder.bold(false);
    emit_card_slip(builder, slip, width);
    builder.separator().center();
    emit_wrapped(builder, FOOTER_HEADLINE, width);
    builder.left();
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Render a complete ESC/POS buffer for one receipt.
///
/// Section order is fixed: header, items, totals, payment, barcode,
/// footer, then (card payments only) a cut followed by the customer copy.
/// Each physical slip ends with a partial cut.
pub fn render_receipt(input: &ReceiptInput) -> Result<Vec<u8>, ReceiptError> {
    validate(input)?;
    let width = input.characters_per_line;
    let mut builder = EscPosBuilder::new(width);
    builder.init().code_page(0);

    emit_header(&mut builder, input, width);
    emit_items(&mut builder, input, width);
    emit_totals(&mut builder, input, width);
    emit_payment(&mut builder, input, width);
    emit_barcode(&mut builder, input);
    emit_footer(&mut builder, input, width);
    builder.feed(4).cut();

    if let PaymentDetails::Card { slip } = &input.payment {
        emit_customer_copy(&mut builder, input, slip);
        builder.feed(4).cut();
    }

    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cash_input() -> ReceiptInput {
        ReceiptInput {
            store_name: "The Small".to_string(),
            store_message: Some("Open daily 08:00-22:00".to_string()),
            copy_label: None,
            receipt_number: "R-1001".to_string(),
            transaction_id: "txn-55aa".to_string(),
            date: "2026-08-24".to_string(),
            time: "14:31".to_string(),
            date_time_iso: Some("2026-08-24T14:31:02+03:00".to_string()),
            characters_per_line: 48,
            items: vec![ReceiptItem {
                name: "Very Long Product Name That Should Wrap Across Lines Cleanly"
                    .to_string(),
                quantity: 1.0,
                unit_price: 1.23,
                total_price: 1.23,
            }],
            subtotal: 1.23,
            tax: 0.0,
            total: 1.23,
            payment: PaymentDetails::Cash {
                received: 2.0,
                change: 0.77,
            },
            qr_data: None,
        }
    }

    fn card_input() -> ReceiptInput {
        ReceiptInput {
            items: vec![ReceiptItem {
                name: "Milk 2L".to_string(),
                quantity: 1.0,
                unit_price: 1.50,
                total_price: 1.50,
            }],
            subtotal: 1.50,
            tax: 0.0,
            total: 1.50,
            payment: PaymentDetails::Card {
                slip: CardSlip {
                    provider: "VIVA WALLET".to_string(),
                    brand: "VISA".to_string(),
                    last4: "1234".to_string(),
                    card_type: Some("debit".to_string()),
                    auth_code: "ABC123".to_string(),
                    terminal_id: Some("T-07".to_string()),
                    terminal_txn_id: Some("vw-900112".to_string()),
                },
            },
            ..cash_input()
        }
    }

    fn count_sequence(bytes: &[u8], seq: &[u8]) -> usize {
        bytes
            .windows(seq.len())
            .filter(|window| *window == seq)
            .count()
    }

    fn find_sequence(bytes: &[u8], seq: &[u8]) -> Option<usize> {
        bytes.windows(seq.len()).position(|window| window == seq)
    }

    /// Strip the command sequences the renderer emits, leaving printable
    /// text and line feeds, so line lengths can be measured.
    fn printable_lines(bytes: &[u8]) -> Vec<String> {
        let mut text = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                0x1B => {
                    // ESC @ is two bytes; every other ESC command we emit
                    // carries one parameter byte
                    i += if bytes.get(i + 1) == Some(&0x40) { 2 } else { 3 };
                }
                0x1D => match bytes.get(i + 1) {
                    Some(0x6B) => {
                        // GS k 73 len data
                        let len = *bytes.get(i + 3).unwrap_or(&0) as usize;
                        i += 4 + len;
                    }
                    Some(0x28) => {
                        // GS ( k pL pH ...
                        let len = *bytes.get(i + 3).unwrap_or(&0) as usize
                            + ((*bytes.get(i + 4).unwrap_or(&0) as usize) << 8);
                        i += 5 + len;
                    }
                    Some(0x56) => {
                        i += if bytes.get(i + 2) == Some(&0x42) { 4 } else { 3 };
                    }
                    // GS ! / GS H / GS h / GS w — one parameter byte
                    _ => i += 3,
                },
                _ => {
                    text.push(bytes[i]);
                    i += 1;
                }
            }
        }
        String::from_utf8_lossy(&text)
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn cash_receipt_scenario() {
        let bytes = render_receipt(&cash_input()).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains(&"-".repeat(48)));
        assert!(text.contains("Cash Received"));
        assert!(text.contains("2.00"));
        assert!(text.contains("0.77"));
        let barcode_at = find_sequence(&bytes, &[0x1D, 0x6B, 0x49]).expect("barcode present");
        let footer_at = find_sequence(&bytes, b"THANK YOU FOR SHOPPING WITH US")
            .expect("footer present");
        assert!(barcode_at < footer_at, "barcode must precede footer");
        assert_eq!(count_sequence(&bytes, &[0x1D, 0x56, 0x42, 0x00]), 1);
        assert_eq!(&bytes[bytes.len() - 4..], &[0x1D, 0x56, 0x42, 0x00]);
    }

    #[test]
    fn every_line_fits_the_width() {
        for input in [cash_input(), card_input()] {
            let bytes = render_receipt(&input).unwrap();
            for line in printable_lines(&bytes) {
                assert!(
                    line.chars().count() <= 48,
                    "line exceeds width: {line:?}"
                );
            }
        }
    }

    #[test]
    fn card_receipt_scenario() {
        let bytes = render_receipt(&card_input()).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains("*CUSTOMER COPY*"));
        assert!(text.contains("VIVA WALLET"));
        assert!(text.contains("AUTH CODE"));
        assert!(text.contains("************1234"));
        // one cut between merchant and customer copy, one terminating
        assert_eq!(count_sequence(&bytes, &[0x1D, 0x56, 0x42, 0x00]), 2);
    }

    #[test]
    fn customer_copy_follows_first_cut() {
        let bytes = render_receipt(&card_input()).unwrap();
        let first_cut = find_sequence(&bytes, &[0x1D, 0x56, 0x42, 0x00]).unwrap();
        let copy_at = find_sequence(&bytes, b"*CUSTOMER COPY*").unwrap();
        assert!(copy_at > first_cut);
    }

    #[test]
    fn masked_pan_has_twelve_mask_characters() {
        assert_eq!(masked_pan("1234"), "************1234");
    }

    #[test]
    fn wrapped_item_name_appears_across_lines() {
        let bytes = render_receipt(&cash_input()).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        // the full 61-character name cannot be on one 48-column line
        assert!(!text.contains(
            "Very Long Product Name That Should Wrap Across Lines Cleanly"
        ));
        assert!(text.contains("Very Long Product Name"));
        assert!(text.contains("Cleanly"));
    }

    #[test]
    fn audit_line_uses_normalized_timestamp() {
        let bytes = render_receipt(&cash_input()).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains("2026-08-24T11:31:02Z"));
    }

    #[test]
    fn unparseable_timestamp_is_skipped() {
        let input = ReceiptInput {
            date_time_iso: Some("yesterday-ish".to_string()),
            ..cash_input()
        };
        let bytes = render_receipt(&input).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(!text.contains("Issued"));
    }

    #[test]
    fn zero_items_renders_placeholder() {
        let input = ReceiptInput {
            items: Vec::new(),
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            payment: PaymentDetails::Cash {
                received: 0.0,
                change: 0.0,
            },
            ..cash_input()
        };
        let bytes = render_receipt(&input).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains("NO ITEMS"));
    }

    #[test]
    fn other_payment_prints_label() {
        let input = ReceiptInput {
            payment: PaymentDetails::Other {
                label: "MEAL VOUCHER".to_string(),
            },
            ..cash_input()
        };
        let bytes = render_receipt(&input).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains("MEAL VOUCHER"));
        assert!(!text.contains("*CUSTOMER COPY*"));
    }

    #[test]
    fn qr_data_is_emitted_before_footer() {
        let input = ReceiptInput {
            qr_data: Some("https://thesmall.app/r/R-1001".to_string()),
            ..cash_input()
        };
        let bytes = render_receipt(&input).unwrap();
        let qr_at = find_sequence(&bytes, &[0x1D, b'(', b'k']).expect("qr present");
        let footer_at = find_sequence(&bytes, b"THANK YOU FOR SHOPPING WITH US").unwrap();
        assert!(qr_at < footer_at);
    }

    #[test]
    fn rejects_narrow_width() {
        let input = ReceiptInput {
            characters_per_line: 16,
            ..cash_input()
        };
        assert!(matches!(
            render_receipt(&input),
            Err(ReceiptError::InvalidWidth(_))
        ));
    }

    #[test]
    fn rejects_negative_price() {
        let mut input = cash_input();
        input.items[0].unit_price = -1.0;
        assert!(matches!(
            render_receipt(&input),
            Err(ReceiptError::InvalidMoneyValue {
                field: "unit_price",
                ..
            })
        ));
    }

    #[test]
    fn rejects_non_finite_total() {
        let input = ReceiptInput {
            total: f64::NAN,
            ..cash_input()
        };
        assert!(matches!(
            render_receipt(&input),
            Err(ReceiptError::InvalidMoneyValue { field: "total", .. })
        ));
    }

    #[test]
    fn rejects_incomplete_card_slip() {
        let mut input = card_input();
        if let PaymentDetails::Card { slip } = &mut input.payment {
            slip.auth_code = String::new();
        }
        assert!(matches!(
            render_receipt(&input),
            Err(ReceiptError::IncompleteCardSlip(_))
        ));
    }

    #[test]
    fn rejects_malformed_last4() {
        let mut input = card_input();
        if let PaymentDetails::Card { slip } = &mut input.payment {
            slip.last4 = "12345".to_string();
        }
        assert!(matches!(
            render_receipt(&input),
            Err(ReceiptError::IncompleteCardSlip(_))
        ));
    }

    #[test]
    fn failed_validation_emits_no_bytes() {
        let input = ReceiptInput {
            characters_per_line: 0,
            ..cash_input()
        };
        assert!(render_receipt(&input).is_err());
    }

    #[test]
    fn deserializes_orchestrator_payload() {
        let payload = serde_json::json!({
            "store_name": "The Small",
            "receipt_number": "R-2002",
            "transaction_id": "txn-77",
            "date": "2026-08-24",
            "time": "09:15",
            "characters_per_line": 32,
            "items": [
                {"name": "Espresso", "quantity": 2.0, "unit_price": 1.80, "total_price": 3.60}
            ],
            "subtotal": 3.60,
            "tax": 0.47,
            "total": 3.60,
            "payment": {"method": "card", "slip": {
                "provider": "VIVA WALLET",
                "brand": "MASTERCARD",
                "last4": "9876",
                "auth_code": "Z9Y8X7"
            }}
        });
        let input: ReceiptInput = serde_json::from_value(payload).unwrap();
        let bytes = render_receipt(&input).unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        assert!(text.contains(&"-".repeat(32)));
        assert!(text.contains("************9876"));
    }
}
