//! BR Code payloads
//!
//! Builds the EMV-style "Pix copia e cola" string used by simulated
//! charges, and the two-decimal amount formatting shared with the real
//! provider.

use rust_decimal::{Decimal, RoundingStrategy};

const GUI: &str = "br.gov.bcb.pix";
const MERCHANT_NAME: &str = "PIX SIMULADO";
const MERCHANT_CITY: &str = "SAO PAULO";

/// Amount with exactly two decimal places, e.g. `117.00`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Two-decimal amount with the separator stripped, e.g. `11700`
pub fn compact_amount(amount: Decimal) -> String {
    format_amount(amount).replace('.', "")
}

fn field(id: &str, value: &str) -> String {
    format!("{id}{:02}{value}", value.len())
}

/// Simulated copy-paste payload embedding `txid` and `amount`
pub fn simulated_payload(txid: &str, amount: Decimal) -> String {
    let account = format!("{}{}", field("00", GUI), field("01", txid));

    let mut payload = String::new();
    payload.push_str(&field("00", "01"));
    payload.push_str(&field("26", &account));
    payload.push_str(&field("52", "0000"));
    payload.push_str(&field("53", "986"));
    payload.push_str(&field("54", &compact_amount(amount)));
    payload.push_str(&field("58", "BR"));
    payload.push_str(&field("59", MERCHANT_NAME));
    payload.push_str(&field("60", MERCHANT_CITY));
    payload.push_str(&field("62", &field("05", "***")));
    payload.push_str("6304");

    let crc = crc16_ccitt(payload.as_bytes());
    payload.push_str(&format!("{crc:04X}"));
    payload
}

/// CRC16-CCITT (poly 0x1021, init 0xFFFF), as required by EMV QR payloads
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
