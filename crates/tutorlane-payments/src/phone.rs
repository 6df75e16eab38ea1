// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kenyan MSISDN normalization for push payments.

use tutorlane_core::TutorError;

/// Normalize a payer phone number to the `254XXXXXXXXX` form.
///
/// Non-digits are stripped first. Accepted shapes: `07…`/`01…` (10 digits),
/// `7…`/`1…` (9 digits) and `254…` (12 digits).
pub fn normalize_msisdn(raw: &str) -> Result<String, TutorError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    let normalized = match digits.len() {
        10 if digits.starts_with("07") || digits.starts_with("01") => {
            Some(format!("254{}", &digits[1..]))
        }
        9 if digits.starts_with('7') || digits.starts_with('1') => Some(format!("254{digits}")),
        12 if digits.starts_with("254") => Some(digits),
        _ => None,
    };

    normalized.ok_or_else(|| TutorError::InvalidInput("invalid M-Pesa phone number format".into()))
}
