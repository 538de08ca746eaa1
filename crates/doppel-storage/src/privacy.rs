// SPDX-FileCopyrightText: 2026 Doppel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII masking for persisted text.
//!
//! Everything written to the conversation log goes through [`mask_pii`]
//! first. Patterns target mainland-China formats for phone numbers and
//! identity card numbers plus generic email and bank card shapes.
//!
//! `\b` treats CJK characters as word characters, so digit patterns carry
//! explicit non-digit boundaries instead.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()
});

// Resident identity card: 6-digit region, birth date, sequence, check digit.
static ID_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(^|[^0-9Xx])([0-9]{6}(?:19|20)[0-9]{2}(?:0[1-9]|1[0-2])(?:0[1-9]|[12][0-9]|3[01])[0-9]{3}[0-9Xx])([^0-9Xx]|$)",
    )
    .unwrap()
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^0-9])(1[3-9][0-9]{9})([^0-9]|$)").unwrap());

static BANK_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^0-9])([0-9]{13,19})([^0-9]|$)").unwrap());

/// Replaces recognized PII with typed placeholders.
///
/// Identity cards are masked before bank card numbers; the 18-digit ID
/// shape would otherwise be swallowed by the generic card pattern.
pub fn mask_pii(input: &str) -> String {
    let masked = EMAIL.replace_all(input, "<<email>>");
    let masked = ID_CARD.replace_all(&masked, "${1}<<id>>${3}");
    let masked = PHONE.replace_all(&masked, "${1}<<phone>>${3}");
    let masked = BANK_CARD.replace_all(&masked, "${1}<<card>>${3}");
    masked.into_owned()
}
