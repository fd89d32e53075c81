//! Thai-language enrichments for AMLO forms
//!
//! Thai numerals and the amount-in-words line are optional enrichments on
//! the printed form; the numeric field always carries the authoritative
//! amount, so a conversion gap here can never corrupt a filing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const THAI_DIGITS: [char; 10] = ['๐', '๑', '๒', '๓', '๔', '๕', '๖', '๗', '๘', '๙'];
const DIGIT_WORDS: [&str; 10] = [
    "ศูนย์", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];
const PLACE_WORDS: [&str; 6] = ["", "สิบ", "ร้อย", "พัน", "หมื่น", "แสน"];

/// Replaces ASCII digits with Thai numerals, leaving other characters as-is
pub fn thai_numerals(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => THAI_DIGITS[d as usize],
            None => c,
        })
        .collect()
}

/// Spells a non-negative baht amount in Thai words
///
/// Follows the conventional reading: แสน/หมื่น/พัน/ร้อย/สิบ places, เอ็ด for
/// a trailing one, ยี่สิบ for twenty, ล้าน recursion for millions, and
/// satang rendered after ถ้วน/บาท. Returns None for negative amounts.
pub fn baht_text(amount: Decimal) -> Option<String> {
    if amount.is_sign_negative() {
        return None;
    }
    let rounded = amount.round_dp(2);
    let baht = rounded.trunc().to_u64()?;
    let satang = ((rounded - rounded.trunc()) * Decimal::from(100)).to_u64()?;

    let mut out = String::new();
    if baht == 0 && satang == 0 {
        return Some("ศูนย์บาทถ้วน".to_string());
    }
    if baht > 0 {
        out.push_str(&read_number(baht, false));
        out.push_str("บาท");
    }
    if satang == 0 {
        out.push_str("ถ้วน");
    } else {
        out.push_str(&read_number(satang, false));
        out.push_str("สตางค์");
    }
    Some(out)
}

/// Reads a positive integer in Thai, recursing per million
///
/// `has_prefix` marks that higher places were already read, so a lone
/// trailing one still becomes เอ็ด (e.g. ห้าล้านเอ็ด).
fn read_number(n: u64, has_prefix: bool) -> String {
    if n >= 1_000_000 {
        let millions = read_number(n / 1_000_000, has_prefix);
        let rest = n % 1_000_000;
        if rest == 0 {
            return format!("{millions}ล้าน");
        }
        return format!("{millions}ล้าน{}", read_number(rest, true));
    }

    let mut out = String::new();
    let digits: Vec<u64> = {
        let mut v = Vec::new();
        let mut m = n;
        while m > 0 {
            v.push(m % 10);
            m /= 10;
        }
        v
    };

    for place in (0..digits.len()).rev() {
        let d = digits[place];
        if d == 0 {
            continue;
        }
        match (place, d) {
            // Trailing one after any higher place reads เอ็ด
            (0, 1) if digits.len() > 1 || has_prefix => out.push_str("เอ็ด"),
            // Tens place: twenty is ยี่สิบ, ten has no leading หนึ่ง
            (1, 1) => out.push_str("สิบ"),
            (1, 2) => out.push_str("ยี่สิบ"),
            (1, _) => {
                out.push_str(DIGIT_WORDS[d as usize]);
                out.push_str("สิบ");
            }
            _ => {
                out.push_str(DIGIT_WORDS[d as usize]);
                out.push_str(PLACE_WORDS[place]);
            }
        }
    }
    out
}
