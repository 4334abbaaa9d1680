//! Punycode (RFC 3492) and label-wise IDNA ASCII conversion.
//!
//! Only the bootstring transform and the separator mapping are implemented;
//! no Nameprep/UTS #46 mapping is applied. Callers lowercase their input
//! before converting.

use crate::error::{DomainError, Result};

const BASE: u32 = 36;
const T_MIN: u32 = 1;
const T_MAX: u32 = 26;
const SKEW: u32 = 38;
const DAMP: u32 = 700;
const INITIAL_BIAS: u32 = 72;
const INITIAL_N: u32 = 128;
const DELIMITER: char = '-';

/// Largest value any intermediate delta may take (2^31 - 1).
const MAX_INT: u32 = i32::MAX as u32;

/// Prefix marking an ASCII-compatible encoded label.
pub const ACE_PREFIX: &str = "xn--";

/// Full stops recognized as label separators besides `.`:
/// ideographic full stop, fullwidth full stop, halfwidth ideographic full stop.
const SEPARATORS: [char; 3] = ['\u{3002}', '\u{FF0E}', '\u{FF61}'];

/// Bias adaptation function (RFC 3492 section 6.1).
fn adapt(delta: u32, num_points: u32, first_time: bool) -> u32 {
    let mut delta = if first_time { delta / DAMP } else { delta >> 1 };
    delta += delta / num_points;

    let mut k = 0;
    while delta > ((BASE - T_MIN) * T_MAX) >> 1 {
        delta /= BASE - T_MIN;
        k += BASE;
    }

    k + (BASE - T_MIN + 1) * delta / (delta + SKEW)
}

/// Threshold for digit position `k` under the current bias.
#[inline]
fn threshold(k: u32, bias: u32) -> u32 {
    if k <= bias {
        T_MIN
    } else if k >= bias + T_MAX {
        T_MAX
    } else {
        k - bias
    }
}

/// Basic code point for a digit: 0..=25 -> a..=z, 26..=35 -> 0..=9.
#[inline]
fn digit_to_basic(digit: u32) -> char {
    let byte = if digit < 26 {
        b'a' + digit as u8
    } else {
        b'0' + (digit - 26) as u8
    };
    byte as char
}

/// Digit value of a basic code point, or `BASE` if it is not a digit.
#[inline]
fn basic_to_digit(code_point: u32) -> u32 {
    match code_point {
        0x30..=0x39 => code_point - 22,
        0x41..=0x5A => code_point - 0x41,
        0x61..=0x7A => code_point - 0x61,
        _ => BASE,
    }
}

/// Decode UTF-16 code units into code points.
///
/// Surrogate pairs are joined; a surrogate without its partner is kept as a
/// code point of its own.
pub fn decode_utf16(units: &[u16]) -> Vec<u32> {
    let mut output = Vec::with_capacity(units.len());
    let mut i = 0;

    while i < units.len() {
        let value = units[i] as u32;
        i += 1;

        if (0xD800..=0xDBFF).contains(&value) && i < units.len() {
            let extra = units[i] as u32;
            if extra & 0xFC00 == 0xDC00 {
                output.push(((value & 0x3FF) << 10) + (extra & 0x3FF) + 0x10000);
                i += 1;
                continue;
            }
        }

        output.push(value);
    }

    output
}

/// Bootstring-encode a sequence of code points.
pub fn encode_code_points(input: &[u32]) -> Result<String> {
    let mut output = String::with_capacity(input.len() * 2);

    for &code_point in input {
        if code_point < 0x80 {
            output.push(code_point as u8 as char);
        }
    }

    let basic_length = output.len() as u32;
    let mut handled = basic_length;

    if basic_length > 0 {
        output.push(DELIMITER);
    }

    let input_length = input.len() as u32;
    let mut n = INITIAL_N;
    let mut delta: u32 = 0;
    let mut bias = INITIAL_BIAS;

    while handled < input_length {
        // Smallest code point not yet handled
        let m = input
            .iter()
            .copied()
            .filter(|&c| c >= n)
            .min()
            .ok_or(DomainError::Overflow)?;

        let handled_plus_one = handled + 1;
        if m - n > (MAX_INT - delta) / handled_plus_one {
            return Err(DomainError::Overflow);
        }
        delta += (m - n) * handled_plus_one;
        n = m;

        for &code_point in input {
            if code_point < n {
                delta += 1;
                if delta > MAX_INT {
                    return Err(DomainError::Overflow);
                }
            }

            if code_point == n {
                let mut q = delta;
                let mut k = BASE;
                loop {
                    let t = threshold(k, bias);
                    if q < t {
                        break;
                    }
                    let q_minus_t = q - t;
                    let base_minus_t = BASE - t;
                    output.push(digit_to_basic(t + q_minus_t % base_minus_t));
                    q = q_minus_t / base_minus_t;
                    k += BASE;
                }

                output.push(digit_to_basic(q));
                bias = adapt(delta, handled + 1, handled == basic_length);
                delta = 0;
                handled += 1;
            }
        }

        delta += 1;
        n += 1;
    }

    Ok(output)
}

/// Bootstring-encode a single label (without the `xn--` prefix).
pub fn encode(input: &str) -> Result<String> {
    let code_points: Vec<u32> = input.chars().map(u32::from).collect();
    encode_code_points(&code_points)
}

/// Decode a bootstring-encoded label (without the `xn--` prefix).
pub fn decode(input: &str) -> Result<String> {
    let chars: Vec<char> = input.chars().collect();
    let basic = chars.iter().rposition(|&c| c == DELIMITER).unwrap_or(0);

    let mut output: Vec<u32> = Vec::with_capacity(chars.len());
    for &c in &chars[..basic] {
        if !c.is_ascii() {
            return Err(DomainError::InvalidInput(format!(
                "non-basic code point in basic section: {}",
                input
            )));
        }
        output.push(c as u32);
    }

    let mut index = if basic > 0 { basic + 1 } else { 0 };
    let mut i: u32 = 0;
    let mut n = INITIAL_N;
    let mut bias = INITIAL_BIAS;

    while index < chars.len() {
        let old_i = i;
        let mut w: u32 = 1;
        let mut k = BASE;

        loop {
            let c = chars.get(index).copied().ok_or_else(|| {
                DomainError::InvalidInput(format!("truncated punycode: {}", input))
            })?;
            index += 1;

            let digit = basic_to_digit(c as u32);
            if digit >= BASE {
                return Err(DomainError::InvalidInput(format!(
                    "invalid punycode digit '{}' in {}",
                    c, input
                )));
            }
            if digit > (MAX_INT - i) / w {
                return Err(DomainError::Overflow);
            }
            i += digit * w;

            let t = threshold(k, bias);
            if digit < t {
                break;
            }

            let base_minus_t = BASE - t;
            if w > MAX_INT / base_minus_t {
                return Err(DomainError::Overflow);
            }
            w *= base_minus_t;
            k += BASE;
        }

        let out = output.len() as u32 + 1;
        bias = adapt(i - old_i, out, old_i == 0);

        if i / out > MAX_INT - n {
            return Err(DomainError::Overflow);
        }
        n += i / out;
        i %= out;

        output.insert(i as usize, n);
        i += 1;
    }

    output
        .into_iter()
        .map(|cp| {
            char::from_u32(cp).ok_or_else(|| {
                DomainError::InvalidInput(format!("invalid code point U+{:X} in {}", cp, input))
            })
        })
        .collect()
}

/// Replace the IDNA label separators (U+3002, U+FF0E, U+FF61) with `.`.
pub fn map_separators(domain: &str) -> String {
    domain
        .chars()
        .map(|c| if SEPARATORS.contains(&c) { '.' } else { c })
        .collect()
}

/// Apply `f` to every label of a domain or the domain part of an email address.
fn map_domain<F>(input: &str, f: F) -> Result<String>
where
    F: Fn(&str) -> Result<String>,
{
    let (local, domain) = match input.split_once('@') {
        Some((local, domain)) => (Some(local), domain),
        None => (None, input),
    };

    let domain = map_separators(domain);

    let labels = domain
        .split('.')
        .map(&f)
        .collect::<Result<Vec<String>>>()?;
    let encoded = labels.join(".");

    Ok(match local {
        Some(local) => format!("{}@{}", local, encoded),
        None => encoded,
    })
}

/// Convert a Unicode domain (or `local@domain` address) to its ASCII form.
///
/// ASCII labels are returned unchanged; other labels become `xn--` + punycode.
///
/// ```
/// use etld_engine::punycode::to_ascii;
///
/// assert_eq!(to_ascii("mañana.com").unwrap(), "xn--maana-pta.com");
/// assert_eq!(to_ascii("example.com").unwrap(), "example.com");
/// ```
pub fn to_ascii(input: &str) -> Result<String> {
    map_domain(input, |label| {
        if label.is_ascii() {
            Ok(label.to_string())
        } else {
            Ok(format!("{}{}", ACE_PREFIX, encode(label)?))
        }
    })
}

/// Convert an ASCII domain (or `local@domain` address) back to Unicode.
pub fn to_unicode(input: &str) -> Result<String> {
    map_domain(input, |label| match label.get(..ACE_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(ACE_PREFIX) => {
            decode(&label[ACE_PREFIX.len()..].to_lowercase())
        }
        _ => Ok(label.to_string()),
    })
}
