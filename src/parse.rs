use memchr::memchr;

use crate::error::FormatError;

pub const DELIMITER: u8 = b';';
pub const TERMINATOR: u8 = b'\n';
pub const COMMENT: u8 = b'#';

/// Sign plus this many digits is the widest value accepted, which keeps
/// per-key sums comfortably inside an `i64`.
const MAX_DIGITS: usize = 12;

/// Parses the value field at the start of `bytes` (everything after the `;`).
///
/// The field runs to the first `\n`, or to the end of `bytes` for a final
/// record without one. Returns the value scaled by 10 and the number of bytes
/// consumed, terminator included.
#[inline]
pub fn parse_value(bytes: &[u8]) -> Result<(i64, usize), FormatError> {
    let (field, consumed) = match memchr(TERMINATOR, bytes) {
        Some(end) => (&bytes[..end], end + 1),
        None => (bytes, bytes.len()),
    };
    Ok((parse_field(field)?, consumed))
}

/// Parses an isolated value field such as `-12.3` into `-123`.
///
/// Digits are accumulated right to left so place values never depend on how
/// many integer digits there are.
#[inline]
pub fn parse_field(field: &[u8]) -> Result<i64, FormatError> {
    match field {
        [] => return Err(FormatError::EmptyValue),
        [.., b'.', _] => {}
        _ => return Err(FormatError::MissingFraction),
    }
    if field.len() > MAX_DIGITS + 2 {
        return Err(FormatError::OutOfRange);
    }

    let point = field.len() - 2;
    let mut value = 0i64;
    let mut place = 1i64;
    let mut digits = 0usize;

    for (position, &byte) in field.iter().enumerate().rev() {
        match byte {
            b'0'..=b'9' => {
                value += i64::from(byte - b'0') * place;
                place *= 10;
                digits += 1;
            }
            b'.' if position == point => {}
            b'-' if position == 0 => {
                value = -value;
            }
            _ => return Err(FormatError::UnexpectedByte { byte, position }),
        }
    }

    // one fractional digit is always there, so anything less means "-.5" / ".5"
    if digits < 2 {
        return Err(FormatError::MissingIntegerPart);
    }
    Ok(value)
}
