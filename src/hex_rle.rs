use crate::error::{ParseError, Result};
use log::trace;

/// Tokenizer state: either expecting a two-digit literal (or the opening
/// bracket of a count), or inside `[...]` collecting count digits.
#[derive(Debug, Clone, Copy)]
enum State {
    Literal,
    RepeatCount { open: usize },
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

fn invalid(input: &str, at: usize) -> ParseError {
    ParseError::InvalidFormat(format!("invalid hex data {:?}", &input[at..]))
}

/// Decode NEXXT's run-length encoded hexadecimal payloads.
///
/// Two hex digits are one literal byte. `[n]` (hexadecimal) means the last
/// value occupies `n` positions in total, so `n - 1` further copies are
/// appended. Before any literal the value is zero and all `n` zero bytes are
/// emitted. Hex digits may be upper- or lowercase.
///
/// A count too large to allocate is rejected as malformed.
pub fn decode_hex(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut values = Vec::new();
    let mut last: Option<u8> = None;
    let mut state = State::Literal;
    let mut pos = 0;

    while pos < bytes.len() {
        match state {
            State::Literal => {
                if bytes[pos] == b'[' {
                    state = State::RepeatCount { open: pos };
                    pos += 1;
                    continue;
                }
                let literal = bytes
                    .get(pos..pos + 2)
                    .and_then(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?))
                    .ok_or_else(|| invalid(input, pos))?;
                values.push(literal);
                last = Some(literal);
                pos += 2;
            }
            State::RepeatCount { open } => match bytes[pos] {
                b']' => {
                    let digits = &input[open + 1..pos];
                    let count = usize::from_str_radix(digits, 16)
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| invalid(input, open))?;
                    trace!("repeat [{digits}] of {last:?}");
                    values.try_reserve(count).map_err(|_| invalid(input, open))?;
                    match last {
                        Some(value) => values.extend(std::iter::repeat_n(value, count - 1)),
                        None => {
                            values.extend(std::iter::repeat_n(0, count));
                            last = Some(0);
                        }
                    }
                    state = State::Literal;
                    pos += 1;
                }
                b if hex_value(b).is_some() => pos += 1,
                _ => return Err(invalid(input, open)),
            },
        }
    }

    if let State::RepeatCount { open } = state {
        return Err(invalid(input, open));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn repeat_counts_total_occurrences() {
        assert_eq!(decode_hex("0102[03]").unwrap(), vec![0x01, 0x02, 0x02, 0x02]);
        assert_eq!(decode_hex("ff[1]00").unwrap(), vec![0xff, 0x00]);
        assert_eq!(decode_hex("aa[10]").unwrap().len(), 16);
    }

    #[test]
    fn repeat_before_any_literal_emits_zeros() {
        assert_eq!(decode_hex("[05]").unwrap(), vec![0, 0, 0, 0, 0]);
        assert_eq!(decode_hex("[02][03]").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn uppercase_digits_are_accepted() {
        assert_eq!(decode_hex("AbFF").unwrap(), vec![0xab, 0xff]);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for bad in [
            "xyz",
            "0",
            "01[",
            "01[zz]",
            "01[]",
            "01[0]",
            "01]",
            "00[FFFFFFFFFFFFFFFF]",
            "[FFFFFFFFFFFFFFFF]",
        ] {
            match decode_hex(bad) {
                Err(ParseError::InvalidFormat(msg)) => assert!(msg.contains("invalid hex data")),
                other => panic!("{bad:?} decoded to {other:?}"),
            }
        }
    }

    #[test]
    fn oversized_count_names_the_bracket() {
        let err = decode_hex("00[FFFFFFFFFFFFFFFF]").unwrap_err();
        assert!(err.to_string().contains("\"[FFFFFFFFFFFFFFFF]\""), "{err}");
    }

    #[test]
    fn error_names_the_remainder() {
        let err = decode_hex("0102zz03").unwrap_err();
        assert!(err.to_string().contains("\"zz03\""), "{err}");
    }
}
