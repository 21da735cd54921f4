use pinyin::ToPinyin;

/// First character that can carry an initial: a letter, a digit, or a CJK
/// unified ideograph in the common block.
pub fn first_valid_char(s: &str) -> Option<char> {
    s.chars()
        .find(|&c| c.is_alphanumeric() || ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

/// Uppercase Latin initial for `c`, if it has one.
///
/// ASCII letters map to themselves, ASCII digits pass through and Chinese
/// characters map to the first letter of their pinyin reading.
pub fn initial_of(c: char) -> Option<char> {
    if c.is_ascii_alphabetic() {
        return Some(c.to_ascii_uppercase());
    }
    if c.is_ascii_digit() {
        return Some(c);
    }
    if let Some(p) = c.to_pinyin() {
        if let Some(first) = p.first_letter().chars().next() {
            return Some(first.to_ascii_uppercase());
        }
    }
    gb2312_initial(c)
}

// Level-1 GB2312 hanzi are sorted by reading, so each initial owns a
// contiguous code range. I, U and V never start a reading.
const GB2312_RANGES: &[(u16, u16, char)] = &[
    (45217, 45252, 'A'),
    (45253, 45760, 'B'),
    (45761, 46317, 'C'),
    (46318, 46825, 'D'),
    (46826, 47009, 'E'),
    (47010, 47296, 'F'),
    (47297, 47613, 'G'),
    (47614, 48118, 'H'),
    (48119, 49061, 'J'),
    (49062, 49323, 'K'),
    (49324, 49895, 'L'),
    (49896, 50370, 'M'),
    (50371, 50613, 'N'),
    (50614, 50621, 'O'),
    (50622, 50905, 'P'),
    (50906, 51386, 'Q'),
    (51387, 51445, 'R'),
    (51446, 52217, 'S'),
    (52218, 52697, 'T'),
    (52698, 52979, 'W'),
    (52980, 53688, 'X'),
    (53689, 54480, 'Y'),
    (54481, 55289, 'Z'),
];

pub(super) fn gb2312_initial(c: char) -> Option<char> {
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = encoding_rs::GBK.encode(c.encode_utf8(&mut buf));
    if had_errors || bytes.len() < 2 {
        return None;
    }
    let code = u16::from(bytes[0]) * 256 + u16::from(bytes[1]);
    GB2312_RANGES
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&code))
        .map(|&(_, _, letter)| letter)
}
