//! Fractional index allocator for list ordering.
//!
//! A key is a string of base-62 digits read as a fraction in (0, 1):
//! `"V"` is 31/62, `"V1"` is 31/62 + 1/62². Valid keys never end in `'0'`,
//! so plain byte comparison of two keys agrees with their numeric order and
//! there is always a finite key between two distinct ones. Precision is capped
//! at [`MAX_KEY_LEN`] digits; once a gap needs more than that, [`between`]
//! reports [`Between::RebalanceRequired`] and the list must be respread.

/// Digit alphabet in ascending byte order.
pub const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Longest key [`between`] will produce.
pub const MAX_KEY_LEN: usize = 32;

const BASE: usize = DIGITS.len();

/// Result of asking for a key between two neighbours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Between {
    Key(String),
    /// No distinct key fits; the whole list has to be respread.
    RebalanceRequired,
}

impl Between {
    pub fn key(self) -> Option<String> {
        match self {
            Between::Key(key) => Some(key),
            Between::RebalanceRequired => None,
        }
    }
}

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'A'..=b'Z' => Some((byte - b'A') as usize + 10),
        b'a'..=b'z' => Some((byte - b'a') as usize + 36),
        _ => None,
    }
}

pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.ends_with('0')
        && key.bytes().all(|b| digit_value(b).is_some())
}

/// Key given to the first item of an empty list. Smaller keys remain
/// reachable through [`between`].
pub fn min() -> String {
    "1".to_string()
}

/// A key greater than `key`, for appending at the end of a list.
///
/// Bumps the leftmost digit that is not already the top digit and drops
/// everything after it, so repeated appends stay short. An invalid `key` is
/// treated as an empty list.
pub fn next(key: &str) -> String {
    if !is_valid_key(key) {
        return min();
    }
    let bytes = key.as_bytes();
    match bytes.iter().position(|&b| b != b'z') {
        Some(i) => {
            let mut out = key[..i].to_string();
            let value = digit_value(bytes[i]).unwrap_or(0);
            out.push(DIGITS[value + 1] as char);
            out
        }
        None => format!("{}1", key),
    }
}

/// Key to append after `last`, or [`min`] when there is no valid last key.
pub fn append_after(last: Option<&str>) -> String {
    match last.filter(|k| is_valid_key(k)) {
        Some(key) => next(key),
        None => min(),
    }
}

/// A key strictly between `lower` and `upper`. An empty bound means the list
/// is open on that side.
///
/// Returns [`Between::RebalanceRequired`] when the gap is exhausted, when a
/// bound is not a valid key, or when the bounds are not strictly ordered
/// (two rows that collided on the same key).
pub fn between(lower: &str, upper: &str) -> Between {
    if (!lower.is_empty() && !is_valid_key(lower)) || (!upper.is_empty() && !is_valid_key(upper)) {
        return Between::RebalanceRequired;
    }
    if !lower.is_empty() && !upper.is_empty() && lower >= upper {
        return Between::RebalanceRequired;
    }

    let key = match (lower.is_empty(), upper.is_empty()) {
        (true, true) => min(),
        (false, true) => next(lower),
        _ => midpoint(lower.as_bytes(), Some(upper.as_bytes())),
    };

    if key.len() > MAX_KEY_LEN {
        Between::RebalanceRequired
    } else {
        Between::Key(key)
    }
}

/// Midpoint of two digit strings, `upper = None` standing for 1.0.
/// Requires `lower < upper` and no trailing zeros on either side.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> String {
    if let Some(upper) = upper {
        // Shared prefix (lower padded with zeros) is copied as is.
        let mut n = 0;
        while n < upper.len() && lower.get(n).copied().unwrap_or(b'0') == upper[n] {
            n += 1;
        }
        if n > 0 {
            let mut out: String = upper[..n].iter().map(|&b| b as char).collect();
            out.push_str(&midpoint(lower.get(n..).unwrap_or(&[]), Some(&upper[n..])));
            return out;
        }
    }

    let digit_lower = lower.first().and_then(|&b| digit_value(b)).unwrap_or(0);
    let digit_upper = upper
        .and_then(|u| u.first())
        .and_then(|&b| digit_value(b))
        .unwrap_or(BASE);

    if digit_upper - digit_lower > 1 {
        return (DIGITS[(digit_lower + digit_upper + 1) / 2] as char).to_string();
    }

    match upper {
        // Consecutive first digits: the upper key's first digit alone sits in between.
        Some(upper) if upper.len() > 1 => (upper[0] as char).to_string(),
        _ => {
            let mut out = String::new();
            out.push(DIGITS[digit_lower] as char);
            out.push_str(&midpoint(lower.get(1..).unwrap_or(&[]), None));
            out
        }
    }
}

/// Largest valid key; invalid keys are ignored.
pub fn max_key<'a, I>(keys: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().filter(|k| is_valid_key(k)).max()
}

/// Smallest valid key; invalid keys are ignored.
pub fn min_key<'a, I>(keys: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().filter(|k| is_valid_key(k)).min()
}

/// `count` ascending keys spaced evenly over the key space, all of the same
/// width before trailing zeros are trimmed. The width leaves at least one free
/// slot between neighbours.
pub fn spread(count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    let slots = (count as u128 + 1) * 2;
    let mut width = 1;
    let mut capacity = BASE as u128;
    while capacity < slots {
        width += 1;
        capacity *= BASE as u128;
    }
    let step = capacity / (count as u128 + 1);
    (1..=count as u128).map(|i| encode(i * step, width)).collect()
}

fn encode(mut value: u128, width: usize) -> String {
    let mut digits = vec![b'0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = DIGITS[(value % BASE as u128) as usize];
        value /= BASE as u128;
    }
    while digits.last() == Some(&b'0') {
        digits.pop();
    }
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn alphabet_is_sorted() {
        assert!(DIGITS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn validity() {
        assert!(is_valid_key("1"));
        assert!(is_valid_key("0V"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("10"));
        assert!(!is_valid_key("a-b"));
        assert!(!is_valid_key("1000.5"));
    }

    #[test]
    fn next_bumps_and_truncates() {
        assert_eq!(next("1"), "2");
        assert_eq!(next("1V"), "2");
        assert_eq!(next("y"), "z");
        assert_eq!(next("z"), "z1");
        assert_eq!(next("z5"), "z6");
        assert_eq!(next("zz"), "zz1");
        assert_eq!(next("legacy-key"), min());
    }

    #[test]
    fn append_after_ignores_invalid_keys() {
        assert_eq!(append_after(None), "1");
        assert_eq!(append_after(Some("not valid")), "1");
        assert_eq!(append_after(Some("5")), "6");
    }

    #[test]
    fn between_open_bounds() {
        assert_eq!(between("", ""), Between::Key(min()));
        assert_eq!(between("5", ""), Between::Key("6".to_string()));
        assert_eq!(between("", "1"), Between::Key("0V".to_string()));
        assert_eq!(between("", "01"), Between::Key("00V".to_string()));
    }

    #[test]
    fn between_neighbours() {
        assert_eq!(between("1", "3"), Between::Key("2".to_string()));
        assert_eq!(between("1", "2"), Between::Key("1V".to_string()));
        assert_eq!(between("1", "12"), Between::Key("11".to_string()));
        assert_eq!(between("1z", "2"), Between::Key("1zV".to_string()));
    }

    #[test]
    fn between_rejects_collisions_and_garbage() {
        assert_eq!(between("5", "5"), Between::RebalanceRequired);
        assert_eq!(between("6", "5"), Between::RebalanceRequired);
        assert_eq!(between("5", "bad key"), Between::RebalanceRequired);
        assert_eq!(between("50", ""), Between::RebalanceRequired);
    }

    #[test]
    fn repeated_narrow_inserts_exhaust_the_space() {
        let lower = "1".to_string();
        let mut upper = "2".to_string();
        let mut inserts = 0;
        loop {
            match between(&lower, &upper) {
                Between::Key(key) => {
                    assert!(lower.as_str() < key.as_str() && key.as_str() < upper.as_str());
                    assert!(key.len() <= MAX_KEY_LEN);
                    upper = key;
                    inserts += 1;
                }
                Between::RebalanceRequired => break,
            }
            assert!(inserts < 10_000, "key space never exhausted");
        }
        assert!(inserts > MAX_KEY_LEN);
    }

    #[test]
    fn max_and_min_skip_invalid_entries() {
        let keys = ["3", "garbage!", "V", "10", "1"];
        assert_eq!(max_key(keys.iter().copied()), Some("V"));
        assert_eq!(min_key(keys.iter().copied()), Some("1"));
        assert_eq!(max_key(["", "x y"].iter().copied()), None);
    }

    #[test]
    fn spread_is_even_and_ascending() {
        assert_eq!(spread(0), Vec::<String>::new());
        assert_eq!(spread(1), vec!["V".to_string()]);
        let keys = spread(500);
        assert_eq!(keys.len(), 500);
        assert!(keys.iter().all(|k| is_valid_key(k)));
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        for pair in keys.windows(2) {
            assert!(matches!(between(&pair[0], &pair[1]), Between::Key(_)));
        }
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(0usize..BASE, 1..12).prop_map(|mut digits| {
            if let Some(last) = digits.last_mut() {
                if *last == 0 {
                    *last = 1;
                }
            }
            digits.into_iter().map(|d| DIGITS[d] as char).collect()
        })
    }

    proptest! {
        #[test]
        fn next_chain_strictly_increases(steps in 1usize..300) {
            let mut key = min();
            for _ in 0..steps {
                let following = next(&key);
                prop_assert!(following > key);
                prop_assert!(is_valid_key(&following));
                key = following;
            }
        }

        #[test]
        fn between_lies_strictly_inside(a in key_strategy(), b in key_strategy()) {
            prop_assume!(a != b);
            let (lower, upper) = if a < b { (a, b) } else { (b, a) };
            match between(&lower, &upper) {
                Between::Key(key) => {
                    prop_assert!(lower < key && key < upper);
                    prop_assert!(is_valid_key(&key));
                }
                Between::RebalanceRequired => prop_assert!(false, "room expected between {} and {}", lower, upper),
            }
        }

        #[test]
        fn between_open_ends_stay_on_the_right_side(a in key_strategy()) {
            if let Between::Key(key) = between("", &a) {
                prop_assert!(key < a);
            }
            if let Between::Key(key) = between(&a, "") {
                prop_assert!(key > a);
            }
        }
    }
}
