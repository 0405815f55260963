use std::time::Duration;

/// Parses a duration string into a number of milliseconds.
///
/// The string is a sequence of `<digits><unit>` pairs, where unit is one of `ms`, `s`,
/// `m`, `h` or `d`. For example `1m30s` or `500ms`.
///
/// Returns `None` if the string is malformed or the value overflows.
///
/// # Examples
///
/// ```
/// use extcat_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1m30s"), Some(90_000));
/// assert_eq!(parse_duration("500ms"), Some(500));
/// ```
pub fn parse_duration(input: &str) -> Option<u128> {
    let mut total: u128 = 0;
    let mut chars = input.trim().chars().peekable();

    while chars.peek().is_some() {
        let mut number_str = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                number_str.push(chars.next()?);
            } else {
                break;
            }
        }

        if number_str.is_empty() {
            return None;
        }

        let number: u128 = number_str.parse().ok()?;
        let multiplier = match chars.next()? {
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                1
            }
            's' => 1000,
            'm' => 60 * 1000,
            'h' => 60 * 60 * 1000,
            'd' => 24 * 60 * 60 * 1000,
            _ => return None,
        };

        total = total.checked_add(number.checked_mul(multiplier)?)?;
    }

    Some(total)
}

/// Like [`parse_duration`], but returns a [`Duration`].
pub fn parse_std_duration(input: &str) -> Option<Duration> {
    let millis = parse_duration(input)?;
    u64::try_from(millis).ok().map(Duration::from_millis)
}
