/// Parses a goal-minute string such as `"12;45;88"` or `"12,45"`.
///
/// Separators `;` and `,` are interchangeable. Tokens that are not a non-negative number are
/// skipped; decimal tokens (`"45.0"`) are truncated to whole minutes.
pub fn parse_goal_minutes(raw: Option<&str>) -> Vec<u16> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split([';', ','])
        .filter_map(parse_minute_token)
        .collect()
}

/// Parses several goal-minute strings and returns every minute, in input order.
pub fn parse_goal_minutes_batch<'a, I>(raws: I) -> Vec<u16>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    raws.into_iter().flat_map(parse_goal_minutes).collect()
}

/// Formats minutes back into the `;`-separated form used by the stores.
pub fn format_goal_minutes(minutes: &[u16]) -> String {
    minutes
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_minute_token(token: &str) -> Option<u16> {
    let s = token.trim();
    if s.is_empty() {
        return None;
    }
    let mut dots = 0usize;
    for ch in s.chars() {
        match ch {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return None,
        }
    }
    if dots > 1 || s == "." {
        return None;
    }
    let whole = s.split('.').next().unwrap_or_default();
    if whole.is_empty() {
        // ".5" style tokens carry no whole minute.
        return Some(0);
    }
    whole.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_separators() {
        assert_eq!(parse_goal_minutes(Some("23;45")), vec![23, 45]);
        assert_eq!(parse_goal_minutes(Some("23,45")), vec![23, 45]);
        assert_eq!(parse_goal_minutes(Some("5;17,90")), vec![5, 17, 90]);
    }

    #[test]
    fn empty_and_missing_are_empty() {
        assert!(parse_goal_minutes(Some("")).is_empty());
        assert!(parse_goal_minutes(Some(";")).is_empty());
        assert!(parse_goal_minutes(None).is_empty());
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        assert_eq!(parse_goal_minutes(Some("12,, 30")), vec![12, 30]);
        assert_eq!(parse_goal_minutes(Some("12;x;45+2;-3;60")), vec![12, 60]);
        assert_eq!(parse_goal_minutes(Some("1.2.3;7")), vec![7]);
    }

    #[test]
    fn decimal_tokens_truncate() {
        assert_eq!(parse_goal_minutes(Some("45.0;88.7")), vec![45, 88]);
    }

    #[test]
    fn batch_flattens_in_order() {
        let out = parse_goal_minutes_batch([Some("10;20"), None, Some("5"), Some("")]);
        assert_eq!(out, vec![10, 20, 5]);
    }

    #[test]
    fn format_round_trips() {
        let minutes = vec![3, 41, 90];
        assert_eq!(parse_goal_minutes(Some(&format_goal_minutes(&minutes))), minutes);
    }
}
