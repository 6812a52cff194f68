//! Display formatting and normalization helpers shared by the tool adapters.
//! Pure functions; no I/O.

use regex::Regex;

/// Compact human form of a count: 1234 -> "1.2K", 1234567 -> "1.2M".
pub fn format_count(value: u64) -> String {
    const UNITS: &[(u64, &str)] = &[(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (scale, suffix) in UNITS {
        if value >= *scale {
            let scaled = value as f64 / *scale as f64;
            let rendered = format!("{:.1}", scaled);
            let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
            return format!("{}{}", rendered, suffix);
        }
    }
    value.to_string()
}

/// "h:mm:ss" for durations an hour or longer, "m:ss" otherwise.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

/// Total seconds from an ISO-8601 "PT#H#M#S" duration. Absent groups count
/// as zero; anything unrecognized normalizes to 0.
pub fn parse_iso8601_duration(raw: &str) -> u64 {
    let re = Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").unwrap();
    let Some(caps) = re.captures(raw) else {
        return 0;
    };
    let group = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    group(1) * 3600 + group(2) * 60 + group(3)
}

/// ISO timestamp -> 8-digit "YYYYMMDD".
pub fn format_upload_date(iso: &str) -> String {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(iso) {
        return parsed.format("%Y%m%d").to_string();
    }
    iso.chars().filter(|c| c.is_ascii_digit()).take(8).collect()
}

/// "[m:ss]" marker for a transcript timestamp.
pub fn timestamp_tag(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("[{}:{:02}]", total / 60, total % 60)
}

/// Parse a view count out of whatever form the upstream hands back:
/// "123456", "1,234 views", or an abbreviated "1.2M".
pub fn parse_view_count(raw: &str) -> u64 {
    let trimmed = raw.trim();
    let mut numeric = String::new();
    let mut rest = "";
    for (i, c) in trimmed.char_indices() {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            numeric.push(c);
        } else {
            rest = &trimmed[i..];
            break;
        }
    }
    if numeric.is_empty() {
        return 0;
    }
    let multiplier = match rest.trim_start().chars().next() {
        Some('K') | Some('k') => 1_000.0,
        Some('M') | Some('m') => 1_000_000.0,
        Some('B') | Some('b') => 1_000_000_000.0,
        _ => 1.0,
    };
    let value: f64 = numeric.replace(',', "").parse().unwrap_or(0.0);
    (value * multiplier) as u64
}

/// Strip clickbait markers from a title: bracketed all-caps annotations
/// ("(OFFICIAL VIDEO)", "[4K]") and runs of repeated punctuation.
pub fn clean_title(raw: &str) -> String {
    let bracketed = Regex::new(r"[\[(][^\[\]()]*[\])]").unwrap();
    let cleaned = bracketed.replace_all(raw, |caps: &regex::Captures<'_>| {
        let segment = &caps[0];
        if segment.chars().any(|c| c.is_lowercase()) {
            segment.to_string()
        } else {
            String::new()
        }
    });
    let cleaned = Regex::new(r"([!?]){2,}").unwrap().replace_all(&cleaned, "$1");
    Regex::new(r"\s{2,}")
        .unwrap()
        .replace_all(cleaned.trim(), " ")
        .to_string()
}

/// Drop hashtag runs and collapse excess blank lines in a description.
pub fn clean_description(raw: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut blank_run = 0;
    for line in raw.lines() {
        let trimmed = line.trim();
        let words = trimmed.split_whitespace().count();
        let hashtags = trimmed
            .split_whitespace()
            .filter(|w| w.starts_with('#'))
            .count();
        if hashtags >= 3 || (words > 0 && hashtags == words) {
            continue;
        }
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        kept.push(line);
    }
    kept.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_formatting() {
        assert_eq!(format_count(532), "532");
        assert_eq!(format_count(1_234), "1.2K");
        assert_eq!(format_count(1_000_000), "1M");
        assert_eq!(format_count(1_234_567), "1.2M");
        assert_eq!(format_count(2_500_000_000), "2.5B");
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(45), "0:45");
        assert_eq!(format_duration(125), "2:05");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(832), "832 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(12 * 1024 * 1024), "12.0 MB");
    }

    #[test]
    fn iso_duration_normalization() {
        assert_eq!(parse_iso8601_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_iso8601_duration("PT45S"), 45);
        assert_eq!(parse_iso8601_duration("PT4M"), 240);
        assert_eq!(parse_iso8601_duration("garbage"), 0);
        assert_eq!(parse_iso8601_duration(""), 0);
    }

    #[test]
    fn upload_date_normalization() {
        assert_eq!(format_upload_date("2021-06-15T10:00:00Z"), "20210615");
        assert_eq!(format_upload_date("2021-06-15"), "20210615");
    }

    #[test]
    fn timestamp_tags() {
        assert_eq!(timestamp_tag(0.0), "[0:00]");
        assert_eq!(timestamp_tag(65.4), "[1:05]");
        assert_eq!(timestamp_tag(600.0), "[10:00]");
    }

    #[test]
    fn view_count_parsing() {
        assert_eq!(parse_view_count("123456"), 123_456);
        assert_eq!(parse_view_count("1,234 views"), 1_234);
        assert_eq!(parse_view_count("1.2M"), 1_200_000);
        assert_eq!(parse_view_count("3.4k views"), 3_400);
        assert_eq!(parse_view_count("no digits"), 0);
    }

    #[test]
    fn title_cleaning() {
        assert_eq!(
            clean_title("Cool Song (OFFICIAL VIDEO) [4K]!!!"),
            "Cool Song !"
        );
        assert_eq!(
            clean_title("Interview (feat. Someone)"),
            "Interview (feat. Someone)"
        );
    }

    #[test]
    fn description_cleaning() {
        let raw = "Real first line\n\n\n\nSecond line\n#tag1 #tag2 #tag3 #tag4\nlast";
        let cleaned = clean_description(raw);
        assert!(cleaned.contains("Real first line"));
        assert!(cleaned.contains("Second line"));
        assert!(!cleaned.contains("#tag1"));
        assert!(!cleaned.contains("\n\n\n"));
    }
}
