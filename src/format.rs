//! Text formatting for story cards and the page header.
//!
//! Everything here is pure: callers pass in the reference time and the random
//! source so renders can be reproduced in tests.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use scraper::Html;

/// Number of words shown on a front-page card before the body is cut.
pub const DEFAULT_WORD_LIMIT: usize = 100;

/// Highest page number used for "Continued on Page A{n}".
pub const MAX_CONTINUED_PAGE: u8 = 30;

/// Body used for articles that arrive without any text.
pub const PLACEHOLDER_BODY: &str = "Lorem ipsum dolor sit amet, ei mel cibo meliore instructior, \
    eam te etiam clita. Id falli facilis intellegam his, eu populo dolorem offendit eam. \
    Noster nemore luptatum ex sit. Ei sea melius definitiones.";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Human-friendly age of a timestamp relative to `now`.
pub fn relative_time(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(timestamp) = timestamp else {
        return "some time ago".to_string();
    };

    let delta = (now - timestamp).num_seconds();
    if delta < MINUTE {
        "< 1 min ago".to_string()
    } else if delta < HOUR {
        format!("{} min ago", delta / MINUTE)
    } else if delta < DAY {
        format!("{} hrs ago", delta / HOUR)
    } else if delta < 2 * DAY {
        "yesterday".to_string()
    } else if delta < 3 * DAY {
        "2 days ago".to_string()
    } else {
        timestamp.format("%-m/%-d/%Y").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    pub text: String,
    /// Set when words were dropped; the card then gets a "Continued on Page" line.
    pub truncated: bool,
}

pub fn truncate_body(text: &str, limit: usize) -> Truncated {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > limit {
        Truncated {
            text: format!("{} ...", words[..limit].join(" ")),
            truncated: true,
        }
    } else {
        Truncated {
            text: words.join(" "),
            truncated: false,
        }
    }
}

/// Page number for the "Continued on Page A{n}" footer. Drawn fresh on every render.
pub fn continued_page<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=MAX_CONTINUED_PAGE)
}

/// Convert HTML-encoded text to plain text, the way `textContent` would.
///
/// Named and numeric entities are decoded and any markup is dropped.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') && !raw.contains('<') {
        return raw.to_string();
    }

    let fragment = Html::parse_fragment(raw);
    fragment.root_element().text().collect()
}

/// Split rendered post content into plain-text paragraphs.
pub fn split_paragraphs(html: &str) -> Vec<String> {
    html.split("</p>")
        .map(|para| decode_entities(para).trim().to_string())
        .filter(|para| !para.is_empty())
        .collect()
}

/// Byline text: "A", "A and B", "A, B and C".
pub fn format_authors(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

/// Date shown in the header bar, e.g. "Sunday, October 18, 2026".
pub fn format_header_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn words(n: usize) -> String {
        (1..=n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    mod relative_time_tests {
        use super::*;

        #[test]
        fn test_missing_timestamp() {
            assert_eq!(relative_time(None, reference_now()), "some time ago");
        }

        #[test]
        fn test_just_now() {
            let now = reference_now();
            assert_eq!(relative_time(Some(now), now), "< 1 min ago");
            assert_eq!(
                relative_time(Some(now - Duration::seconds(59)), now),
                "< 1 min ago"
            );
        }

        #[test]
        fn test_future_timestamp_counts_as_just_now() {
            let now = reference_now();
            assert_eq!(
                relative_time(Some(now + Duration::minutes(10)), now),
                "< 1 min ago"
            );
        }

        #[test]
        fn test_minutes_are_floored() {
            let now = reference_now();
            assert_eq!(relative_time(Some(now - Duration::seconds(60)), now), "1 min ago");
            assert_eq!(
                relative_time(Some(now - Duration::seconds(119)), now),
                "1 min ago"
            );
            assert_eq!(
                relative_time(Some(now - Duration::seconds(3599)), now),
                "59 min ago"
            );
        }

        #[test]
        fn test_hours() {
            let now = reference_now();
            assert_eq!(relative_time(Some(now - Duration::seconds(7200)), now), "2 hrs ago");
            assert_eq!(relative_time(Some(now - Duration::seconds(3600)), now), "1 hrs ago");
            assert_eq!(
                relative_time(Some(now - Duration::seconds(86399)), now),
                "23 hrs ago"
            );
        }

        #[test]
        fn test_days() {
            let now = reference_now();
            assert_eq!(relative_time(Some(now - Duration::hours(24)), now), "yesterday");
            assert_eq!(relative_time(Some(now - Duration::hours(47)), now), "yesterday");
            assert_eq!(relative_time(Some(now - Duration::hours(48)), now), "2 days ago");
            assert_eq!(relative_time(Some(now - Duration::hours(71)), now), "2 days ago");
        }

        #[test]
        fn test_older_dates_use_locale_format() {
            let now = reference_now();
            assert_eq!(relative_time(Some(now - Duration::days(3)), now), "3/12/2024");
            let old = Utc.with_ymd_and_hms(2023, 11, 5, 8, 30, 0).unwrap();
            assert_eq!(relative_time(Some(old), now), "11/5/2023");
        }
    }

    mod truncate_body_tests {
        use super::*;

        #[test]
        fn test_long_body_is_cut_at_limit() {
            let result = truncate_body(&words(150), DEFAULT_WORD_LIMIT);

            assert!(result.truncated);
            assert_eq!(result.text, format!("{} ...", words(100)));
            assert_eq!(result.text.split_whitespace().count(), 101);
        }

        #[test]
        fn test_short_body_is_kept() {
            let result = truncate_body(&words(50), DEFAULT_WORD_LIMIT);

            assert!(!result.truncated);
            assert_eq!(result.text, words(50));
        }

        #[test]
        fn test_exactly_at_limit_is_not_truncated() {
            let result = truncate_body(&words(100), DEFAULT_WORD_LIMIT);
            assert!(!result.truncated);
        }

        #[test]
        fn test_splits_on_any_whitespace() {
            let result = truncate_body("one\ntwo\t three   four", 3);
            assert!(result.truncated);
            assert_eq!(result.text, "one two three ...");
        }

        #[test]
        fn test_empty_body() {
            let result = truncate_body("", DEFAULT_WORD_LIMIT);
            assert_eq!(result.text, "");
            assert!(!result.truncated);
        }
    }

    mod continued_page_tests {
        use super::*;

        #[test]
        fn test_page_is_in_range() {
            let mut rng = StdRng::seed_from_u64(7);
            for _ in 0..500 {
                let page = continued_page(&mut rng);
                assert!((1..=MAX_CONTINUED_PAGE).contains(&page));
            }
        }
    }

    mod decode_entities_tests {
        use super::*;

        #[test]
        fn test_plain_text_passes_through() {
            assert_eq!(decode_entities("Nothing to see"), "Nothing to see");
        }

        #[test]
        fn test_named_entities() {
            assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
            assert_eq!(decode_entities("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
            assert_eq!(decode_entities("&quot;quoted&quot;"), "\"quoted\"");
        }

        #[test]
        fn test_numeric_entities() {
            assert_eq!(decode_entities("It&#8217;s"), "It\u{2019}s");
            assert_eq!(decode_entities("a &#x2014; b"), "a \u{2014} b");
        }

        #[test]
        fn test_markup_is_dropped() {
            assert_eq!(
                decode_entities("<p>Vanderbilt&#8217;s <em>new</em> dorm</p>"),
                "Vanderbilt\u{2019}s new dorm"
            );
        }
    }

    mod split_paragraphs_tests {
        use super::*;

        #[test]
        fn test_splits_and_decodes() {
            let html = "<p>First &amp; foremost.</p>\n<p>Second.</p>\n";
            assert_eq!(
                split_paragraphs(html),
                vec!["First & foremost.".to_string(), "Second.".to_string()]
            );
        }

        #[test]
        fn test_empty_content() {
            assert!(split_paragraphs("").is_empty());
        }
    }

    mod format_authors_tests {
        use super::*;

        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        #[test]
        fn test_single_author() {
            assert_eq!(format_authors(&names(&["A"])), "A");
        }

        #[test]
        fn test_two_authors() {
            assert_eq!(format_authors(&names(&["A", "B"])), "A and B");
        }

        #[test]
        fn test_three_authors() {
            assert_eq!(format_authors(&names(&["A", "B", "C"])), "A, B and C");
        }

        #[test]
        fn test_no_authors() {
            assert_eq!(format_authors(&[]), "");
        }
    }

    #[test]
    fn test_format_header_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(format_header_date(date), "Sunday, October 18, 2026");

        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(format_header_date(date), "Thursday, February 1, 2024");
    }
}
