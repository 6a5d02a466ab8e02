use once_cell::sync::Lazy;
use regex::Regex;

/// `proceedings of [the] 2024 [on ]`
static PROCEEDINGS_YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^proceedings of (?:the )?[0-9]{4} (?:on )?").unwrap());

/// `proceedings of [the] `
static PROCEEDINGS_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^proceedings of (?:the )?").unwrap());

/// `proc. of [the] `
static PROC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^proc\. of (?:the )?").unwrap());

/// `icml'24: ` (straight or typographic apostrophe)
static QUOTED_YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+['\u{2019}][0-9]{2,4}:\s*").unwrap());

static LEADING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}\s+").unwrap());

static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[0-9]{4}$").unwrap());

static TRAILING_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^()]*\)$").unwrap());

/// Normalize a venue name for lookup.
///
/// Steps (order matters, each applies only if its pattern matches):
/// 1. Trim and lowercase
/// 2. Strip `proceedings of [the] <year> [on ]`
/// 3. Otherwise strip `proceedings of [the] `
/// 4. Strip `proc. of [the] `
/// 5. Strip a quoted-year short code such as `icml'24: `
/// 6. Strip a leading 4-digit year
/// 7. Strip a trailing 4-digit year
/// 8. Strip a trailing parenthesized group, e.g. `(icml)`
/// 9. Trim
///
/// The pass is repeated until the output no longer changes, so that
/// `normalize(normalize(s)) == normalize(s)` holds even for inputs that
/// stack noise (`"... (SP) 2023"`, `"ICML'24: Proceedings of the ..."`).
/// Every pass after the first either leaves the string alone or shortens it.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(raw: &str) -> String {
    let s = raw.trim().to_lowercase();

    let s = match strip(&PROCEEDINGS_YEAR_PREFIX, &s) {
        Some(stripped) => stripped,
        None => strip(&PROCEEDINGS_PREFIX, &s).unwrap_or(s),
    };

    let s = [
        &*PROC_PREFIX,
        &*QUOTED_YEAR_PREFIX,
        &*LEADING_YEAR,
        &*TRAILING_YEAR,
        &*TRAILING_PARENS,
    ]
    .into_iter()
    .fold(s, |acc, re| strip(re, &acc).unwrap_or(acc));

    s.trim().to_string()
}

/// Remove the first match of `re`, or `None` when it does not match.
fn strip(re: &Regex, s: &str) -> Option<String> {
    let m = re.find(s)?;
    let mut out = String::with_capacity(s.len() - m.len());
    out.push_str(&s[..m.start()]);
    out.push_str(&s[m.end()..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_lowercase() {
        assert_eq!(normalize("  ICSE  "), "icse");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t "), "");
    }

    #[test]
    fn test_proceedings_year_prefix() {
        assert_eq!(
            normalize("Proceedings of the 2024 IEEE/CVF Conference on Computer Vision and Pattern Recognition"),
            "ieee/cvf conference on computer vision and pattern recognition"
        );
    }

    #[test]
    fn test_proceedings_year_on_prefix() {
        assert_eq!(
            normalize("Proceedings of the 2022 on ACM SIGSAC Conference on Computer and Communications Security"),
            "acm sigsac conference on computer and communications security"
        );
    }

    #[test]
    fn test_proceedings_prefix_without_year() {
        assert_eq!(
            normalize("Proceedings of the AAAI Conference on Artificial Intelligence"),
            "aaai conference on artificial intelligence"
        );
        assert_eq!(
            normalize("Proceedings of International Conference on Machine Learning"),
            "international conference on machine learning"
        );
    }

    #[test]
    fn test_proc_prefix() {
        assert_eq!(
            normalize("Proc. of the ACM on Programming Languages"),
            "acm on programming languages"
        );
    }

    #[test]
    fn test_quoted_year_prefix() {
        assert_eq!(normalize("ICML'24: Machine Learning"), "machine learning");
        assert_eq!(normalize("CHI\u{2019}23: Human Factors"), "human factors");
    }

    #[test]
    fn test_quoted_year_prefix_then_proceedings() {
        assert_eq!(normalize("AAAI'23: Proceedings of..."), "proceedings of...");
        assert_eq!(
            normalize("CCS '23: Proceedings of the 2023 ACM SIGSAC Conference on Computer and Communications Security"),
            "ccs '23: proceedings of the 2023 acm sigsac conference on computer and communications security"
        );
    }

    #[test]
    fn test_leading_year() {
        assert_eq!(normalize("2023 IEEE Symposium on Security and Privacy"), "ieee symposium on security and privacy");
    }

    #[test]
    fn test_trailing_year() {
        assert_eq!(normalize("CVPR 2024"), "cvpr");
        assert_eq!(normalize("NeurIPS2023"), "neurips");
    }

    #[test]
    fn test_trailing_parenthesized_group() {
        assert_eq!(
            normalize("International Conference on Machine Learning (ICML)"),
            "international conference on machine learning"
        );
    }

    #[test]
    fn test_parenthesized_group_not_at_end_is_kept() {
        assert_eq!(
            normalize("Symposium (Extended) on Something"),
            "symposium (extended) on something"
        );
    }

    #[test]
    fn test_year_and_parens_combined() {
        assert_eq!(
            normalize("2021 IEEE/CVF International Conference on Computer Vision (ICCV)"),
            "ieee/cvf international conference on computer vision"
        );
    }

    #[test]
    fn test_short_numbers_are_not_years() {
        assert_eq!(normalize("Web 3.0"), "web 3.0");
        assert_eq!(normalize("ABC 123"), "abc 123");
    }

    #[test]
    fn test_stacked_noise_reaches_fixed_point() {
        assert_eq!(normalize("IEEE Symposium on Security and Privacy (SP) 2023"), "ieee symposium on security and privacy");
        assert_eq!(normalize("Foo Conference (Short) (FC)"), "foo conference");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "Proceedings of the 2024 IEEE/CVF Conference on Computer Vision and Pattern Recognition",
            "CVPR 2024",
            "AAAI'23: Proceedings of...",
            "ICML'24: Proceedings of the 41st International Conference on Machine Learning",
            "2021 IEEE/CVF International Conference on Computer Vision (ICCV)",
            "IEEE Symposium on Security and Privacy (SP) 2023",
            "Proceedings of the Proceedings of the 2020 on Workshop (W) 1999",
            "2024",
            "(ICML)",
            "",
            "   ",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
