//! Pick the venue of a bibliographic record.
//!
//! Fields are tried in a type-dependent order and the first field whose
//! value *matches* wins; a non-empty field that matches nothing just moves
//! on to the next one.
//!
//! - conference paper: proceedings title, publication title, conference name
//! - journal article: publication title
//! - then, for every type: publication title, and finally a parenthesized
//!   short code in the title such as `(CVPR)` or `(AAAI'21)`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ReferenceEntry;
use crate::matching::{Matcher, VenueMatch};
use crate::record::{BibRecord, Field, ItemType};

/// `(CVPR)`, `(AAAI'21)`, `(ICML’24)`
static TITLE_VENUE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z]+(?:['\u{2019}][0-9]+)?)\)").unwrap());

static QUOTED_DIGITS_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"['\u{2019}][0-9]+$").unwrap());

const CONFERENCE_FIELDS: &[Field] = &[
    Field::ProceedingsTitle,
    Field::PublicationTitle,
    Field::ConferenceName,
];

const JOURNAL_FIELDS: &[Field] = &[Field::PublicationTitle];

/// A venue match and the record field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch<'a> {
    pub field: Field,
    /// The string handed to the matcher (for the title fallback this is the
    /// extracted short code, not the whole title).
    pub input: String,
    pub venue: VenueMatch<'a>,
}

/// The reference entry for `record`, if any field resolves to one.
pub fn find_venue<'a, R: BibRecord + ?Sized>(
    record: &R,
    matcher: &Matcher<'a>,
) -> Option<&'a ReferenceEntry> {
    explain_record(record, matcher).map(|m| m.venue.entry)
}

/// Like [`find_venue`], but reports which field matched and how.
pub fn explain_record<'a, R: BibRecord + ?Sized>(
    record: &R,
    matcher: &Matcher<'a>,
) -> Option<FieldMatch<'a>> {
    let primary: &[Field] = match record.item_type() {
        ItemType::ConferencePaper => CONFERENCE_FIELDS,
        ItemType::JournalArticle => JOURNAL_FIELDS,
        ItemType::Other => &[],
    };

    for &field in primary {
        if let Some(m) = try_field(record, field, matcher) {
            return Some(m);
        }
    }

    // Fallback, applied to every type. Skip the publication title when it
    // has already been tried: the matcher is pure, so the answer is the same.
    if !primary.contains(&Field::PublicationTitle)
        && let Some(m) = try_field(record, Field::PublicationTitle, matcher)
    {
        return Some(m);
    }

    let title = non_empty(record.field(Field::Title))?;
    let token = title_venue_token(&title)?;
    let venue = matcher.explain(&token)?;
    Some(FieldMatch {
        field: Field::Title,
        input: token,
        venue,
    })
}

/// Extract a venue short code from a paper title.
///
/// Finds the first parenthesized group of uppercase letters, optionally
/// followed by an apostrophe and digits, and drops the `'digits` suffix:
/// `"Some Paper Title (AAAI'21)"` yields `"AAAI"`.
pub fn title_venue_token(title: &str) -> Option<String> {
    let caps = TITLE_VENUE_TOKEN.captures(title)?;
    let token = caps.get(1)?.as_str();
    Some(QUOTED_DIGITS_SUFFIX.replace(token, "").into_owned())
}

fn try_field<'a, R: BibRecord + ?Sized>(
    record: &R,
    field: Field,
    matcher: &Matcher<'a>,
) -> Option<FieldMatch<'a>> {
    let value = non_empty(record.field(field))?;
    let venue = matcher.explain(&value)?;
    Some(FieldMatch {
        field,
        input: value,
        venue,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
