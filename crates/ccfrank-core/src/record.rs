use std::collections::HashMap;
use std::fmt;

/// Item type tag of a bibliographic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    ConferencePaper,
    JournalArticle,
    Other,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::ConferencePaper => f.write_str("conference paper"),
            ItemType::JournalArticle => f.write_str("journal article"),
            ItemType::Other => f.write_str("other"),
        }
    }
}

/// Text fields the venue extractor reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ProceedingsTitle,
    PublicationTitle,
    ConferenceName,
    Title,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ProceedingsTitle => "proceedingsTitle",
            Field::PublicationTitle => "publicationTitle",
            Field::ConferenceName => "conferenceName",
            Field::Title => "title",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read access to a bibliographic record.
///
/// Only the type tag and a handful of text fields are needed. A missing
/// field is `None`; implementations may also return empty strings, which
/// callers treat the same way.
pub trait BibRecord {
    fn item_type(&self) -> ItemType;
    fn field(&self, field: Field) -> Option<String>;
}

/// In-memory record, handy for hosts that already hold plain field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub item_type: ItemType,
    pub fields: HashMap<Field, String>,
}

impl Record {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }
}

impl BibRecord for Record {
    fn item_type(&self) -> ItemType {
        self.item_type
    }

    fn field(&self, field: Field) -> Option<String> {
        self.fields.get(&field).cloned()
    }
}

impl<T: BibRecord + ?Sized> BibRecord for &T {
    fn item_type(&self) -> ItemType {
        (**self).item_type()
    }

    fn field(&self, field: Field) -> Option<String> {
        (**self).field(field)
    }
}
