use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content_type::ContentType;
use crate::error::TypeError;
use crate::object::DigitalObject;

/// Date layout for `date` values: millisecond precision, no zone.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// The fifteen elements of the Dublin Core Metadata Element Set 1.1.
///
/// Declaration order is serialization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DublinCoreElement {
    Title,
    Creator,
    Subject,
    Description,
    Publisher,
    Contributor,
    Date,
    Type,
    Format,
    Identifier,
    Source,
    Language,
    Relation,
    Coverage,
    Rights,
}

impl DublinCoreElement {
    pub const ALL: [DublinCoreElement; 15] = [
        Self::Title,
        Self::Creator,
        Self::Subject,
        Self::Description,
        Self::Publisher,
        Self::Contributor,
        Self::Date,
        Self::Type,
        Self::Format,
        Self::Identifier,
        Self::Source,
        Self::Language,
        Self::Relation,
        Self::Coverage,
        Self::Rights,
    ];

    /// XML local name, e.g. `title`.
    pub const fn local_name(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Creator => "creator",
            Self::Subject => "subject",
            Self::Description => "description",
            Self::Publisher => "publisher",
            Self::Contributor => "contributor",
            Self::Date => "date",
            Self::Type => "type",
            Self::Format => "format",
            Self::Identifier => "identifier",
            Self::Source => "source",
            Self::Language => "language",
            Self::Relation => "relation",
            Self::Coverage => "coverage",
            Self::Rights => "rights",
        }
    }
}

impl fmt::Display for DublinCoreElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

impl FromStr for DublinCoreElement {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.local_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TypeError::UnknownElement(s.to_owned()))
    }
}

/// XML namespaces of the Dublin Core vocabularies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DublinCoreNamespace {
    /// Element set 1.1 (`dc`).
    Elements,
    /// DCMI type vocabulary (`dcmitype`).
    DcmiType,
    /// DCMI metadata terms (`dcterms`).
    Terms,
}

impl DublinCoreNamespace {
    pub const ALL: [DublinCoreNamespace; 3] = [Self::Elements, Self::DcmiType, Self::Terms];

    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Elements => "dc",
            Self::DcmiType => "dcmitype",
            Self::Terms => "dcterms",
        }
    }

    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Elements => "http://purl.org/dc/elements/1.1",
            Self::DcmiType => "http://purl.org/dc/dcmitype",
            Self::Terms => "http://purl.org/dc/terms",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.prefix() == prefix)
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.uri() == uri)
    }
}

/// A Dublin Core record.
///
/// Every element holds zero or more values, kept in insertion order. A
/// record always carries at least the identifier it was created with;
/// recommended practice is the repository identifier of the object it
/// describes.
///
/// [`to_xml`](Self::to_xml) renders the record as a `dc` document in element
/// order, and [`DigitalObject::from`] wraps that document as a
/// [`ContentType::DublinCoreMetadata`] object ready to store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DublinCore {
    values: BTreeMap<DublinCoreElement, Vec<String>>,
}

impl DublinCore {
    pub fn new(identifier: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(DublinCoreElement::Identifier, vec![identifier.into()]);
        Self { values }
    }

    /// Build a record from prepared element values.
    ///
    /// `date` values must match [`DATE_FORMAT`]. Any identifier values in
    /// `elements` are replaced by `identifier`.
    pub fn with_values<I>(identifier: impl Into<String>, elements: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (DublinCoreElement, Vec<String>)>,
    {
        let mut record = Self::new(identifier);
        for (element, values) in elements {
            if element == DublinCoreElement::Identifier {
                continue;
            }
            for value in values {
                if element == DublinCoreElement::Date {
                    record.put(element, normalize_date(&value)?);
                } else {
                    record.put(element, value);
                }
            }
        }
        Ok(record)
    }

    /// Append a value to `element`.
    pub fn put(&mut self, element: DublinCoreElement, value: impl Into<String>) -> &mut Self {
        self.values.entry(element).or_default().push(value.into());
        self
    }

    pub fn put_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.put(DublinCoreElement::Title, title)
    }

    pub fn put_creator(&mut self, creator: impl Into<String>) -> &mut Self {
        self.put(DublinCoreElement::Creator, creator)
    }

    pub fn put_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.put(DublinCoreElement::Subject, subject)
    }

    pub fn put_type(&mut self, kind: impl Into<String>) -> &mut Self {
        self.put(DublinCoreElement::Type, kind)
    }

    pub fn put_date(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.put(DublinCoreElement::Date, date.format(DATE_FORMAT).to_string())
    }

    /// Values of `element`, oldest first.
    pub fn values(&self, element: DublinCoreElement) -> &[String] {
        self.values.get(&element).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of elements with at least one value.
    pub fn element_count(&self) -> usize {
        self.values.values().filter(|v| !v.is_empty()).count()
    }

    pub fn to_xml(&self) -> String {
        let ns = DublinCoreNamespace::Elements;
        let mut xml = format!(
            "<?xml version=\"1.0\" ?><dc xmlns:{}=\"{}\">",
            ns.prefix(),
            ns.uri()
        );
        for (element, values) in &self.values {
            for value in values {
                let name = element.local_name();
                xml.push_str(&format!("<{0}:{name}>", ns.prefix()));
                escape_into(&mut xml, value);
                xml.push_str(&format!("</{0}:{name}>", ns.prefix()));
            }
        }
        xml.push_str("</dc>");
        xml
    }
}

impl From<&DublinCore> for DigitalObject {
    fn from(record: &DublinCore) -> Self {
        DigitalObject::new(record.to_xml(), ContentType::DublinCoreMetadata)
    }
}

impl From<DublinCore> for DigitalObject {
    fn from(record: DublinCore) -> Self {
        Self::from(&record)
    }
}

fn normalize_date(value: &str) -> Result<String, TypeError> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|e| TypeError::InvalidDate {
            value: value.to_owned(),
            reason: e.to_string(),
        })
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
