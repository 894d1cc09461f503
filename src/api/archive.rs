use serde::Deserialize;
use serde_json::Value;

use crate::models::ArchiveMatch;

const EMBED_BASE: &str = "https://archive.org/embed";

/// Outcome of the optional full-movie lookup. Callers that only care about a
/// playable result use [`ArchiveLookup::into_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveLookup {
    Found(ArchiveMatch),
    NoMatch,
    Failed(String),
}

impl ArchiveLookup {
    pub fn into_match(self) -> Option<ArchiveMatch> {
        match self {
            ArchiveLookup::Found(m) => Some(m),
            ArchiveLookup::NoMatch | ArchiveLookup::Failed(_) => None,
        }
    }

    pub fn as_match(&self) -> Option<&ArchiveMatch> {
        match self {
            ArchiveLookup::Found(m) => Some(m),
            _ => None,
        }
    }
}

/// Boolean query for the advanced search index.
pub fn archive_query(title: &str, year: Option<i32>) -> String {
    let mut q = format!("title:(\"{}\") AND mediatype:(movies)", title.replace('"', ""));
    if let Some(y) = year {
        q.push_str(&format!(" AND year:({y})"));
    }
    q
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: String,
    #[serde(default)]
    title: Option<Value>,
}

/// Takes the first document of an advanced search response.
pub(crate) fn parse_search(body: &str) -> Result<Option<ArchiveMatch>, serde_json::Error> {
    let envelope: SearchEnvelope = serde_json::from_str(body)?;
    Ok(envelope.response.docs.into_iter().next().map(|doc| {
        // Titles occasionally come back as arrays.
        let title = match doc.title {
            Some(Value::String(s)) => s,
            Some(Value::Array(items)) => items
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        ArchiveMatch {
            embed_url: format!("{EMBED_BASE}/{}", doc.identifier),
            identifier: doc.identifier,
            title,
        }
    }))
}
