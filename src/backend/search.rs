//! Structured OpenKM search query and its query-string serialization.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::mcp::schema::{FieldKind, InputSchema};

/// Multi-field search accepted by `search/findPaginated`.
///
/// Every field is optional; absent fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Index of the first result.
    pub offset: Option<u64>,
    /// Maximum number of results.
    pub limit: Option<u64>,
    /// Full-text content filter.
    pub content: Option<String>,
    /// Document name filter.
    pub name: Option<String>,
    /// Search domain (documents, folders, mails).
    pub domain: Option<String>,
    /// Keywords, each sent as a repeated `keyword` parameter.
    pub keyword: Option<Vec<String>>,
    /// Category ids or paths.
    pub category: Option<Vec<String>>,
    /// Metadata properties as `name=value`.
    pub property: Option<Vec<String>>,
    /// Author user id.
    pub author: Option<String>,
    /// MIME type filter.
    pub mime_type: Option<String>,
    /// Lower modification date bound.
    pub last_modified_from: Option<String>,
    /// Upper modification date bound.
    pub last_modified_to: Option<String>,
    /// Mail subject filter.
    pub mail_subject: Option<String>,
    /// Mail sender filter.
    pub mail_from: Option<String>,
    /// Mail recipient filter.
    pub mail_to: Option<String>,
    /// Repository path to search under.
    pub path: Option<String>,
}

impl SearchQuery {
    /// Input shape of the `find-paginated` tool.
    #[must_use]
    pub fn input_schema() -> InputSchema {
        InputSchema::object()
            .optional("offset", FieldKind::NonNegativeInteger, "Index of the first result")
            .optional("limit", FieldKind::NonNegativeInteger, "Maximum number of results")
            .optional("content", FieldKind::String, "Full-text content filter")
            .optional("name", FieldKind::String, "Document name filter")
            .optional("domain", FieldKind::String, "Search domain")
            .optional("keyword", FieldKind::StringList, "Keywords")
            .optional("category", FieldKind::StringList, "Categories")
            .optional("property", FieldKind::StringList, "Metadata properties as name=value")
            .optional("author", FieldKind::String, "Author user id")
            .optional("mimeType", FieldKind::String, "MIME type filter")
            .optional("lastModifiedFrom", FieldKind::String, "Lower modification date bound")
            .optional("lastModifiedTo", FieldKind::String, "Upper modification date bound")
            .optional("mailSubject", FieldKind::String, "Mail subject filter")
            .optional("mailFrom", FieldKind::String, "Mail sender filter")
            .optional("mailTo", FieldKind::String, "Mail recipient filter")
            .optional("path", FieldKind::String, "Repository path to search under")
    }

    /// Query parameters in wire order, list fields repeated.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        push_one(&mut pairs, "offset", self.offset.map(|v| v.to_string()));
        push_one(&mut pairs, "limit", self.limit.map(|v| v.to_string()));
        push_one(&mut pairs, "content", self.content.clone());
        push_one(&mut pairs, "name", self.name.clone());
        push_one(&mut pairs, "domain", self.domain.clone());
        push_many(&mut pairs, "keyword", self.keyword.as_deref());
        push_many(&mut pairs, "category", self.category.as_deref());
        push_many(&mut pairs, "property", self.property.as_deref());
        push_one(&mut pairs, "author", self.author.clone());
        push_one(&mut pairs, "mimeType", self.mime_type.clone());
        push_one(&mut pairs, "lastModifiedFrom", self.last_modified_from.clone());
        push_one(&mut pairs, "lastModifiedTo", self.last_modified_to.clone());
        push_one(&mut pairs, "mailSubject", self.mail_subject.clone());
        push_one(&mut pairs, "mailFrom", self.mail_from.clone());
        push_one(&mut pairs, "mailTo", self.mail_to.clone());
        push_one(&mut pairs, "path", self.path.clone());

        pairs
    }
}

fn push_one(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(value) = value {
        pairs.push((key, value));
    }
}

fn push_many(pairs: &mut Vec<(&'static str, String)>, key: &'static str, values: Option<&[String]>) {
    for value in values.unwrap_or_default() {
        pairs.push((key, value.clone()));
    }
}

/// Append the serialized `query` to `base`, which is returned otherwise unchanged.
#[must_use]
pub fn build_search_url(base: &Url, query: &SearchQuery) -> Url {
    let mut url = base.clone();
    let pairs = query.query_pairs();
    if !pairs.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())));
    }
    url
}
