//! Pure functions computing the URL of every CouchDB resource this crate talks to.
//!
//! Handles call these with all constituent parts at once whenever one of them
//! changes, so a path never reflects a half-applied update.

/// Strips exactly one trailing slash from a server url.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url
        .strip_suffix('/')
        .unwrap_or(base_url)
        .to_string()
}

/// Percent-encodes a document id so it fits in a single path segment.
pub fn encode_document_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

pub fn server_path(base_url: &str) -> String {
    format!("{}/", base_url)
}

pub fn server_endpoint_path(base_url: &str, endpoint: &str) -> String {
    format!("{}/{}", base_url, endpoint)
}

pub fn database_path(base_url: &str, database: &str) -> String {
    format!("{}/{}/", base_url, database)
}

pub fn all_documents_path(base_url: &str, database: &str) -> String {
    format!("{}_all_docs", database_path(base_url, database))
}

/// `encoded_id` must already be percent-encoded, see [`encode_document_id`].
pub fn document_path(base_url: &str, database: &str, encoded_id: &str) -> String {
    format!("{}/{}/{}", base_url, database, encoded_id)
}

pub fn view_path(document_path: &str, view: &str) -> String {
    format!("{}/_view/{}", document_path, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_base_url_strips_exactly_one_trailing_slash() {
        assert_eq!(normalize_base_url("http://h/"), "http://h");
        assert_eq!(normalize_base_url("http://h"), "http://h");
        assert_eq!(normalize_base_url("http://h//"), "http://h/");
    }

    #[test]
    fn database_path_appends_name_and_slash() {
        assert_eq!(database_path("http://h", "d"), "http://h/d/");
        assert_eq!(all_documents_path("http://h", "d"), "http://h/d/_all_docs");
    }

    #[test]
    fn document_ids_are_encoded_as_one_segment() {
        let id = encode_document_id("_design/app");
        assert_eq!(id, "_design%2Fapp");
        assert_eq!(document_path("http://h", "d", &id), "http://h/d/_design%2Fapp");
    }

    #[test]
    fn view_path_hangs_off_the_document() {
        let document = document_path("http://h", "d", "_design%2Fapp");
        assert_eq!(
            view_path(&document, "by_name"),
            "http://h/d/_design%2Fapp/_view/by_name"
        );
    }
}
