//! Reads scraped page records from a data directory.
//!
//! The scraper writes an `index.json` listing every page as
//! `{"id", "space_key"}` pairs, plus one `{space_key}/{id}.json` file per
//! page holding the content and metadata. The loader is deliberately
//! forgiving: a missing, oversized, or malformed page file is logged and
//! skipped, and a missing index yields an empty corpus. Scraped data being
//! partially broken must not keep the rest of the corpus from indexing.

use crate::document::Document;
use serde::Deserialize;
use std::path::Path;

const INDEX_FILE_NAME: &str = "index.json";

/// Page files larger than this are skipped as corrupt scraper output.
const MAX_PAGE_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct IndexRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    space_key: String,
}

#[derive(Debug, Deserialize)]
struct PageFile {
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: PageMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    space_name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
}

/// Load every readable page under `data_dir`.
///
/// Never fails: unreadable pages are skipped with a warning, and a data
/// directory without an `index.json` is treated as an empty corpus.
pub async fn load_documents(data_dir: &Path) -> Vec<Document> {
    let index_path = data_dir.join(INDEX_FILE_NAME);

    let index_raw = match tokio::fs::read_to_string(&index_path).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(
                path = %index_path.display(),
                error = %err,
                "index file not readable, treating corpus as empty"
            );
            return Vec::new();
        }
    };

    let records: Vec<IndexRecord> = match serde_json::from_str(&index_raw) {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(
                path = %index_path.display(),
                error = %err,
                "index file is not valid JSON, treating corpus as empty"
            );
            return Vec::new();
        }
    };

    let mut documents = Vec::with_capacity(records.len());
    for record in &records {
        if let Some(document) = load_page(data_dir, record).await {
            documents.push(document);
        }
    }

    tracing::info!(
        loaded = documents.len(),
        listed = records.len(),
        dir = %data_dir.display(),
        "loaded documents"
    );
    documents
}

async fn load_page(data_dir: &Path, record: &IndexRecord) -> Option<Document> {
    if record.id.is_empty() || record.space_key.is_empty() {
        tracing::warn!("index record missing id or space_key, skipping");
        return None;
    }

    let page_path = data_dir
        .join(&record.space_key)
        .join(format!("{}.json", record.id));

    let meta = match tokio::fs::metadata(&page_path).await {
        Ok(meta) => meta,
        Err(err) => {
            tracing::warn!(path = %page_path.display(), error = %err, "page file not found, skipping");
            return None;
        }
    };
    if meta.len() > MAX_PAGE_FILE_BYTES {
        tracing::warn!(
            path = %page_path.display(),
            bytes = meta.len(),
            "page file too large, skipping"
        );
        return None;
    }

    let raw = match tokio::fs::read_to_string(&page_path).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %page_path.display(), error = %err, "page file not readable, skipping");
            return None;
        }
    };
    let page: PageFile = match serde_json::from_str(&raw) {
        Ok(page) => page,
        Err(err) => {
            tracing::warn!(path = %page_path.display(), error = %err, "page file is not valid JSON, skipping");
            return None;
        }
    };

    Some(Document {
        id: record.id.clone(),
        space_key: record.space_key.clone(),
        space_name: page.metadata.space_name,
        title: page.metadata.title.unwrap_or_else(|| "Untitled".to_string()),
        content: page.content,
        url: page.metadata.url.unwrap_or_default(),
        last_updated: page.metadata.last_updated.unwrap_or_default(),
        author: page.metadata.author,
        labels: page.metadata.labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    async fn write_corpus(dir: &Path, index: serde_json::Value, pages: &[(&str, &str, serde_json::Value)]) {
        tokio::fs::write(dir.join("index.json"), index.to_string())
            .await
            .unwrap();
        for (space_key, id, body) in pages {
            let space_dir = dir.join(space_key);
            tokio::fs::create_dir_all(&space_dir).await.unwrap();
            tokio::fs::write(space_dir.join(format!("{id}.json")), body.to_string())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_loads_listed_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_corpus(
            temp_dir.path(),
            json!([
                {"id": "100", "space_key": "ENG"},
                {"id": "200", "space_key": "OPS"},
            ]),
            &[
                (
                    "ENG",
                    "100",
                    json!({
                        "content": "Deploying with Docker",
                        "metadata": {
                            "title": "Docker guide",
                            "url": "https://wiki.example.com/100",
                            "last_updated": "2024-03-01",
                            "space_name": "Engineering",
                            "author": "alice",
                            "labels": ["docker", "howto"]
                        }
                    }),
                ),
                ("OPS", "200", json!({"content": "Runbooks", "metadata": {}})),
            ],
        )
        .await;

        let documents = load_documents(temp_dir.path()).await;
        assert_eq!(documents.len(), 2);

        let first = &documents[0];
        assert_eq!(first.id, "100");
        assert_eq!(first.space_key, "ENG");
        assert_eq!(first.title, "Docker guide");
        assert_eq!(first.labels, vec!["docker", "howto"]);

        // Absent metadata fields fall back to defaults.
        let second = &documents[1];
        assert_eq!(second.title, "Untitled");
        assert!(second.url.is_empty());
        assert!(second.author.is_none());
    }

    #[tokio::test]
    async fn test_missing_index_means_empty_corpus() {
        let temp_dir = tempfile::tempdir().unwrap();
        let documents = load_documents(temp_dir.path()).await;
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_broken_entries_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_corpus(
            temp_dir.path(),
            json!([
                {"id": "1", "space_key": "ENG"},      // fine
                {"id": "2", "space_key": "ENG"},      // file missing
                {"id": "3", "space_key": "ENG"},      // malformed JSON
                {"id": "", "space_key": "ENG"},       // bad index record
            ]),
            &[("ENG", "1", json!({"content": "ok", "metadata": {"title": "Fine"}}))],
        )
        .await;
        tokio::fs::write(
            temp_dir.path().join("ENG").join("3.json"),
            "{not json at all",
        )
        .await
        .unwrap();

        let documents = load_documents(temp_dir.path()).await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "1");
    }

    #[tokio::test]
    async fn test_malformed_index_means_empty_corpus() {
        let temp_dir = tempfile::tempdir().unwrap();
        tokio::fs::write(temp_dir.path().join("index.json"), "][")
            .await
            .unwrap();
        let documents = load_documents(temp_dir.path()).await;
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_nonexistent_directory_means_empty_corpus() {
        let documents = load_documents(&PathBuf::from("/definitely/not/here")).await;
        assert!(documents.is_empty());
    }
}
