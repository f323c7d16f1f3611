//! Multi-field relevance index over notes and questions.
//!
//! Every entry carries its owner and kind, and both are mandatory clauses of
//! every query, so a search can only ever surface the caller's own records.
//! Query text is split into terms that are OR-matched across title, body and
//! tags and ranked by BM25.

use anyhow::Result;
use parking_lot::Mutex;
use tantivy::{
    collector::TopDocs,
    query::{BooleanQuery, Occur, Query, TermQuery},
    schema::{Field, IndexRecordOption, Schema, STORED, STRING, TEXT},
    Document, Index, IndexReader, IndexWriter, ReloadPolicy, Term,
};
use uuid::Uuid;

const WRITER_HEAP_BYTES: usize = 50_000_000;
// Matches the default tokenizer's long-token cutoff.
const MAX_TERM_BYTES: usize = 40;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    Note,
    Question,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Note => "note",
            SearchKind::Question => "question",
        }
    }
}

/// Text of one record as seen by the index.
pub struct SearchEntry<'a> {
    pub kind: SearchKind,
    pub title: &'a str,
    pub body: Vec<&'a str>,
    pub tags: &'a [String],
}

pub struct SearchIndex {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id: Field,
    owner: Field,
    kind: Field,
    title: Field,
    body: Field,
    tags: Field,
    #[cfg(test)]
    pub(crate) fail_writes: std::sync::atomic::AtomicBool,
}

impl SearchIndex {
    /// Create an empty in-memory index. The store rebuilds it from its
    /// records on open.
    pub fn new() -> Result<Self> {
        let mut schema_builder = Schema::builder();
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let owner = schema_builder.add_text_field("owner", STRING);
        let kind = schema_builder.add_text_field("kind", STRING);
        let title = schema_builder.add_text_field("title", TEXT);
        let body = schema_builder.add_text_field("body", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);
        let index = Index::create_in_ram(schema_builder.build());
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            reader,
            writer: Mutex::new(writer),
            id,
            owner,
            kind,
            title,
            body,
            tags,
            #[cfg(test)]
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        })
    }

    #[cfg(test)]
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("index writer failed");
        }
        Ok(())
    }

    fn document(&self, id: Uuid, owner: &str, entry: &SearchEntry<'_>) -> Document {
        let mut doc = Document::default();
        doc.add_text(self.id, id.to_string());
        doc.add_text(self.owner, owner);
        doc.add_text(self.kind, entry.kind.as_str());
        doc.add_text(self.title, entry.title);
        for part in &entry.body {
            doc.add_text(self.body, *part);
        }
        for tag in entry.tags {
            doc.add_text(self.tags, tag);
        }
        doc
    }

    /// Insert or replace the entry for `id` and make it visible to searches.
    pub fn upsert(&self, id: Uuid, owner: &str, entry: &SearchEntry<'_>) -> Result<()> {
        #[cfg(test)]
        self.check_writable()?;
        let doc = self.document(id, owner, entry);
        {
            let mut writer = self.writer.lock();
            writer.delete_term(Term::from_field_text(self.id, &id.to_string()));
            writer.add_document(doc)?;
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    pub fn remove(&self, id: Uuid) -> Result<()> {
        #[cfg(test)]
        self.check_writable()?;
        {
            let mut writer = self.writer.lock();
            writer.delete_term(Term::from_field_text(self.id, &id.to_string()));
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Drop every entry and index `entries` in a single commit.
    pub fn rebuild<'a>(
        &self,
        entries: impl IntoIterator<Item = (Uuid, &'a str, SearchEntry<'a>)>,
    ) -> Result<()> {
        {
            let mut writer = self.writer.lock();
            writer.delete_all_documents()?;
            for (id, owner, entry) in entries {
                writer.add_document(self.document(id, owner, &entry))?;
            }
            writer.commit()?;
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Ids of `owner`'s records of `kind` matching any term of `text`,
    /// best match first. Text without any searchable term matches nothing.
    pub fn search(
        &self,
        owner: &str,
        kind: SearchKind,
        text: &str,
        limit: usize,
    ) -> Result<Vec<Uuid>> {
        let terms = tokenize(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut any_field: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &terms {
            for field in [self.title, self.body, self.tags] {
                any_field.push((
                    Occur::Should,
                    Box::new(TermQuery::new(
                        Term::from_field_text(field, term),
                        IndexRecordOption::WithFreqs,
                    )),
                ));
            }
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.owner, owner),
                    IndexRecordOption::Basic,
                )),
            ),
            (
                Occur::Must,
                Box::new(TermQuery::new(
                    Term::from_field_text(self.kind, kind.as_str()),
                    IndexRecordOption::Basic,
                )),
            ),
            (Occur::Must, Box::new(BooleanQuery::new(any_field))),
        ];
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let hits = searcher.search(&query, &TopDocs::with_limit(limit.max(1)))?;
        Ok(hits
            .into_iter()
            .filter_map(|(_score, addr)| {
                let retrieved = searcher.doc(addr).ok()?;
                let field = retrieved.get_first(self.id)?;
                field.as_text().and_then(|s| Uuid::parse_str(s).ok())
            })
            .collect())
    }
}

/// Split like the default tokenizer: alphanumeric runs, lower-cased, with
/// over-long runs dropped.
fn tokenize(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && t.len() < MAX_TERM_BYTES)
        .map(str::to_lowercase)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}
