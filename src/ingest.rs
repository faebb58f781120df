use crate::config::{IngestSettings, Settings};
use crate::database::VectorStore;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::files::discover_files;
use crate::persist::merge_and_persist;
use crate::prompt::Prompt;
use crate::splitter::{chunk_text, split_sentences};
use crate::vector_entry::{keys, Metadata, RecordId};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const INGEST_PROMPT: &str = "\nCmd> ";

#[derive(Debug, Default)]
pub struct IngestReport {
    pub record_ids: Vec<RecordId>,
    /// Documents that were extracted and embedded.
    pub documents: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Turns source text into embedded records appended to a [`VectorStore`].
pub struct IngestPipeline<'a> {
    store: &'a mut VectorStore,
    provider: &'a dyn EmbeddingProvider,
    settings: IngestSettings,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(store: &'a mut VectorStore, provider: &'a dyn EmbeddingProvider, settings: IngestSettings) -> Self {
        Self {
            store,
            provider,
            settings,
        }
    }

    /// Sentence-split `text` and append one record per sentence.
    ///
    /// Every record carries `source_metadata` plus a `line_number` counting the
    /// sentences of this call from zero.
    pub fn ingest_text(&mut self, text: &str, source_metadata: &Metadata) -> Result<Vec<RecordId>> {
        let mut ids = Vec::new();
        for (line_number, sentence) in split_sentences(text).into_iter().enumerate() {
            let metadata = source_metadata.clone().with(keys::LINE_NUMBER, line_number);
            ids.push(self.embed_and_add(sentence, metadata)?);
        }
        Ok(ids)
    }

    /// Read a UTF-8 file and ingest it sentence by sentence, tagged with its
    /// absolute path.
    pub fn ingest_file(&mut self, path: &Path) -> Result<Vec<RecordId>> {
        let content = fs::read_to_string(path).map_err(|e| Error::ExtractionFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let absolute = absolute_path(path);
        let metadata = Metadata::new().with(keys::SOURCE, absolute.to_string_lossy().into_owned());
        let ids = self.ingest_text(&content, &metadata)?;
        log::info!("Ingested {} sentences from '{}'", ids.len(), absolute.display());
        Ok(ids)
    }

    /// Ingest every matching file below `root_directory` in fixed-size chunks.
    ///
    /// A document that cannot be read or extracted is logged and skipped;
    /// embedding failures abort the whole run.
    pub fn ingest_documents<S: AsRef<str>>(&mut self, root_directory: &Path, extension_filters: &[S]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for path in discover_files(root_directory, extension_filters)? {
            let text = match Extractor::for_path(&path).extract(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Skipping '{}': {}", path.display(), e);
                    report.skipped.push((path, e.to_string()));
                    continue;
                }
            };

            let absolute = absolute_path(&path);
            let file_name = absolute
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let directory = absolute
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let base = Metadata::new()
                .with(keys::FILE_NAME, file_name.as_str())
                .with(keys::ABSOLUTE_DIRECTORY_PATH, directory)
                .with(keys::SOURCE, absolute.to_string_lossy().into_owned());

            let chunks = chunk_text(&text, self.settings.chunk_size, self.settings.chunk_overlap);
            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let metadata = base.clone().with(keys::CHUNK_INDEX, chunk_index);
                report.record_ids.push(self.embed_and_add(chunk, metadata)?);
            }
            report.documents += 1;
            log::info!("Ingested file: {}", file_name);
        }

        Ok(report)
    }

    fn embed_and_add(&mut self, text: String, metadata: Metadata) -> Result<RecordId> {
        let embedding = self.provider.embed(&text)?;
        self.store.add(embedding, text, metadata)
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Interactive ingest: each line names a file to ingest. On exit the
/// collected records are merged into the durable store.
///
/// A file only joins the session once all of its sentences are embedded; a
/// failure partway through leaves no records from that file behind.
pub fn run_ingest_session<R: BufRead, W: Write>(
    input: R,
    output: W,
    provider: &dyn EmbeddingProvider,
    settings: &Settings,
) -> anyhow::Result<VectorStore> {
    let mut store = VectorStore::new();
    let mut prompt = Prompt::new(input, output, INGEST_PROMPT, &settings.exit_sentinels);
    while let Some(filename) = prompt.next_line()? {
        writeln!(prompt.output(), "File to ingest: {}", filename)?;
        match ingest_one_file(&store, provider, settings, Path::new(&filename)) {
            Ok(merged) => store = merged,
            Err(e) => log::error!("Failed to ingest '{}': {}", filename, e),
        }
    }

    merge_and_persist(&store, &settings.store_path)?;
    Ok(store)
}

fn ingest_one_file(
    session: &VectorStore,
    provider: &dyn EmbeddingProvider,
    settings: &Settings,
    path: &Path,
) -> Result<VectorStore> {
    let mut scratch = VectorStore::new();
    IngestPipeline::new(&mut scratch, provider, settings.ingest.clone()).ingest_file(path)?;
    VectorStore::merge(session, &scratch)
}
