use crate::config::{Number, SearchSettings, Settings};
use crate::database::{SearchMatch, VectorStore};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::prompt::Prompt;
use crate::vector_entry::{keys, VectorRecord};
use std::io::{BufRead, Write};

pub const SEARCH_PROMPT: &str = "\nString> ";
const SEPARATOR: &str = "=========================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct SearchSession<'a> {
    store: &'a VectorStore,
    provider: &'a dyn EmbeddingProvider,
    settings: SearchSettings,
    format: OutputFormat,
}

impl<'a> SearchSession<'a> {
    pub fn new(
        store: &'a VectorStore,
        provider: &'a dyn EmbeddingProvider,
        settings: SearchSettings,
        format: OutputFormat,
    ) -> Self {
        Self {
            store,
            provider,
            settings,
            format,
        }
    }

    /// Embed `query`, search the store and render the matches to `out`.
    pub fn run_query<W: Write>(&self, query: &str, out: &mut W) -> Result<Vec<SearchMatch<'a>>> {
        let query_embedding = self.provider.embed(query)?;
        let matches = self.store.search(
            &query_embedding,
            self.settings.max_results,
            self.settings.min_score as Number,
        );
        log::debug!("Query {:?} matched {} records", query, matches.len());

        match self.format {
            OutputFormat::Text => self.render_text(&matches, out)?,
            OutputFormat::Json => self.render_json(query, &matches, out)?,
        }
        Ok(matches)
    }

    fn render_text<W: Write>(&self, matches: &[SearchMatch<'_>], out: &mut W) -> Result<()> {
        for m in matches {
            if self.settings.verbose {
                writeln!(out, "{}", m.record.text)?;
            }
            let identifiers = identifiers(m.record);
            if self.settings.verbose {
                writeln!(out, "[{}: {}]", identifiers, m.score)?;
            } else {
                writeln!(out, "[{}]", identifiers)?;
            }
            writeln!(out, "{}", SEPARATOR)?;
        }
        Ok(())
    }

    fn render_json<W: Write>(&self, query: &str, matches: &[SearchMatch<'_>], out: &mut W) -> Result<()> {
        let verbose = self.settings.verbose;
        let output = serde_json::json!({
            "query": query,
            "store_record_count": self.store.len(),
            "results": matches.iter().map(|m| {
                let mut result = serde_json::json!({
                    "id": m.record.id,
                    "metadata": m.record.metadata.to_json(),
                });
                if verbose {
                    result["score"] = serde_json::json!(m.score);
                    result["text"] = serde_json::json!(m.record.text);
                }
                result
            }).collect::<Vec<_>>(),
            "actual_results_count": matches.len(),
            "requested_results_count": self.settings.max_results,
        });
        writeln!(out, "{}", output)?;
        Ok(())
    }
}

/// `line_number: source` for sentence records, `file_name: directory` for
/// document chunks, otherwise every metadata value in key order.
fn identifiers(record: &VectorRecord) -> String {
    let metadata = &record.metadata;
    let pair = |a: &str, b: &str| match (metadata.get(a), metadata.get(b)) {
        (Some(x), Some(y)) => Some(format!("{}: {}", x, y)),
        _ => None,
    };

    pair(keys::LINE_NUMBER, keys::SOURCE)
        .or_else(|| pair(keys::FILE_NAME, keys::ABSOLUTE_DIRECTORY_PATH))
        .unwrap_or_else(|| {
            metadata
                .iter()
                .map(|(_, v)| v.to_string())
                .collect::<Vec<_>>()
                .join(": ")
        })
}

/// Interactive search until an exit sentinel or end of input. A query whose
/// embedding fails is reported and the loop moves on.
pub fn run_search_session<R: BufRead, W: Write>(
    input: R,
    output: W,
    store: &VectorStore,
    provider: &dyn EmbeddingProvider,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<usize> {
    let session = SearchSession::new(store, provider, settings.search.clone(), format);
    let mut prompt = Prompt::new(input, output, SEARCH_PROMPT, &settings.exit_sentinels);

    let mut queries = 0;
    while let Some(query) = prompt.next_line()? {
        queries += 1;
        if let Err(e) = session.run_query(&query, prompt.output()) {
            log::error!("Query failed: {}", e);
        }
    }
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;
    use crate::error::Error;
    use crate::vector_entry::Metadata;

    struct DownProvider;

    impl EmbeddingProvider for DownProvider {
        fn embed(&self, _text: &str) -> Result<Vec<Number>> {
            Err(Error::ProviderFailure("connection refused".into()))
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn search_settings(verbose: bool) -> SearchSettings {
        SearchSettings {
            max_results: 10,
            min_score: 0.3,
            verbose,
        }
    }

    fn corpus(provider: &HashEmbedder) -> VectorStore {
        let mut store = VectorStore::new();
        let sentences = [
            "the cat sat on the mat",
            "rust programs compile to native code",
            "a cat chased the dog",
        ];
        for (i, text) in sentences.iter().enumerate() {
            let metadata = Metadata::new()
                .with(keys::SOURCE, "/docs/pets.txt")
                .with(keys::LINE_NUMBER, i);
            store.add(provider.embed(text).unwrap(), *text, metadata).unwrap();
        }
        store
    }

    #[test]
    fn test_run_query_text_terse() {
        let provider = HashEmbedder::new(256);
        let store = corpus(&provider);
        let session = SearchSession::new(&store, &provider, search_settings(false), OutputFormat::Text);

        let mut out = Vec::new();
        let matches = session.run_query("cat", &mut out).unwrap();
        assert_eq!(matches.len(), 2);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("/docs/pets.txt]"));
        assert!(!text.contains("the cat sat"));
        assert_eq!(text.matches(SEPARATOR).count(), 2);
    }

    #[test]
    fn test_run_query_text_verbose_shows_text_and_score() {
        let provider = HashEmbedder::new(256);
        let store = corpus(&provider);
        let session = SearchSession::new(&store, &provider, search_settings(true), OutputFormat::Text);

        let mut out = Vec::new();
        let matches = session.run_query("rust native code", &mut out).unwrap();
        assert_eq!(matches[0].record.text, "rust programs compile to native code");

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("rust programs compile to native code"));
        let id_line = lines.next().unwrap();
        assert!(id_line.starts_with("[1: /docs/pets.txt: "));
    }

    #[test]
    fn test_run_query_json() {
        let provider = HashEmbedder::new(256);
        let store = corpus(&provider);
        let session = SearchSession::new(&store, &provider, search_settings(true), OutputFormat::Json);

        let mut out = Vec::new();
        session.run_query("cat", &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["query"], "cat");
        assert_eq!(json["store_record_count"], 3);
        assert_eq!(json["requested_results_count"], 10);
        assert_eq!(json["actual_results_count"], 2);
        assert!(json["results"][0]["score"].is_number());
        assert_eq!(json["results"][0]["metadata"]["source"], "/docs/pets.txt");
    }

    #[test]
    fn test_empty_store_yields_nothing() {
        let provider = HashEmbedder::new(16);
        let store = VectorStore::new();
        let session = SearchSession::new(&store, &provider, search_settings(true), OutputFormat::Text);
        let mut out = Vec::new();
        assert!(session.run_query("anything", &mut out).unwrap().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_identifiers_for_document_chunks() {
        let record = VectorRecord {
            id: "r".into(),
            embedding: vec![1.0],
            text: "chunk".into(),
            metadata: Metadata::new()
                .with(keys::FILE_NAME, "guide.pdf")
                .with(keys::ABSOLUTE_DIRECTORY_PATH, "/docs")
                .with(keys::CHUNK_INDEX, 4usize),
        };
        assert_eq!(identifiers(&record), "guide.pdf: /docs");
    }

    #[test]
    fn test_session_loop_survives_provider_failure() {
        let store = VectorStore::new();
        let mut settings = Settings::from_config(&config::Config::default()).unwrap();
        settings.exit_sentinels = vec!["exit".into()];

        let input = b"first\nsecond\nEXIT\nthird\n";
        let mut out = Vec::new();
        let queries = run_search_session(&input[..], &mut out, &store, &DownProvider, &settings, OutputFormat::Text).unwrap();
        assert_eq!(queries, 2);
        assert_eq!(String::from_utf8(out).unwrap().matches("String> ").count(), 3);
    }
}
