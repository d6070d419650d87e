use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::{Config, ModeAction};
use crate::content::{Article, Library, Locale};
use crate::error::HighlightError;
use crate::highlight::{
    HighlightRecord, HighlightSession, HighlightStore, Normalizer, Resolver, Segment, escape_html,
    reconcile, render, to_html,
};
use crate::kv::KeyValueStore;

/// Result of asking for a new highlight. Rejections are normal outcomes
/// reported to the reader, not errors.
#[derive(Debug)]
pub enum Commit {
    Saved(HighlightRecord),
    Rejected(String),
}

#[derive(Debug, Serialize)]
pub struct RenderedArticle {
    pub id: String,
    pub title: String,
    pub direction: &'static str,
    pub segments: Vec<Segment>,
}

impl RenderedArticle {
    /// Plain text view with highlights wrapped in `==`.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n\n", self.title);
        for segment in &self.segments {
            if segment.highlighted {
                out.push_str(&format!("=={}==", segment.text));
            } else {
                out.push_str(&segment.text);
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        format!(
            "<article id=\"{}\" dir=\"{}\">\n<h1>{}</h1>\n<p>{}</p>\n</article>",
            escape_html(&self.id),
            self.direction,
            escape_html(&self.title),
            to_html(&self.segments)
        )
    }
}

/// Ties the content library, highlight store and session together for one
/// reader.
pub struct Reader<S> {
    library: Library,
    store: HighlightStore<S>,
    normalizer: Normalizer,
    resolver: Resolver,
    session: HighlightSession,
    default_tag: String,
    persist_mode: bool,
}

impl<S: KeyValueStore> Reader<S> {
    pub fn new(cfg: &Config, library: Library, kv: S) -> Self {
        let locale = cfg.app.default_locale;
        let session = if cfg.highlight.persist_mode {
            HighlightSession::load(&kv, locale, cfg.highlight.enabled_by_default)
        } else {
            HighlightSession::new(locale, cfg.highlight.enabled_by_default)
        };
        let normalizer = Normalizer::new(&cfg.highlight.marker);

        Self {
            library,
            store: HighlightStore::new(kv),
            resolver: Resolver::new(normalizer.clone()),
            normalizer,
            session,
            default_tag: cfg.highlight.default_tag.clone(),
            persist_mode: cfg.highlight.persist_mode,
        }
    }

    pub fn session(&self) -> &HighlightSession {
        &self.session
    }

    pub fn store_mut(&mut self) -> &mut HighlightStore<S> {
        &mut self.store
    }

    fn article(&self, locale: Locale, slug: &str) -> Result<Article> {
        self.library
            .load(locale, slug)
            .with_context(|| format!("failed to load article {}/{}", locale, slug))
    }

    /// Renders an article with its highlights. Stored highlights are first
    /// re-anchored against the current text and saved back if they moved.
    pub fn show(&mut self, locale: Locale, slug: &str) -> Result<RenderedArticle> {
        let article = self.article(locale, slug)?;
        let canonical = article.canonical(&self.normalizer);

        let stored = self.store.list(&article.id)?.to_vec();
        let records = reconcile(&self.resolver, &canonical, &stored);
        if records != stored {
            tracing::info!(
                article_id = %article.id,
                before = stored.len(),
                after = records.len(),
                "re-anchored highlights"
            );
            self.store.replace(&article.id, records.clone())?;
        }

        Ok(RenderedArticle {
            segments: render(&canonical, &records),
            direction: locale.direction(),
            id: article.id,
            title: article.title,
        })
    }

    pub fn highlight(
        &mut self,
        locale: Locale,
        slug: &str,
        fragment: &str,
        tag: Option<String>,
    ) -> Result<Commit> {
        let article = self.article(locale, slug)?;
        let canonical = article.canonical(&self.normalizer);
        let labels = crate::highlight::labels(locale);

        if !self.session.select(&article.id, fragment) {
            return Ok(Commit::Rejected(labels.mode_off.to_string()));
        }

        let tag = Some(tag.unwrap_or_else(|| self.default_tag.clone()));
        match self
            .session
            .commit(&mut self.store, &self.resolver, &canonical, tag)
        {
            Ok(record) => Ok(Commit::Saved(record)),
            Err(HighlightError::Storage(e)) => Err(HighlightError::Storage(e))
                .with_context(|| format!("failed to save highlight for {}", article.id)),
            Err(e) => {
                tracing::info!(article_id = %article.id, error = %e, "highlight rejected");
                Ok(Commit::Rejected(labels.describe(&e)))
            }
        }
    }

    pub fn list(&mut self, locale: Locale, slug: &str) -> Result<Vec<HighlightRecord>> {
        let id = Article::article_id(locale, slug);
        Ok(self.store.list(&id)?.to_vec())
    }

    pub fn remove(&mut self, locale: Locale, slug: &str, record_id: &str) -> Result<bool> {
        let id = Article::article_id(locale, slug);
        Ok(self.store.remove(&id, record_id)?)
    }

    pub fn clear(&mut self, locale: Locale, slug: &str) -> Result<()> {
        let id = Article::article_id(locale, slug);
        Ok(self.store.clear(&id)?)
    }

    /// Applies `action` to highlight mode and returns the resulting state.
    pub fn mode(&mut self, action: Option<ModeAction>) -> Result<bool> {
        let Some(action) = action else {
            return Ok(self.session.is_enabled());
        };

        match action {
            ModeAction::On => self.session.set_enabled(true),
            ModeAction::Off => self.session.set_enabled(false),
            ModeAction::Toggle => {
                self.session.toggle();
            }
        }

        if self.persist_mode {
            self.session
                .save_mode(self.store.kv_mut())
                .context("failed to save highlight mode")?;
        } else {
            tracing::warn!("highlight mode is not persisted; set highlight.persist_mode to keep it");
        }
        Ok(self.session.is_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn reader(cfg: &Config) -> Reader<MemoryStore> {
        Reader::new(cfg, Library::Embedded, MemoryStore::new())
    }

    #[test]
    fn highlight_then_show() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);

        let record = match reader
            .highlight(Locale::En, "cognitive-bias", "**cognitive bias**", None)
            .unwrap()
        {
            Commit::Saved(record) => record,
            Commit::Rejected(msg) => panic!("rejected: {msg}"),
        };
        assert_eq!((record.start_offset, record.end_offset), (8, 22));
        assert_eq!(record.tag.as_deref(), Some("yellow"));

        let rendered = reader.show(Locale::En, "cognitive-bias").unwrap();
        assert_eq!(rendered.direction, "ltr");
        assert_eq!(rendered.segments[1].text, "cognitive bias");
        assert!(rendered.to_text().contains("This is ==cognitive bias== and"));
        assert!(rendered.to_html().contains(&format!(
            r#"<mark data-highlight-id="{}">cognitive bias</mark>"#,
            record.id
        )));
    }

    #[test]
    fn overlap_and_missing_text_are_rejections() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);
        reader
            .highlight(Locale::En, "cognitive-bias", "cognitive bias", None)
            .unwrap();

        match reader
            .highlight(Locale::En, "cognitive-bias", "bias and", None)
            .unwrap()
        {
            Commit::Rejected(msg) => assert_eq!(msg, "This text is already highlighted"),
            Commit::Saved(_) => panic!("overlap should be rejected"),
        }
        match reader
            .highlight(Locale::En, "cognitive-bias", "not on this page", None)
            .unwrap()
        {
            Commit::Rejected(msg) => assert_eq!(msg, "Cannot highlight this selection"),
            Commit::Saved(_) => panic!("missing text should be rejected"),
        }
        assert_eq!(reader.list(Locale::En, "cognitive-bias").unwrap().len(), 1);
    }

    #[test]
    fn arabic_article_highlights() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);
        let commit = reader
            .highlight(Locale::Ar, "cognitive-bias", "**التحيز المعرفي**", None)
            .unwrap();
        assert!(matches!(commit, Commit::Saved(ref r) if r.start_offset == 7));

        let rendered = reader.show(Locale::Ar, "cognitive-bias").unwrap();
        assert_eq!(rendered.direction, "rtl");
        assert_eq!(rendered.id, "ar/cognitive-bias");
    }

    #[test]
    fn remove_and_clear() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);
        let Commit::Saved(record) = reader
            .highlight(Locale::En, "working-memory", "working memory", None)
            .unwrap()
        else {
            panic!("expected saved highlight");
        };
        reader
            .highlight(Locale::En, "working-memory", "limited capacity", None)
            .unwrap();

        assert!(!reader.remove(Locale::En, "working-memory", "unknown").unwrap());
        assert!(reader.remove(Locale::En, "working-memory", &record.id).unwrap());
        assert_eq!(reader.list(Locale::En, "working-memory").unwrap().len(), 1);

        reader.clear(Locale::En, "working-memory").unwrap();
        assert!(reader.list(Locale::En, "working-memory").unwrap().is_empty());
    }

    #[test]
    fn disabled_mode_rejects_without_storing() {
        let mut cfg = Config::default();
        cfg.highlight.enabled_by_default = false;
        let mut reader = reader(&cfg);

        match reader
            .highlight(Locale::En, "cognitive-bias", "cognitive bias", None)
            .unwrap()
        {
            Commit::Rejected(msg) => assert_eq!(msg, "Highlight mode is off"),
            Commit::Saved(_) => panic!("disabled mode should reject"),
        }
        assert!(reader.list(Locale::En, "cognitive-bias").unwrap().is_empty());
    }

    #[test]
    fn persisted_mode_survives_new_reader() {
        let mut cfg = Config::default();
        cfg.highlight.persist_mode = true;
        let mut kv = MemoryStore::new();

        {
            let mut reader = Reader::new(&cfg, Library::Embedded, kv.clone());
            assert!(!reader.mode(Some(ModeAction::Toggle)).unwrap());
            kv = reader.store_mut().kv().clone();
        }

        let mut reader = Reader::new(&cfg, Library::Embedded, kv);
        assert!(!reader.mode(None).unwrap());
        assert!(!reader.session().is_enabled());
    }

    #[test]
    fn show_reanchors_shifted_highlights() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);
        let stale = HighlightRecord::new("en/cognitive-bias", 0, 14, "cognitive bias", None);
        reader
            .store_mut()
            .add("en/cognitive-bias", stale.clone())
            .unwrap();

        let rendered = reader.show(Locale::En, "cognitive-bias").unwrap();
        let highlighted: Vec<&Segment> = rendered.segments.iter().filter(|s| s.highlighted).collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].text, "cognitive bias");
        let moved_id = crate::highlight::compute_record_id("en/cognitive-bias", 8, 22);
        assert_eq!(highlighted[0].record_id.as_deref(), Some(moved_id.as_str()));

        let saved = reader.list(Locale::En, "cognitive-bias").unwrap();
        assert_eq!(saved[0].start_offset, 8);
        assert_eq!(saved[0].created_at, stale.created_at);

        // the freed span can be highlighted again without an id clash
        let commit = reader
            .highlight(Locale::En, "cognitive-bias", "This is", None)
            .unwrap();
        assert!(matches!(commit, Commit::Saved(ref r) if r.id != moved_id));
    }

    #[test]
    fn unknown_article_is_an_error() {
        let cfg = Config::default();
        let mut reader = reader(&cfg);
        assert!(reader.show(Locale::En, "does-not-exist").is_err());
    }
}
