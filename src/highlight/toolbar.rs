use super::record::HighlightRecord;
use super::resolve::Resolver;
use super::store::HighlightStore;
use crate::content::Locale;
use crate::error::{HighlightError, StorageError};
use crate::kv::KeyValueStore;

pub const MODE_KEY: &str = "highlight-mode";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub enable: &'static str,
    pub disable: &'static str,
    pub confirm: &'static str,
    pub cannot_highlight: &'static str,
    pub already_highlighted: &'static str,
    pub mode_off: &'static str,
}

const EN_LABELS: Labels = Labels {
    enable: "Enable highlighting",
    disable: "Disable highlighting",
    confirm: "Highlight selection",
    cannot_highlight: "Cannot highlight this selection",
    already_highlighted: "This text is already highlighted",
    mode_off: "Highlight mode is off",
};

const AR_LABELS: Labels = Labels {
    enable: "تفعيل التظليل",
    disable: "إيقاف التظليل",
    confirm: "تظليل النص المحدد",
    cannot_highlight: "لا يمكن تظليل هذا التحديد",
    already_highlighted: "هذا النص مظلل بالفعل",
    mode_off: "وضع التظليل متوقف",
};

impl Labels {
    pub fn describe(&self, err: &HighlightError) -> String {
        match err {
            HighlightError::NotFound | HighlightError::InvalidSpan { .. } => {
                self.cannot_highlight.to_string()
            }
            HighlightError::Overlap { .. } | HighlightError::DuplicateId { .. } => {
                self.already_highlighted.to_string()
            }
            other => other.to_string(),
        }
    }
}

pub fn labels(locale: Locale) -> &'static Labels {
    match locale {
        Locale::En => &EN_LABELS,
        Locale::Ar => &AR_LABELS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    pub article_id: String,
    pub fragment: String,
}

/// Reader-facing highlight state: whether highlight mode is on, and the
/// selection waiting to be confirmed.
#[derive(Debug, Clone)]
pub struct HighlightSession {
    enabled: bool,
    locale: Locale,
    pending: Option<PendingSelection>,
}

impl HighlightSession {
    pub fn new(locale: Locale, enabled: bool) -> Self {
        Self {
            enabled,
            locale,
            pending: None,
        }
    }

    /// Restores the mode flag from `kv`, falling back to `default_enabled`
    /// when nothing usable is stored.
    pub fn load<S: KeyValueStore>(kv: &S, locale: Locale, default_enabled: bool) -> Self {
        let enabled = match kv.get(MODE_KEY) {
            Ok(Some(raw)) => match raw.trim() {
                "true" => true,
                "false" => false,
                other => {
                    tracing::warn!(value = other, "ignoring malformed highlight mode");
                    default_enabled
                }
            },
            Ok(None) => default_enabled,
            Err(e) => {
                tracing::warn!(error = %crate::unpack_error(&e), "failed to read highlight mode");
                default_enabled
            }
        };
        Self::new(locale, enabled)
    }

    pub fn save_mode<S: KeyValueStore>(&self, kv: &mut S) -> Result<(), StorageError> {
        kv.set(MODE_KEY, if self.enabled { "true" } else { "false" })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn labels(&self) -> &'static Labels {
        labels(self.locale)
    }

    pub fn direction(&self) -> &'static str {
        self.locale.direction()
    }

    /// Label for the toggle button, i.e. the action it will perform.
    pub fn toggle_label(&self) -> &'static str {
        if self.enabled {
            self.labels().disable
        } else {
            self.labels().enable
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending = None;
        }
    }

    /// Records a selection for later confirmation. A newer selection replaces
    /// the previous one. Ignored while highlight mode is off.
    pub fn select(&mut self, article_id: &str, fragment: &str) -> bool {
        if !self.enabled {
            return false;
        }
        self.pending = Some(PendingSelection {
            article_id: article_id.to_string(),
            fragment: fragment.to_string(),
        });
        true
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    pub fn discard(&mut self) -> Option<PendingSelection> {
        self.pending.take()
    }

    /// Turns the pending selection into a stored highlight. The pending
    /// selection is consumed whatever the outcome.
    pub fn commit<S: KeyValueStore>(
        &mut self,
        store: &mut HighlightStore<S>,
        resolver: &Resolver,
        canonical: &str,
        tag: Option<String>,
    ) -> Result<HighlightRecord, HighlightError> {
        let pending = self.pending.take().ok_or(HighlightError::NothingPending)?;

        let span = resolver.resolve(&pending.fragment, canonical)?;
        let record = HighlightRecord::from_span(&pending.article_id, canonical, span, tag)?;
        store.add(&pending.article_id, record.clone())?;
        Ok(record)
    }

    /// Message to show the reader for a failed commit.
    pub fn describe_error(&self, err: &HighlightError) -> String {
        self.labels().describe(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::normalize::normalize;
    use crate::kv::MemoryStore;

    const ARTICLE_ID: &str = "en/cognitive-bias";

    fn canonical() -> String {
        normalize("This is **cognitive bias** and it affects decision making.")
    }

    #[test]
    fn toggle_flips_and_disabling_drops_pending() {
        let mut session = HighlightSession::new(Locale::En, true);
        assert!(session.select(ARTICLE_ID, "bias"));
        assert!(!session.toggle());
        assert!(session.pending().is_none());
        assert_eq!(session.toggle_label(), "Enable highlighting");
        assert!(session.toggle());
        assert_eq!(session.toggle_label(), "Disable highlighting");
    }

    #[test]
    fn select_ignored_when_disabled() {
        let mut session = HighlightSession::new(Locale::En, false);
        assert!(!session.select(ARTICLE_ID, "bias"));
        assert!(session.pending().is_none());
    }

    #[test]
    fn newer_selection_replaces_pending() {
        let mut session = HighlightSession::new(Locale::En, true);
        session.select(ARTICLE_ID, "bias");
        session.select(ARTICLE_ID, "decision");
        assert_eq!(session.pending().unwrap().fragment, "decision");
        assert_eq!(session.discard().unwrap().fragment, "decision");
        assert!(session.pending().is_none());
    }

    #[test]
    fn commit_stores_resolved_record() {
        let mut store = HighlightStore::new(MemoryStore::new());
        let mut session = HighlightSession::new(Locale::En, true);
        session.select(ARTICLE_ID, "**cognitive bias**");

        let record = session
            .commit(&mut store, &Resolver::default(), &canonical(), Some("yellow".into()))
            .unwrap();
        assert_eq!((record.start_offset, record.end_offset), (8, 22));
        assert_eq!(record.text, "cognitive bias");
        assert_eq!(record.tag.as_deref(), Some("yellow"));
        assert!(session.pending().is_none());
        assert_eq!(store.list(ARTICLE_ID).unwrap(), &[record][..]);
    }

    #[test]
    fn failed_commit_discards_pending_without_state_change() {
        let mut store = HighlightStore::new(MemoryStore::new());
        let mut session = HighlightSession::new(Locale::Ar, true);
        session.select(ARTICLE_ID, "not in the text");

        let err = session
            .commit(&mut store, &Resolver::default(), &canonical(), None)
            .unwrap_err();
        assert!(matches!(err, HighlightError::NotFound));
        assert_eq!(session.describe_error(&err), "لا يمكن تظليل هذا التحديد");
        assert!(session.pending().is_none());
        assert!(store.list(ARTICLE_ID).unwrap().is_empty());
        assert!(store.kv().get(&crate::highlight::store::storage_key(ARTICLE_ID)).unwrap().is_none());

        assert!(matches!(
            session.commit(&mut store, &Resolver::default(), &canonical(), None),
            Err(HighlightError::NothingPending)
        ));
    }

    #[test]
    fn overlapping_commit_reports_already_highlighted() {
        let mut store = HighlightStore::new(MemoryStore::new());
        let mut session = HighlightSession::new(Locale::En, true);
        session.select(ARTICLE_ID, "cognitive bias");
        session.commit(&mut store, &Resolver::default(), &canonical(), None).unwrap();

        session.select(ARTICLE_ID, "bias and");
        let err = session
            .commit(&mut store, &Resolver::default(), &canonical(), None)
            .unwrap_err();
        assert_eq!(session.describe_error(&err), "This text is already highlighted");
        assert_eq!(store.list(ARTICLE_ID).unwrap().len(), 1);
    }

    #[test]
    fn mode_persists_in_kv() {
        let mut kv = MemoryStore::new();
        assert!(HighlightSession::load(&kv, Locale::En, true).is_enabled());

        let mut session = HighlightSession::new(Locale::En, true);
        session.toggle();
        session.save_mode(&mut kv).unwrap();
        assert!(!HighlightSession::load(&kv, Locale::En, true).is_enabled());

        kv.set(MODE_KEY, "maybe").unwrap();
        assert!(!HighlightSession::load(&kv, Locale::En, false).is_enabled());
    }

    #[test]
    fn direction_follows_locale() {
        assert_eq!(HighlightSession::new(Locale::Ar, true).direction(), "rtl");
        assert_eq!(HighlightSession::new(Locale::En, true).direction(), "ltr");
    }
}
