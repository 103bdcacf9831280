//! Transform pipeline - the session state machine.
//!
//! Orchestrates scanner, resolver, validator, isolator and injector into the
//! forward (store -> preview) and reverse (preview -> store) transforms.
//!
//! ```text
//! Idle -> Scanning -> Resolving -> Validating -> Ready -> Editing -> Saving -> Idle
//!                                      |                               |
//!                                  (async probes)                 (retry -> Editing)
//! ```
//!
//! `forward()` is synchronous end to end except validation, which keeps
//! running in the background and only updates the status surface. A repeated
//! `forward()` replaces the session object outright: fresh token, fresh
//! tables, stale probe results dropped.

mod rewrite;

use std::sync::Arc;

use anyhow::Result;
use dashmap::DashMap;

use crate::config::PreviewConfig;
use crate::core::{RefKind, ResolvedAsset, SessionState};
use crate::dom;
use crate::editable::EditabilityInjector;
use crate::error::PreviewError;
use crate::resolve::PathResolver;
use crate::scan::AssetScanner;
use crate::store::{ContentStore, ImageReplacer, ImageSwapRequest, ReplaceReport};
use crate::validate::{AssetValidator, StatusTable, ValidationHandle};
use crate::widget::{self, PlaceholderTable, WidgetIsolator};
use crate::{debug, log};

pub use rewrite::{resolve_pass, revert_pass};

// =============================================================================
// Session
// =============================================================================

/// State owned by one open edit session.
///
/// Never shared across sessions; destroyed on close, save, or when a new
/// `forward()` replaces it.
pub struct DocumentTransformSession {
    /// Monotonic token correlating async work to this session.
    pub token: u64,
    pub current_directory: String,
    pub base_url: String,
    /// HTML exactly as read from storage.
    pub original_html: String,
    /// Instrumented preview HTML emitted by the forward transform.
    pub processed_html: String,
    pub placeholder_table: PlaceholderTable,
    /// Raw path -> resolved asset, mutated in place by the validator.
    pub asset_table: StatusTable,
    validation: ValidationHandle,
    /// Last serialization pushed from the preview host, kept as the save
    /// fallback when the preview DOM cannot be read.
    last_edit: Option<String>,
}

impl DocumentTransformSession {
    /// Live validation progress for this session.
    pub fn validation(&self) -> &ValidationHandle {
        &self.validation
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Bidirectional transform engine, one session at a time.
pub struct TransformPipeline {
    config: PreviewConfig,
    validator: AssetValidator,
    state: SessionState,
    session: Option<DocumentTransformSession>,
    next_token: u64,
}

impl TransformPipeline {
    pub fn new(config: PreviewConfig) -> Result<Self> {
        let validator = AssetValidator::new(&config.validate)?;
        Ok(Self {
            config,
            validator,
            state: SessionState::Idle,
            session: None,
            next_token: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> Option<&DocumentTransformSession> {
        self.session.as_ref()
    }

    /// Forward transform: stored HTML in, instrumented preview HTML out.
    ///
    /// Returns once the preview is ready; asset probes continue in the
    /// background and only update the session's status surface.
    pub fn forward(
        &mut self,
        original_html: &str,
        current_directory: &str,
        base_url: &str,
    ) -> Result<String> {
        // Replacing the session invalidates any in-flight validation
        self.session = None;
        self.next_token += 1;
        let token = self.next_token;

        self.transition(SessionState::Scanning)?;
        let mut doc = dom::parse(original_html);
        let report = AssetScanner::scan_doc(&doc);
        debug!("pipeline"; "scanned {} references", report.references().len());

        self.transition(SessionState::Resolving)?;
        let resolver = PathResolver::new(current_directory, base_url);
        let asset_table: StatusTable = Arc::new(DashMap::default());
        for reference in report.resolvable() {
            if matches!(RefKind::parse(&reference.raw_path), RefKind::Unresolvable(_)) {
                debug!("pipeline"; "leaving malformed reference `{}` unresolved", reference.raw_path);
                continue;
            }
            let resolved = resolver.resolve(&reference.raw_path);
            asset_table.insert(
                reference.raw_path.clone(),
                ResolvedAsset::new(reference.clone(), resolved),
            );
        }
        rewrite::resolve_pass(&mut doc, &resolver);

        self.transition(SessionState::Validating)?;
        let validation = self.validator.begin(token, Arc::clone(&asset_table));

        let mut isolator =
            WidgetIsolator::new(&self.config.widgets, &self.config.site.widget_origin);
        let placeholder_table = isolator.isolate_doc(&mut doc);
        if !placeholder_table.is_empty() {
            debug!("pipeline"; "isolated {} widget(s)", placeholder_table.len());
        }

        EditabilityInjector::make_editable_doc(&mut doc);

        let processed_html = dom::render(&doc);
        self.session = Some(DocumentTransformSession {
            token,
            current_directory: current_directory.to_string(),
            base_url: base_url.to_string(),
            original_html: original_html.to_string(),
            processed_html: processed_html.clone(),
            placeholder_table,
            asset_table,
            validation,
            last_edit: None,
        });
        self.transition(SessionState::Ready)?;

        Ok(processed_html)
    }

    /// Record the latest edited serialization from the preview host.
    ///
    /// Also moves a `Ready` session into `Editing` - the first push is the
    /// edit that starts the lifecycle.
    pub fn cache_edit(&mut self, edited: &str) {
        if let Some(session) = self.session.as_mut() {
            session.last_edit = Some(edited.to_string());
            if self.state == SessionState::Ready {
                self.state = SessionState::Editing;
            }
        }
    }

    /// Explicitly enter `Editing` without a cached serialization.
    pub fn begin_editing(&mut self) -> Result<()> {
        self.transition(SessionState::Editing)
    }

    /// Reverse transform: edited preview HTML in, storable HTML out.
    ///
    /// Strips injected markers, reverts URLs to their original relative
    /// form, and restores widget iframes from their placeholders.
    pub fn reverse(&mut self, edited: &str) -> Result<String> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PreviewError::InvalidState("no open session".to_string()))?;

        let mut doc = dom::parse(edited);
        EditabilityInjector::strip_doc(&mut doc);

        let resolver = PathResolver::new(&session.current_directory, &session.base_url);
        rewrite::revert_pass(&mut doc, &resolver);

        widget::restore_doc(&mut doc, &mut session.placeholder_table);

        Ok(dom::render(&doc))
    }

    /// Save the edited preview back through the storage collaborator.
    ///
    /// `edited` of `None` models a preview DOM that could not be read
    /// (sandbox/cross-origin denial): the last cached serialization stands
    /// in, with a recoverable warning. A storage rejection fails only this
    /// attempt - the session returns to `Editing` for retry.
    pub fn save(
        &mut self,
        edited: Option<&str>,
        store: &dyn ContentStore,
        path: &str,
    ) -> Result<String, PreviewError> {
        if self.state != SessionState::Editing {
            return Err(PreviewError::InvalidState(format!(
                "save requires an editing session (state: {})",
                self.state
            )));
        }
        self.state = SessionState::Saving;

        let serialization = match edited {
            Some(html) => html.to_string(),
            None => {
                let cached = self
                    .session
                    .as_ref()
                    .and_then(|s| s.last_edit.clone());
                match cached {
                    Some(html) => {
                        log!("warning"; "preview DOM unavailable, saving last cached edit");
                        html
                    }
                    None => {
                        self.state = SessionState::Editing;
                        return Err(PreviewError::SerializationUnavailable(
                            "no edited serialization and no cached edit".to_string(),
                        ));
                    }
                }
            }
        };

        let storable = self.reverse(&serialization).map_err(|err| {
            self.state = SessionState::Editing;
            PreviewError::SerializationUnavailable(err.to_string())
        })?;

        if let Err(err) = store.put(path, &storable) {
            self.state = SessionState::Editing;
            return Err(PreviewError::PersistFailure(err.to_string()));
        }

        self.session = None;
        self.state = SessionState::Idle;
        Ok(storable)
    }

    /// Close the session without saving. Discards tables and cached edits.
    pub fn close(&mut self) {
        self.session = None;
        self.state = SessionState::Idle;
    }

    /// Delegate an image swap to the collaborator and refresh the session.
    ///
    /// Responses are correlated by session token; a request minted for a
    /// superseded session is dropped without side effects.
    pub fn replace_image(
        &mut self,
        replacer: &dyn ImageReplacer,
        store: &dyn ContentStore,
        request: &ImageSwapRequest,
    ) -> Result<ReplaceReport> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| PreviewError::InvalidState("no open session".to_string()))?;

        if request.session_token != session.token {
            debug!("pipeline"; "dropping stale image swap (token {} != {})",
                request.session_token, session.token);
            anyhow::bail!("stale image swap response");
        }

        let report = replacer.replace(request).map_err(PreviewError::Store)?;

        if report.replaced() > 0 {
            // The collaborator rewrote storage; refresh our in-memory copy
            let html = store.get(&request.page_path).map_err(PreviewError::Store)?;
            let directory = session.current_directory.clone();
            let base_url = session.base_url.clone();
            self.forward(&html, &directory, &base_url)?;
        }

        Ok(report)
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance(next) {
            let from = self.state;
            self.state = SessionState::Error;
            anyhow::bail!("illegal session transition: {} -> {}", from, next);
        }
        debug!("pipeline"; "{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
