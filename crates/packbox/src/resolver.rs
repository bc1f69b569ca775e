//! Primary/fallback resolution chain
//!
//! Per file: `TryPrimary -> (Matched | TryFallback) -> (Matched | Unresolved)`.
//! A transport failure is logged but otherwise handled exactly like a miss, so
//! the caller only ever sees `Matched` or `NotFound`.

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::PackboxConfig;
use crate::core::progress::emit;
use crate::core::{ProgressCallback, ProgressEvent, Result};
use crate::manifest::{Manifest, Source};
use crate::sources::{LocalFile, ResolutionOutcome, SourceRegistry};

/// Resolves local files against a primary and an optional fallback registry
pub struct SourceResolver {
    registry: SourceRegistry,
    primary: Source,
    fallback: Source,
    progress: Option<ProgressCallback>,
}

impl SourceResolver {
    pub fn new(registry: SourceRegistry, primary: Source, fallback: Source) -> Self {
        Self {
            registry,
            primary,
            fallback,
            progress: None,
        }
    }

    /// Build a resolver for the manifest's source chain, constructing only the clients it needs
    pub fn for_manifest(config: &PackboxConfig, manifest: &Manifest) -> Result<Self> {
        manifest.validate()?;
        let registry = SourceRegistry::for_sources(config, &manifest.source_chain())?;
        Ok(Self::new(registry, manifest.source, manifest.fallback_source))
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Sources in the order they are tried; `None` never appears
    pub fn chain(&self) -> Vec<Source> {
        let mut chain = Vec::with_capacity(2);
        if !self.primary.is_none() {
            chain.push(self.primary);
        }
        if !self.fallback.is_none() && self.fallback != self.primary {
            chain.push(self.fallback);
        }
        chain
    }

    /// Resolve one file, returning `Matched` or `NotFound`
    pub async fn resolve(&self, file: &LocalFile) -> ResolutionOutcome {
        let span = info_span!("resolve", path = %file.relative);
        async move {
            emit(&self.progress, ProgressEvent::FileChecking {
                path: file.relative.clone(),
            });

            for (attempt, source) in self.chain().into_iter().enumerate() {
                if attempt > 0 {
                    debug!("Trying fallback source {}", source);
                    emit(&self.progress, ProgressEvent::FallbackAttempt {
                        path: file.relative.clone(),
                        source,
                    });
                }

                let Some(client) = self.registry.find(source) else {
                    warn!("No client registered for source {}", source);
                    continue;
                };

                match client.lookup(file).await {
                    ResolutionOutcome::Matched(entry) => {
                        info!("Matched {} on {}", file.relative, source);
                        emit(&self.progress, ProgressEvent::FileMatched {
                            path: file.relative.clone(),
                            source,
                        });
                        return ResolutionOutcome::Matched(entry);
                    }
                    ResolutionOutcome::NotFound => {
                        debug!("{} not found on {}", file.relative, source);
                    }
                    // Not distinguished from a miss; no retry is attempted
                    ResolutionOutcome::TransportFailure(err) => {
                        warn!("Lookup on {} failed ({}): {}", source, err.category(), err);
                    }
                }
            }

            warn!("Couldn't find {} in any configured source", file.relative);
            emit(&self.progress, ProgressEvent::FileUnresolved {
                path: file.relative.clone(),
            });
            ResolutionOutcome::NotFound
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PackboxError;
    use crate::manifest::ModEntry;
    use crate::sources::RegistryClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    enum Reply {
        Match,
        Miss,
        Broken,
    }

    struct Stub {
        source: Source,
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl Stub {
        fn new(source: Source, reply: Reply) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { source, reply, calls: calls.clone() }, calls)
        }
    }

    #[async_trait]
    impl RegistryClient for Stub {
        fn source(&self) -> Source {
            self.source
        }

        async fn lookup(&self, file: &LocalFile) -> ResolutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Match => ResolutionOutcome::Matched(ModEntry::new(
                    file.relative.clone(),
                    format!("https://example.invalid/{}", self.source),
                    self.source,
                )),
                Reply::Miss => ResolutionOutcome::NotFound,
                Reply::Broken => ResolutionOutcome::TransportFailure(PackboxError::HttpStatus {
                    url: "https://example.invalid".to_string(),
                    status: 502,
                }),
            }
        }
    }

    fn file() -> LocalFile {
        LocalFile::new("/nonexistent/a.jar", "mods/a.jar")
    }

    #[tokio::test]
    async fn test_primary_match_skips_fallback() {
        let (primary, primary_calls) = Stub::new(Source::Modrinth, Reply::Match);
        let (fallback, fallback_calls) = Stub::new(Source::CurseForge, Reply::Match);
        let registry = SourceRegistry::new().register(primary).register(fallback);
        let resolver = SourceResolver::new(registry, Source::Modrinth, Source::CurseForge);

        let entry = resolver.resolve(&file()).await.into_entry().unwrap();
        assert_eq!(entry.source, Source::Modrinth);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_queried_exactly_once() {
        let (primary, primary_calls) = Stub::new(Source::Modrinth, Reply::Miss);
        let (fallback, fallback_calls) = Stub::new(Source::CurseForge, Reply::Miss);
        let registry = SourceRegistry::new().register(primary).register(fallback);
        let resolver = SourceResolver::new(registry, Source::Modrinth, Source::CurseForge);

        assert!(matches!(resolver.resolve(&file()).await, ResolutionOutcome::NotFound));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_stops_after_primary() {
        let (primary, primary_calls) = Stub::new(Source::CurseForge, Reply::Miss);
        let (other, other_calls) = Stub::new(Source::Modrinth, Reply::Match);
        let registry = SourceRegistry::new().register(primary).register(other);
        let resolver = SourceResolver::new(registry, Source::CurseForge, Source::None);

        assert!(matches!(resolver.resolve(&file()).await, ResolutionOutcome::NotFound));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_collapses_and_falls_back() {
        let (primary, _) = Stub::new(Source::Modrinth, Reply::Broken);
        let (fallback, fallback_calls) = Stub::new(Source::CurseForge, Reply::Match);
        let registry = SourceRegistry::new().register(primary).register(fallback);
        let resolver = SourceResolver::new(registry, Source::Modrinth, Source::CurseForge);

        let entry = resolver.resolve(&file()).await.into_entry().unwrap();
        assert_eq!(entry.source, Source::CurseForge);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);

        let (broken, _) = Stub::new(Source::Modrinth, Reply::Broken);
        let resolver = SourceResolver::new(
            SourceRegistry::new().register(broken),
            Source::Modrinth,
            Source::None,
        );
        assert!(matches!(resolver.resolve(&file()).await, ResolutionOutcome::NotFound));
    }

    #[tokio::test]
    async fn test_events_follow_state_machine() {
        let (primary, _) = Stub::new(Source::Modrinth, Reply::Miss);
        let (fallback, _) = Stub::new(Source::CurseForge, Reply::Miss);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let resolver = SourceResolver::new(
            SourceRegistry::new().register(primary).register(fallback),
            Source::Modrinth,
            Source::CurseForge,
        )
        .with_progress(Arc::new(move |event| {
            let name = match event {
                ProgressEvent::FileChecking { .. } => "checking",
                ProgressEvent::FallbackAttempt { .. } => "fallback",
                ProgressEvent::FileMatched { .. } => "matched",
                ProgressEvent::FileUnresolved { .. } => "unresolved",
                _ => "other",
            };
            sink.lock().unwrap().push(name);
        }));

        resolver.resolve(&file()).await;
        assert_eq!(*seen.lock().unwrap(), vec!["checking", "fallback", "unresolved"]);
    }

    #[test]
    fn test_chain_skips_none_and_duplicates() {
        let resolver = SourceResolver::new(SourceRegistry::new(), Source::Modrinth, Source::Modrinth);
        assert_eq!(resolver.chain(), vec![Source::Modrinth]);
        let resolver = SourceResolver::new(SourceRegistry::new(), Source::CurseForge, Source::Modrinth);
        assert_eq!(resolver.chain(), vec![Source::CurseForge, Source::Modrinth]);
    }
}
