/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


//! Decorator contract, the chain runner applied before queueing, and the built-in
//! stale-file blocker.

use crate::error::{ExchangeError, Result};
use crate::metadata::{Metadata, MetadataProvider};
use crate::observability::{events, fields};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const COMPONENT: &str = "decorator_chain";

/// Outcome of one decorator.
#[derive(Debug)]
pub enum Decoration {
    /// Continue with the current file.
    Unchanged,
    /// Continue with a new file; metadata is recomputed from it.
    Replaced(NamedTempFile),
    /// The decorator produced nothing.
    Empty,
}

/// File transforming or filtering step run before a file is queued for delivery.
#[async_trait]
pub trait Decorator: Send + Sync {
    fn name(&self) -> &str;

    async fn decorate(&self, path: &Path, metadata: &Metadata) -> Result<Decoration>;
}

/// One configured position in a publication's decorator chain.
#[derive(Clone)]
pub struct DecoratorStage {
    pub decorator: Arc<dyn Decorator>,
    /// Abandon the delivery when the decorator produces nothing.
    pub allow_discard: bool,
}

impl DecoratorStage {
    pub fn new(decorator: Arc<dyn Decorator>, allow_discard: bool) -> Self {
        Self {
            decorator,
            allow_discard,
        }
    }
}

/// Runs every stage in order.
///
/// Returns `Ok(None)` when a discarding stage produced nothing. The temp file is released
/// on every path that does not hand it back.
pub(crate) async fn run_chain(
    publication: &str,
    stages: &[DecoratorStage],
    mut file: NamedTempFile,
    mut metadata: Metadata,
    provider: &dyn MetadataProvider,
) -> Result<Option<(NamedTempFile, Metadata)>> {
    for stage in stages {
        let name = stage.decorator.name();
        let decoration = stage
            .decorator
            .decorate(file.path(), &metadata)
            .await
            .map_err(|err| decoration_error(name, err))?;

        match decoration {
            Decoration::Unchanged => {}
            Decoration::Replaced(replacement) => {
                metadata = provider
                    .metadata_from_file(replacement.path())
                    .map_err(|err| decoration_error(name, err))?;
                file = replacement;
                debug!(
                    event = events::DECORATOR_REPLACED,
                    component = COMPONENT,
                    publication,
                    decorator = name,
                    file_id = fields::format_file_id(&metadata).as_str(),
                    "decorator replaced file"
                );
            }
            Decoration::Empty if stage.allow_discard => {
                info!(
                    event = events::DECORATOR_DISCARD,
                    component = COMPONENT,
                    publication,
                    decorator = name,
                    file_id = fields::format_file_id(&metadata).as_str(),
                    "decorator discarded file; delivery abandoned"
                );
                return Ok(None);
            }
            Decoration::Empty => {
                debug!(
                    event = events::DECORATOR_EMPTY_KEPT,
                    component = COMPONENT,
                    publication,
                    decorator = name,
                    file_id = fields::format_file_id(&metadata).as_str(),
                    "decorator produced nothing; discard not allowed, keeping file"
                );
            }
        }
    }

    Ok(Some((file, metadata)))
}

fn decoration_error(decorator: &str, err: ExchangeError) -> ExchangeError {
    match err {
        ExchangeError::Decoration { .. } => err,
        other => ExchangeError::Decoration {
            decorator: decorator.to_string(),
            reason: other.to_string(),
        },
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaleFileBlockerArguments {
    pub max_age_minutes: i64,
}

/// Produces nothing for files whose nominal time is older than the configured age.
///
/// Files without a nominal date and time pass unchanged.
pub struct StaleFileBlocker {
    max_age: TimeDelta,
}

impl StaleFileBlocker {
    pub const NAME: &'static str = "stale_file_blocker";

    pub fn new(arguments: StaleFileBlockerArguments) -> Result<Self> {
        let max_age = TimeDelta::try_minutes(arguments.max_age_minutes)
            .filter(|age| *age >= TimeDelta::zero())
            .ok_or_else(|| {
                ExchangeError::config(format!(
                    "{}: max_age_minutes out of range: {}",
                    Self::NAME,
                    arguments.max_age_minutes
                ))
            })?;

        Ok(Self { max_age })
    }
}

#[async_trait]
impl Decorator for StaleFileBlocker {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn decorate(&self, _path: &Path, metadata: &Metadata) -> Result<Decoration> {
        let Some(nominal) = metadata.nominal_datetime() else {
            return Ok(Decoration::Unchanged);
        };

        if Utc::now().naive_utc() - nominal > self.max_age {
            Ok(Decoration::Empty)
        } else {
            Ok(Decoration::Unchanged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        run_chain, Decoration, Decorator, DecoratorStage, StaleFileBlocker,
        StaleFileBlockerArguments,
    };
    use crate::error::{ExchangeError, Result};
    use crate::metadata::{Metadata, MetadataProvider};
    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    struct FixedProvider;

    impl MetadataProvider for FixedProvider {
        fn metadata_from_file(&self, path: &Path) -> Result<Metadata> {
            let contents = std::fs::read_to_string(path)?;
            Ok(Metadata::new().with_source_name(contents.trim()))
        }
    }

    enum Behaviour {
        Keep,
        Replace(&'static str),
        Nothing,
        Fail,
    }

    struct ScriptedDecorator {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl ScriptedDecorator {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Decorator for ScriptedDecorator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn decorate(&self, _path: &Path, _metadata: &Metadata) -> Result<Decoration> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.behaviour {
                Behaviour::Keep => Ok(Decoration::Unchanged),
                Behaviour::Replace(contents) => {
                    let mut file = NamedTempFile::new()?;
                    file.write_all(contents.as_bytes())?;
                    Ok(Decoration::Replaced(file))
                }
                Behaviour::Nothing => Ok(Decoration::Empty),
                Behaviour::Fail => Err(ExchangeError::delivery("scripted", "broken")),
            }
        }
    }

    fn input() -> NamedTempFile {
        NamedTempFile::new().expect("temp file")
    }

    #[tokio::test]
    async fn replacement_recomputes_metadata_for_later_stages() {
        let replace = ScriptedDecorator::new(Behaviour::Replace("seang"));
        let keep = ScriptedDecorator::new(Behaviour::Keep);
        let stages = [
            DecoratorStage::new(replace, false),
            DecoratorStage::new(keep.clone(), false),
        ];

        let (file, metadata) = run_chain("pub", &stages, input(), Metadata::new(), &FixedProvider)
            .await
            .expect("chain should succeed")
            .expect("file should survive");

        assert_eq!(metadata.source_name(), "seang");
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "seang");
        assert_eq!(keep.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn discarding_stage_stops_the_chain() {
        let nothing = ScriptedDecorator::new(Behaviour::Nothing);
        let after = ScriptedDecorator::new(Behaviour::Keep);
        let stages = [
            DecoratorStage::new(nothing, true),
            DecoratorStage::new(after.clone(), false),
        ];
        let file = input();
        let path = file.path().to_path_buf();

        let outcome = run_chain("pub", &stages, file, Metadata::new(), &FixedProvider)
            .await
            .expect("chain should succeed");

        assert!(outcome.is_none());
        assert!(!path.exists());
        assert_eq!(after.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_without_discard_keeps_the_file() {
        let stages = [DecoratorStage::new(
            ScriptedDecorator::new(Behaviour::Nothing),
            false,
        )];

        let outcome = run_chain("pub", &stages, input(), Metadata::new(), &FixedProvider)
            .await
            .expect("chain should succeed");

        assert!(outcome.is_some());
    }

    #[tokio::test]
    async fn failing_stage_reports_decoration_error() {
        let stages = [DecoratorStage::new(
            ScriptedDecorator::new(Behaviour::Fail),
            true,
        )];

        let result = run_chain("pub", &stages, input(), Metadata::new(), &FixedProvider).await;

        assert!(matches!(
            result,
            Err(ExchangeError::Decoration { decorator, .. }) if decorator == "scripted"
        ));
    }

    fn stamped(age: TimeDelta) -> Metadata {
        let nominal = Utc::now().naive_utc() - age;
        Metadata::new()
            .with_attribute("/what/date", nominal.format("%Y%m%d").to_string())
            .with_attribute("/what/time", nominal.format("%H%M%S").to_string())
    }

    #[tokio::test]
    async fn stale_file_blocker_blocks_old_files_only() {
        let blocker = StaleFileBlocker::new(StaleFileBlockerArguments {
            max_age_minutes: 30,
        })
        .expect("valid age");
        let path = Path::new("/tmp/ignored.h5");

        let old = blocker
            .decorate(path, &stamped(TimeDelta::try_hours(2).unwrap()))
            .await
            .unwrap();
        let fresh = blocker
            .decorate(path, &stamped(TimeDelta::try_minutes(5).unwrap()))
            .await
            .unwrap();
        let undated = blocker.decorate(path, &Metadata::new()).await.unwrap();

        assert!(matches!(old, Decoration::Empty));
        assert!(matches!(fresh, Decoration::Unchanged));
        assert!(matches!(undated, Decoration::Unchanged));
    }

    #[test]
    fn stale_file_blocker_rejects_negative_age() {
        let result = StaleFileBlocker::new(StaleFileBlockerArguments {
            max_age_minutes: -1,
        });

        assert!(matches!(result, Err(ExchangeError::Config { .. })));
    }
}
