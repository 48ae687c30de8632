//! Concurrent multi-style generation
//!
//! A batch fans out one model call per selected style. Calls run on the
//! blocking pool behind a semaphore shared by every batch, so the number of
//! in-flight inference passes never exceeds the pool size. The batch returns
//! only after every task it spawned has resolved.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, warn};

use super::cache::GenerationCache;
use super::canvas::Canvas;
use super::invoker::{self, GenerationError};
use super::model::ImageModel;
use super::room::RoomType;
use super::style::StyleSelection;
use super::{DesignError, GenerationParams, GenerationRequest};
use crate::config::{CacheConfig, GenerationConfig};

/// Fixed knobs for every batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Inference steps per model call
    pub steps: u32,
    /// Worker pool size
    pub max_concurrency: usize,
}

impl BatchOptions {
    /// Options from config; a zero concurrency means available parallelism
    pub fn from_config(config: &GenerationConfig) -> Self {
        let max_concurrency = if config.max_concurrency == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            config.max_concurrency
        };
        Self {
            steps: config.steps,
            max_concurrency,
        }
    }
}

/// Batch progress snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Final result for one style
#[derive(Debug, Clone)]
pub struct StyleOutcome {
    pub style: String,
    pub result: Result<Arc<RgbImage>, GenerationError>,
    /// Served from the cache without a model call
    pub cached: bool,
}

/// Outcome of a batch with at least one success
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub room_type: RoomType,
    /// One entry per selected style, in selection order
    pub outcomes: Vec<StyleOutcome>,
}

impl BatchReport {
    /// Successful styles and their images
    pub fn successes(&self) -> impl Iterator<Item = (&str, &Arc<RgbImage>)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|img| (o.style.as_str(), img)))
    }

    /// Failed styles
    pub fn failures(&self) -> impl Iterator<Item = &GenerationError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }
}

/// Owns the model handle, result cache and worker pool
pub struct DesignStudio {
    model: Arc<dyn ImageModel>,
    cache: Arc<GenerationCache>,
    permits: Arc<Semaphore>,
    options: BatchOptions,
}

impl std::fmt::Debug for DesignStudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignStudio")
            .field("model", &self.model.name())
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish()
    }
}

impl DesignStudio {
    /// Create a studio around a loaded model
    pub fn new(model: Arc<dyn ImageModel>, options: BatchOptions, cache: &CacheConfig) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrency.max(1)));
        Self {
            model,
            cache: Arc::new(GenerationCache::new(
                cache.capacity,
                Duration::from_secs(cache.ttl_secs),
            )),
            permits,
            options,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    /// Generate one design per selected style.
    ///
    /// `on_progress` sees `completed` go from 0 to the selection size, once
    /// per resolved style. A style failure never affects its siblings; only
    /// when every style fails is the batch itself an error.
    pub async fn run_batch(
        &self,
        canvas: Arc<Canvas>,
        room_type: RoomType,
        selection: &StyleSelection,
        params: GenerationParams,
        mut on_progress: impl FnMut(BatchProgress),
    ) -> Result<BatchReport, DesignError> {
        let total = selection.len();
        let steps = self.options.steps;
        let mut progress = BatchProgress {
            completed: 0,
            total,
        };
        on_progress(progress);

        info!(
            "Generating {} designs for {} with {}",
            total,
            room_type,
            self.model.name()
        );

        let mut slots: Vec<Option<StyleOutcome>> = (0..total).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        for (index, style) in selection.styles().iter().enumerate() {
            let request = GenerationRequest::new(canvas.clone(), room_type, *style, params);
            let key = GenerationCache::key(&request, steps);

            if let Some(image) = self.cache.get(&key) {
                debug!("Cache hit for {} {}", style.name, room_type);
                slots[index] = Some(StyleOutcome {
                    style: style.name.to_string(),
                    result: Ok(image),
                    cached: true,
                });
                progress.completed += 1;
                on_progress(progress);
                continue;
            }

            let model = self.model.clone();
            let permits = self.permits.clone();
            let cache = self.cache.clone();

            tasks.spawn(async move {
                let style = request.style_name.clone();
                let result = match permits.acquire_owned().await {
                    Ok(permit) => {
                        let joined = task::spawn_blocking(move || {
                            let _permit = permit;
                            invoker::generate(model.as_ref(), &request, steps)
                        })
                        .await;
                        match joined {
                            Ok(result) => result,
                            Err(e) => Err(GenerationError::new(&style, format!("worker failed: {}", e))),
                        }
                    }
                    Err(_) => Err(GenerationError::new(&style, "worker pool closed")),
                };

                let result = result.map(Arc::new);
                if let Ok(image) = &result {
                    cache.insert(key, image.clone());
                }
                (index, style, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, style, result)) => {
                    match &result {
                        Ok(_) => debug!("{} {} design ready", style, room_type),
                        Err(e) => warn!("{}", e),
                    }
                    slots[index] = Some(StyleOutcome {
                        style,
                        result,
                        cached: false,
                    });
                }
                Err(e) => warn!("Generation task did not complete: {}", e),
            }
            progress.completed += 1;
            on_progress(progress);
        }

        let outcomes: Vec<StyleOutcome> = slots
            .into_iter()
            .zip(selection.styles())
            .map(|(slot, style)| {
                slot.unwrap_or_else(|| StyleOutcome {
                    style: style.name.to_string(),
                    result: Err(GenerationError::new(style.name, "generation task was lost")),
                    cached: false,
                })
            })
            .collect();

        let report = BatchReport {
            room_type,
            outcomes,
        };
        let succeeded = report.success_count();

        if succeeded == 0 {
            warn!("All {} styles failed for {}", total, room_type);
            return Err(DesignError::BatchExhausted {
                failures: report.failures().cloned().collect(),
            });
        }

        info!(
            "Generated {} of {} designs for {}",
            succeeded, total, room_type
        );
        Ok(report)
    }
}
