//! Accelerator monitoring.
//!
//! `GpuMonitor` keeps a bounded in-memory history of performance samples,
//! fed by an optional background sampling task and by per-request reports
//! from the model client. Probes never fail the caller; missing hardware
//! shows up as zeroed fields.

mod probe;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::System;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use probe::{GpuInfo, RuntimeModel};

/// One point-in-time measurement. The last two fields snapshot the
/// request counters as they stood when the sample was taken.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSample {
    pub timestamp: DateTime<Utc>,
    pub gpu_utilization: f64,
    pub gpu_memory_percent: f64,
    pub gpu_temperature: f64,
    pub ollama_memory_mb: u64,
    pub cpu_usage: f32,
    pub system_memory_percent: f64,
    pub tokens_generated: u64,
    pub response_time_s: f64,
}

/// Request counters updated by [`GpuMonitor::record_inference_performance`].
#[derive(Debug, Clone, Default)]
struct PerformanceCounters {
    total_requests: u64,
    total_tokens: u64,
    /// Running mean in seconds, updated incrementally.
    average_response_time: f64,
    /// Tokens per second of the most recent request.
    inference_speed: f64,
}

/// Aggregate over the recent sample window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PerformanceSummary {
    NoData,
    Ready {
        samples_considered: usize,
        history_len: usize,
        average_utilization: f64,
        average_memory_percent: f64,
        average_temperature: f64,
        total_requests: u64,
        total_tokens: u64,
        average_response_time_seconds: f64,
        tokens_per_second: f64,
    },
}

/// Snapshot for health endpoints. Every field is present even when the
/// probes find nothing.
#[derive(Debug, Clone, Serialize)]
pub struct GpuHealth {
    pub gpu_available: bool,
    pub gpu_name: Option<String>,
    pub gpu_utilization: u32,
    pub gpu_memory: Option<String>,
    pub gpu_temperature: Option<i32>,
    pub ollama_gpu_accelerated: bool,
    pub ollama_model: Option<String>,
    pub ollama_memory: Option<String>,
    pub monitoring_active: bool,
}

#[derive(Debug, Serialize)]
struct PerformanceReport {
    generated_at: DateTime<Utc>,
    gpu_info: Option<GpuInfo>,
    runtime_status: Option<RuntimeModel>,
    performance_summary: PerformanceSummary,
    recommendations: Vec<String>,
    recent_samples: Vec<PerformanceSample>,
}

struct MonitorState {
    history: VecDeque<PerformanceSample>,
    counters: PerformanceCounters,
    system: System,
    task: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

pub struct GpuMonitor {
    inner: RwLock<MonitorState>,
    max_history: usize,
}

impl GpuMonitor {
    pub fn new(max_history: usize) -> Self {
        let mut system = System::new_all();
        system.refresh_all();

        Self {
            inner: RwLock::new(MonitorState {
                history: VecDeque::with_capacity(max_history.min(1024)),
                counters: PerformanceCounters::default(),
                system,
                task: None,
            }),
            max_history,
        }
    }

    /// Spawn the periodic sampling task. A second call while running logs
    /// a warning and leaves the first task in place.
    pub async fn start_monitoring(self: &Arc<Self>, interval: Duration) {
        let mut state = self.inner.write().await;
        if state.task.is_some() {
            warn!("GPU monitoring already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.update_metrics().await;
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        state.task = Some((stop_tx, handle));
        info!("Started GPU monitoring with {}s interval", interval.as_secs());
    }

    /// Stop the sampling task and wait for it to finish. No sample lands
    /// after this returns. A no-op when monitoring is not running.
    pub async fn stop_monitoring(&self) {
        let task = {
            let mut state = self.inner.write().await;
            state.task.take()
        };
        let Some((stop_tx, handle)) = task else {
            return;
        };

        let _ = stop_tx.send(true);
        if let Err(err) = handle.await {
            warn!("Monitoring task ended abnormally: {}", err);
        }
        info!("Stopped GPU monitoring");
    }

    pub async fn is_monitoring(&self) -> bool {
        self.inner.read().await.task.is_some()
    }

    /// Run all probes, append the sample and trim history to the cap.
    ///
    /// A failed probe zeroes its fields; partial data is valid data.
    pub async fn update_metrics(&self) -> PerformanceSample {
        let gpu = probe::query_gpu().await;
        let runtime = probe::query_runtime().await;

        let mut state = self.inner.write().await;
        state.system.refresh_cpu();
        state.system.refresh_memory();

        let cpu_usage = if state.system.cpus().is_empty() {
            0.0
        } else {
            state.system.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>()
                / state.system.cpus().len() as f32
        };
        let system_memory_percent = if state.system.total_memory() == 0 {
            0.0
        } else {
            state.system.used_memory() as f64 / state.system.total_memory() as f64 * 100.0
        };

        let sample = PerformanceSample {
            timestamp: Utc::now(),
            gpu_utilization: gpu.as_ref().map(|g| g.utilization as f64).unwrap_or(0.0),
            gpu_memory_percent: gpu.as_ref().map(|g| g.memory_percent()).unwrap_or(0.0),
            gpu_temperature: gpu.as_ref().map(|g| g.temperature as f64).unwrap_or(0.0),
            ollama_memory_mb: runtime.as_ref().map(|r| r.gpu_memory_mb).unwrap_or(0),
            cpu_usage,
            system_memory_percent,
            tokens_generated: state.counters.total_tokens,
            response_time_s: state.counters.average_response_time,
        };

        state.history.push_back(sample.clone());
        while state.history.len() > self.max_history {
            state.history.pop_front();
        }
        sample
    }

    /// Fold one request into the running counters.
    /// Mean update is `new = (old * (n - 1) + x) / n`.
    pub async fn record_inference_performance(&self, tokens: u64, response_time_seconds: f64) {
        let mut state = self.inner.write().await;
        let counters = &mut state.counters;

        counters.total_requests += 1;
        counters.total_tokens += tokens;
        if response_time_seconds > 0.0 {
            counters.inference_speed = tokens as f64 / response_time_seconds;
        }

        let n = counters.total_requests as f64;
        counters.average_response_time =
            (counters.average_response_time * (n - 1.0) + response_time_seconds) / n;
    }

    /// Average the last 10 samples (or fewer). Empty history is the
    /// `NoData` sentinel, never a division by zero.
    pub async fn get_performance_summary(&self) -> PerformanceSummary {
        let state = self.inner.read().await;
        if state.history.is_empty() {
            return PerformanceSummary::NoData;
        }

        let window: Vec<&PerformanceSample> = state.history.iter().rev().take(10).collect();
        let len = window.len() as f64;
        let average_utilization = window.iter().map(|s| s.gpu_utilization).sum::<f64>() / len;
        let average_memory_percent = window.iter().map(|s| s.gpu_memory_percent).sum::<f64>() / len;
        let average_temperature = window.iter().map(|s| s.gpu_temperature).sum::<f64>() / len;

        PerformanceSummary::Ready {
            samples_considered: window.len(),
            history_len: state.history.len(),
            average_utilization: round2(average_utilization),
            average_memory_percent: round2(average_memory_percent),
            average_temperature: round2(average_temperature),
            total_requests: state.counters.total_requests,
            total_tokens: state.counters.total_tokens,
            average_response_time_seconds: round3(state.counters.average_response_time),
            tokens_per_second: round2(state.counters.inference_speed),
        }
    }

    /// Fresh probe of the GPU. `None` means no usable driver.
    pub async fn get_gpu_info(&self) -> Option<GpuInfo> {
        probe::query_gpu().await
    }

    /// Fresh probe of the Ollama runtime. `None` means no resident model.
    pub async fn get_runtime_status(&self) -> Option<RuntimeModel> {
        probe::query_runtime().await
    }

    pub async fn check_health(&self) -> GpuHealth {
        let gpu = probe::query_gpu().await;
        let runtime = probe::query_runtime().await;

        GpuHealth {
            gpu_available: gpu.is_some(),
            gpu_name: gpu.as_ref().map(|g| g.name.clone()),
            gpu_utilization: gpu.as_ref().map(|g| g.utilization).unwrap_or(0),
            gpu_memory: gpu
                .as_ref()
                .map(|g| format!("{}/{} MB", g.memory_used_mb, g.memory_total_mb)),
            gpu_temperature: gpu.as_ref().map(|g| g.temperature),
            ollama_gpu_accelerated: runtime.as_ref().map(|r| r.gpu_accelerated).unwrap_or(false),
            ollama_model: runtime.as_ref().map(|r| r.name.clone()),
            ollama_memory: runtime.as_ref().map(|r| format!("{} MB", r.gpu_memory_mb)),
            monitoring_active: self.is_monitoring().await,
        }
    }

    /// Advisory tuning hints for the current probe results.
    pub async fn get_optimization_recommendations(&self) -> Vec<String> {
        let gpu = probe::query_gpu().await;
        let runtime = probe::query_runtime().await;
        recommendations_for(gpu.as_ref(), runtime.as_ref())
    }

    /// Write a JSON report with probes, summary, recommendations and the
    /// last 100 samples.
    pub async fn save_performance_report(&self, path: &Path) -> Result<()> {
        let gpu = probe::query_gpu().await;
        let runtime = probe::query_runtime().await;
        let performance_summary = self.get_performance_summary().await;
        let recommendations = recommendations_for(gpu.as_ref(), runtime.as_ref());

        let recent_samples: Vec<PerformanceSample> = {
            let state = self.inner.read().await;
            let skip = state.history.len().saturating_sub(100);
            state.history.iter().skip(skip).cloned().collect()
        };

        let report = PerformanceReport {
            generated_at: Utc::now(),
            gpu_info: gpu,
            runtime_status: runtime,
            performance_summary,
            recommendations,
            recent_samples,
        };

        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize performance report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        info!("Performance report saved to {}", path.display());
        Ok(())
    }

    #[cfg(test)]
    async fn push_sample(&self, sample: PerformanceSample) {
        let mut state = self.inner.write().await;
        state.history.push_back(sample);
        while state.history.len() > self.max_history {
            state.history.pop_front();
        }
    }
}

/// Threshold logic behind [`GpuMonitor::get_optimization_recommendations`].
fn recommendations_for(gpu: Option<&GpuInfo>, runtime: Option<&RuntimeModel>) -> Vec<String> {
    let mut recommendations = Vec::new();

    let Some(gpu) = gpu else {
        recommendations.push("GPU monitoring unavailable, check NVIDIA drivers".to_string());
        return recommendations;
    };

    let memory_percent = gpu.memory_percent();
    if memory_percent < 30.0 {
        recommendations
            .push("GPU memory usage is low, a larger model would improve quality".to_string());
    } else if memory_percent > 90.0 {
        recommendations.push(
            "GPU memory usage is high, switch to a smaller model to avoid exhaustion".to_string(),
        );
    }

    if gpu.temperature > 80 {
        recommendations
            .push("GPU temperature is high, check cooling or reduce the workload".to_string());
    } else if gpu.temperature < 40 && gpu.utilization >= 50 {
        recommendations.push("GPU temperature is optimal for sustained workloads".to_string());
    }

    if gpu.utilization < 50 {
        recommendations
            .push("GPU utilization is low, batching requests would improve efficiency".to_string());
    } else if gpu.utilization > 95 {
        recommendations.push("GPU is at capacity".to_string());
    }

    match runtime {
        Some(runtime) if !runtime.gpu_accelerated => {
            recommendations
                .push("Ollama is not using GPU acceleration, check its configuration".to_string());
        }
        Some(_) => {
            recommendations.push("Ollama is using GPU acceleration".to_string());
        }
        None => {}
    }

    let free_mb = gpu.memory_total_mb.saturating_sub(gpu.memory_used_mb);
    if free_mb >= 4000 {
        recommendations.push("Sufficient GPU memory free for larger models (7B+)".to_string());
    } else if free_mb >= 2000 {
        recommendations.push("Moderate GPU memory free, suitable for 3B models".to_string());
    } else {
        recommendations
            .push("Limited GPU memory free, prefer smaller models or free memory".to_string());
    }

    recommendations
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
