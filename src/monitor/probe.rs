//! External probes for accelerator state.
//!
//! Both probes shell out (`nvidia-smi`, `ollama ps`) and degrade to `None`
//! when the binary is missing or exits non-zero. Parsing is split out into
//! pure functions so it stays testable without the binaries installed.

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

const GPU_QUERY: &str = "--query-gpu=index,name,memory.total,memory.used,memory.free,utilization.gpu,temperature.gpu,power.draw,driver_version";

/// One physical GPU as reported by `nvidia-smi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuInfo {
    pub gpu_id: u32,
    pub name: String,
    pub memory_total_mb: u64,
    pub memory_used_mb: u64,
    pub memory_free_mb: u64,
    /// Percent, 0-100.
    pub utilization: u32,
    /// Celsius.
    pub temperature: i32,
    pub power_draw_watts: f64,
    pub driver_version: String,
}

impl GpuInfo {
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_mb == 0 {
            return 0.0;
        }
        self.memory_used_mb as f64 / self.memory_total_mb as f64 * 100.0
    }
}

/// A model resident in the Ollama runtime as reported by `ollama ps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeModel {
    pub name: String,
    pub size: String,
    pub processor: String,
    pub gpu_memory_mb: u64,
    pub gpu_accelerated: bool,
}

/// Query the first GPU. `None` when no NVIDIA driver is reachable.
pub(crate) async fn query_gpu() -> Option<GpuInfo> {
    let output = Command::new("nvidia-smi")
        .args([GPU_QUERY, "--format=csv,noheader,nounits"])
        .output()
        .await;

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            debug!("nvidia-smi not available: {}", err);
            return None;
        }
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("nvidia-smi failed: {}", stderr.trim());
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .and_then(parse_gpu_csv)
}

/// Query the Ollama runtime for the first resident model.
pub(crate) async fn query_runtime() -> Option<RuntimeModel> {
    let output = Command::new("ollama").arg("ps").output().await;

    let output = match output {
        Ok(output) => output,
        Err(err) => {
            debug!("ollama not available: {}", err);
            return None;
        }
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("ollama ps failed: {}", stderr.trim());
        return None;
    }

    parse_runtime_table(&String::from_utf8_lossy(&output.stdout))
}

/// Parse one `csv,noheader,nounits` line from `nvidia-smi`.
///
/// Memory, utilization and temperature must parse; a `[N/A]` power reading
/// degrades to 0 rather than discarding the whole sample.
pub(crate) fn parse_gpu_csv(line: &str) -> Option<GpuInfo> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 9 {
        return None;
    }

    Some(GpuInfo {
        gpu_id: parts[0].parse().ok()?,
        name: parts[1].to_string(),
        memory_total_mb: parts[2].parse().ok()?,
        memory_used_mb: parts[3].parse().ok()?,
        memory_free_mb: parts[4].parse().ok()?,
        utilization: parts[5].parse().ok()?,
        temperature: parts[6].parse().ok()?,
        power_draw_watts: parts[7].parse().unwrap_or(0.0),
        driver_version: parts[8].to_string(),
    })
}

/// Parse the `ollama ps` table. Returns the first data row, if any.
///
/// Rows look like `NAME ID SIZE PROCESSOR UNTIL`, where SIZE is "9.0 GB"
/// and PROCESSOR is "100% GPU", "100% CPU" or a split like "22%/78% CPU/GPU".
pub(crate) fn parse_runtime_table(output: &str) -> Option<RuntimeModel> {
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            continue;
        }

        let name = parts[0].to_string();
        let (size, rest) = if matches!(parts[3], "GB" | "MB") {
            (format!("{} {}", parts[2], parts[3]), &parts[4..])
        } else {
            (parts[2].to_string(), &parts[3..])
        };

        let processor = rest
            .iter()
            .copied()
            .take_while(|t| t.contains('%') || matches!(*t, "GPU" | "CPU" | "CPU/GPU"))
            .collect::<Vec<_>>()
            .join(" ");

        let gpu_memory_mb = parse_size_mb(&size);
        let gpu_accelerated = processor.contains("GPU");

        return Some(RuntimeModel {
            name,
            size,
            processor,
            gpu_memory_mb,
            gpu_accelerated,
        });
    }
    None
}

fn parse_size_mb(size: &str) -> u64 {
    let normalized = size.replace(' ', "");
    if let Some(value) = normalized.strip_suffix("GB") {
        (value.parse::<f64>().unwrap_or(0.0) * 1024.0) as u64
    } else if let Some(value) = normalized.strip_suffix("MB") {
        value.parse::<f64>().unwrap_or(0.0) as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_gpu_line() {
        let line = "0, NVIDIA GeForce RTX 4090, 24564, 2048, 22516, 35, 42, 68.50, 550.54.14";
        let info = parse_gpu_csv(line).unwrap();

        assert_eq!(info.gpu_id, 0);
        assert_eq!(info.name, "NVIDIA GeForce RTX 4090");
        assert_eq!(info.memory_total_mb, 24564);
        assert_eq!(info.memory_used_mb, 2048);
        assert_eq!(info.memory_free_mb, 22516);
        assert_eq!(info.utilization, 35);
        assert_eq!(info.temperature, 42);
        assert!((info.power_draw_watts - 68.5).abs() < f64::EPSILON);
        assert_eq!(info.driver_version, "550.54.14");
    }

    #[test]
    fn short_gpu_line_is_rejected() {
        assert!(parse_gpu_csv("0, RTX 4090, 24564").is_none());
    }

    #[test]
    fn unreadable_power_degrades_to_zero() {
        let line = "0, Tesla T4, 15360, 512, 14848, 10, 38, [N/A], 535.104.05";
        let info = parse_gpu_csv(line).unwrap();
        assert_eq!(info.power_draw_watts, 0.0);
    }

    #[test]
    fn memory_percent_guards_zero_total() {
        let line = "0, Ghost, 0, 0, 0, 0, 30, 0.0, 1.0";
        let info = parse_gpu_csv(line).unwrap();
        assert_eq!(info.memory_percent(), 0.0);
    }

    #[test]
    fn parses_gpu_resident_model() {
        let table = "NAME            ID            SIZE      PROCESSOR    UNTIL\n\
                     qwen2.5:14b     7cdf5a0187d5  9.0 GB    100% GPU     4 minutes from now\n";
        let model = parse_runtime_table(table).unwrap();

        assert_eq!(model.name, "qwen2.5:14b");
        assert_eq!(model.size, "9.0 GB");
        assert_eq!(model.processor, "100% GPU");
        assert_eq!(model.gpu_memory_mb, 9216);
        assert!(model.gpu_accelerated);
    }

    #[test]
    fn cpu_only_model_is_not_accelerated() {
        let table = "NAME        ID            SIZE      PROCESSOR    UNTIL\n\
                     llama3:8b   a1b2c3d4e5f6  4.7 GB    100% CPU     30 seconds from now\n";
        let model = parse_runtime_table(table).unwrap();

        assert_eq!(model.processor, "100% CPU");
        assert!(!model.gpu_accelerated);
    }

    #[test]
    fn split_processor_counts_as_accelerated() {
        let table = "NAME        ID            SIZE      PROCESSOR        UNTIL\n\
                     mixtral:8x7b a1b2c3d4e5f6 26 GB     22%/78% CPU/GPU  2 minutes from now\n";
        let model = parse_runtime_table(table).unwrap();

        assert_eq!(model.processor, "22%/78% CPU/GPU");
        assert!(model.gpu_accelerated);
        assert_eq!(model.gpu_memory_mb, 26624);
    }

    #[test]
    fn empty_table_yields_none() {
        assert!(parse_runtime_table("NAME ID SIZE PROCESSOR UNTIL\n").is_none());
        assert!(parse_runtime_table("").is_none());
    }
}
