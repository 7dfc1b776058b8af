use std::time::Duration;

/// Samples a running container's reported memory usage in the background,
/// tracking the observed maximum in KiB. Polls every 100 ms via
/// `docker stats --no-stream`, normalizing the runtime's human-readable
/// unit (B/KiB/MiB/GiB) the way the original system's `docker stats`
/// parser does. Sampling starts immediately on construction — no artificial
/// startup delay, so very short-lived programs still get at least one
/// sample.
pub struct MemoryMonitor {
    handle: tokio::task::JoinHandle<u64>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl MemoryMonitor {
    /// Starts sampling `container_name`'s memory in a background task.
    /// Stops automatically once `docker stats` can no longer find the
    /// container (it exited or was removed).
    pub fn start(container_name: String) -> Self {
        let handle = tokio::spawn(async move {
            let mut peak_kb: u64 = 0;
            loop {
                match sample_once(&container_name).await {
                    Some(kb) => {
                        if kb > peak_kb {
                            peak_kb = kb;
                        }
                    }
                    None => break,
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            peak_kb
        });

        Self { handle }
    }

    /// Stops sampling and returns the observed peak, in KiB. A sampling
    /// failure (runtime stats unreachable for the whole run) yields 0
    /// rather than an error.
    pub async fn stop(self) -> u64 {
        self.handle.await.unwrap_or(0)
    }
}

async fn sample_once(container_name: &str) -> Option<u64> {
    let output = tokio::process::Command::new("docker")
        .args(["stats", "--no-stream", "--format", "{{.MemUsage}}", container_name])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let line = String::from_utf8_lossy(&output.stdout);
    parse_mem_usage(line.trim())
}

/// Parses a `docker stats` `MemUsage` field of the form `"12.3MiB / 128MiB"`
/// into its used-side value, normalized to KiB.
fn parse_mem_usage(line: &str) -> Option<u64> {
    let used = line.split('/').next()?.trim();
    parse_quantity_to_kb(used)
}

fn parse_quantity_to_kb(s: &str) -> Option<u64> {
    if let Some(value) = s.strip_suffix("GiB") {
        return Some((value.trim().parse::<f64>().ok()? * 1024.0 * 1024.0) as u64);
    }
    if let Some(value) = s.strip_suffix("MiB") {
        return Some((value.trim().parse::<f64>().ok()? * 1024.0) as u64);
    }
    if let Some(value) = s.strip_suffix("KiB") {
        return Some(value.trim().parse::<f64>().ok()? as u64);
    }
    if let Some(value) = s.strip_suffix('B') {
        return Some((value.trim().parse::<f64>().ok()? / 1024.0) as u64);
    }
    s.trim().parse::<f64>().ok().map(|v| (v / 1024.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mib() {
        assert_eq!(parse_mem_usage("12.5MiB / 128MiB"), Some(12800));
    }

    #[test]
    fn parses_gib() {
        assert_eq!(parse_mem_usage("1.0GiB / 2GiB"), Some(1_048_576));
    }

    #[test]
    fn parses_kib() {
        assert_eq!(parse_mem_usage("512KiB / 128MiB"), Some(512));
    }

    #[test]
    fn parses_plain_bytes() {
        assert_eq!(parse_mem_usage("2048B / 128MiB"), Some(2));
    }

    #[test]
    fn unparseable_input_yields_none() {
        assert_eq!(parse_mem_usage("not a number"), None);
    }
}
