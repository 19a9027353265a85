//! Parsers for kernel tables and vendor tool output.
//!
//! All parsers are total: malformed input yields sentinels or skipped rows,
//! never an error.

use aiserver_core::GpuDescriptor;

/// `(NAME, VERSION_ID)` from an os-release file
pub fn parse_os_release(content: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut version = None;

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("NAME=") {
            name = Some(unquote(value));
        } else if let Some(value) = line.strip_prefix("VERSION_ID=") {
            version = Some(unquote(value));
        }
    }

    (name, version)
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').trim_matches('\'').to_string()
}

/// First `model name` entry of the CPU info table
pub fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .filter(|line| line.starts_with("model name"))
        .find_map(|line| line.split_once(':'))
        .map(|(_, model)| model.trim().to_string())
        .filter(|model| !model.is_empty())
}

/// `(total, available)` memory in GB, rounded to one decimal
pub fn parse_meminfo(meminfo: &str) -> (f64, f64) {
    let mut total_kb = 0u64;
    let mut available_kb = 0u64;

    for line in meminfo.lines() {
        let mut fields = line.split_whitespace();
        let key = fields.next();
        let value = fields.next().and_then(|v| v.parse::<u64>().ok());
        match (key, value) {
            (Some("MemTotal:"), Some(kb)) => total_kb = kb,
            (Some("MemAvailable:"), Some(kb)) => available_kb = kb,
            _ => {}
        }
    }

    (kb_to_gb(total_kb), kb_to_gb(available_kb))
}

fn kb_to_gb(kb: u64) -> f64 {
    let gb = kb as f64 / 1024.0 / 1024.0;
    (gb * 10.0).round() / 10.0
}

/// Rows of `index,name,memory.total,memory.free,driver_version` in
/// `csv,noheader,nounits` format. Rows with fewer than five fields or an
/// unparsable index are skipped.
pub fn parse_gpu_rows(stdout: &str) -> Vec<GpuDescriptor> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_gpu_row)
        .collect()
}

fn parse_gpu_row(line: &str) -> Option<GpuDescriptor> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 5 {
        return None;
    }

    let index = parts[0].parse::<u32>().ok()?;
    let total = parse_mb(parts[2]);
    let free = parse_mb(parts[3]);

    Some(GpuDescriptor::new(
        index,
        parts[1].to_string(),
        total,
        free,
        parts[4].to_string(),
    ))
}

/// Memory fields may come back as floats or "[N/A]"
fn parse_mb(value: &str) -> u64 {
    value
        .parse::<f64>()
        .ok()
        .filter(|mb| mb.is_finite() && *mb >= 0.0)
        .map(|mb| mb as u64)
        .unwrap_or(0)
}

/// Release number from the CUDA compiler version banner,
/// e.g. `Cuda compilation tools, release 12.4, V12.4.131` -> `12.4`
pub fn parse_nvcc_release(banner: &str) -> Option<String> {
    banner.lines().find_map(|line| {
        // Same byte offsets as `line`
        let lower = line.to_ascii_lowercase();
        let start = lower.find("release")? + "release".len();
        let release = line[start..].split(',').next()?.trim();
        (!release.is_empty()).then(|| release.to_string())
    })
}

/// Kernel version strings of virtualized Linux-on-Windows carry this marker
pub fn is_wsl_kernel(version: &str) -> bool {
    let lower = version.to_lowercase();
    lower.contains("microsoft") || lower.contains("wsl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os_release() {
        let content = "PRETTY_NAME=\"Ubuntu 22.04.4 LTS\"\nNAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\n";
        let (name, version) = parse_os_release(content);
        assert_eq!(name.as_deref(), Some("Ubuntu"));
        assert_eq!(version.as_deref(), Some("22.04"));

        assert_eq!(parse_os_release(""), (None, None));
    }

    #[test]
    fn test_parse_cpu_model() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: AuthenticAMD\nmodel name\t: AMD Ryzen 9 7950X 16-Core Processor\n\nprocessor\t: 1\nmodel name\t: AMD Ryzen 9 7950X 16-Core Processor\n";
        assert_eq!(
            parse_cpu_model(cpuinfo).as_deref(),
            Some("AMD Ryzen 9 7950X 16-Core Processor")
        );
        assert_eq!(parse_cpu_model("processor\t: 0\n"), None);
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       65536000 kB\nMemFree:         1000000 kB\nMemAvailable:   32768000 kB\n";
        let (total, available) = parse_meminfo(meminfo);
        assert_eq!(total, 62.5);
        assert_eq!(available, 31.3);
        assert_eq!(parse_meminfo(""), (0.0, 0.0));
    }

    #[test]
    fn test_parse_gpu_rows() {
        let stdout = "0, NVIDIA GeForce RTX 4090, 24564, 23987, 550.54.14\n1, NVIDIA GeForce RTX 4090, 24564, 120.0, 550.54.14\n";
        let gpus = parse_gpu_rows(stdout);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].name, "NVIDIA GeForce RTX 4090");
        assert_eq!(gpus[0].memory_total_mb, 24564);
        assert_eq!(gpus[1].memory_free_mb, 120);
        assert_eq!(gpus[1].driver_version, "550.54.14");
    }

    #[test]
    fn test_parse_gpu_rows_skips_malformed() {
        let stdout = "garbage\nx, GPU, 1, 1, 1\n0, Tesla T4, 15360, [N/A], 535.0\n\n";
        let gpus = parse_gpu_rows(stdout);
        assert_eq!(gpus.len(), 1);
        assert_eq!(gpus[0].memory_free_mb, 0);
    }

    #[test]
    fn test_parse_gpu_rows_clamps_free_memory() {
        let gpus = parse_gpu_rows("0, Broken GPU, 8192, 9999, 535.0\n");
        assert_eq!(gpus[0].memory_free_mb, 8192);
    }

    #[test]
    fn test_parse_nvcc_release() {
        let banner = "nvcc: NVIDIA (R) Cuda compiler driver\nCopyright (c) 2005-2024 NVIDIA Corporation\nCuda compilation tools, release 12.4, V12.4.131\n";
        assert_eq!(parse_nvcc_release(banner).as_deref(), Some("12.4"));
        assert_eq!(parse_nvcc_release("no banner here"), None);
    }

    #[test]
    fn test_parse_nvcc_release_after_non_ascii_text() {
        // 'İ' grows from two to three bytes under full Unicode lowercasing
        let banner = "Outils de compilation Cuda İİİ, Release 12.6, V12.6.20\n";
        assert_eq!(parse_nvcc_release(banner).as_deref(), Some("12.6"));
    }

    #[test]
    fn test_is_wsl_kernel() {
        assert!(is_wsl_kernel(
            "Linux version 5.15.153.1-microsoft-standard-WSL2 (root@...)"
        ));
        assert!(!is_wsl_kernel("Linux version 6.8.0-45-generic (buildd@lcy02)"));
    }
}
