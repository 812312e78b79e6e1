//! Output formatting for CLI results

use crate::core::ScanReport;
use crate::detection::{EvpClass, EvpDetection};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Format a scan report for terminal output
pub fn format_report(report: &ScanReport, verbose: bool) -> String {
    let mut output = String::new();

    let (color, symbol) = if report.detections.is_empty() {
        ("\x1b[90m", "·")
    } else {
        ("\x1b[35m", "◆")
    };

    output.push_str(&format!(
        "{}{} {}{}{} {}[{} Hz, {:.2}s, {}]{}\n",
        color,
        symbol,
        BOLD,
        report.file.path.display(),
        RESET,
        DIM,
        report.sample_rate,
        report.duration_secs,
        report.codec,
        RESET,
    ));

    output.push_str(&format!(
        "  {} detection(s), voice activity {:.0}% over the last window\n",
        report.detections.len(),
        report.stats.voice_activity_rate * 100.0
    ));

    if !report.detections.is_empty() {
        output.push_str("\n  Detections:\n");
        for detection in &report.detections {
            output.push_str(&format_detection(detection, verbose));
        }
    }

    if verbose {
        output.push_str(&format!(
            "  {}{} ticks at hop {} | {} frames | analyzed {} in {} ms{}\n",
            DIM,
            report.ticks,
            report.hop_size,
            report.stats.frames_processed,
            report.analyzed_at.format("%Y-%m-%d %H:%M:%S"),
            report.elapsed_ms,
            RESET
        ));
    }

    output
}

fn format_detection(detection: &EvpDetection, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "    {}{} {}{} {} {:.0} Hz, SNR {:.1} dB ",
        detection.classification.color_code(),
        detection.classification.symbol(),
        detection.classification.name(),
        RESET,
        format_timestamp(detection.timestamp_ms),
        detection.dominant_frequency_hz,
        detection.snr_db,
    ));

    output.push_str(&format!(
        "{}({:.0}%){}\n",
        DIM,
        detection.confidence * 100.0,
        RESET
    ));

    if verbose {
        let f = &detection.features;
        output.push_str(&format!(
            "      {}centroid {:.0} Hz | spread {:.0} Hz | rolloff {:.0} Hz | flatness {:.3} | zcr {:.3} | peak {:.1} dB{}\n",
            DIM, f.centroid, f.spread, f.rolloff, f.flatness, f.zcr, detection.amplitude, RESET
        ));
        output.push_str(&format!("      {}id {}{}\n", DIM, detection.id, RESET));
    }

    output
}

/// `mm:ss.mmm`
pub fn format_timestamp(timestamp_ms: i64) -> String {
    let ms = timestamp_ms.max(0);
    format!("{:02}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

/// Format scan reports as a JSON array
pub fn format_json(reports: &[ScanReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Format a summary for multiple files
pub fn format_summary(reports: &[ScanReport], failed: usize) -> String {
    let mut output = String::new();

    let count = |class: EvpClass| {
        reports
            .iter()
            .flat_map(|r| r.detections.iter())
            .filter(|d| d.classification == class)
            .count()
    };
    let with_events = reports.iter().filter(|r| !r.detections.is_empty()).count();

    output.push_str(&format!("\n{}Summary:{}\n", BOLD, RESET));
    output.push_str(&format!(
        "  {} files analyzed, {} with detections\n",
        reports.len(),
        with_events
    ));

    for class in [EvpClass::ClassA, EvpClass::ClassB, EvpClass::ClassC, EvpClass::Unknown] {
        let n = count(class);
        if n > 0 {
            output.push_str(&format!(
                "  {}{} {} {}{}\n",
                class.color_code(),
                class.symbol(),
                n,
                class.name(),
                RESET
            ));
        }
    }

    if failed > 0 {
        output.push_str(&format!("  \x1b[31m✗ {} failed{}\n", failed, RESET));
    }

    output
}
