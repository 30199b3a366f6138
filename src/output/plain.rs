//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::ScanReport;
use crate::types::HostState;
use console::style;
use std::io::{self, Write};

/// Print results in human-readable plain text format.
pub fn print_plain(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_plain(&mut out, report)
}

/// Write the host list: one block per host with its state, link-layer
/// address, names and indented comments.
pub fn write_plain<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    writeln!(out)?;
    if report.hosts.is_empty() {
        writeln!(out, "  {}", style("No hosts found.").dim())?;
        writeln!(out)?;
    }

    for host in &report.hosts {
        let line = format!("{} is {}", host.address, host.state());
        match host.state() {
            HostState::Alive => writeln!(out, "{} {}", style("✓").green().bold(), style(line).green())?,
            HostState::Unknown => writeln!(out, "{} {}", style("?").yellow().bold(), style(line).yellow())?,
            HostState::Dead => writeln!(out, "  {}", style(line).dim())?,
        }

        if let Some(mac) = host.mac {
            writeln!(out, "\t{}", mac)?;
        }
        if let Some(name) = &host.host_name {
            writeln!(out, "\t{}", style(name).bold())?;
        }
        if let Some(workgroup) = &host.workgroup {
            writeln!(out, "\t{}", workgroup)?;
        }
        for comment in &host.comments {
            writeln!(out, "\t\t{}", style(comment).dim())?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "{} alive, {} unknown, {} addresses probed in {:.2}s",
        style(report.count(HostState::Alive)).green().bold(),
        style(report.count(HostState::Unknown)).yellow(),
        report.dispatched,
        report.duration_ms as f64 / 1000.0
    )?;

    Ok(())
}

/// Print the run header before scanning begins.
pub fn print_scan_header(target: &str, steps: &[String], threads: usize) {
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("netscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Target: {}", style("•").dim(), style(target).white().bold());
    println!(
        "{} Scan methods: {}",
        style("•").dim(),
        style(steps.join(", ")).yellow()
    );
    println!("{} Using {} threads", style("•").dim(), threads);
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostInfo;
    use chrono::Utc;
    use pnet::util::MacAddr;

    fn report(hosts: Vec<HostInfo>) -> ScanReport {
        ScanReport {
            target: "192.168.1.0/24".into(),
            probes: vec!["TCP Scan".into()],
            threads: 128,
            started_at: Utc::now(),
            duration_ms: 1500,
            dispatched: 254,
            emitted: 254,
            interrupted: false,
            hosts,
        }
    }

    #[test]
    fn test_write_plain_host_block() {
        let mut host = HostInfo::new("192.168.1.7".parse().unwrap());
        host.raise_state(HostState::Alive);
        host.mac = Some(MacAddr::new(0x18, 0x0f, 0x76, 0, 0, 1));
        host.host_name = Some("FILESERVER".into());
        host.add_comment("open TCP ports: 22 (ssh)");

        let mut buf = Vec::new();
        write_plain(&mut buf, &report(vec![host])).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("192.168.1.7 is alive"));
        assert!(text.contains("\t18:0f:76:00:00:01\n"));
        assert!(text.contains("FILESERVER"));
        assert!(text.contains("\t\t"));
        assert!(text.contains("open TCP ports: 22 (ssh)"));
        assert!(text.contains("254 addresses probed in 1.50s"));
    }

    #[test]
    fn test_write_plain_empty() {
        let mut buf = Vec::new();
        write_plain(&mut buf, &report(Vec::new())).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("No hosts found."));
    }
}
