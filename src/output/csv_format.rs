//! CSV output formatting. One row per host; comments are joined with "; ".

use crate::scanner::ScanReport;
use std::io::{self, Write};

/// Print results in CSV format.
pub fn print_csv(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    write_csv(stdout.lock(), report)
}

pub fn write_csv<W: Write>(out: W, report: &ScanReport) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["address", "state", "mac", "host_name", "workgroup", "comments"])?;

    for host in &report.hosts {
        wtr.write_record([
            host.address.to_string().as_str(),
            host.state().to_string().as_str(),
            host.mac.map(|m| m.to_string()).unwrap_or_default().as_str(),
            host.host_name.as_deref().unwrap_or(""),
            host.workgroup.as_deref().unwrap_or(""),
            host.comments.join("; ").as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
