use std::io::{self, Write};

use serde::Serialize;

use crate::app::GenerateResult;
use crate::service::MapListing;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_generate(result: &GenerateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_list(listing: &MapListing) -> io::Result<()> {
        Self::print_json(listing)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Keeps progress off the terminal while JSON goes to stdout.
impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}
