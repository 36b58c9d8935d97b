use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::store::{StoreBackend, TokenStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// `token\n`
    #[default]
    Tokens,
    /// `token\torigin\n`
    WithOrigin,
}

/// Write every committed entry to `sink` in store (token) order.
/// Returns the number of lines written. The store is left untouched, so a
/// failed export can be retried against another sink.
pub fn export<B, W>(store: &TokenStore<B>, sink: W, format: ExportFormat) -> Result<usize>
where
    B: StoreBackend,
    W: Write,
{
    let mut out = BufWriter::new(sink);
    let mut written = 0;

    for (token, origin) in store.iter() {
        match format {
            ExportFormat::Tokens => writeln!(out, "{token}")?,
            ExportFormat::WithOrigin => writeln!(out, "{token}\t{origin}")?,
        }
        written += 1;
    }

    out.flush()?;
    Ok(written)
}
