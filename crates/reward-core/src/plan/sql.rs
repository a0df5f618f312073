//! SQL dump rewriting for database imports
//!
//! Dumps taken on another server carry definers and GTID statements the
//! development database rejects. Each line is rewritten before it reaches the
//! import process.

use anyhow::{bail, Context, Result};
use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

const READ_BUFFER: usize = 1024 * 1024;
const MAX_LINE_MIB: u64 = 64;

fn definer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"DEFINER[ ]*=[ ]*`[^`]+`@`[^`]+`").expect("static definer pattern")
    })
}

fn gtid() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@@(GLOBAL\.GTID_PURGED|SESSION\.SQL_LOG_BIN)").expect("static gtid pattern")
    })
}

/// Rewrite a single dump line
pub fn rewrite_line(line: &[u8]) -> Cow<'_, [u8]> {
    match definer().replace_all(line, &b"DEFINER=CURRENT_USER"[..]) {
        Cow::Borrowed(b) => gtid().replace_all(b, &b""[..]),
        Cow::Owned(o) => Cow::Owned(gtid().replace_all(&o, &b""[..]).into_owned()),
    }
}

/// Line-oriented copy from a dump source into an import process
#[derive(Debug, Clone, Copy)]
pub struct SqlRewriter {
    max_line: usize,
}

impl SqlRewriter {
    /// `max_line_mib` bounds a single line, clamped to 1..=64 MiB
    pub fn new(max_line_mib: u64) -> Self {
        let mib = max_line_mib.clamp(1, MAX_LINE_MIB) as usize;
        Self {
            max_line: mib * 1024 * 1024,
        }
    }

    /// Copy `reader` to `writer` line by line, rewriting each line
    ///
    /// Owns the writer end and shuts it down at end of input, so the import
    /// process sees EOF. Returns the number of lines copied.
    pub async fn pump<R, W>(&self, reader: R, mut writer: W) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::with_capacity(READ_BUFFER, reader);
        let mut line = Vec::new();
        let mut count = 0u64;

        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .await
                .context("Failed to read SQL input")?;
            if n == 0 {
                break;
            }
            if line.len() > self.max_line {
                bail!(
                    "SQL line {} is longer than {} MiB, raise {}",
                    count + 1,
                    self.max_line / (1024 * 1024),
                    "REWARD_DB_IMPORT_LINE_BUFFER_SIZE"
                );
            }
            writer
                .write_all(&rewrite_line(&line))
                .await
                .context("Failed to write to import process")?;
            count += 1;
        }

        writer.flush().await.context("Failed to flush import input")?;
        writer.shutdown().await.context("Failed to close import input")?;
        debug!(lines = count, "SQL input copied");
        Ok(count)
    }
}

impl Default for SqlRewriter {
    fn default() -> Self {
        Self::new(10)
    }
}
