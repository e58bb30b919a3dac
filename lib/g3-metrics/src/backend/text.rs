/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};
use std::sync::Arc;

/// Output of the text line backends.
pub trait TextSink: Send + Sync {
    fn write_line(&self, line: &str);
}

pub type ArcTextSink = Arc<dyn TextSink>;

#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutTextSink;

impl TextSink for StdoutTextSink {
    fn write_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }
}
