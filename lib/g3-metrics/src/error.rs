/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use g3_statsd_client::StatsdClientBuildError;

use crate::names::TemplateError;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid prefix template: {0}")]
    InvalidPrefix(TemplateError),
    #[error("invalid route names template: {0}")]
    InvalidNames(TemplateError),
    #[error("statsd: {0}")]
    Statsd(#[from] StatsdClientBuildError),
}
