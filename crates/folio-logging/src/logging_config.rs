// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging configuration types

use crate::{CliLogLevel, CliLoggingArgs, LogFormat};
use serde::{Deserialize, Serialize};

/// `[logging]` section of the server configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Logging verbosity level
    #[serde(rename = "log-level")]
    pub level: Option<CliLogLevel>,

    /// Output format
    pub format: Option<LogFormat>,

    /// Directory for log files
    pub dir: Option<String>,

    /// Log filename
    pub file: Option<String>,
}

impl LoggingConfig {
    /// Fill unset CLI arguments from the file configuration.
    ///
    /// Flags given on the command line always win.
    pub fn apply_to(&self, args: &mut CliLoggingArgs) {
        if args.log_level.is_none() {
            args.log_level = self.level;
        }
        if args.log_format.is_none() {
            args.log_format = self.format;
        }
        if args.log_dir.is_none() {
            args.log_dir = self.dir.clone();
        }
        if args.log_file.is_none() {
            args.log_file = self.file.clone();
        }
    }
}
