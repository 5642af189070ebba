// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Data model and XML serializer for Gallio test execution reports.
//!
//! A [`Report`] captures one test run: the package configuration that was
//! executed, the static test model, and a tree of [`TestStepRun`]s carrying
//! results, execution logs and attachments. Reports serialize to an XML
//! document rooted at `<report>`; see the `gallio-report-store` crate for
//! persisting reports into file-system or zip containers.

mod log;
mod model_data;
mod report;
mod serialize;
mod statistics;

pub use log::*;
pub use model_data::*;
pub use report::*;
pub use serialize::*;
pub use statistics::*;
