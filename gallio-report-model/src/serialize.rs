// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize and deserialize a [`Report`] as XML text.

use crate::report::Report;
use quick_xml::DeError;
use quick_xml::se::Serializer;
use serde::Serialize;

/// Serializes a report to an XML document rooted at `<report>`.
pub fn to_xml(report: &Report) -> Result<String, DeError> {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let mut serializer = Serializer::new(&mut out);
    serializer.indent(' ', 2);
    report.serialize(serializer)?;
    out.push('\n');
    Ok(out)
}

/// Deserializes a report from XML text.
pub fn from_xml(xml: &str) -> Result<Report, DeError> {
    quick_xml::de::from_str(xml)
}
