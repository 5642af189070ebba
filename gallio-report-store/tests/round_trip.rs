// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end save/load round trips through the report manager.

use camino_tempfile::Utf8TempDir;
use chrono::TimeZone;
use gallio_report_model::{
    AttachmentContentDisposition, Report, Tag, TestLogAttachment, TestLogStream, TestOutcome,
    TestPackageRun, TestResult, TestStepData, TestStepRun, stream_names,
};
use gallio_report_store::{
    FormatterOptions, NullProgressMonitor, ReportArchiveFormat, ReportContainerFactory,
    ReportManager, ReportMerger,
};
use pretty_assertions::assert_eq;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0, 1, 2, 3];

fn case(id: &str, name: &str, outcome: TestOutcome) -> TestStepRun {
    let mut step = TestStepData::new(id, name);
    step.is_test_case = true;
    TestStepRun::new(
        step,
        TestResult {
            assert_count: 1,
            duration: 0.25,
            outcome,
        },
    )
}

fn sample_report() -> Report {
    let mut root = TestStepRun::new(TestStepData::new("root", "Suite"), TestResult::default());

    root.add_child(case("s1", "First", TestOutcome::passed()));
    root.add_child(case("s2", "Second", TestOutcome::passed()));

    let mut failing = case("s3", "Third", TestOutcome::failed());
    failing
        .test_log
        .add_stream(TestLogStream::text(stream_names::FAILURES, "boom"));
    failing.test_log.streams[0]
        .body
        .contents
        .push(Tag::embed("screenshot"));
    failing
        .test_log
        .add_attachment(TestLogAttachment::binary("screenshot", "image/png", PNG_BYTES));
    root.add_child(failing);

    let tz = chrono::FixedOffset::east_opt(0).unwrap();
    let mut run = TestPackageRun::new(
        root,
        tz.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        tz.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap(),
    );
    run.refresh_statistics();

    let mut report = Report::new();
    report.test_package_run = Some(run);
    report
}

fn save_and_reload(format: ReportArchiveFormat, options: FormatterOptions) -> Report {
    let dir = Utf8TempDir::new().unwrap();
    let manager = ReportManager::new();
    let factory = ReportContainerFactory::new(dir.path(), "report");

    let mut writer = manager.create_report_writer(sample_report(), &factory, format);
    manager
        .format(&mut writer, "Xml", &options, &mut NullProgressMonitor)
        .unwrap();

    if format == ReportArchiveFormat::Zip {
        assert!(dir.path().join("report.zip").is_file());
    } else {
        assert!(dir.path().join("report.xml").is_file());
    }

    let mut reader = manager.create_report_reader(&factory);
    reader.load_report(true, &mut NullProgressMonitor).unwrap()
}

fn assert_loaded_report(report: &Report) {
    let run = report.test_package_run.as_ref().unwrap();
    assert_eq!(
        run.statistics.format_test_case_result_summary(),
        "3 run, 2 passed, 1 failed, 0 inconclusive, 0 skipped"
    );

    let root = &run.root_test_step_run;
    assert_eq!(root.step.parent_id, None);
    for child in &root.children {
        assert_eq!(child.step.parent_id.as_deref(), Some("root"));
    }

    let failing = &root.children[2];
    assert_eq!(failing.test_log.streams[0].to_text(), "boom");
    let attachment = failing.test_log.attachment("screenshot").unwrap();
    assert_eq!(
        attachment.binary_contents().unwrap().as_deref(),
        Some(PNG_BYTES)
    );
}

#[test]
fn flat_report_round_trips_with_linked_attachments() {
    let report = save_and_reload(ReportArchiveFormat::Flat, FormatterOptions::new());
    assert_loaded_report(&report);
}

#[test]
fn zip_report_round_trips_with_linked_attachments() {
    let report = save_and_reload(ReportArchiveFormat::Zip, FormatterOptions::new());
    assert_loaded_report(&report);
}

#[test]
fn inline_report_round_trips_without_attachment_files() {
    let options =
        FormatterOptions::new().with_property("attachmentContentDisposition", "inline");
    let report = save_and_reload(ReportArchiveFormat::Flat, options);
    assert_loaded_report(&report);

    let run = report.test_package_run.as_ref().unwrap();
    let attachment = run.root_test_step_run.children[2]
        .test_log
        .attachment("screenshot")
        .unwrap();
    assert_eq!(
        attachment.content_disposition,
        AttachmentContentDisposition::Inline
    );
    assert_eq!(attachment.content_path, None);
}

#[test]
fn linked_attachment_lands_at_its_encoded_path() {
    let dir = Utf8TempDir::new().unwrap();
    let manager = ReportManager::new();
    let factory = ReportContainerFactory::new(dir.path(), "report");

    let mut writer =
        manager.create_report_writer(sample_report(), &factory, ReportArchiveFormat::Flat);
    writer
        .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
        .unwrap();

    let attachment_file = dir.path().join("report/s3/screenshot.png");
    assert_eq!(std::fs::read(attachment_file).unwrap(), PNG_BYTES);
}

#[test]
fn merged_reports_round_trip() {
    let first = sample_report();
    let second = sample_report();
    let merged = ReportMerger::new().merge([&first, &second]);

    let dir = Utf8TempDir::new().unwrap();
    let manager = ReportManager::new();
    let factory = ReportContainerFactory::new(dir.path(), "merged");
    let mut writer = manager.create_report_writer(merged, &factory, ReportArchiveFormat::Zip);
    writer
        .save_report(AttachmentContentDisposition::Link, &mut NullProgressMonitor)
        .unwrap();

    let mut reader = manager.create_report_reader(&factory);
    let reloaded = reader.load_report(true, &mut NullProgressMonitor).unwrap();

    let run = reloaded.test_package_run.as_ref().unwrap();
    assert_eq!(run.statistics.run_count, 6);
    assert_eq!(run.root_test_step_run.children.len(), 6);
    assert_eq!(
        run.statistics.format_test_case_result_summary(),
        "6 run, 4 passed, 2 failed, 0 inconclusive, 0 skipped"
    );
}
