use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use msj_core::{CoreError, MalformedPolicy, OutputRecord, ParseError, RankedEntry, NO_DETAILS};
use msj_runtime::metrics::MetricsRegistry;
use msj_runtime::output::{part_file_name, write_partitions};
use msj_runtime::pipeline::Uninitialized;
use msj_runtime::{run_job, run_partition, JobConfig, OutputFormat, PartitionSlice, PipelineError};

fn run_in_memory(reference: &str, primary: &str, k: usize) -> Vec<OutputRecord> {
    let mut aggregating = Uninitialized::new("::", MalformedPolicy::Skip, MetricsRegistry::default())
        .load(Cursor::new(reference), "users.dat")
        .unwrap()
        .start_aggregating();
    aggregating
        .aggregate(Cursor::new(primary), "ratings.dat")
        .unwrap();
    aggregating.finalize(k).into_output()
}

fn pairs(records: &[OutputRecord]) -> Vec<(i64, &str)> {
    records.iter().map(|r| (r.id, r.payload.as_str())).collect()
}

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn joins_top_users_in_count_order() {
    let out = run_in_memory("1::F::25\n2::M::30\n", "1::x::y\n1::x::y\n2::x::y\n", 10);
    assert_eq!(pairs(&out), vec![(1, "25\tF\t2"), (2, "30\tM\t1")]);
}

#[test]
fn unknown_user_gets_sentinel_payload() {
    let out = run_in_memory("1::F::25\n", "1::a\n99::b\n99::c\n", 10);
    assert_eq!(pairs(&out), vec![(99, NO_DETAILS), (1, "25\tF\t1")]);
}

#[test]
fn empty_primary_stream_emits_nothing() {
    assert!(run_in_memory("1::F::25\n2::M::30\n", "", 10).is_empty());
    assert!(run_in_memory("1::F::25\n", "\n\n", 10).is_empty());
}

#[test]
fn output_is_capped_at_k_with_deterministic_ties() {
    let reference: String = (1..=20).map(|id| format!("{id}::M::{}\n", 20 + id)).collect();
    // ids 1..=15 once each, plus id 12 twice more
    let mut primary: String = (1..=15).map(|id| format!("{id}::100::4::0\n")).collect();
    primary.push_str("12::1::1::0\n12::2::2::0\n");

    let out = run_in_memory(&reference, &primary, 10);
    let ids: Vec<i64> = out.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![12, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(out[0].payload, "32\tM\t3");
}

#[test]
fn ranked_entries_precede_the_join() {
    let mut aggregating = Uninitialized::new("::", MalformedPolicy::Skip, MetricsRegistry::default())
        .load(Cursor::new("1::F::25\n"), "users.dat")
        .unwrap()
        .start_aggregating();
    aggregating
        .aggregate(Cursor::new("7::a\n1::b\n7::c\n"), "ratings.dat")
        .unwrap();
    let done = aggregating.finalize(10);
    assert_eq!(
        done.ranked(),
        &[RankedEntry { id: 7, count: 2 }, RankedEntry { id: 1, count: 1 }]
    );
    assert_eq!(pairs(done.output()), vec![(7, NO_DETAILS), (1, "25\tF\t1")]);
}

#[test]
fn strict_policy_aborts_on_malformed_primary_line() {
    let mut aggregating = Uninitialized::new("::", MalformedPolicy::Fail, MetricsRegistry::default())
        .load(Cursor::new("1::F::25\n"), "users.dat")
        .unwrap()
        .start_aggregating();
    let err = aggregating
        .aggregate(Cursor::new("1::a\noops::b\n"), "ratings.dat")
        .unwrap_err();
    assert_eq!(err.to_string(), "ratings.dat:2: invalid id 'oops'");
}

#[test]
fn missing_reference_fails_the_partition() {
    let dir = tempfile::tempdir().unwrap();
    let ratings = write_file(dir.path(), "ratings.dat", "1::1::5::0\n");
    let cfg = JobConfig {
        reference_path: dir.path().join("users.dat"),
        primary_paths: vec![ratings],
        ..JobConfig::default()
    };
    let err = run_partition(&cfg, PartitionSlice::single(), &MetricsRegistry::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Core(CoreError::SourceUnavailable { .. })));
}

#[test]
fn job_partitions_the_stream_across_workers() {
    let dir = tempfile::tempdir().unwrap();
    let users = write_file(dir.path(), "users.dat", "1::F::25::10::48067\n2::M::56::16::70072\n");
    let first = write_file(dir.path(), "ratings-a.dat", "1::1::5::0\n2::1::5::0\n1::2::3::0\n");
    let second = write_file(dir.path(), "ratings-b.dat", "2::3::1::0\n3::4::2::0\n");

    let metrics = MetricsRegistry::default();
    let cfg = JobConfig {
        reference_path: users,
        primary_paths: vec![first, second],
        workers: 2,
        ..JobConfig::default()
    };
    let outputs = run_job(&cfg, &metrics).unwrap();
    assert_eq!(outputs.len(), 2);

    // positions 0, 2, 4 -> ids 1, 1, 3; positions 1, 3 -> ids 2, 2
    assert_eq!(outputs[0].partition.index, 0);
    assert_eq!(pairs(&outputs[0].records), vec![(1, "25\tF\t2"), (3, NO_DETAILS)]);
    assert_eq!(pairs(&outputs[1].records), vec![(2, "56\tM\t2")]);

    let snap = metrics.snapshot();
    assert_eq!(snap.primary_records, 5);
    assert_eq!(snap.reference_records, 4);
    assert_eq!(snap.emitted_records, 3);
    assert_eq!(snap.unmatched_records, 1);
}

#[test]
fn job_skips_undecodable_ratings_lines() {
    let dir = tempfile::tempdir().unwrap();
    let users = write_file(dir.path(), "users.dat", "1::F::25\n");
    let ratings = dir.path().join("ratings.dat");
    fs::write(&ratings, b"1::a\n1::\xff\xfe::5\n1::b\n").unwrap();

    let metrics = MetricsRegistry::default();
    let cfg = JobConfig {
        reference_path: users,
        primary_paths: vec![ratings],
        k: 1,
        ..JobConfig::default()
    };
    let outputs = run_job(&cfg, &metrics).unwrap();
    assert_eq!(pairs(&outputs[0].records), vec![(1, "25\tF\t2")]);
    assert_eq!(outputs[0].tally.skipped, 1);
    assert_eq!(metrics.snapshot().primary_skipped, 1);

    let strict = JobConfig {
        malformed: MalformedPolicy::Fail,
        ..cfg
    };
    let err = run_job(&strict, &MetricsRegistry::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Core(CoreError::Parse {
            line: 2,
            source: ParseError::Encoding { .. },
            ..
        }))
    ));
}

#[test]
fn job_writes_part_files() {
    let dir = tempfile::tempdir().unwrap();
    let users = write_file(dir.path(), "users.dat", "1::F::25\n");
    let ratings = write_file(dir.path(), "ratings.dat", "1::1::5::0\n\n1::2::4::0\n");
    let cfg = JobConfig {
        reference_path: users,
        primary_paths: vec![ratings],
        format: OutputFormat::Text,
        ..JobConfig::default()
    };

    let outputs = run_job(&cfg, &MetricsRegistry::default()).unwrap();
    let out_dir = dir.path().join("out");
    let written = write_partitions(&outputs, Some(&out_dir), cfg.format).unwrap();

    assert_eq!(written, vec![out_dir.join(part_file_name(0))]);
    assert_eq!(fs::read_to_string(&written[0]).unwrap(), "1\t25\tF\t2\n");
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let err = run_job(&JobConfig::default(), &MetricsRegistry::default()).unwrap_err();
    assert!(err.to_string().contains("primary input"));
}
