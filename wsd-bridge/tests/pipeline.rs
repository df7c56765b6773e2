//! End-to-end tests for the classifier bridge, driven by scripted fake
//! classifiers that speak the tab-separated pipe protocol.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use wsd_bridge::{annotate, TokenAnnotations, WorkerManager, WsdConfig, WsdError};

/// A well-behaved fake classifier: echoes every token row with the request's
/// sense field scored 0.900, 0.800, ... in order. Written as a `while read`
/// loop so it answers line-by-line even while stdin stays open.
const FAKE_CLASSIFIER: &str = r#"#!/bin/sh
set -f
tab="$(printf '\t')"
while IFS="$tab" read -r f1 f2 f3 f4 f5 f6 rest; do
  if [ "$f5" = '$SENT$' ] || [ "$f6" = '_' ]; then
    printf '%s\t%s\t%s\t%s\t%s\t%s\t_\n' "$f1" "$f2" "$f3" "$f4" "$f5" "$f6"
  else
    probs=''
    d=9
    IFS='|'
    for sense in $f6; do
      if [ "$d" -gt 0 ]; then p="0.${d}00"; else p='0.000'; fi
      if [ -z "$probs" ]; then probs="$p"; else probs="$probs|$p"; fi
      d=$((d - 1))
    done
    printf '%s\t%s\t%s\t%s\t%s\t%s\t%s\n' "$f1" "$f2" "$f3" "$f4" "$f5" "$f6" "$probs"
  fi
done
"#;

/// A desynchronizing fake classifier: swallows the first token row.
const TRUNCATING_CLASSIFIER: &str = r#"#!/bin/sh
tab="$(printf '\t')"
n=0
while IFS="$tab" read -r f1 f2 f3 f4 f5 f6 rest; do
  n=$((n + 1))
  if [ "$n" -eq 1 ]; then continue; fi
  if [ "$f5" = '$SENT$' ] || [ "$f6" = '_' ]; then
    printf '%s\t%s\t%s\t%s\t%s\t%s\t_\n' "$f1" "$f2" "$f3" "$f4" "$f5" "$f6"
  else
    printf '%s\t%s\t%s\t%s\t%s\t%s\t0.500\n' "$f1" "$f2" "$f3" "$f4" "$f5" "$f6"
  fi
done
"#;

/// A hung fake classifier: never answers.
const HUNG_CLASSIFIER: &str = "#!/bin/sh\nexec sleep 60\n";

fn write_script(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn config(binary: PathBuf, persistent: bool) -> WsdConfig {
    WsdConfig {
        binary,
        persistent,
        call_timeout_ms: 5_000,
        ..WsdConfig::default()
    }
}

fn sample_annotations() -> TokenAnnotations {
    TokenAnnotations::new(
        vec!["Hon".into(), "kan".into(), "ge".into(), "upp".into()],
        vec!["1".into(), "2".into(), "3".into(), "4".into()],
        vec![
            "|hon..pn.1|".into(),
            "|kunna..vb.1|".into(),
            "|ge_upp..vbm.1|ge..vb.1|".into(),
            "|".into(),
        ],
        vec![
            "|hon..1|".into(),
            "|kunna..1|kunna..3|".into(),
            "|ge_upp..1|".into(),
            "|".into(),
        ],
        vec!["PN".into(), "VB".into(), "VB".into(), "PL".into()],
    )
    .unwrap()
}

fn sample_sentences() -> Vec<Vec<usize>> {
    vec![vec![0, 1], vec![2, 3]]
}

#[tokio::test]
async fn test_one_shot_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "fake-saldowsd", FAKE_CLASSIFIER);
    let config = config(binary, false);
    let mut workers = WorkerManager::new(&config);

    let out = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await
    .unwrap();

    assert_eq!(out[0], "|hon..1:0.900|");
    assert_eq!(out[1], "|kunna..1:0.900|kunna..3:0.800|");
    // MWE token: the request carried no sense entries, so its candidate
    // falls back to the default probability.
    assert_eq!(out[2], "|ge_upp..1:-1.000|");
    // Token without candidate senses gets the empty set.
    assert_eq!(out[3], "|");
}

/// A document whose request comfortably exceeds the OS pipe buffers, so the
/// worker I/O only completes when writing and reading are overlapped.
fn large_document(tokens: usize) -> (TokenAnnotations, Vec<Vec<usize>>) {
    let mut reference = Vec::with_capacity(tokens);
    let mut word = Vec::with_capacity(tokens);
    let mut lemgram = Vec::with_capacity(tokens);
    let mut sense = Vec::with_capacity(tokens);
    let mut pos = Vec::with_capacity(tokens);
    for i in 0..tokens {
        reference.push((i + 1).to_string());
        word.push(format!("långtgående{i}"));
        lemgram.push(format!("|långtgående{i}..av.1|"));
        sense.push(format!("|långtgående{i}..1|långtgående{i}..2|"));
        pos.push("JJ".into());
    }
    let annotations = TokenAnnotations::new(word, reference, lemgram, sense, pos).unwrap();
    let sentences = (0..tokens)
        .collect::<Vec<_>>()
        .chunks(20)
        .map(<[usize]>::to_vec)
        .collect();
    (annotations, sentences)
}

#[tokio::test]
async fn test_large_document_one_shot_does_not_deadlock() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "fake-saldowsd", FAKE_CLASSIFIER);
    let config = WsdConfig {
        binary,
        call_timeout_ms: 30_000,
        ..WsdConfig::default()
    };
    let mut workers = WorkerManager::new(&config);

    let (annotations, sentences) = large_document(4000);
    let out = annotate(&config, &mut workers, &annotations, &sentences, &[])
        .await
        .unwrap();
    assert_eq!(out.len(), 4000);
    assert_eq!(out[0], "|långtgående0..1:0.900|långtgående0..2:0.800|");
    assert_eq!(out[3999], "|långtgående3999..1:0.900|långtgående3999..2:0.800|");
}

#[tokio::test]
async fn test_large_document_persistent_does_not_deadlock() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "fake-saldowsd", FAKE_CLASSIFIER);
    let config = WsdConfig {
        binary,
        persistent: true,
        call_timeout_ms: 30_000,
        ..WsdConfig::default()
    };
    let mut workers = WorkerManager::new(&config);

    let (annotations, sentences) = large_document(4000);
    let out = annotate(&config, &mut workers, &annotations, &sentences, &[])
        .await
        .unwrap();
    assert_eq!(out.len(), 4000);
    assert_eq!(out[1234], "|långtgående1234..1:0.900|långtgående1234..2:0.800|");
    assert!(!workers.needs_restart());
    workers.shutdown().await;
}

#[tokio::test]
async fn test_persistent_worker_is_reused_across_calls() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "fake-saldowsd", FAKE_CLASSIFIER);
    let config = config(binary, true);
    let mut workers = WorkerManager::new(&config);
    workers.preload().await.unwrap();
    let pid = workers.worker_pid().unwrap();

    let annotations = sample_annotations();
    let sentences = sample_sentences();
    let first = annotate(&config, &mut workers, &annotations, &sentences, &[])
        .await
        .unwrap();
    workers.cleanup().await.unwrap();
    let second = annotate(&config, &mut workers, &annotations, &sentences, &[])
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(workers.worker_pid(), Some(pid));
    workers.shutdown().await;
}

#[tokio::test]
async fn test_dead_worker_is_replaced_before_next_request() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "fake-saldowsd", FAKE_CLASSIFIER);
    let config = config(binary, true);
    let mut workers = WorkerManager::new(&config);
    workers.preload().await.unwrap();
    let pid = workers.worker_pid().unwrap();

    // Kill the worker behind the manager's back.
    std::process::Command::new("kill")
        .args(["-9", &pid.to_string()])
        .status()
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let out = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await
    .unwrap();
    assert_eq!(out[0], "|hon..1:0.900|");
    assert_ne!(workers.worker_pid(), Some(pid));
    workers.shutdown().await;
}

#[tokio::test]
async fn test_one_shot_desynchronization_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "bad-saldowsd", TRUNCATING_CLASSIFIER);
    let config = config(binary, false);
    let mut workers = WorkerManager::new(&config);

    let err = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WsdError::Desync { unit: "tokens", .. }));
}

#[tokio::test]
async fn test_persistent_call_failure_marks_worker_for_restart() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "bad-saldowsd", TRUNCATING_CLASSIFIER);
    let config = config(binary, true);
    let mut workers = WorkerManager::new(&config);

    let result = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await;
    assert!(result.is_err());
    assert!(workers.needs_restart());
    let broken_pid = workers.worker_pid();

    // The between-calls hook replaces the worker transparently.
    workers.cleanup().await.unwrap();
    assert!(!workers.needs_restart());
    assert_ne!(workers.worker_pid(), broken_pid);
    workers.shutdown().await;
}

#[tokio::test]
async fn test_hung_worker_times_out_and_is_marked() {
    let dir = tempfile::tempdir().unwrap();
    let binary = write_script(dir.path(), "hung-saldowsd", HUNG_CLASSIFIER);
    let config = WsdConfig {
        binary,
        persistent: true,
        call_timeout_ms: 500,
        ..WsdConfig::default()
    };
    let mut workers = WorkerManager::new(&config);

    let err = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WsdError::Timeout(_)));
    assert!(workers.needs_restart());
    workers.shutdown().await;
}

/// Integration test against a real saldowsd installation.
/// Run with: cargo test --package wsd-bridge -- --ignored
#[tokio::test]
#[ignore = "Requires a saldowsd binary and models (WSD_BIN, WSD_SENSE_MODEL, WSD_CONTEXT_MODEL)"]
async fn test_real_classifier_end_to_end() {
    let config = WsdConfig {
        binary: std::env::var_os("WSD_BIN").map(PathBuf::from).unwrap(),
        sense_model: std::env::var_os("WSD_SENSE_MODEL").map(PathBuf::from).unwrap(),
        context_model: std::env::var_os("WSD_CONTEXT_MODEL").map(PathBuf::from).unwrap(),
        ..WsdConfig::default()
    };
    let mut workers = WorkerManager::new(&config);

    let out = annotate(
        &config,
        &mut workers,
        &sample_annotations(),
        &sample_sentences(),
        &[],
    )
    .await
    .unwrap();
    assert_eq!(out.len(), 4);
    assert!(out[0].starts_with("|hon..1"));
}
