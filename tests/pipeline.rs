use parley::core::audit::{AuditLog, AuditRecord, ParseSource};
use parley::core::contract::{ChatInput, IdentityLemmatizer, SemanticParser};
use parley::core::error::ParleyError;
use parley::core::grammar::GrammarValidator;
use parley::core::ground_truth::GroundTruthIndex;
use parley::core::logical_form::LogicalForm;
use parley::core::resolver::CommandResolver;
use parley::core::time;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

struct ScriptedParser {
    form: LogicalForm,
    calls: Arc<AtomicUsize>,
}

impl SemanticParser for ScriptedParser {
    fn parse(&self, _chat: ChatInput<'_>) -> Result<LogicalForm, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.form.clone())
    }
}

fn write_dataset(data_dir: &Path) {
    let datasets = data_dir.join("datasets");
    std::fs::create_dir_all(&datasets).expect("datasets dir");
    std::fs::write(
        datasets.join("commands.txt"),
        concat!(
            "\"come here\"|{\"dialogue_type\": \"HUMAN_GIVE_COMMAND\", \"action_sequence\": [{\"action_type\": \"MOVE\"}]}\n",
            "\"what can you do\"|{\"dialogue_type\": \"GET_CAPABILITIES\"}\n",
        ),
    )
    .expect("dataset file");
}

fn resolver_with(
    data_dir: &Path,
    form: LogicalForm,
    calls: Arc<AtomicUsize>,
) -> CommandResolver {
    write_dataset(data_dir);
    CommandResolver::new(
        GroundTruthIndex::load_dir(data_dir).expect("ground truth"),
        GrammarValidator::embedded_default().expect("grammar"),
        Box::new(ScriptedParser { form, calls }),
        Box::new(IdentityLemmatizer),
        AuditLog::create(&data_dir.join("nsp_outputs.csv")).expect("audit log"),
        "test_agent",
    )
}

fn audit_lines(data_dir: &Path) -> Vec<String> {
    std::fs::read_to_string(data_dir.join("nsp_outputs.csv"))
        .expect("audit readable")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn ground_truth_hits_never_touch_the_model() {
    let tmp = tempdir().expect("tempdir");
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver_with(tmp.path(), LogicalForm::noop(), calls.clone());

    for _ in 0..3 {
        let resolution = resolver.resolve("come here", false).expect("resolve");
        assert_eq!(resolution.source, ParseSource::GroundTruth);
        assert_eq!(
            resolution.form.dialogue_type_str(),
            Some("HUMAN_GIVE_COMMAND")
        );
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // One audit row per attempt, all tagged ground_truth.
    let lines = audit_lines(tmp.path());
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "command|action_dict|source|agent|time");
    for line in &lines[1..] {
        assert!(line.contains("|ground_truth|test_agent|"));
    }
}

#[test]
fn misses_invoke_the_model_exactly_once_per_resolve() {
    let tmp = tempdir().expect("tempdir");
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver_with(tmp.path(), LogicalForm::noop(), calls.clone());

    let resolution = resolver.resolve("do a little dance", false).expect("resolve");
    assert_eq!(resolution.source, ParseSource::Model);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let lines = audit_lines(tmp.path());
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("|model|"));
}

#[test]
fn end_to_end_destroy_this_resolves_the_span() {
    let tmp = tempdir().expect("tempdir");
    let model_output = LogicalForm::from_value(json!({
        "dialogue_type": "HUMAN_GIVE_COMMAND",
        "action_sequence": [{
            "action_type": "DESTROY",
            "reference_object": {
                "filters": {"contains_coreference": "yes"},
                "text_span": [0, [1, 1]]
            }
        }]
    }))
    .expect("model output form");
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver_with(tmp.path(), model_output, calls);

    let resolution = resolver.resolve("destroy this", false).expect("resolve");
    assert_eq!(resolution.source, ParseSource::Model);
    assert_eq!(
        resolution.form.root()["action_sequence"][0]["reference_object"]["text_span"],
        json!("this")
    );
    assert!(!resolution.form.contains_span_markers());
}

#[test]
fn invalid_structure_collapses_to_the_noop_form() {
    let tmp = tempdir().expect("tempdir");
    let junk = LogicalForm::from_value(json!({
        "dialogue_type": "HUMAN_GIVE_COMMAND",
        "action_sequence": "not an array"
    }))
    .expect("junk form");
    let calls = Arc::new(AtomicUsize::new(0));
    let resolver = resolver_with(tmp.path(), junk, calls);

    let resolution = resolver.resolve("gibberish command", false).expect("resolve");
    assert_eq!(
        resolution.form,
        LogicalForm::from_value(json!({"dialogue_type": "NOOP"})).unwrap()
    );

    // Audited before validation: the raw junk is on disk even though the
    // pipeline output is NOOP.
    let lines = audit_lines(tmp.path());
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("not an array"));
}

#[test]
fn audit_appends_do_not_interleave_across_threads() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("nsp_outputs.csv");
    let log = Arc::new(AuditLog::create(&path).expect("audit log"));

    let mut handles = Vec::new();
    for worker in 0..8 {
        let log = log.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..25 {
                log.append(&AuditRecord {
                    command: format!("command {} from worker {}", i, worker),
                    logical_form: LogicalForm::noop(),
                    source: ParseSource::Model,
                    agent_id: format!("agent_{}", worker),
                    timestamp: time::now_epoch_secs(),
                })
                .expect("append");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .from_path(&path)
        .expect("reader");
    let rows: Vec<_> = reader.records().collect::<Result<_, _>>().expect("rows");
    assert_eq!(rows.len(), 200);
    for row in &rows {
        assert_eq!(row.len(), 5);
        assert!(LogicalForm::from_json_str(&row[1]).is_ok());
    }
}
