//! End-to-end orchestration scenarios replayed from cassettes.
//!
//! Each test records the model answers a flow needs with `CassetteRecorder`,
//! replays them through `ServiceContext::replaying()` against an in-memory
//! object store, and inspects what the flow committed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use quill::adapters::memory::MemoryObjectStore;
use quill::cassette::recorder::CassetteRecorder;
use quill::config::Settings;
use quill::context::ServiceContext;
use quill::orchestrator::{InvocationRequest, InvocationResponse, ProjectOrchestrator};
use quill::snapshot::ProjectSnapshot;

/// Builds a cassette of model answers, ids and clock readings.
struct Script {
    recorder: CassetteRecorder,
}

impl Script {
    fn new(path: &Path) -> Self {
        Self { recorder: CassetteRecorder::new(path, "pipeline-test", "test-model") }
    }

    fn answer(mut self, label: &str, text: &str) -> Self {
        self.recorder.record(
            "llm",
            "generate",
            json!({ "label": label }),
            json!({ "Ok": { "text": text, "prompt_tokens": 0, "completion_tokens": 0 } }),
        );
        self
    }

    /// One id and one clock reading, as every committed flow consumes.
    fn commit(mut self, id: &str, time: &str) -> Self {
        self.recorder.record("id_gen", "generate_id", json!(null), json!(id));
        self.recorder.record("clock", "now", json!(null), json!(time));
        self
    }

    fn finish(self) -> PathBuf {
        self.recorder.finish().expect("cassette should be written")
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quill_pipeline_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn replay(cassette: &Path, store: &Arc<MemoryObjectStore>) -> ServiceContext {
    ServiceContext::replaying(cassette, Box::new(Arc::clone(store))).unwrap()
}

fn settings() -> Settings {
    Settings { max_retries: 0, ..Settings::default() }
}

fn request(project: &str, language: &str, framework: &str, prompt: &str) -> InvocationRequest {
    InvocationRequest {
        project_id: Some(project.into()),
        language: Some(language.into()),
        framework: Some(framework.into()),
        prompt: Some(prompt.into()),
        ..InvocationRequest::default()
    }
}

fn change(project: &str, text: &str) -> InvocationRequest {
    InvocationRequest {
        project_id: Some(project.into()),
        change_request: Some(text.into()),
        ..InvocationRequest::default()
    }
}

fn load_snapshot(store: &MemoryObjectStore, project: &str) -> ProjectSnapshot {
    let json = store
        .get_text(&format!("projects/{project}/snapshot.json"))
        .unwrap_or_else(|| panic!("no snapshot for {project}"));
    serde_json::from_str(&json).unwrap()
}

#[tokio::test]
async fn long_requirement_is_chunked_and_generates_every_planned_file() {
    let dir = scratch("long_requirement");
    let cassette = Script::new(&dir.join("create.cassette.yaml"))
        .commit("req-001", "2025-03-15T14:30:00Z")
        .answer("summarize:0", "{\"modules\":[\"users\"]}")
        .answer("summarize:1", "{\"modules\":[\"orders\"]}")
        .answer("summarize:2", "{\"modules\":[\"billing\"]}")
        .answer("summarize:3", "{\"modules\":[\"reports\"]}")
        .answer("merge", "{\"modules\":[\"users\",\"orders\",\"billing\",\"reports\"]}")
        .answer(
            "plan",
            r#"[{"path":"src/users.ts","role":"users"},{"path":"src/orders.ts","role":"orders"},
                {"path":"src/billing.ts","role":"billing"},{"path":"src/reports.ts","role":"reports"}]"#,
        )
        .answer("generate:src/users.ts", "<<<FILE:src/users.ts>>>\nexport class Users {}")
        .answer("generate:src/orders.ts", "<<<FILE:src/orders.ts>>>\nexport class Orders {}")
        .answer("generate:src/billing.ts", "<<<FILE:src/billing.ts>>>\nexport class Billing {}")
        .answer("generate:src/reports.ts", "<<<FILE:src/reports.ts>>>\nexport class Reports {}")
        .finish();

    let store = Arc::new(MemoryObjectStore::new());
    let ctx = replay(&cassette, &store);
    let settings = settings();
    let requirement = "r".repeat(20_000);

    let response = ProjectOrchestrator::new(&ctx, &settings)
        .invoke(&request("shop", "typescript", "express", &requirement))
        .await;

    let InvocationResponse::Created(created) = response else { panic!("{response:?}") };
    assert_eq!(created.file_count, 4);
    assert_eq!(created.requirement_key, "projects/shop/requirements/req-001.txt");
    assert_eq!(store.get_text(&created.requirement_key).map(|t| t.len()), Some(20_000));

    let snapshot = load_snapshot(&store, "shop");
    assert_eq!(
        snapshot.files,
        vec!["src/users.ts", "src/orders.ts", "src/billing.ts", "src/reports.ts"]
    );
    assert_eq!(snapshot.global_spec, "{\"modules\":[\"users\",\"orders\",\"billing\",\"reports\"]}");
    assert_eq!(snapshot.updated_at.unwrap().to_rfc3339(), "2025-03-15T14:30:00+00:00");
    for path in &snapshot.files {
        let content = store.get_text(&format!("projects/shop/files/{path}")).unwrap();
        assert_eq!(snapshot.summaries[path], content.trim_end());
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn update_touches_only_known_impacted_files() {
    let dir = scratch("update_impacted");
    let cassette = Script::new(&dir.join("session.cassette.yaml"))
        .commit("req-create", "2025-03-15T14:30:00Z")
        .answer("summarize:0", "{}")
        .answer("merge", "{\"modules\":[\"a\",\"b\"]}")
        .answer("plan", r#"["a.ts","b.ts"]"#)
        .answer("generate:a.ts", "<<<FILE:a.ts>>>\nexport const a = 1;")
        .answer("generate:b.ts", "<<<FILE:b.ts>>>\nexport const b = 1;")
        .commit("req-change", "2025-03-16T09:00:00Z")
        .answer(
            "change_spec",
            r#"{"changeType":"fix","impactedFiles":["a.ts","missing.ts"],"newFiles":[]}"#,
        )
        .answer("regenerate:a.ts", "<<<FILE:a.ts>>>\nexport const a = 2;")
        .finish();

    let store = Arc::new(MemoryObjectStore::new());
    let ctx = replay(&cassette, &store);
    let settings = settings();
    let orchestrator = ProjectOrchestrator::new(&ctx, &settings);

    let created = orchestrator.invoke(&request("p1", "typescript", "", "Two constants")).await;
    assert!(!created.is_failure(), "{created:?}");
    let b_before = store.get_text("projects/p1/files/b.ts");

    let response = orchestrator.invoke(&change("p1", "Bump a")).await;

    let InvocationResponse::Updated(updated) = response else { panic!("{response:?}") };
    assert_eq!(updated.updated_files, vec!["a.ts"]);
    assert!(updated.new_files.is_empty());
    assert_eq!(updated.impact_info.dropped, vec!["missing.ts"]);
    assert_eq!(updated.response, "<<<FILE:a.ts>>>\nexport const a = 2;\n");
    assert_eq!(store.get_text("projects/p1/files/a.ts").as_deref(), Some("export const a = 2;\n"));
    assert_eq!(store.get_text("projects/p1/files/b.ts"), b_before);
    assert!(store.get_text("projects/p1/files/missing.ts").is_none());

    let snapshot = load_snapshot(&store, "p1");
    assert_eq!(snapshot.files, vec!["a.ts", "b.ts"]);
    assert_eq!(snapshot.summaries["a.ts"], "export const a = 2;");
    assert_eq!(
        snapshot.last_requirement_key.as_deref(),
        Some("projects/p1/requirements/req-change.txt")
    );
    assert!(snapshot.last_change_spec.unwrap().contains("missing.ts"));
    assert_eq!(snapshot.updated_at.unwrap().to_rfc3339(), "2025-03-16T09:00:00+00:00");

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn malformed_plan_for_nestjs_uses_the_skeleton() {
    let dir = scratch("nest_skeleton");
    let skeleton = ["src/main.ts", "src/app.module.ts", "src/app.controller.ts", "src/app.service.ts"];
    let mut script = Script::new(&dir.join("nest.cassette.yaml"))
        .commit("req-nest", "2025-03-15T14:30:00Z")
        .answer("summarize:0", "{}")
        .answer("merge", "{}")
        .answer("plan", "Sure! You will need a module, a controller and a service.");
    for path in skeleton {
        script = script.answer(&format!("generate:{path}"), &format!("// {path}\nexport {{}};"));
    }
    let cassette = script.finish();

    let store = Arc::new(MemoryObjectStore::new());
    let ctx = replay(&cassette, &store);
    let settings = settings();

    let response = ProjectOrchestrator::new(&ctx, &settings)
        .invoke(&request("nest", "TypeScript", "NestJS", "A hello world API"))
        .await;

    let InvocationResponse::Created(created) = response else { panic!("{response:?}") };
    assert_eq!(created.file_count, 4);
    let snapshot = load_snapshot(&store, "nest");
    assert_eq!(snapshot.files, skeleton);
    assert_eq!(snapshot.language, "typescript");
    assert_eq!(snapshot.framework, "nestjs");
    assert_eq!(
        store.get_text("projects/nest/files/src/app.service.ts").as_deref(),
        Some("// src/app.service.ts\nexport {};\n")
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn projects_never_share_keys() {
    let dir = scratch("namespaces");
    let mut script = Script::new(&dir.join("two.cassette.yaml"));
    for (project, id) in [("alpha", "req-a"), ("beta", "req-b")] {
        script = script
            .commit(id, "2025-03-15T14:30:00Z")
            .answer("summarize:0", &format!("{{\"project\":\"{project}\"}}"))
            .answer("merge", &format!("{{\"project\":\"{project}\"}}"))
            .answer("plan", r#"["main.py"]"#)
            .answer("generate:main.py", &format!("print('{project}')"));
    }
    let cassette = script
        .commit("req-a2", "2025-03-16T09:00:00Z")
        .answer("change_spec", r#"{"impactedFiles":["main.py"]}"#)
        .answer("regenerate:main.py", "print('alpha v2')")
        .finish();

    let store = Arc::new(MemoryObjectStore::new());
    let ctx = replay(&cassette, &store);
    let settings = settings();
    let orchestrator = ProjectOrchestrator::new(&ctx, &settings);

    for project in ["alpha", "beta"] {
        let response = orchestrator.invoke(&request(project, "python", "", "Say hello")).await;
        assert!(!response.is_failure(), "{response:?}");
    }
    let beta_before = load_snapshot(&store, "beta");

    let response = orchestrator.invoke(&change("alpha", "Say hello twice")).await;
    assert!(!response.is_failure(), "{response:?}");

    assert_eq!(load_snapshot(&store, "beta"), beta_before);
    assert_eq!(store.get_text("projects/beta/files/main.py").as_deref(), Some("print('beta')\n"));
    assert_eq!(
        store.get_text("projects/alpha/files/main.py").as_deref(),
        Some("print('alpha v2')\n")
    );
    for key in store.keys() {
        assert!(key.starts_with("projects/alpha/") || key.starts_with("projects/beta/"), "{key}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_requirement_writes_nothing() {
    let dir = scratch("missing_requirement");
    let cassette = Script::new(&dir.join("empty.cassette.yaml")).finish();
    let store = Arc::new(MemoryObjectStore::new());
    let ctx = replay(&cassette, &store);
    let settings = settings();

    let response = ProjectOrchestrator::new(&ctx, &settings)
        .invoke(&request("p1", "python", "", "   "))
        .await;

    let InvocationResponse::Failed(failure) = response else { panic!("{response:?}") };
    assert_eq!(failure.project_id.as_deref(), Some("p1"));
    let json = serde_json::to_value(&failure).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Missing"));
    assert!(json.get("plan").is_none());
    assert!(store.keys().is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}
