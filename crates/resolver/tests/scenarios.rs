use findcode_protocol::{Accuracy, ElementDescriptor, FailureKind};
use findcode_resolver::ResolverSession;
use findcode_search::ScoringProfile;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const BUTTON_LINE: &str = r#"    <button id="submit-btn">Send</button>"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `form.html` with the submit button on line index 12.
fn form_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let mut lines: Vec<String> = (0..20).map(|i| format!("<!-- line {i} -->")).collect();
    lines[12] = BUTTON_LINE.to_string();
    write(temp.path(), "form.html", &lines.join("\n"));
    temp
}

/// Map for `app.js` sending generated 40:3 to `<source>` 22:5.
fn app_map(source: &str) -> String {
    format!(
        r#"{{"version":3,"file":"app.js","sources":["{source}"],"names":[],"mappings":"{}EAqBI"}}"#,
        ";".repeat(39)
    )
}

fn submit_button() -> ElementDescriptor {
    ElementDescriptor::new("button").id("submit-btn")
}

fn open(root: &Path) -> ResolverSession {
    ResolverSession::open(root, ScoringProfile::default()).unwrap()
}

#[test]
fn scenario_a_heuristic_match_without_maps() {
    let temp = form_workspace();
    let session = open(temp.path());

    let location = session.resolve(&submit_button()).unwrap();
    assert_eq!(location.accuracy, Accuracy::Fallback);
    assert!(location.file_path.ends_with("form.html"));
    assert_eq!(location.line, 12);
    assert_eq!(location.column, 12);
    assert!(!location.position_unknown);
}

#[test]
fn scenario_b_source_map_wins() {
    let temp = form_workspace();
    write(temp.path(), "dist/app.js.map", &app_map("src/Form.tsx"));
    write(temp.path(), "src/Form.tsx", "export function Form() {}\n");
    let session = open(temp.path());

    let descriptor = submit_button()
        .source_file_hint("app.js")
        .generated_position(40, 3);
    let location = session.resolve(&descriptor).unwrap();

    assert_eq!(location.accuracy, Accuracy::SourceMap);
    assert_eq!(
        location.file_path,
        temp.path().canonicalize().unwrap().join("src/Form.tsx")
    );
    assert_eq!((location.line, location.column), (21, 4));
}

#[test]
fn scenario_c_no_evidence_is_no_match() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "index.html", "<main><p>hello</p></main>");
    write(temp.path(), "src/App.tsx", "export const App = () => <span/>;");
    let session = open(temp.path());

    let failure = session
        .resolve(&ElementDescriptor::new("div").text_content(""))
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::NoMatch);
}

#[test]
fn sources_inside_nested_out_folder_are_ranked() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "src/components/out/Header.jsx",
        "export const Header = () => (\n  <header id=\"top\">Hi</header>\n);\n",
    );
    let session = open(temp.path());

    let location = session
        .resolve(&ElementDescriptor::new("header").id("top"))
        .unwrap();
    assert!(location.file_path.ends_with("src/components/out/Header.jsx"));
    assert_eq!((location.line, location.column), (1, 10));
}

#[test]
fn map_pointing_outside_root_falls_back() {
    let temp = form_workspace();
    write(temp.path(), "dist/app.js.map", &app_map("../../etc/passwd"));
    let session = open(temp.path());

    let descriptor = submit_button()
        .source_file_hint("app.js")
        .generated_position(40, 3);
    let location = session.resolve(&descriptor).unwrap();
    assert_eq!(location.accuracy, Accuracy::Fallback);
    assert_eq!(location.line, 12);
}

#[test]
fn map_pointing_at_missing_file_falls_back() {
    let temp = form_workspace();
    write(temp.path(), "dist/app.js.map", &app_map("src/Deleted.tsx"));
    let session = open(temp.path());

    let descriptor = submit_button()
        .source_file_hint("app.js")
        .generated_position(40, 3);
    let location = session.resolve(&descriptor).unwrap();
    assert_eq!(location.accuracy, Accuracy::Fallback);
    assert!(location.file_path.ends_with("form.html"));
}

#[test]
fn unconfigured_and_disposed_sessions_report_missing_workspace() {
    let session = ResolverSession::new(ScoringProfile::default());
    let failure = session.resolve(&submit_button()).unwrap_err();
    assert_eq!(failure.kind, FailureKind::WorkspaceMissing);

    let temp = form_workspace();
    session.initialize(temp.path()).unwrap();
    assert!(session.resolve(&submit_button()).is_ok());

    session.dispose();
    let failure = session.resolve(&submit_button()).unwrap_err();
    assert_eq!(failure.kind, FailureKind::WorkspaceMissing);
}

#[test]
fn reinitialize_picks_up_new_maps() {
    let temp = form_workspace();
    write(temp.path(), "src/Form.tsx", "export function Form() {}\n");
    let session = open(temp.path());
    assert_eq!(session.map_count(), 0);

    let descriptor = submit_button()
        .source_file_hint("app.js")
        .generated_position(40, 3);
    assert_eq!(
        session.resolve(&descriptor).unwrap().accuracy,
        Accuracy::Fallback
    );

    write(temp.path(), "dist/app.js.map", &app_map("src/Form.tsx"));
    let stats = session.initialize(temp.path()).unwrap();
    assert_eq!(stats.loaded, 1);
    assert_eq!(
        session.resolve(&descriptor).unwrap().accuracy,
        Accuracy::SourceMap
    );
}

#[test]
fn concurrent_resolutions_during_rebuild_always_finish() {
    let temp = form_workspace();
    write(temp.path(), "dist/app.js.map", &app_map("src/Form.tsx"));
    write(temp.path(), "src/Form.tsx", "export function Form() {}\n");
    let session = Arc::new(open(temp.path()));
    let root = temp.path().to_path_buf();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let session = Arc::clone(&session);
            scope.spawn(move || {
                for _ in 0..10 {
                    let descriptor = submit_button()
                        .source_file_hint("app.js")
                        .generated_position(40, 3);
                    let location = session.resolve(&descriptor).unwrap();
                    assert_eq!(location.accuracy, Accuracy::SourceMap);
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..5 {
                session.initialize(&root).unwrap();
            }
        });
    });
}
