use chat_library::config::{self, ArchiveConfig, Config};
use chat_library::library::{plain_locator, Library};
use chat_library::scanner::ScanOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn chatlib_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chatlib");
    path
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two roots: a backup with Alice and a memory card with an older copy of
/// the same chat plus a Bob folder.
fn setup_archive() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let backup = tmp.path().join("ST-backup");
    let card = tmp.path().join("card");

    write(
        &backup.join("chats/Alice/first.jsonl"),
        concat!(
            "{\"user_name\":\"You\",\"character_name\":\"Alice\"}\n",
            "{\"name\":\"You\",\"is_user\":true,\"mes\":\"hello\",\"send_date\":\"2024-01-01\"}\n",
            "{\"name\":\"Alice\",\"is_user\":false,\"mes\":\"<thinking>plan</thinking>hi there\",\"swipes\":[\"a\",\"b\"],\"swipe_id\":1}\n",
            "not json\n",
        ),
    );
    write(&backup.join("images/Alice/alice.png"), "png");
    write(&card.join("chats/Alice/first.jsonl"), "{\"mes\":\"stale\"}\n");
    write(&card.join("chats/Bob/b.jsonl"), "{\"mes\":\"bob\"}\n");
    write(&card.join("characters/bob.webp"), "webp");

    (tmp, backup, card)
}

fn run_chatlib(roots: &[&Path], args: &[&str]) -> (String, String, bool) {
    let binary = chatlib_binary();
    let joined = std::env::join_paths(roots).unwrap();
    let missing_config = roots[0].join("no-such-config.toml");
    let output = Command::new(&binary)
        .arg("--config")
        .arg(&missing_config)
        .args(args)
        .env("CHAT_LIBRARY_PATH", joined)
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chatlib binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

// ============ Library ============

#[test]
fn test_library_end_to_end() {
    let (_tmp, backup, card) = setup_archive();
    let library = Library::from_paths(&[backup.clone(), card.clone()], ScanOptions::default());

    let catalog = library.scan();
    let names: Vec<&str> = catalog.characters().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);

    let alice = catalog.get("Alice").unwrap();
    assert_eq!(alice.chats.len(), 1);
    assert_eq!(alice.chats[0].path, backup.join("chats/Alice/first.jsonl"));
    assert_eq!(
        alice.avatar.as_ref().unwrap().path,
        backup.join("images/Alice/alice.png")
    );
    assert_eq!(
        catalog.get("Bob").unwrap().avatar.as_ref().unwrap().path,
        card.join("characters/bob.webp")
    );

    let view = library
        .get_chat(Some("Alice"), Some("first.jsonl"), plain_locator)
        .unwrap();
    // header line decodes to an empty message; the corrupt line is dropped
    assert_eq!(view.messages.len(), 3);
    assert_eq!(view.messages[1].speaker, "You");
    assert!(view.messages[1].is_user);
    assert_eq!(view.messages[1].body, "hello");
    assert_eq!(view.messages[1].timestamp, "2024-01-01");
    assert_eq!(view.messages[2].body, "hi there");
    assert_eq!(view.messages[2].swipe_count, 2);
    assert_eq!(view.messages[2].selected_swipe, Some(1));
    assert_eq!(
        view.avatar.as_deref(),
        backup.join("images/Alice/alice.png").to_str()
    );

    let bob = library.get_chat(Some("Bob"), Some("b.jsonl"), plain_locator).unwrap();
    assert_eq!(bob.messages[0].speaker, "Bob");
}

#[test]
fn test_single_root_alice_scenario() {
    let tmp = TempDir::new().unwrap();
    let r1 = tmp.path().join("r1");
    write(
        &r1.join("chats/Alice/2024-01-01.jsonl"),
        "{\"name\":\"Alice\",\"mes\":\"Good morning.\"}\n{\"name\":\"You\",\"is_user\":true,\"mes\":\"Morning!\"}\n",
    );
    write(&r1.join("images/Alice/alice.png"), "png");
    let library = Library::from_paths(&[r1.clone()], ScanOptions::default());

    let summary = serde_json::to_value(library.summary(plain_locator)).unwrap();
    let characters = summary["characters"].as_object().unwrap();
    assert_eq!(characters.len(), 1);
    assert_eq!(characters["Alice"]["chatCount"], 1);
    assert_eq!(characters["Alice"]["imageCount"], 1);
    assert_eq!(
        characters["Alice"]["avatar"],
        r1.join("images/Alice/alice.png").to_str().unwrap()
    );

    let view = library
        .get_chat(Some("Alice"), Some("2024-01-01.jsonl"), plain_locator)
        .unwrap();
    let bodies: Vec<&str> = view.messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["Good morning.", "Morning!"]);
}

#[test]
fn test_every_avatar_locator_resolves() {
    let (_tmp, backup, card) = setup_archive();
    let library = Library::from_paths(&[backup, card], ScanOptions::default());
    for character in library.scan().characters() {
        if let Some(avatar) = &character.avatar {
            let resolved = library.resolve_image(avatar.path.to_str()).unwrap();
            assert_eq!(resolved, avatar.path);
        }
    }
}

#[test]
fn test_files_added_between_queries_are_seen() {
    let (_tmp, backup, card) = setup_archive();
    let library = Library::from_paths(&[backup.clone(), card], ScanOptions::default());
    assert!(library.scan().get("Carol").is_none());

    write(&backup.join("chats/Carol/c.jsonl"), "{}\n");
    assert_eq!(library.scan().get("Carol").unwrap().chats.len(), 1);
}

#[test]
fn test_library_from_config_uses_explicit_roots() {
    let (tmp, backup, card) = setup_archive();
    let archive = ArchiveConfig {
        roots: vec![card.clone(), backup],
        home: Some(tmp.path().join("home")),
        ..ArchiveConfig::default()
    };
    let library = Library::from_config(&archive);
    assert_eq!(library.roots()[0].path, card);
    // the card now wins the shared chat
    let view = library
        .get_chat(Some("Alice"), Some("first.jsonl"), plain_locator)
        .unwrap();
    assert_eq!(view.messages[0].body, "stale");
    assert!(!tmp.path().join("home/ST-backup").exists());
}

#[test]
fn test_config_file_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("chatlib.toml");
    fs::write(
        &path,
        r#"
[archive]
max_depth = 4
image_extensions = ["png"]

[server]
bind = "127.0.0.1:7331"
"#,
    )
    .unwrap();
    let parsed: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.archive.max_depth, 4);
    assert_eq!(parsed.archive.image_extensions, vec!["png".to_string()]);
    assert_eq!(parsed.server.bind, "127.0.0.1:7331");
    assert!(config::load_config(&tmp.path().join("absent.toml")).is_ok());
}

// ============ CLI ============

#[test]
fn test_cli_roots() {
    let (_tmp, backup, card) = setup_archive();
    let (stdout, stderr, success) = run_chatlib(&[backup.as_path(), card.as_path()], &["roots"]);
    assert!(success, "roots failed: {}", stderr);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec![backup.to_str().unwrap(), card.to_str().unwrap()]);
}

#[test]
fn test_cli_scan_json() {
    let (_tmp, backup, card) = setup_archive();
    let (stdout, stderr, success) = run_chatlib(&[backup.as_path(), card.as_path()], &["scan", "--json"]);
    assert!(success, "scan failed: {}", stderr);

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["characters"]["Alice"]["chatCount"], 1);
    assert_eq!(value["characters"]["Bob"]["chatCount"], 1);
    assert_eq!(value["imageCount"], 2);
    assert_eq!(value["roots"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_scan_table() {
    let (_tmp, backup, card) = setup_archive();
    let (stdout, _, success) = run_chatlib(&[backup.as_path(), card.as_path()], &["scan"]);
    assert!(success);
    assert!(stdout.contains("Alice"));
    assert!(stdout.contains("2 characters"));
}

#[test]
fn test_cli_chat_sanitized() {
    let (_tmp, backup, card) = setup_archive();
    let (stdout, stderr, success) =
        run_chatlib(&[backup.as_path(), card.as_path()], &["chat", "Alice", "first.jsonl"]);
    assert!(success, "chat failed: {}", stderr);
    assert!(stdout.contains("hi there"));
    assert!(!stdout.contains("<thinking>"));
    assert!(stdout.contains("(swipe 2/2)"));
}

#[test]
fn test_cli_chat_missing_character() {
    let (_tmp, backup, card) = setup_archive();
    let (_, stderr, success) = run_chatlib(&[backup.as_path(), card.as_path()], &["chat", "Nobody", "x.jsonl"]);
    assert!(!success);
    assert!(stderr.contains("character not found: Nobody"));
}

#[test]
fn test_cli_images_filter() {
    let (_tmp, backup, card) = setup_archive();
    let (stdout, stderr, success) =
        run_chatlib(&[backup.as_path(), card.as_path()], &["images", "--character", "BOB", "--json"]);
    assert!(success, "images failed: {}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let images = value["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "bob.webp");
}

#[test]
fn test_cli_invalid_config_is_error() {
    let (tmp, backup, _card) = setup_archive();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[archive]\nmax_depth = 0\n").unwrap();
    let output = Command::new(chatlib_binary())
        .arg("--config")
        .arg(&config_path)
        .arg("roots")
        .env("CHAT_LIBRARY_PATH", &backup)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_depth"));
}
