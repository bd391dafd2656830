//! Tests for the script asset source and renderer.

use std::collections::HashMap;

use bootstrap::assets::{staging_path, DirScripts, EmbeddedScripts, ScriptSource, ALL_SCRIPTS};
use bootstrap::checks::CheckKind;
use bootstrap::init::InitKind;
use bootstrap::render::ScriptRenderer;

#[test]
fn test_every_catalog_script_is_embedded() {
    let source = EmbeddedScripts;
    for kind in CheckKind::all() {
        if let Some(script) = kind.script() {
            assert!(
                source.open(script).is_ok(),
                "missing check script {script}"
            );
        }
    }
    for kind in InitKind::all() {
        assert!(
            source.open(kind.script()).is_ok(),
            "missing init script {}",
            kind.script()
        );
    }
}

#[test]
fn test_embedded_scripts_are_shell_scripts() {
    for (name, content) in ALL_SCRIPTS {
        assert!(
            content.starts_with("#!/bin/sh"),
            "{name} is missing its interpreter line"
        );
    }
}

#[test]
fn test_open_unknown_asset_fails() {
    assert!(EmbeddedScripts.open("no_such_script.sh").is_err());
}

#[test]
fn test_staging_path_is_under_the_fixed_remote_directory() {
    assert_eq!(
        staging_path("check_cpu_num.sh"),
        std::path::PathBuf::from("/tmp/scripts/check_cpu_num.sh")
    );
}

#[test]
fn test_renderer_substitutes_toolchain_parameters() {
    let renderer = ScriptRenderer::new(Box::new(EmbeddedScripts)).unwrap();
    let vars = HashMap::from([
        ("mirror".to_string(), "https://mirror.example.com".to_string()),
        ("kubernetes_version".to_string(), "1.18.6".to_string()),
        ("image_repository".to_string(), "registry.example.com/k8s".to_string()),
        ("cluster_dns".to_string(), "10.96.0.10".to_string()),
    ]);

    let rendered = renderer.render("init_install_toolchain.sh.j2", &vars).unwrap();
    let text = String::from_utf8(rendered).unwrap();
    assert!(text.contains("MIRROR=\"https://mirror.example.com\""));
    assert!(text.contains("--cluster-dns=10.96.0.10"));
    assert!(text.contains("--image-repository \"registry.example.com/k8s\""));
    assert!(!text.contains("{{"), "all placeholders must be substituted");
}

#[test]
fn test_renderer_fails_on_unregistered_template() {
    let renderer = ScriptRenderer::new(Box::new(EmbeddedScripts)).unwrap();
    assert!(renderer.render("init_close_swap.sh", &HashMap::new()).is_err());
}

#[test]
fn test_dir_source_swaps_in_for_the_embedded_bundle() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("check_cpu_num.sh"), "#!/bin/sh\nnproc\n").unwrap();

    let source = DirScripts::new(dir.path());
    assert_eq!(source.names(), vec!["check_cpu_num.sh".to_string()]);
    let content = source.open("check_cpu_num.sh").unwrap();
    assert_eq!(content, b"#!/bin/sh\nnproc\n");
    assert!(source.open("missing.sh").is_err());
}
