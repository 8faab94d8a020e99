//! Behavior driven by process environment variables.
//!
//! Everything lives in one test so no other test in this binary reads the
//! environment while it is being changed.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tsify_host::config::is_production;
use tsify_host::prelude::*;

struct NullEngine;

impl CompilerEngine for NullEngine {
    type SourceFile = String;

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }

    fn parse(&self, _file_name: &str, text: &str, _target: TargetVersion) -> String {
        text.to_string()
    }

    fn default_lib_file_name(&self, _target: TargetVersion) -> String {
        "lib.d.ts".to_string()
    }

    fn lib_directory(&self) -> PathBuf {
        PathBuf::from("/engine/lib")
    }

    fn compile(
        &self,
        roots: &[String],
        mode: CompileMode,
        host: &mut dyn CompilerHost<SourceFile = String>,
    ) -> Vec<Diagnostic> {
        for root in roots {
            if host.source_file(root).is_some() && mode == CompileMode::Emit {
                host.write_file(&root.replacen("/src/", "/dist/", 1).replace(".ts", ".d.ts"), "export {};\n");
            }
        }
        Vec::new()
    }
}

fn set_env(key: &str, value: impl Into<OsString>) {
    // SAFETY: the only test in this binary; nothing reads the environment concurrently.
    unsafe { std::env::set_var(key, value.into()) }
}

fn restore_env(key: &str, previous: Option<OsString>) {
    // SAFETY: see `set_env`.
    unsafe {
        match previous {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

#[test]
fn test_environment_driven_configuration() {
    let dir = TempDir::new().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir(root.join("src")).unwrap();
    fs::write(root.join("src/types.ts"), "// @if NODE_ENV == 'production'\nexport type T = 1;\n// @endif\n").unwrap();

    let previous_env = std::env::var_os("NODE_ENV");

    // Production runs disable hot reload by default.
    set_env("NODE_ENV", "production");
    assert!(is_production());
    assert!(!HostConfig::default().hmr);
    assert!(!ConfigBuilder::new().build().hmr);

    set_env("NODE_ENV", "development");
    assert!(!is_production());
    assert!(HostConfig::default().hmr);

    // A variable that is not valid UTF-8 must not break environment definitions.
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStringExt;
        set_env("TSIFY_HOST_NON_UTF8", OsString::from_vec(vec![0xff, 0xfe]));
    }
    let config = ConfigBuilder::new()
        .current_dir(&root)
        .root_dir("src")
        .out_dir("dist")
        .case_sensitive(true)
        .preprocess(Preprocess::Environment)
        .build();
    assert!(config.hmr);
    let mut host = Host::builder(NullEngine, config)
        .with_roots(["src/types.ts"])
        .build()
        .unwrap();
    host.run_compile().unwrap();

    // Declaration-only output is served without the hot-reload bootstrap.
    assert_eq!(host.request_artifact("src/types.d.ts").as_deref(), Some("export {};\n"));
    assert!(host.request_artifact("src/types.js").is_none());

    restore_env("TSIFY_HOST_NON_UTF8", None);
    restore_env("NODE_ENV", previous_env);
}
