//! Runs the generator over the fixture schemas. The output is pulled into
//! `src/lib.rs` with `include!`, so any codegen regression that produces
//! invalid Rust fails this crate's build.

use std::env;
use std::path::PathBuf;

use tablec_codegen::CodegenConfig;

const VERSIONS: &[&str] = &["v1", "v2"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let config = CodegenConfig::default();

    for version in VERSIONS {
        let schema = manifest_dir
            .join("schemas")
            .join(format!("world_{}.tbl", version));
        println!("cargo:rerun-if-changed={}", schema.display());

        let top = tablec_core::compile_file(&schema)?;
        tablec_codegen::generate(&top, &out_dir.join(version), "world", &config)?;
    }
    Ok(())
}
