//! Write `include/gingham.h` for the C ABI.
//!
//! ```text
//! cargo run -p gingham-ffi --features generate-header --bin generate-ffi-header [OUT]
//! ```

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let out = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| crate_dir.join("include").join("gingham.h"));
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml"))?;
    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()?
        .write_to_file(&out);

    eprintln!("wrote {}", out.display());
    Ok(())
}
