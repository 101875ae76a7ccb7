//! Stamps the stylesheet and the storefront script with content versions.
//!
//! Pages link `/static/css/main.css?v=<version>`, so a browser refetches an
//! asset only after its bytes change. The versions reach the crate as
//! `BRICKY_CSS_VERSION` and `BRICKY_JS_VERSION` (read with `env!`).

use std::env;
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

const VERSIONED_ASSETS: [(&str, &str); 2] = [
    ("BRICKY_CSS_VERSION", "static/css/main.css"),
    ("BRICKY_JS_VERSION", "static/js/storefront.js"),
];

fn main() -> Result<(), Box<dyn Error>> {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);

    for (var, relative) in VERSIONED_ASSETS {
        let path = crate_dir.join(relative);
        println!("cargo:rerun-if-changed={}", path.display());

        let bytes = fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        println!("cargo:rustc-env={var}={}", content_version(&bytes));
    }

    Ok(())
}

/// Ten hex characters of the SHA-256 digest.
fn content_version(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .take(5)
        .fold(String::with_capacity(10), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}
