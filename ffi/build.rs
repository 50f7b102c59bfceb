use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");
    let crate_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let out_dir = crate_dir.join("include");

    let bindings = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("COMET_FFI_H")
        .generate();
    match bindings {
        Ok(bindings) => {
            if let Err(e) = std::fs::create_dir_all(&out_dir) {
                println!("cargo:warning=cannot create {}: {e}", out_dir.display());
                return;
            }
            bindings.write_to_file(out_dir.join("comet_ffi.h"));
        }
        Err(e) => println!("cargo:warning=header generation skipped: {e}"),
    }
}
