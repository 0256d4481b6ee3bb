fn main() {
    use std::env;

    println!("cargo:rerun-if-env-changed=PAWNC_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PAWNC_STATIC");

    // The compiler is only linked when the JNI surface is built.
    if env::var("CARGO_FEATURE_PAWNC").is_err() {
        return;
    }

    if let Ok(dir) = env::var("PAWNC_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    } else {
        println!("cargo:warning=PAWNC_LIB_DIR not set; relying on the default linker search path");
    }

    let kind = if env::var("PAWNC_STATIC").is_ok() { "static" } else { "dylib" };
    println!("cargo:rustc-link-lib={kind}=pawnc");
}
