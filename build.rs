use std::env;

fn main() {
    let base   = env::var("CARGO_MANIFEST_DIR").unwrap();
    let target = env::var("TARGET").unwrap();

    println!("cargo:rerun-if-changed=build.rs");

    if target.contains("darwin") {
        println!("cargo:rustc-link-search=native={}/libs/macos", base);
    } else if target.contains("linux-musl") {
        println!("cargo:rustc-link-search=native=/usr/local/lib");
        println!("cargo:rustc-link-search=native={}/libs/musl", base);
        println!("cargo:rustc-link-lib=static=pcap");
    }
}
