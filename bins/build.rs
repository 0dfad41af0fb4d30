fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");
    // only the on-target tests log through defmt
    println!("cargo:rustc-link-arg-tests=-Tdefmt.x");
    println!("cargo:rustc-link-arg-tests=-Tembedded-test.x");
}
