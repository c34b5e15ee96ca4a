// Build provenance shown by `tcumux version --extended`.
fn main() {
    for (var, key) in [("TARGET", "TCUMUX_BUILD_TARGET"), ("PROFILE", "TCUMUX_BUILD_PROFILE")] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
