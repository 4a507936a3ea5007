/// Build metadata captured by `build.rs`. Values are absent when the crate
/// was built without the build script's environment.
pub fn version_lines() -> Vec<String> {
    let or_unknown = |value: Option<&'static str>| value.unwrap_or("unknown");

    let mut lines = vec![format!("policychat {}", env!("CARGO_PKG_VERSION"))];
    lines.push(format!(
        "commit: {} ({})",
        or_unknown(option_env!("VERGEN_GIT_SHA")),
        or_unknown(option_env!("VERGEN_GIT_BRANCH"))
    ));
    lines.push(format!(
        "describe: {}",
        or_unknown(option_env!("VERGEN_GIT_DESCRIBE"))
    ));
    lines.push(format!(
        "built: {}",
        or_unknown(option_env!("VERGEN_BUILD_TIMESTAMP"))
    ));
    lines.push(format!(
        "rustc: {}",
        or_unknown(option_env!("VERGEN_RUSTC_SEMVER"))
    ));
    lines.push(format!(
        "target: {}",
        or_unknown(option_env!("VERGEN_CARGO_TARGET_TRIPLE"))
    ));
    lines
}

pub fn print_version_info() {
    for line in version_lines() {
        println!("{line}");
    }
}
