use vergen::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};
use vergen_git2::Git2Builder;

// Git values printed by `policychat version`.
const GIT_FALLBACKS: &[&str] = &["VERGEN_GIT_BRANCH", "VERGEN_GIT_DESCRIBE", "VERGEN_GIT_SHA"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let cargo = CargoBuilder::default().target_triple(true).build()?;
    let rustc = RustcBuilder::default().semver(true).build()?;

    let mut emitter = Emitter::default();
    emitter
        .add_instructions(&build)?
        .add_instructions(&cargo)?
        .add_instructions(&rustc)?;

    // Source tarballs from crates.io carry no git metadata.
    match Git2Builder::default()
        .branch(true)
        .describe(true, true, None)
        .sha(true)
        .build()
    {
        Ok(git2) => {
            emitter.add_instructions(&git2)?;
        }
        Err(_) => {
            for key in GIT_FALLBACKS {
                println!("cargo:rustc-env={key}=unknown");
            }
        }
    }

    emitter.emit()?;
    Ok(())
}
