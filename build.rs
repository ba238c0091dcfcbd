use vergen::EmitBuilder;

fn main() {
    // Missing git metadata (tarball builds) must not break the build.
    if let Err(err) = EmitBuilder::builder().build_timestamp().git_sha(true).emit() {
        println!("cargo:warning=vergen: {err}");
    }
}
